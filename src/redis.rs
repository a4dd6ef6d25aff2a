use crate::error::{GuardError, Result};
use crate::fixed_window::{Decision, RateWindow};
use crate::store::{window_ms, WindowStore};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use std::time::Duration;

const KEY_PREFIX: &str = "catalog-guard:window";

// KEYS[1] = window hash, ARGV = limit, window_ms, now
const HIT_SCRIPT: &str = r#"
local limit = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local count = tonumber(redis.call('HGET', KEYS[1], 'count'))
local start = tonumber(redis.call('HGET', KEYS[1], 'start'))

if (not count) or (not start) or (now - start > window) then
    redis.call('HSET', KEYS[1], 'count', 1, 'start', now)
    redis.call('PEXPIRE', KEYS[1], window + 1)
    return {1, 1, now}
end

if count < limit then
    count = redis.call('HINCRBY', KEYS[1], 'count', 1)
    return {1, count, start}
end

return {0, count, start}
"#;

/// Window store shared between instances through Redis.
pub struct RedisStore {
    connection: MultiplexedConnection,
    hit_script: Script,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| GuardError::Redis(format!("Failed to create Redis client: {}", e)))?;

        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| GuardError::Redis(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            hit_script: Script::new(HIT_SCRIPT),
        })
    }

    fn key(client_id: &str) -> String {
        format!("{}:{}", KEY_PREFIX, client_id)
    }
}

/// Map the script's `{allowed, count, window_start}` reply onto a [`Decision`].
fn decision_from_reply(reply: &[i64], limit: u32, window_ms: u64) -> Result<Decision> {
    match reply {
        [1, count, _] => Ok(Decision::allowed(*count as u32, limit)),
        [0, count, start] => Ok(Decision::denied(
            *count as u32,
            limit,
            (*start as u64).saturating_add(window_ms),
        )),
        other => Err(GuardError::Redis(format!(
            "Unexpected window script reply: {:?}",
            other
        ))),
    }
}

#[async_trait]
impl WindowStore for RedisStore {
    async fn hit(
        &self,
        client_id: &str,
        limit: u32,
        window: Duration,
        now: u64,
    ) -> Result<Decision> {
        let limit = limit.max(1);
        let window_ms = window_ms(window);
        let mut conn = self.connection.clone();

        let reply: Vec<i64> = self
            .hit_script
            .key(Self::key(client_id))
            .arg(limit)
            .arg(window_ms)
            .arg(now)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| GuardError::Redis(format!("Window script failed: {}", e)))?;

        decision_from_reply(&reply, limit, window_ms)
    }

    async fn window(&self, client_id: &str) -> Result<Option<RateWindow>> {
        let mut conn = self.connection.clone();
        let (count, start): (Option<u32>, Option<u64>) = redis::cmd("HMGET")
            .arg(Self::key(client_id))
            .arg("count")
            .arg("start")
            .query_async(&mut conn)
            .await?;

        Ok(match (count, start) {
            (Some(count), Some(window_start)) => Some(RateWindow {
                count,
                window_start,
            }),
            _ => None,
        })
    }

    async fn reset(&self, client_id: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(Self::key(client_id)).await?;
        Ok(())
    }

    async fn tracked_clients(&self) -> Result<usize> {
        let mut conn = self.connection.clone();
        let mut keys = conn
            .scan_match::<_, String>(format!("{}:*", KEY_PREFIX))
            .await?;

        let mut total = 0;
        while keys.next_item().await.is_some() {
            total += 1;
        }
        Ok(total)
    }

    async fn is_healthy(&self) -> bool {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok()
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
