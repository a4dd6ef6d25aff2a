use crate::error::{GuardError, Result};
use std::net::SocketAddr;

const ENVIRONMENTS: [&str; 4] = ["development", "staging", "production", "test"];

/// Checks on settings that parse but cannot run.
pub struct ConfigValidator;

impl ConfigValidator {
    /// `BIND_ADDR` must name a concrete port.
    pub fn check_bind_addr(addr: &SocketAddr) -> Result<()> {
        if addr.port() == 0 {
            return Err(invalid(format!(
                "BIND_ADDR {} has port 0; the gate needs a fixed port",
                addr
            )));
        }
        Ok(())
    }

    /// `REDIS_URL` must use a scheme the window store can open.
    pub fn check_redis_url(url: &str) -> Result<()> {
        match url.split_once("://") {
            Some(("redis" | "rediss", rest)) if !rest.is_empty() => Ok(()),
            _ => Err(invalid(format!(
                "REDIS_URL '{}' is not a redis:// or rediss:// address",
                url
            ))),
        }
    }

    /// `MAX_TRACKED_CLIENTS` of 0 would evict every window on arrival.
    pub fn check_tracked_clients(capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(invalid("MAX_TRACKED_CLIENTS must be at least 1".to_string()));
        }
        Ok(())
    }

    /// `CLEANUP_INTERVAL` drives a tokio interval, which panics on zero.
    pub fn check_cleanup_interval(secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(invalid("CLEANUP_INTERVAL must be at least 1 second".to_string()));
        }
        Ok(())
    }

    pub fn check_environment(name: &str) -> Result<()> {
        let lowered = name.to_lowercase();
        if ENVIRONMENTS.contains(&lowered.as_str()) {
            Ok(())
        } else {
            Err(invalid(format!(
                "APP_ENV '{}' is not one of {}",
                name,
                ENVIRONMENTS.join(", ")
            )))
        }
    }
}

fn invalid(message: String) -> GuardError {
    GuardError::Validation(message)
}
