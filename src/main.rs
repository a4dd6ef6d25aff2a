use anyhow::Result;
use catalog_guard::config::Config;
use catalog_guard::health;
use catalog_guard::server::Server;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "catalog-guard", version, about = "Security headers and rate limiting for the catalog API")]
struct Cli {
    /// Override BIND_ADDR
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override ROUTE_POLICY_FILE
    #[arg(long)]
    policy: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    health::mark_started();

    // Load environment variables from .env file
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(policy) = cli.policy {
        config.route_policy_file = Some(policy);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("catalog_guard={},tower_http=debug", config.log_level).into());

    if config.environment.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting catalog-guard");
    tracing::info!(
        "Configuration: bind_addr={}, environment={}, redis={}",
        config.bind_addr,
        config.environment,
        config.redis_url.is_some()
    );

    let server = Server::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
