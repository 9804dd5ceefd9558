use anyhow::Result;
use bingefast::config::{Config, REQUIRED_VARS};
use dotenvy::dotenv;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn check_env() -> Result<()> {
    for key in REQUIRED_VARS {
        if env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true) {
            anyhow::bail!("Missing required environment variable: {}", key);
        }
    }
    info!("All required environment variables are set");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    check_env()?;
    let config = Config::from_env()?;
    bingefast::app::run_server(config).await
}
