use anyhow::Result;
use clap::Parser;
use crm_token_agent::server;
use crm_token_agent::utils::config_loader;
use crm_token_agent::utils::logging::{self, LogLevel};
use crm_token_agent::TokenProvider;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "crm-token-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, fail fast on anything missing
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Build the token provider (credentials resolved here)
    // -------------------------------

    let provider = TokenProvider::from_config(&service_config)?;

    // -------------------------------
    // 3. Warm the cache; a failure here is not fatal, callers retry
    // -------------------------------

    match provider.get_valid_token().await {
        Ok(token) => info!("initial token ready, lease until {}", token.assumed_expiry),
        Err(err) => warn!("initial token acquisition failed: {}", err),
    }

    // -------------------------------
    // 4. Serve token + metrics routes
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, provider, shutdown_signal()).await?;
    info!("Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
