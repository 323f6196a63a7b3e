use mailer_api::api::{ApiServer, AppState};
use mailer_api::config::Config;
use mailer_api::transport::{verify_relay, SmtpRelay};
use mailer_api::{db, logging};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config path: first argument, else ./config.toml when present
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config.toml")).filter(|p| p.exists()));

    let config = Config::load(config_path.as_deref())?;
    logging::init(&config.logging);

    info!("Starting mailer-api v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No config file found, using defaults and environment"),
    }
    info!("  Environment: {}", config.server.environment.as_str());
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Database: {}", config.database.url);
    info!("  SMTP relay: {}:{}", config.smtp.host, config.smtp.port);

    let pool = db::connect(&config.database.url, config.database.max_connections).await?;

    let relay = SmtpRelay::new(&config.smtp)?;
    if config.smtp.verify_on_startup {
        verify_relay(&relay).await?;
    }

    let state = Arc::new(AppState::build(pool, &config, Arc::new(relay)).await?);
    let server = ApiServer::new(
        state,
        config.server.listen_addr.clone(),
        config.server.max_body_bytes,
    );

    if let Err(e) = server.run().await {
        error!("API server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
