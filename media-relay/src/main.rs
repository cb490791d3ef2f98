use media_relay::api::server::{ApiServer, ApiServerConfig, AppState};
use media_relay::config::RelayConfig;
use media_relay::logging;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = RelayConfig::from_env_or_default();

    // Keep the guard alive for the process lifetime
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;

    let state = AppState::from_config(config)?;
    let server = ApiServer::with_state(ApiServerConfig::from_env_or_default(), state);

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            cancel_token.cancel();
        }
    });

    server.run().await?;

    Ok(())
}
