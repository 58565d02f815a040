//! Marketplace API server: env config, schema bootstrap, route mounting, serve.

use estate_api::{bootstrap, BootstrapConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("estate_api=info,tower_http=info")),
        )
        .init();

    let config = BootstrapConfig::from_env()?;
    tracing::info!(
        prefix = %config.api_prefix,
        stop_on_error = config.stop_on_error,
        background = config.schema_in_background,
        "starting"
    );
    bootstrap::run(config).await?;
    Ok(())
}
