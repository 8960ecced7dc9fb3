use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use file_translator_backend::config::Config;
use file_translator_backend::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("file_translator_backend=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // CONFIG_PATH wins; otherwise conf.yaml next to the working directory is optional
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "conf.yaml".to_string());
    let config = Config::load(Some(config_path.as_str()))?;

    info!(
        upload_root = %config.upload.root_directory,
        extraction_url = %config.extraction.api_url,
        translator = ?config.translation.provider,
        "Loaded configuration"
    );

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
