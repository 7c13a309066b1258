use anyhow::{Context, Result};

use scenecraft::app_config::AppConfig;
use scenecraft::logging::init_logging;
use scenecraft::providers::create_provider;
use scenecraft::server;

mod args;
use args::{CliArgs, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let cli = CliArgs::parse()?;
    if cli.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::load()?,
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(media_dir) = cli.media_dir {
        config.media.root = media_dir;
    }

    let provider = create_provider(&config.llm).await?;
    log::info!(
        "scenecraft {} | {}/{} | media at {}",
        env!("CARGO_PKG_VERSION"),
        provider.name(),
        provider.model(),
        config.media.root.display()
    );

    server::serve(config, provider).await
}
