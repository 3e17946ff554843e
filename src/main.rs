use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use confluence::app::AppContext;
use confluence::cli::{commands, Cli, Commands};
use confluence::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("confluence=info")))
        .init();

    let cli = Cli::parse();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.quick_start {
        config.quick_start = true;
    }

    if let Commands::Check = cli.command {
        commands::check(&config, &config_path);
        return Ok(());
    }

    let db_path = cli.database.clone().or_else(|| config.database.clone());
    let ctx = AppContext::new(db_path, config.settings())?;

    match cli.command {
        Commands::Run => {
            commands::run(Arc::new(ctx), &config, config_path).await?;
        }
        Commands::Show { river, callback } => {
            commands::show(&ctx, &config, &river, callback.as_deref())?;
        }
        Commands::Opml { river } => {
            commands::opml(&ctx, &config, &river).await?;
        }
        Commands::Check => {}
    }

    Ok(())
}
