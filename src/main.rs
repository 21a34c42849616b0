use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rivulet_store::app::AppContext;
use rivulet_store::cli::{commands, Cli, Commands};
use rivulet_store::config::{Config, Durability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.storage.durability = Durability::Persistent;
        config.storage.path = Some(db);
    }
    if cli.ephemeral {
        config.storage.durability = Durability::Ephemeral;
    }

    let ctx = AppContext::new(config)?;
    ctx.init().await?;

    match cli.command {
        Commands::Status => {
            commands::status(&ctx).await?;
        }
        Commands::Feeds => {
            commands::list_feeds(&ctx)?;
        }
        Commands::ImportFeeds { path } => {
            commands::import_feeds(&ctx, &path).await?;
        }
        Commands::Entries => {
            commands::list_entries(&ctx).await?;
        }
        Commands::Query(args) => {
            commands::run_query(&ctx, &args).await?;
        }
        Commands::Delete { ids } => {
            commands::delete_entries(&ctx, &ids).await?;
        }
        Commands::Clear => {
            commands::clear_entries(&ctx).await?;
        }
    }

    Ok(())
}
