mod schedule;
mod scrape;

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "offerdb-cli")]
#[command(about = "Weekly grocery offer scraper")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape configured stores and persist their current offers
    Scrape {
        /// Restrict the run to one store (by url_slug)
        #[arg(long)]
        store: Option<String>,

        /// Scrape and print offers without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// List configured stores and their listing URLs
    Stores,
    /// Print the number of persisted offers
    Count,
    /// Run `scrape` on the configured cron schedule until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Arc::new(offerdb_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Scrape { store, dry_run }) => {
            let pool = if dry_run {
                None
            } else {
                Some(connect(&config).await?)
            };
            scrape::run_scrape(pool.as_ref(), &config, store.as_deref(), dry_run).await?;
        }
        Some(Commands::Stores) => scrape::print_stores(&config)?,
        Some(Commands::Count) => {
            let pool = connect(&config).await?;
            let count = offerdb_db::count_offers(&pool).await?;
            println!("{count} offers stored");
        }
        Some(Commands::Schedule) => {
            let pool = connect(&config).await?;
            schedule::run_schedule(pool, Arc::clone(&config)).await?;
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

/// Opens the pool and brings the schema up to date.
async fn connect(config: &offerdb_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = offerdb_db::PoolConfig::from_app_config(config);
    let pool = offerdb_db::connect_pool(config.database_url()?, pool_config).await?;
    let applied = offerdb_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }
    Ok(pool)
}
