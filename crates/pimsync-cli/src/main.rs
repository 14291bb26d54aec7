mod runs;
mod sync;

use clap::{Parser, Subcommand};
use pimsync_core::BuyPriceMode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pimsync-cli")]
#[command(about = "Catalog, buy price and variant data sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a sync job once and print its result as JSON
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Inspect sync run history
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum SyncCommands {
    /// Mirror the OMS product catalog
    Catalog {
        /// Resume the listing after this upstream product id
        #[arg(long)]
        since_id: Option<i64>,
        /// Products requested per page
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Refresh cost prices from the warehouse
    BuyPrices {
        /// `bulk_refresh` or `in_place`; defaults to PIMSYNC_BUY_PRICE_MODE
        #[arg(long)]
        mode: Option<BuyPriceMode>,
    },
    /// Refresh variant fields and prices for known EANs
    Data,
}

#[derive(Debug, Subcommand)]
enum RunsCommands {
    /// List the most recent runs, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pimsync-cli: no command given (try --help)");
        return Ok(());
    };

    let config = pimsync_core::load_app_config()?;
    // stdout carries the JSON result; logs go to stderr.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = pimsync_db::PoolConfig::from_app_config(&config);
    let pool = pimsync_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Sync { command } => {
            let overrides = sync::Overrides::from(&command);
            sync::run_sync(&pool, &config, overrides).await?;
        }
        Commands::Runs {
            command: RunsCommands::List { limit },
        } => runs::list_runs(&pool, limit).await?,
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            pimsync_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            pimsync_db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
    }

    Ok(())
}
