mod facilities;
mod geocode;
mod places;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::geocode::GeocodeCommands;
use crate::places::PlacesCommands;

#[derive(Debug, Parser)]
#[command(name = "kompas-cli")]
#[command(about = "Care facility directory command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Place index maintenance
    Places {
        #[command(subcommand)]
        command: PlacesCommands,
    },
    /// Coordinate maintenance
    Geocode {
        #[command(subcommand)]
        command: GeocodeCommands,
    },
    /// Print place suggestions for a partial name
    Suggest {
        query: String,
        /// Voivodeship filter
        #[arg(long)]
        woj: Option<String>,
        /// County filter (needs --woj)
        #[arg(long)]
        powiat: Option<String>,
        /// Count only facilities of this type (dps or sds)
        #[arg(long = "type")]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run a facility search from a directory query string (e.g. "q=Tarnów&type=dps")
    Search {
        #[arg(default_value = "")]
        params: String,
    },
    /// Check whether a facility is likely already in the directory
    CheckDuplicate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        locality: String,
        #[arg(long)]
        street: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Id of the record being edited
        #[arg(long)]
        exclude_id: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check the database connection
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("kompas-cli: no command given; see --help");
        return Ok(());
    };

    let config = kompas_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    kompas_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = kompas_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
        Commands::Places { command } => match command {
            PlacesCommands::Refresh { top } => places::run_places_refresh(&config, top).await?,
        },
        Commands::Geocode { command } => match command {
            GeocodeCommands::Backfill { limit, dry_run } => {
                let pool = connect(&config).await?;
                geocode::run_geocode_backfill(&pool, &config, limit, dry_run).await?;
            }
        },
        Commands::Suggest {
            query,
            woj,
            powiat,
            category,
            limit,
        } => {
            let category = category.as_deref().and_then(kompas_core::FacilityCategory::from_code);
            places::run_suggest(&config, &query, woj, powiat, category, limit).await?;
        }
        Commands::Search { params } => {
            let pool = connect(&config).await?;
            facilities::run_search(&pool, &params).await?;
        }
        Commands::CheckDuplicate {
            name,
            locality,
            street,
            phone,
            exclude_id,
        } => {
            let pool = connect(&config).await?;
            let candidate = kompas_engine::DuplicateCandidate {
                name,
                locality,
                street,
                phone,
                exclude_id,
            };
            facilities::run_check_duplicate(&pool, &candidate).await?;
        }
    }

    Ok(())
}

async fn connect(config: &kompas_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = kompas_db::PoolConfig::from_app_config(config);
    Ok(kompas_db::connect_pool(&config.database_url, pool_config).await?)
}

/// Format an optional value for table display, returning `"—"` when `None`.
fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "\u{2014}".to_string(), |v| v.to_string())
}
