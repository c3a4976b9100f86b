//! Coordinate backfill for facilities stored without a location.

use std::time::Duration;

use clap::Subcommand;
use kompas_core::AppConfig;
use kompas_db::PgFacilityStore;
use kompas_engine::{address_text, CoordinateResolver};
use kompas_geocode::NominatimClient;

/// Pause between provider calls; public Nominatim allows one request per second.
const PROVIDER_DELAY: Duration = Duration::from_millis(1100);

/// Sub-commands available under `geocode`.
#[derive(Debug, Subcommand)]
pub enum GeocodeCommands {
    /// Geocode facilities that have no coordinate yet
    Backfill {
        /// Maximum number of facilities to process
        #[arg(long)]
        limit: Option<i64>,
        /// List the addresses that would be looked up without calling the provider
        #[arg(long)]
        dry_run: bool,
    },
}

/// Resolve coordinates for facilities missing them and persist the results.
///
/// Provider failures leave the facility unresolved and do not abort the run.
///
/// # Errors
///
/// Returns an error if the candidate list cannot be read or a coordinate
/// patch fails to persist.
pub(crate) async fn run_geocode_backfill(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    limit: Option<i64>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let pending = kompas_db::list_missing_coordinates(pool, limit).await?;
    if pending.is_empty() {
        println!("all facilities have coordinates");
        return Ok(());
    }

    if dry_run {
        println!("{:<8}{:<40}ADDRESS", "ID", "NAME");
        for facility in &pending {
            println!(
                "{:<8}{:<40}{}",
                facility.id,
                facility.name,
                address_text(&facility.address())
            );
        }
        println!("{} facilities would be geocoded", pending.len());
        return Ok(());
    }

    let resolver = CoordinateResolver::new(NominatimClient::from_config(config)?);
    let store = PgFacilityStore::new(pool.clone());

    let mut resolved = 0usize;
    let mut unresolved = 0usize;
    for (i, facility) in pending.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(PROVIDER_DELAY).await;
        }
        let coordinate = resolver.ensure_coordinates(&store, facility).await?;
        match coordinate.point() {
            Some(point) => {
                resolved += 1;
                println!(
                    "{:>6}  {:<40} {:.5}, {:.5}",
                    facility.id, facility.name, point.lat, point.lon
                );
            }
            None => {
                unresolved += 1;
                println!("{:>6}  {:<40} no match", facility.id, facility.name);
            }
        }
    }

    tracing::info!(resolved, unresolved, "geocode backfill finished");
    println!("resolved {resolved}, unresolved {unresolved}");
    Ok(())
}
