//! Place index commands. The index is built from the YAML seed when
//! `KOMPAS_PLACES_PATH` is set, otherwise from the facility table.

use clap::Subcommand;
use kompas_core::{AppConfig, FacilityCategory, PlaceEntry};
use kompas_engine::suggest::suggest;
use kompas_engine::{PlaceIndex, SuggestOptions};

/// Sub-commands available under `places`.
#[derive(Debug, Subcommand)]
pub enum PlacesCommands {
    /// Rebuild the place index from its source and print a summary
    Refresh {
        /// Number of busiest places to list
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

async fn load_entries(config: &AppConfig) -> anyhow::Result<Vec<PlaceEntry>> {
    if let Some(path) = &config.places_path {
        tracing::info!(path = %path.display(), "loading places from seed file");
        return Ok(kompas_core::load_places(path)?.places);
    }
    let pool = crate::connect(config).await?;
    Ok(kompas_db::list_place_entries(&pool).await?)
}

/// Rebuild the place index and print its size and the busiest places.
///
/// # Errors
///
/// Returns an error if the seed file is invalid or the database query fails.
pub(crate) async fn run_places_refresh(config: &AppConfig, top: usize) -> anyhow::Result<()> {
    let index = PlaceIndex::new(load_entries(config).await?);
    let facilities: u64 = index.entries().map(|p| u64::from(p.facility_count)).sum();
    println!("{} places, {facilities} facilities", index.len());

    let mut busiest: Vec<&PlaceEntry> = index.entries().collect();
    busiest.sort_by(|a, b| b.facility_count.cmp(&a.facility_count));
    if busiest.is_empty() || top == 0 {
        return Ok(());
    }

    println!();
    println!(
        "{:<24}{:<20}{:<22}{:<6}{:<6}TOTAL",
        "PLACE", "COUNTY", "REGION", "DPS", "SDS"
    );
    for place in busiest.into_iter().take(top) {
        println!(
            "{:<24}{:<20}{:<22}{:<6}{:<6}{}",
            place.name,
            place.county,
            place.region,
            place.residential_count,
            place.day_care_count,
            place.facility_count
        );
    }
    Ok(())
}

/// Print ranked suggestions for `query`.
///
/// # Errors
///
/// Returns an error if the place index cannot be loaded.
pub(crate) async fn run_suggest(
    config: &AppConfig,
    query: &str,
    region: Option<String>,
    county: Option<String>,
    category: Option<FacilityCategory>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let index = PlaceIndex::new(load_entries(config).await?);
    let options = SuggestOptions {
        min_len: config.suggest_min_len,
        limit: limit.unwrap_or(config.suggest_limit),
        region,
        county,
        category,
    };
    let found = suggest(&index, query, &options);

    if found.places.is_empty() {
        println!("no places match '{query}'");
        return Ok(());
    }
    for place in &found.places {
        println!(
            "{} ({}, {}) \u{2014} {} facilities",
            place.name, place.county, place.region, place.facility_count
        );
    }
    if found.total > found.places.len() {
        println!("... {} more", found.total - found.places.len());
    }
    Ok(())
}
