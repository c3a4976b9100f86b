//! Read-only facility commands: search and duplicate check.

use kompas_db::PgFacilityStore;
use kompas_engine::{
    format_distance, DuplicateCandidate, DuplicateResolver, RankedFacility, SearchExecutor,
};

use crate::fmt_opt;

/// Run a search from a directory query string and print the ordered hits.
///
/// # Errors
///
/// Returns an error if the facility query fails.
pub(crate) async fn run_search(pool: &sqlx::PgPool, params: &str) -> anyhow::Result<()> {
    let state = kompas_core::decode_query_string(params);
    let canonical = kompas_core::encode(&state).to_query_string();
    let executor = SearchExecutor::new(PgFacilityStore::new(pool.clone()));
    let results = executor.search(&state).await?;

    if canonical.is_empty() {
        println!("query: (none)");
    } else {
        println!("query: {canonical}");
    }

    if results.is_empty() {
        println!("no facilities match");
        return Ok(());
    }

    println!(
        "{:<8}{:<6}{:<40}{:<22}{:<12}DISTANCE",
        "ID", "TYPE", "NAME", "LOCALITY", "COST"
    );
    for hit in &results.hits {
        print_hit(hit);
    }
    println!("{} facilities", results.len());
    Ok(())
}

fn print_hit(hit: &RankedFacility) {
    let f = &hit.facility;
    let cost = if f.is_free() {
        "free".to_string()
    } else {
        fmt_opt(f.monthly_cost)
    };
    println!(
        "{:<8}{:<6}{:<40}{:<22}{:<12}{}",
        f.id,
        f.category.as_code(),
        f.name,
        f.locality,
        cost,
        fmt_opt(hit.distance_km.map(format_distance))
    );
}

/// Print the likely duplicate for `candidate`, if any.
///
/// # Errors
///
/// Returns an error if the locality's records cannot be read.
pub(crate) async fn run_check_duplicate(
    pool: &sqlx::PgPool,
    candidate: &DuplicateCandidate,
) -> anyhow::Result<()> {
    let resolver = DuplicateResolver::new(PgFacilityStore::new(pool.clone()));
    match resolver.find_duplicate(candidate).await? {
        Some(found) => println!(
            "possible duplicate: #{} {} (matched by {}, {} confidence)",
            found.facility_id,
            found.facility_name,
            found.matched_by.as_str(),
            found.confidence.as_str()
        ),
        None => println!("no duplicate found"),
    }
    Ok(())
}
