//! Place-index source: one entry per distinct locality, aggregated from
//! `facilities`.

use kompas_core::PlaceEntry;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlaceEntryRow {
    pub name: String,
    pub county: String,
    pub region: String,
    pub residential_count: i64,
    pub day_care_count: i64,
}

impl From<PlaceEntryRow> for PlaceEntry {
    fn from(row: PlaceEntryRow) -> Self {
        let narrow = |n: i64| u32::try_from(n).unwrap_or(u32::MAX);
        PlaceEntry::new(
            row.name,
            row.county,
            row.region,
            narrow(row.residential_count),
            narrow(row.day_care_count),
        )
    }
}

/// Returns every (locality, county, region) triple with its facility counts,
/// split by category.
///
/// Spelling variants of the same locality are folded together via the
/// normalized key columns; the displayed name is the lexically smallest
/// stored spelling.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_place_entries(pool: &PgPool) -> Result<Vec<PlaceEntry>, DbError> {
    let rows = sqlx::query_as::<_, PlaceEntryRow>(
        "SELECT MIN(locality) AS name, \
                MIN(county) AS county, \
                MIN(region) AS region, \
                COUNT(*) FILTER (WHERE category = 'dps') AS residential_count, \
                COUNT(*) FILTER (WHERE category = 'sds') AS day_care_count \
         FROM facilities \
         GROUP BY locality_key, county_key, region_key \
         ORDER BY locality_key, county_key",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PlaceEntry::from).collect())
}
