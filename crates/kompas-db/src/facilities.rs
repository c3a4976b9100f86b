//! Database operations for the `facilities` table.

use chrono::{DateTime, NaiveDate, Utc};
use kompas_core::fuzzy::normalize;
use kompas_core::{
    CareProfile, Coordinate, Facility, FacilityCategory, FacilityDraft, FacilityPredicate,
    PriceFilter,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::DbError;

const FACILITY_COLUMNS: &str = "id, public_id, name, category, locality, street, postal_code, \
     county, region, phone, email, website, seat_count, subsidized_seat_count, monthly_cost, \
     care_profiles, coordinate_source, latitude, longitude, source_url, source_date, verified, \
     notes, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `facilities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FacilityRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub category: String,
    pub locality: String,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub county: String,
    pub region: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub seat_count: Option<i32>,
    pub subsidized_seat_count: Option<i32>,
    pub monthly_cost: Option<Decimal>,
    pub care_profiles: Vec<String>,
    pub coordinate_source: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source_url: Option<String>,
    pub source_date: Option<NaiveDate>,
    pub verified: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FacilityRow {
    /// Converts the row into the domain type.
    ///
    /// Unknown care-profile codes are dropped; an inconsistent coordinate
    /// reads as absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the category code is unknown.
    pub fn into_facility(self) -> Result<Facility, DbError> {
        let category = FacilityCategory::from_code(&self.category).ok_or_else(|| {
            DbError::InvalidRow(format!(
                "facility {} has unknown category '{}'",
                self.id, self.category
            ))
        })?;
        let mut care_profiles: Vec<CareProfile> = self
            .care_profiles
            .iter()
            .filter_map(|code| CareProfile::from_code(code))
            .collect();
        care_profiles.sort_unstable();
        care_profiles.dedup();

        Ok(Facility {
            id: self.id,
            name: self.name,
            category,
            locality: self.locality,
            street: self.street,
            postal_code: self.postal_code,
            county: self.county,
            region: self.region,
            phone: self.phone,
            email: self.email,
            website: self.website,
            seat_count: self.seat_count,
            subsidized_seat_count: self.subsidized_seat_count,
            monthly_cost: self.monthly_cost,
            care_profiles,
            coordinate: Coordinate::from_parts(
                &self.coordinate_source,
                self.latitude,
                self.longitude,
            ),
            source_url: self.source_url,
            source_date: self.source_date,
            verified: self.verified,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_facilities(rows: Vec<FacilityRow>) -> Result<Vec<Facility>, DbError> {
    rows.into_iter().map(FacilityRow::into_facility).collect()
}

fn care_codes(profiles: &[CareProfile]) -> Vec<String> {
    profiles.iter().map(|p| p.as_code().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns a single facility by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::InvalidRow`]
/// if the stored row cannot be converted.
pub async fn get_facility(pool: &PgPool, id: i64) -> Result<Option<Facility>, DbError> {
    let row = sqlx::query_as::<_, FacilityRow>(&format!(
        "SELECT {FACILITY_COLUMNS} FROM facilities WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(FacilityRow::into_facility).transpose()
}

/// Returns all facilities whose folded locality equals the folded `locality`,
/// ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_facilities_by_locality(
    pool: &PgPool,
    locality: &str,
) -> Result<Vec<Facility>, DbError> {
    let rows = sqlx::query_as::<_, FacilityRow>(&format!(
        "SELECT {FACILITY_COLUMNS} FROM facilities WHERE locality_key = $1 ORDER BY id"
    ))
    .bind(normalize(locality))
    .fetch_all(pool)
    .await?;

    into_facilities(rows)
}

/// Returns facilities matching `predicate` in insertion order.
///
/// The SQL mirrors [`FacilityPredicate::matches`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn query_facilities(
    pool: &PgPool,
    predicate: &FacilityPredicate,
) -> Result<Vec<Facility>, DbError> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {FACILITY_COLUMNS} FROM facilities WHERE TRUE"
    ));
    push_predicate(&mut builder, predicate);
    builder.push(" ORDER BY id");

    let rows = builder
        .build_query_as::<FacilityRow>()
        .fetch_all(pool)
        .await?;

    into_facilities(rows)
}

fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &FacilityPredicate) {
    if let Some(category) = predicate.category {
        builder
            .push(" AND category = ")
            .push_bind(category.as_code().to_string());
    }
    if let Some(region) = &predicate.region {
        builder.push(" AND region_key = ").push_bind(normalize(region));
    }
    if let Some(county) = &predicate.county {
        builder.push(" AND county_key = ").push_bind(normalize(county));
    }
    match predicate.price {
        PriceFilter::Any => {}
        PriceFilter::FreeOnly => {
            builder.push(" AND (monthly_cost IS NULL OR monthly_cost = 0)");
        }
        PriceFilter::Range { min, max } => {
            builder.push(" AND monthly_cost IS NOT NULL");
            if let Some(min) = min {
                builder
                    .push(" AND monthly_cost >= ")
                    .push_bind(Decimal::from(min));
            }
            if let Some(max) = max {
                builder
                    .push(" AND monthly_cost <= ")
                    .push_bind(Decimal::from(max));
            }
        }
    }
    if !predicate.care_profiles.is_empty() {
        builder
            .push(" AND care_profiles && ")
            .push_bind(care_codes(&predicate.care_profiles))
            .push("::text[]");
    }
    if let Some(location) = &predicate.location {
        let needle = normalize(location);
        if !needle.is_empty() {
            builder
                .push(" AND (strpos(locality_key, ")
                .push_bind(needle.clone())
                .push(") > 0 OR strpos(county_key, ")
                .push_bind(needle.clone())
                .push(") > 0 OR strpos(name_key, ")
                .push_bind(needle)
                .push(") > 0)");
        }
    }
}

/// Returns facilities without a coordinate, oldest first. `limit` of `None`
/// returns all of them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_missing_coordinates(
    pool: &PgPool,
    limit: Option<i64>,
) -> Result<Vec<Facility>, DbError> {
    let rows = sqlx::query_as::<_, FacilityRow>(&format!(
        "SELECT {FACILITY_COLUMNS} FROM facilities \
         WHERE coordinate_source = 'absent' \
         ORDER BY id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    into_facilities(rows)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a new facility and returns the stored record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_facility(pool: &PgPool, draft: &FacilityDraft) -> Result<Facility, DbError> {
    let point = draft.coordinate.point();
    let row = sqlx::query_as::<_, FacilityRow>(&format!(
        "INSERT INTO facilities ( \
             name, name_key, category, locality, locality_key, street, postal_code, \
             county, county_key, region, region_key, phone, email, website, seat_count, \
             subsidized_seat_count, monthly_cost, care_profiles, coordinate_source, \
             latitude, longitude, source_url, source_date, verified, notes \
         ) VALUES ( \
             $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
             $16, $17, $18, $19, $20, $21, $22, $23, $24, $25 \
         ) \
         RETURNING {FACILITY_COLUMNS}"
    ))
    .bind(&draft.name)
    .bind(normalize(&draft.name))
    .bind(draft.category.as_code())
    .bind(&draft.locality)
    .bind(normalize(&draft.locality))
    .bind(&draft.street)
    .bind(&draft.postal_code)
    .bind(&draft.county)
    .bind(normalize(&draft.county))
    .bind(&draft.region)
    .bind(normalize(&draft.region))
    .bind(&draft.phone)
    .bind(&draft.email)
    .bind(&draft.website)
    .bind(draft.seat_count)
    .bind(draft.subsidized_seat_count)
    .bind(draft.monthly_cost)
    .bind(care_codes(&draft.care_profiles))
    .bind(draft.coordinate.source().as_str())
    .bind(point.map(|p| p.lat))
    .bind(point.map(|p| p.lon))
    .bind(&draft.source_url)
    .bind(draft.source_date)
    .bind(draft.verified)
    .bind(&draft.notes)
    .fetch_one(pool)
    .await?;

    tracing::info!(facility_id = row.id, locality = %row.locality, "facility inserted");
    row.into_facility()
}

/// Replaces every editable field of facility `id` and returns the stored record.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no facility has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_facility(
    pool: &PgPool,
    id: i64,
    draft: &FacilityDraft,
) -> Result<Facility, DbError> {
    let point = draft.coordinate.point();
    let row = sqlx::query_as::<_, FacilityRow>(&format!(
        "UPDATE facilities SET \
             name = $2, name_key = $3, category = $4, locality = $5, locality_key = $6, \
             street = $7, postal_code = $8, county = $9, county_key = $10, region = $11, \
             region_key = $12, phone = $13, email = $14, website = $15, seat_count = $16, \
             subsidized_seat_count = $17, monthly_cost = $18, care_profiles = $19, \
             coordinate_source = $20, latitude = $21, longitude = $22, source_url = $23, \
             source_date = $24, verified = $25, notes = $26, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {FACILITY_COLUMNS}"
    ))
    .bind(id)
    .bind(&draft.name)
    .bind(normalize(&draft.name))
    .bind(draft.category.as_code())
    .bind(&draft.locality)
    .bind(normalize(&draft.locality))
    .bind(&draft.street)
    .bind(&draft.postal_code)
    .bind(&draft.county)
    .bind(normalize(&draft.county))
    .bind(&draft.region)
    .bind(normalize(&draft.region))
    .bind(&draft.phone)
    .bind(&draft.email)
    .bind(&draft.website)
    .bind(draft.seat_count)
    .bind(draft.subsidized_seat_count)
    .bind(draft.monthly_cost)
    .bind(care_codes(&draft.care_profiles))
    .bind(draft.coordinate.source().as_str())
    .bind(point.map(|p| p.lat))
    .bind(point.map(|p| p.lon))
    .bind(&draft.source_url)
    .bind(draft.source_date)
    .bind(draft.verified)
    .bind(&draft.notes)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    row.into_facility()
}

/// Writes a coordinate (and its provenance) onto facility `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no facility has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn patch_facility_coordinates(
    pool: &PgPool,
    id: i64,
    coordinate: Coordinate,
) -> Result<(), DbError> {
    let point = coordinate.point();
    let result = sqlx::query(
        "UPDATE facilities \
         SET coordinate_source = $2, latitude = $3, longitude = $4, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(coordinate.source().as_str())
    .bind(point.map(|p| p.lat))
    .bind(point.map(|p| p.lon))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
