//! Postgres persistence for facility records and the place aggregate.

use thiserror::Error;

pub mod facilities;
pub mod places;
mod pool;
pub mod store;

pub use facilities::{
    get_facility, insert_facility, list_facilities_by_locality, list_missing_coordinates,
    patch_facility_coordinates, query_facilities, update_facility, FacilityRow,
};
pub use places::{list_place_entries, PlaceEntryRow};
pub use pool::{connect_pool, health_check, pending_migrations, run_migrations, PoolConfig};
pub use store::PgFacilityStore;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("stored row is inconsistent: {0}")]
    InvalidRow(String),
    #[error("facility schema is missing; run `kompas-cli db migrate`")]
    SchemaMissing,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}
