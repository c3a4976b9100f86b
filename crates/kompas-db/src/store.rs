//! Postgres-backed [`FacilityStore`].

use async_trait::async_trait;
use kompas_core::{Coordinate, Facility, FacilityPredicate, FacilityStore, StoreError};
use sqlx::PgPool;

use crate::{facilities, DbError};

#[derive(Debug, Clone)]
pub struct PgFacilityStore {
    pool: PgPool,
}

impl PgFacilityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn unavailable(err: DbError) -> StoreError {
    tracing::warn!(error = %err, "facility store query failed");
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl FacilityStore for PgFacilityStore {
    async fn list_facilities_by_locality(
        &self,
        locality: &str,
    ) -> Result<Vec<Facility>, StoreError> {
        facilities::list_facilities_by_locality(&self.pool, locality)
            .await
            .map_err(unavailable)
    }

    async fn query_facilities(
        &self,
        predicate: &FacilityPredicate,
    ) -> Result<Vec<Facility>, StoreError> {
        facilities::query_facilities(&self.pool, predicate)
            .await
            .map_err(unavailable)
    }

    async fn patch_facility_coordinates(
        &self,
        id: i64,
        coordinate: Coordinate,
    ) -> Result<(), StoreError> {
        match facilities::patch_facility_coordinates(&self.pool, id, coordinate).await {
            Ok(()) => Ok(()),
            Err(DbError::NotFound) => Err(StoreError::NotFound(id)),
            Err(err) => Err(unavailable(err)),
        }
    }
}
