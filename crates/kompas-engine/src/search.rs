//! Filtered facility search: predicate query against the store, then
//! ordering and distance annotation.

use std::cmp::Ordering;

use kompas_core::fuzzy::collation_cmp;
use kompas_core::{
    Facility, FacilityPredicate, FacilityStore, FilterState, GeoPoint, SortMode, StoreError,
};
use serde::Serialize;
use thiserror::Error;

use crate::distance::{haversine_km, rank_by, round_km};

#[derive(Debug, Error)]
pub enum SearchError {
    /// The record store could not answer. Transient; never a partial list.
    #[error("search failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFacility {
    #[serde(flatten)]
    pub facility: Facility,
    /// Kilometres from the user, rounded to 0.1. Present only when a user
    /// position is known and the facility has a coordinate.
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchResults {
    pub hits: Vec<RankedFacility>,
}

impl SearchResults {
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.hits.iter().map(|h| &h.facility)
    }
}

#[derive(Debug, Clone)]
pub struct SearchExecutor<S> {
    store: S,
}

impl<S: FacilityStore> SearchExecutor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Runs the store query for `state` and orders the hits by its sort mode.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] when the record store is unreachable.
    pub async fn search(&self, state: &FilterState) -> Result<SearchResults, SearchError> {
        let predicate = FacilityPredicate::from_filter(state);
        let facilities = self.store.query_facilities(&predicate).await?;
        tracing::debug!(
            hits = facilities.len(),
            sort = ?state.sort(),
            "facility search completed"
        );
        Ok(arrange(facilities, state.sort(), state.user_position()))
    }
}

/// Annotates distances and applies the requested ordering. Pure; exposed
/// for callers that already hold a facility list.
#[must_use]
pub fn arrange(
    facilities: Vec<Facility>,
    sort: SortMode,
    user: Option<GeoPoint>,
) -> SearchResults {
    let mut hits: Vec<RankedFacility> = facilities
        .into_iter()
        .map(|facility| {
            let distance_km = user
                .zip(facility.coordinate.point())
                .map(|(u, p)| round_km(haversine_km(u, p)));
            RankedFacility {
                facility,
                distance_km,
            }
        })
        .collect();

    match sort {
        SortMode::Default => {}
        SortMode::NameAsc => {
            hits.sort_by(|a, b| collation_cmp(&a.facility.name, &b.facility.name));
        }
        SortMode::NameDesc => {
            hits.sort_by(|a, b| collation_cmp(&b.facility.name, &a.facility.name));
        }
        SortMode::PriceAsc => hits.sort_by(|a, b| cost_cmp(&a.facility, &b.facility)),
        SortMode::PriceDesc => hits.sort_by(|a, b| cost_cmp(&b.facility, &a.facility)),
        SortMode::Distance => {
            if let Some(user) = user {
                hits = rank_by(hits, user, |h| h.facility.coordinate.point());
            }
        }
    }

    SearchResults { hits }
}

/// Unknown cost sorts after every known cost.
fn cost_cmp(a: &Facility, b: &Facility) -> Ordering {
    match (a.monthly_cost, b.monthly_cost) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
