//! Seams to the record store and the geocoding provider, plus the search
//! predicate both the in-memory and SQL implementations agree on.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::facility::{CareProfile, Coordinate, Facility, FacilityCategory, GeoPoint};
use crate::filter::{FilterState, PriceFilter};
use crate::fuzzy::normalize;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient: connection refused, pool exhausted, timeout.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("facility {0} not found")]
    NotFound(i64),
}

#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("geocoder transport error: {0}")]
    Transport(String),

    #[error("geocoder returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// The store-side half of a search: everything in a [`FilterState`] except
/// sort order and user position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FacilityPredicate {
    pub category: Option<FacilityCategory>,
    pub region: Option<String>,
    pub county: Option<String>,
    pub price: PriceFilter,
    /// Matches facilities offering at least one of these profiles.
    pub care_profiles: Vec<CareProfile>,
    /// Substring of locality, county or facility name.
    pub location: Option<String>,
}

impl FacilityPredicate {
    #[must_use]
    pub fn from_filter(state: &FilterState) -> Self {
        Self {
            category: state.category(),
            region: state.region().map(str::to_string),
            county: state.county().map(str::to_string),
            price: state.price(),
            care_profiles: state.care_profiles().iter().copied().collect(),
            location: Some(state.location().to_string()).filter(|l| !l.is_empty()),
        }
    }

    /// In-memory evaluation. SQL implementations must agree with this.
    #[must_use]
    pub fn matches(&self, facility: &Facility) -> bool {
        if self.category.is_some_and(|c| c != facility.category) {
            return false;
        }
        if let Some(region) = &self.region {
            if normalize(region) != normalize(&facility.region) {
                return false;
            }
        }
        if let Some(county) = &self.county {
            if normalize(county) != normalize(&facility.county) {
                return false;
            }
        }
        if !price_matches(self.price, facility) {
            return false;
        }
        if !self.care_profiles.is_empty()
            && !facility
                .care_profiles
                .iter()
                .any(|p| self.care_profiles.contains(p))
        {
            return false;
        }
        if let Some(location) = &self.location {
            let needle = normalize(location);
            if !needle.is_empty()
                && ![&facility.locality, &facility.county, &facility.name]
                    .iter()
                    .any(|field| normalize(field).contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

fn price_matches(price: PriceFilter, facility: &Facility) -> bool {
    match price {
        PriceFilter::Any => true,
        PriceFilter::FreeOnly => facility.is_free(),
        PriceFilter::Range { min, max } => facility.monthly_cost.is_some_and(|cost| {
            min.is_none_or(|m| cost >= Decimal::from(m))
                && max.is_none_or(|m| cost <= Decimal::from(m))
        }),
    }
}

/// Read/patch access to persisted facility records.
#[async_trait]
pub trait FacilityStore: Send + Sync {
    /// Facilities whose locality equals `locality` after normalization.
    async fn list_facilities_by_locality(&self, locality: &str)
        -> Result<Vec<Facility>, StoreError>;

    /// Facilities matching `predicate`, in store-defined (insertion) order.
    async fn query_facilities(
        &self,
        predicate: &FacilityPredicate,
    ) -> Result<Vec<Facility>, StoreError>;

    async fn patch_facility_coordinates(
        &self,
        id: i64,
        coordinate: Coordinate,
    ) -> Result<(), StoreError>;
}

/// An external forward-geocoding provider.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` means the provider answered but found no match.
    async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>, GeocoderError>;
}

#[async_trait]
impl<T: FacilityStore + ?Sized> FacilityStore for Arc<T> {
    async fn list_facilities_by_locality(
        &self,
        locality: &str,
    ) -> Result<Vec<Facility>, StoreError> {
        (**self).list_facilities_by_locality(locality).await
    }

    async fn query_facilities(
        &self,
        predicate: &FacilityPredicate,
    ) -> Result<Vec<Facility>, StoreError> {
        (**self).query_facilities(predicate).await
    }

    async fn patch_facility_coordinates(
        &self,
        id: i64,
        coordinate: Coordinate,
    ) -> Result<(), StoreError> {
        (**self).patch_facility_coordinates(id, coordinate).await
    }
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>, GeocoderError> {
        (**self).lookup(address).await
    }
}
