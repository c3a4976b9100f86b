//! Coordinate resolution on the write path, with a per-process cache keyed by
//! the normalized address triple.
//!
//! The provider is called at most once per triple: concurrent callers share
//! the in-flight lookup and "no match" answers are cached as well. Transport
//! failures leave the entry empty so a later write can try again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use kompas_core::fuzzy::{fold_diacritics, normalize, normalize_street};
use kompas_core::{
    AddressFields, Coordinate, Facility, FacilityStore, GeoPoint, Geocoder, StoreError,
};
use tokio::sync::OnceCell;

/// Cache key: the address triple after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressKey {
    pub locality: String,
    pub street: String,
    pub region: String,
}

impl AddressKey {
    #[must_use]
    pub fn from_address(address: &AddressFields) -> Self {
        Self {
            locality: normalize(&address.locality),
            street: address.street.as_deref().map(normalize_street).unwrap_or_default(),
            region: address.region.as_deref().map(normalize).unwrap_or_default(),
        }
    }
}

/// Free-text address sent to the provider: `street, locality, region, Poland`
/// with blank parts skipped and Polish diacritics folded.
#[must_use]
pub fn address_text(address: &AddressFields) -> String {
    [
        address.street.as_deref(),
        Some(address.locality.as_str()),
        address.region.as_deref(),
        Some("Poland"),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .map(fold_diacritics)
    .collect::<Vec<_>>()
    .join(", ")
}

type Slot = Arc<OnceCell<Option<GeoPoint>>>;

pub struct CoordinateResolver<G> {
    geocoder: G,
    cache: Mutex<HashMap<AddressKey, Slot>>,
}

impl<G: Geocoder> std::fmt::Debug for CoordinateResolver<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateResolver")
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

impl<G: Geocoder> CoordinateResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up `address`, consulting the cache first.
    ///
    /// Never fails: provider errors and "no match" both yield
    /// [`Coordinate::Absent`].
    pub async fn resolve(&self, address: &AddressFields) -> Coordinate {
        let key = AddressKey::from_address(address);
        if key.locality.is_empty() {
            return Coordinate::Absent;
        }

        let slot = self.slot(key);
        let text = address_text(address);
        let outcome = slot
            .get_or_try_init(|| async {
                tracing::debug!(address = %text, "geocoding address");
                self.geocoder.lookup(&text).await
            })
            .await;

        match outcome {
            Ok(Some(point)) => Coordinate::Geocoded(*point),
            Ok(None) => {
                tracing::debug!(address = %text, "geocoder found no match");
                Coordinate::Absent
            }
            Err(e) => {
                tracing::warn!(
                    address = %text,
                    error = %e,
                    "geocoding failed; leaving coordinate absent"
                );
                Coordinate::Absent
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but keeps a manual coordinate as is,
    /// without touching the provider.
    pub async fn resolve_for(&self, address: &AddressFields, current: &Coordinate) -> Coordinate {
        if matches!(current, Coordinate::Manual(_)) {
            return *current;
        }
        self.resolve(address).await
    }

    /// Drops the cache entry for `address`. Returns whether one existed.
    pub fn invalidate(&self, address: &AddressFields) -> bool {
        let key = AddressKey::from_address(address);
        self.lock().remove(&key).is_some()
    }

    /// Recomputes the coordinate after an edit.
    ///
    /// Manual coordinates are kept. When the address fields changed the old
    /// triple is invalidated and the new one resolved; otherwise a resolved
    /// coordinate is kept and an absent one is retried.
    pub async fn resolve_after_edit(
        &self,
        old: &AddressFields,
        new: &AddressFields,
        current: &Coordinate,
    ) -> Coordinate {
        if matches!(current, Coordinate::Manual(_)) {
            return *current;
        }
        if AddressKey::from_address(old) != AddressKey::from_address(new) {
            self.invalidate(old);
            return self.resolve(new).await;
        }
        if current.is_resolved() {
            return *current;
        }
        self.resolve(new).await
    }

    /// Resolves a stored facility that has no coordinate yet and writes the
    /// result back. Facilities that already have one are returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if persisting the coordinate patch fails.
    pub async fn ensure_coordinates<S>(
        &self,
        store: &S,
        facility: &Facility,
    ) -> Result<Coordinate, StoreError>
    where
        S: FacilityStore + ?Sized,
    {
        if facility.coordinate.is_resolved() {
            return Ok(facility.coordinate);
        }
        let coordinate = self.resolve(&facility.address()).await;
        if coordinate.is_resolved() {
            store
                .patch_facility_coordinates(facility.id, coordinate)
                .await?;
            tracing::info!(facility_id = facility.id, "stored geocoded coordinate");
        }
        Ok(coordinate)
    }

    /// Number of address triples with a cache slot (answered or pending).
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    fn slot(&self, key: AddressKey) -> Slot {
        Arc::clone(self.lock().entry(key).or_default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AddressKey, Slot>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
