//! Immutable place-name snapshots and the handle that swaps them.

use std::sync::{Arc, PoisonError, RwLock};

use kompas_core::fuzzy::normalize;
use kompas_core::PlaceEntry;

#[derive(Debug, Clone)]
pub(crate) struct IndexedPlace {
    pub(crate) entry: PlaceEntry,
    pub(crate) name_key: String,
    pub(crate) county_key: String,
    pub(crate) region_key: String,
}

/// A read-only table of places with their lookup keys precomputed.
#[derive(Debug, Clone, Default)]
pub struct PlaceIndex {
    places: Vec<IndexedPlace>,
}

impl PlaceIndex {
    #[must_use]
    pub fn new(entries: Vec<PlaceEntry>) -> Self {
        let places = entries
            .into_iter()
            .map(|entry| IndexedPlace {
                name_key: normalize(&entry.name),
                county_key: normalize(&entry.county),
                region_key: normalize(&entry.region),
                entry,
            })
            .collect();
        Self { places }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.places.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PlaceEntry> {
        self.places.iter().map(|p| &p.entry)
    }

    pub(crate) fn indexed(&self) -> &[IndexedPlace] {
        &self.places
    }
}

/// Shared pointer to the current [`PlaceIndex`].
///
/// Readers take a cheap `Arc` clone and keep using it for the whole request
/// even if a refresh lands meanwhile.
#[derive(Debug, Default)]
pub struct PlaceIndexHandle {
    current: RwLock<Arc<PlaceIndex>>,
}

impl PlaceIndexHandle {
    #[must_use]
    pub fn new(index: PlaceIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<PlaceIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Installs `index` as the current snapshot and returns the previous one.
    pub fn replace(&self, index: PlaceIndex) -> Arc<PlaceIndex> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(index))
    }
}
