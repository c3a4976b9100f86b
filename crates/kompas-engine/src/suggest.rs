//! Ranked place completions for free-text location input.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kompas_core::fuzzy::{collation_cmp, normalize};
use kompas_core::{FacilityCategory, PlaceEntry};
use serde::Serialize;

use crate::place_index::{IndexedPlace, PlaceIndex, PlaceIndexHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestOptions {
    /// Queries shorter than this (in characters) return nothing.
    pub min_len: usize,
    pub limit: usize,
    /// Only places in this region (compared after normalization).
    pub region: Option<String>,
    /// Only places in this county; ignored without a region.
    pub county: Option<String>,
    /// Count, rank and filter by facilities of this category only.
    pub category: Option<FacilityCategory>,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self {
            min_len: 2,
            limit: 5,
            region: None,
            county: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Suggestions {
    pub places: Vec<PlaceEntry>,
    /// Number of matching places before `limit` was applied.
    pub total: usize,
}

/// Ranks the places in `index` whose folded name contains the folded query.
///
/// Order: names starting with the query first, then by facility count
/// (descending), then by name. With a category set, only that category's
/// facilities are counted. Places with nothing to count are never returned,
/// and returned entries carry the counted number in `facility_count`.
#[must_use]
pub fn suggest(index: &PlaceIndex, query: &str, options: &SuggestOptions) -> Suggestions {
    let needle = normalize(query);
    if needle.chars().count() < options.min_len.max(1) {
        return Suggestions::default();
    }

    let region = options
        .region
        .as_deref()
        .map(normalize)
        .filter(|r| !r.is_empty() && r != "all");
    let county = region.as_ref().and_then(|_| {
        options
            .county
            .as_deref()
            .map(normalize)
            .filter(|c| !c.is_empty() && c != "all")
    });

    let mut hits: Vec<Hit<'_>> = index
        .indexed()
        .iter()
        .filter(|p| region.as_ref().is_none_or(|r| &p.region_key == r))
        .filter(|p| county.as_ref().is_none_or(|c| &p.county_key == c))
        .filter(|p| p.name_key.contains(&needle))
        .map(|place| Hit {
            place,
            prefix: place.name_key.starts_with(&needle),
            count: place.entry.count_for(options.category),
        })
        .filter(|hit| hit.count > 0)
        .collect();

    hits.sort_by(rank_order);

    let total = hits.len();
    let places = hits
        .into_iter()
        .take(options.limit)
        .map(|hit| PlaceEntry {
            facility_count: hit.count,
            ..hit.place.entry.clone()
        })
        .collect();

    Suggestions { places, total }
}

struct Hit<'a> {
    place: &'a IndexedPlace,
    prefix: bool,
    count: u32,
}

fn rank_order(a: &Hit<'_>, b: &Hit<'_>) -> CmpOrdering {
    b.prefix
        .cmp(&a.prefix)
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| collation_cmp(&a.place.entry.name, &b.place.entry.name))
}

/// Suggestion front end bound to a live [`PlaceIndexHandle`].
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    index: Arc<PlaceIndexHandle>,
}

impl SuggestionEngine {
    #[must_use]
    pub fn new(index: Arc<PlaceIndexHandle>) -> Self {
        Self { index }
    }

    #[must_use]
    pub fn suggest(&self, query: &str, options: &SuggestOptions) -> Suggestions {
        let snapshot = self.index.snapshot();
        suggest(&snapshot, query, options)
    }

    #[must_use]
    pub fn index(&self) -> &Arc<PlaceIndexHandle> {
        &self.index
    }
}

/// Issues increasing sequence tickets for suggestion requests and tells the
/// caller whether a response is still wanted.
///
/// The most recently *issued* ticket wins, whatever order responses arrive in.
#[derive(Debug, Default)]
pub struct SuggestSession {
    latest: AtomicU64,
}

impl SuggestSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a ticket greater than every ticket issued before it.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[must_use]
    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::Acquire) == ticket
    }

    /// Passes `response` through only when `ticket` is still the latest.
    pub fn accept<T>(&self, ticket: u64, response: T) -> Option<T> {
        self.is_current(ticket).then_some(response)
    }
}
