//! Pre-save duplicate detection for newly submitted facility records.
//!
//! Evidence is checked in a fixed order (phone, then street address, then
//! name) against every record in the candidate's locality. The first rule
//! that fires on any record decides the match; rules are never combined.

use kompas_core::fuzzy::{national_phone_digits, normalize, normalize_street, similar};
use kompas_core::{Facility, FacilityStore, StoreError};
use serde::{Deserialize, Serialize};

const MIN_LOCALITY_LEN: usize = 2;
const MIN_PHONE_DIGITS: usize = 9;
const MIN_STREET_LEN: usize = 3;
const MIN_NAME_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DuplicateCandidate {
    pub name: String,
    pub locality: String,
    pub street: Option<String>,
    pub phone: Option<String>,
    /// Record being edited; never reported as its own duplicate.
    pub exclude_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedBy {
    Phone,
    Address,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
}

impl MatchedBy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MatchedBy::Phone => "phone",
            MatchedBy::Address => "address",
            MatchedBy::Name => "name",
        }
    }
}

impl MatchConfidence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MatchConfidence::High => "high",
            MatchConfidence::Medium => "medium",
            MatchConfidence::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    pub facility_id: i64,
    pub facility_name: String,
    pub matched_by: MatchedBy,
    pub confidence: MatchConfidence,
}

impl DuplicateMatch {
    fn new(facility: &Facility, matched_by: MatchedBy, confidence: MatchConfidence) -> Self {
        Self {
            facility_id: facility.id,
            facility_name: facility.name.clone(),
            matched_by,
            confidence,
        }
    }
}

/// Applies the matching rules to `existing`, which should already be limited
/// to the candidate's locality. Records in other localities are skipped.
#[must_use]
pub fn match_candidate(
    candidate: &DuplicateCandidate,
    existing: &[Facility],
) -> Option<DuplicateMatch> {
    let locality = normalize(&candidate.locality);
    if locality.chars().count() < MIN_LOCALITY_LEN {
        return None;
    }
    let pool: Vec<&Facility> = existing
        .iter()
        .filter(|f| Some(f.id) != candidate.exclude_id)
        .filter(|f| normalize(&f.locality) == locality)
        .collect();
    if pool.is_empty() {
        return None;
    }

    by_phone(candidate, &pool)
        .or_else(|| by_address(candidate, &pool))
        .or_else(|| by_name(candidate, &pool))
}

fn by_phone(candidate: &DuplicateCandidate, pool: &[&Facility]) -> Option<DuplicateMatch> {
    let digits = national_phone_digits(candidate.phone.as_deref()?);
    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    pool.iter()
        .find(|f| {
            f.phone
                .as_deref()
                .is_some_and(|p| national_phone_digits(p) == digits)
        })
        .map(|f| DuplicateMatch::new(f, MatchedBy::Phone, MatchConfidence::High))
}

fn by_address(candidate: &DuplicateCandidate, pool: &[&Facility]) -> Option<DuplicateMatch> {
    let street = normalize_street(candidate.street.as_deref()?);
    if street.chars().count() < MIN_STREET_LEN {
        return None;
    }
    pool.iter()
        .find(|f| {
            f.street
                .as_deref()
                .is_some_and(|s| normalize_street(s) == street)
        })
        .map(|f| DuplicateMatch::new(f, MatchedBy::Address, MatchConfidence::High))
}

fn by_name(candidate: &DuplicateCandidate, pool: &[&Facility]) -> Option<DuplicateMatch> {
    let name = normalize(&candidate.name);
    if name.chars().count() < MIN_NAME_LEN {
        return None;
    }
    // An exact name anywhere in the pool outranks an earlier prefix match.
    if let Some(f) = pool.iter().find(|f| normalize(&f.name) == name) {
        return Some(DuplicateMatch::new(f, MatchedBy::Name, MatchConfidence::Medium));
    }
    pool.iter()
        .find(|f| similar(&f.name, &name))
        .map(|f| DuplicateMatch::new(f, MatchedBy::Name, MatchConfidence::Low))
}

#[derive(Debug, Clone)]
pub struct DuplicateResolver<S> {
    store: S,
}

impl<S: FacilityStore> DuplicateResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Finds an existing record that `candidate` most likely duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the records for the locality cannot be read.
    pub async fn find_duplicate(
        &self,
        candidate: &DuplicateCandidate,
    ) -> Result<Option<DuplicateMatch>, StoreError> {
        if normalize(&candidate.locality).chars().count() < MIN_LOCALITY_LEN {
            return Ok(None);
        }
        let existing = self
            .store
            .list_facilities_by_locality(&candidate.locality)
            .await?;
        let found = match_candidate(candidate, &existing);
        if let Some(m) = &found {
            tracing::info!(
                facility_id = m.facility_id,
                matched_by = ?m.matched_by,
                "possible duplicate facility"
            );
        }
        Ok(found)
    }
}
