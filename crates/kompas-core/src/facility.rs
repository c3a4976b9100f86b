//! Facility records and the small value types they are built from.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// The two kinds of provider listed in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCategory {
    /// Round-the-clock residential care home ("dps").
    Residential,
    /// Day-care support centre ("sds").
    DayCare,
}

impl FacilityCategory {
    /// Short code used in URLs and the database.
    #[must_use]
    pub fn as_code(self) -> &'static str {
        match self {
            FacilityCategory::Residential => "dps",
            FacilityCategory::DayCare => "sds",
        }
    }

    /// Parses a category code case-insensitively. Accepts the Polish
    /// spelling with a diacritic (`ŚDS`) as well as the ASCII one.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match crate::fuzzy::normalize(code).as_str() {
            "dps" | "residential" => Some(FacilityCategory::Residential),
            "sds" | "day_care" | "daycare" => Some(FacilityCategory::DayCare),
            _ => None,
        }
    }
}

impl std::fmt::Display for FacilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for FacilityCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| CoreError::InvalidCategory(s.to_string()))
    }
}

/// Fixed set of care-profile codes a facility can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CareProfile {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
}

impl CareProfile {
    pub const ALL: [CareProfile; 9] = [
        CareProfile::A,
        CareProfile::B,
        CareProfile::C,
        CareProfile::D,
        CareProfile::E,
        CareProfile::F,
        CareProfile::G,
        CareProfile::H,
        CareProfile::I,
    ];

    #[must_use]
    pub fn as_code(self) -> &'static str {
        match self {
            CareProfile::A => "A",
            CareProfile::B => "B",
            CareProfile::C => "C",
            CareProfile::D => "D",
            CareProfile::E => "E",
            CareProfile::F => "F",
            CareProfile::G => "G",
            CareProfile::H => "H",
            CareProfile::I => "I",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_code().eq_ignore_ascii_case(code))
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            CareProfile::A => "intellectual disability (adults)",
            CareProfile::B => "autism spectrum",
            CareProfile::C => "mental disorders, dementia, Alzheimer's disease",
            CareProfile::D => "multiple disabilities",
            CareProfile::E => "elderly people",
            CareProfile::F => "chronically somatically ill",
            CareProfile::G => "intellectually disabled children",
            CareProfile::H => "intellectually disabled youth",
            CareProfile::I => "physical (motor) disability",
        }
    }

    /// Parses a comma-separated code list, silently dropping unknown codes.
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<CareProfile> {
        let mut codes: Vec<CareProfile> = raw.split(',').filter_map(Self::from_code).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

impl FromStr for CareProfile {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| CoreError::InvalidCareProfile(s.to_string()))
    }
}

/// A validated WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] when either component is not
    /// finite or falls outside the valid latitude/longitude range.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoreError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if valid {
            Ok(Self { lat, lon })
        } else {
            Err(CoreError::InvalidCoordinate { lat, lon })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSource {
    Manual,
    Geocoded,
    Absent,
}

impl CoordinateSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CoordinateSource::Manual => "manual",
            CoordinateSource::Geocoded => "geocoded",
            CoordinateSource::Absent => "absent",
        }
    }
}

impl std::fmt::Display for CoordinateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A facility position together with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Coordinate {
    /// Entered by an administrator; never overwritten by geocoding.
    Manual(GeoPoint),
    Geocoded(GeoPoint),
    #[default]
    Absent,
}

impl Coordinate {
    #[must_use]
    pub fn point(&self) -> Option<GeoPoint> {
        match self {
            Coordinate::Manual(p) | Coordinate::Geocoded(p) => Some(*p),
            Coordinate::Absent => None,
        }
    }

    #[must_use]
    pub fn source(&self) -> CoordinateSource {
        match self {
            Coordinate::Manual(_) => CoordinateSource::Manual,
            Coordinate::Geocoded(_) => CoordinateSource::Geocoded,
            Coordinate::Absent => CoordinateSource::Absent,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Coordinate::Absent)
    }

    /// Rebuilds a coordinate from its stored columns.
    ///
    /// Anything inconsistent (unknown tag, missing or out-of-range component)
    /// collapses to [`Coordinate::Absent`].
    #[must_use]
    pub fn from_parts(source: &str, lat: Option<f64>, lon: Option<f64>) -> Self {
        let point = match (lat, lon) {
            (Some(lat), Some(lon)) => GeoPoint::new(lat, lon).ok(),
            _ => None,
        };
        match (source, point) {
            ("manual", Some(p)) => Coordinate::Manual(p),
            ("geocoded", Some(p)) => Coordinate::Geocoded(p),
            _ => Coordinate::Absent,
        }
    }
}

/// The address fields that determine a facility's geocoded position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressFields {
    pub locality: String,
    pub street: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: i64,
    pub name: String,
    pub category: FacilityCategory,
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
    /// Monthly cost in PLN. `None` means "ask the facility" or publicly funded.
    pub monthly_cost: Option<Decimal>,
    pub care_profiles: Vec<CareProfile>,
    pub coordinate: Coordinate,
    pub source_url: Option<String>,
    pub source_date: Option<NaiveDate>,
    pub verified: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    #[must_use]
    pub fn address(&self) -> AddressFields {
        AddressFields {
            locality: self.locality.clone(),
            street: self.street.clone(),
            region: Some(self.region.clone()).filter(|r| !r.trim().is_empty()),
        }
    }

    /// The editable fields of this record, for building an update.
    #[must_use]
    pub fn to_draft(&self) -> FacilityDraft {
        FacilityDraft {
            name: self.name.clone(),
            category: self.category,
            locality: self.locality.clone(),
            street: self.street.clone(),
            postal_code: self.postal_code.clone(),
            county: self.county.clone(),
            region: self.region.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            website: self.website.clone(),
            seat_count: self.seat_count,
            subsidized_seat_count: self.subsidized_seat_count,
            monthly_cost: self.monthly_cost,
            care_profiles: self.care_profiles.clone(),
            coordinate: self.coordinate,
            source_url: self.source_url.clone(),
            source_date: self.source_date,
            verified: self.verified,
            notes: self.notes.clone(),
        }
    }

    /// Free or publicly funded: cost unknown or zero.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.monthly_cost.is_none_or(|c| c.is_zero())
    }
}

/// A facility record before it is stored: everything except id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityDraft {
    pub name: String,
    pub category: FacilityCategory,
    pub locality: String,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub county: String,
    pub region: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub seat_count: Option<i32>,
    #[serde(default)]
    pub subsidized_seat_count: Option<i32>,
    #[serde(default)]
    pub monthly_cost: Option<Decimal>,
    #[serde(default)]
    pub care_profiles: Vec<CareProfile>,
    #[serde(default)]
    pub coordinate: Coordinate,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_date: Option<NaiveDate>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FacilityDraft {
    #[must_use]
    pub fn address(&self) -> AddressFields {
        AddressFields {
            locality: self.locality.clone(),
            street: self.street.clone(),
            region: Some(self.region.clone()).filter(|r| !r.trim().is_empty()),
        }
    }
}

/// One row of the place index served by the suggestion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceEntry {
    pub name: String,
    pub county: String,
    pub region: String,
    /// All facilities in the place; the sum of the per-category counts.
    #[serde(default)]
    pub facility_count: u32,
    #[serde(default)]
    pub residential_count: u32,
    #[serde(default)]
    pub day_care_count: u32,
}

impl PlaceEntry {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        county: impl Into<String>,
        region: impl Into<String>,
        residential_count: u32,
        day_care_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            county: county.into(),
            region: region.into(),
            facility_count: residential_count.saturating_add(day_care_count),
            residential_count,
            day_care_count,
        }
    }

    /// Facilities of `category`, or of any category for `None`.
    #[must_use]
    pub fn count_for(&self, category: Option<FacilityCategory>) -> u32 {
        match category {
            None => self.facility_count,
            Some(FacilityCategory::Residential) => self.residential_count,
            Some(FacilityCategory::DayCare) => self.day_care_count,
        }
    }
}
