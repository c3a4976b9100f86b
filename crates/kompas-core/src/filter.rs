//! User-facing filter state for facility search.
//!
//! Fields are private; every mutation goes through a setter so the state can
//! never hold a county without a region, price bounds alongside "free only",
//! or a distance sort without a user position.

use std::collections::BTreeSet;

use crate::facility::{CareProfile, FacilityCategory, GeoPoint};
use crate::region::canonical_region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Store-defined order.
    #[default]
    Default,
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
    /// Nearest first; only valid while a user position is set.
    Distance,
}

impl SortMode {
    /// Wire value, or `None` for the default ordering.
    #[must_use]
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            SortMode::Default => None,
            SortMode::NameAsc => Some("name_asc"),
            SortMode::NameDesc => Some("name_desc"),
            SortMode::PriceAsc => Some("price_asc"),
            SortMode::PriceDesc => Some("price_desc"),
            SortMode::Distance => Some("distance"),
        }
    }

    #[must_use]
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw.trim() {
            "default" | "" => Some(SortMode::Default),
            "name_asc" => Some(SortMode::NameAsc),
            "name_desc" => Some(SortMode::NameDesc),
            "price_asc" => Some(SortMode::PriceAsc),
            "price_desc" => Some(SortMode::PriceDesc),
            "distance" => Some(SortMode::Distance),
            _ => None,
        }
    }
}

/// Monthly-cost constraint. Bounds and "free only" are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceFilter {
    #[default]
    Any,
    /// At least one bound is set. Bounds are whole PLN and positive.
    Range { min: Option<u32>, max: Option<u32> },
    /// Cost is unknown or zero.
    FreeOnly,
}

impl PriceFilter {
    fn from_bounds(min: Option<u32>, max: Option<u32>) -> Self {
        match (min, max) {
            (None, None) => PriceFilter::Any,
            (Some(lo), Some(hi)) if lo > hi => PriceFilter::Range {
                min: Some(hi),
                max: Some(lo),
            },
            (min, max) => PriceFilter::Range { min, max },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    location: String,
    category: Option<FacilityCategory>,
    region: Option<&'static str>,
    county: Option<String>,
    care_profiles: BTreeSet<CareProfile>,
    price: PriceFilter,
    sort: SortMode,
    user_position: Option<GeoPoint>,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn category(&self) -> Option<FacilityCategory> {
        self.category
    }

    #[must_use]
    pub fn region(&self) -> Option<&'static str> {
        self.region
    }

    #[must_use]
    pub fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }

    #[must_use]
    pub fn care_profiles(&self) -> &BTreeSet<CareProfile> {
        &self.care_profiles
    }

    #[must_use]
    pub fn price(&self) -> PriceFilter {
        self.price
    }

    #[must_use]
    pub fn is_free_only(&self) -> bool {
        self.price == PriceFilter::FreeOnly
    }

    #[must_use]
    pub fn min_price(&self) -> Option<u32> {
        match self.price {
            PriceFilter::Range { min, .. } => min,
            _ => None,
        }
    }

    #[must_use]
    pub fn max_price(&self) -> Option<u32> {
        match self.price {
            PriceFilter::Range { max, .. } => max,
            _ => None,
        }
    }

    #[must_use]
    pub fn sort(&self) -> SortMode {
        self.sort
    }

    #[must_use]
    pub fn user_position(&self) -> Option<GeoPoint> {
        self.user_position
    }

    // ---------------------------------------------------------------------
    // Mutators
    // ---------------------------------------------------------------------

    pub fn set_location(&mut self, text: &str) {
        self.location = text.trim().to_string();
    }

    pub fn set_category(&mut self, category: Option<FacilityCategory>) {
        self.category = category;
    }

    /// Sets the region from free-form input. `None`, `"all"` and unknown
    /// names clear it. Any change of region clears the county.
    pub fn set_region(&mut self, region: Option<&str>) {
        let next = region.and_then(canonical_region);
        if next != self.region {
            self.county = None;
        }
        self.region = next;
    }

    /// Ignored while no region is set. Blank and `"all"` clear the county.
    pub fn set_county(&mut self, county: Option<&str>) {
        if self.region.is_none() {
            self.county = None;
            return;
        }
        self.county = county
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(str::to_string);
    }

    /// Adds the profile if absent, removes it if present.
    pub fn toggle_care_profile(&mut self, profile: CareProfile) {
        if !self.care_profiles.remove(&profile) {
            self.care_profiles.insert(profile);
        }
    }

    pub fn set_care_profiles<I>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = CareProfile>,
    {
        self.care_profiles = profiles.into_iter().collect();
    }

    /// Enabling clears both price bounds; disabling leaves no price filter.
    pub fn set_free_only(&mut self, free_only: bool) {
        if free_only {
            self.price = PriceFilter::FreeOnly;
        } else if self.price == PriceFilter::FreeOnly {
            self.price = PriceFilter::Any;
        }
    }

    /// Setting a bound clears "free only". Zero counts as unset. When both
    /// bounds are set and inverted they are swapped.
    pub fn set_min_price(&mut self, min: Option<u32>) {
        let max = self.max_price();
        self.apply_bounds(min.filter(|v| *v > 0), max);
    }

    /// See [`FilterState::set_min_price`].
    pub fn set_max_price(&mut self, max: Option<u32>) {
        let min = self.min_price();
        self.apply_bounds(min, max.filter(|v| *v > 0));
    }

    fn apply_bounds(&mut self, min: Option<u32>, max: Option<u32>) {
        if min.is_none() && max.is_none() && self.price == PriceFilter::FreeOnly {
            return;
        }
        self.price = PriceFilter::from_bounds(min, max);
    }

    /// Distance sort without a user position falls back to the default order.
    pub fn set_sort(&mut self, sort: SortMode) {
        self.sort = if sort == SortMode::Distance && self.user_position.is_none() {
            SortMode::Default
        } else {
            sort
        };
    }

    /// Clearing the position while sorting by distance reverts to the
    /// default order.
    pub fn set_user_position(&mut self, position: Option<GeoPoint>) {
        self.user_position = position;
        if position.is_none() && self.sort == SortMode::Distance {
            self.sort = SortMode::Default;
        }
    }

    /// Clears every filter except the location text and the user position.
    pub fn reset(&mut self) {
        *self = Self {
            location: std::mem::take(&mut self.location),
            user_position: self.user_position,
            ..Self::default()
        };
    }
}
