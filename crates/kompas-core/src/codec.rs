//! Translation between [`FilterState`] and the canonical URL parameter set.
//!
//! `decode` never fails: malformed or out-of-range values are read as unset,
//! and a distance sort without a position falls back to the default order.

use std::collections::BTreeMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::facility::{CareProfile, FacilityCategory, GeoPoint};
use crate::filter::{FilterState, PriceFilter, SortMode};

pub const KEY_LOCATION: &str = "q";
pub const KEY_CATEGORY: &str = "type";
pub const KEY_REGION: &str = "woj";
pub const KEY_COUNTY: &str = "powiat";
pub const KEY_CARE: &str = "care";
pub const KEY_MIN_PRICE: &str = "min";
pub const KEY_MAX_PRICE: &str = "max";
pub const KEY_FREE: &str = "free";
pub const KEY_SORT: &str = "sort";
pub const KEY_LAT: &str = "lat";
pub const KEY_LNG: &str = "lng";

/// Order in which known keys are rendered.
const CANONICAL_ORDER: [&str; 11] = [
    KEY_LOCATION,
    KEY_CATEGORY,
    KEY_REGION,
    KEY_COUNTY,
    KEY_CARE,
    KEY_MIN_PRICE,
    KEY_MAX_PRICE,
    KEY_FREE,
    KEY_SORT,
    KEY_LAT,
    KEY_LNG,
];

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b',');

/// A flat key/value parameter set. Later duplicates of a key overwrite
/// earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    pairs: BTreeMap<String, String>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Known keys in canonical order, then any unknown keys alphabetically.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let known = CANONICAL_ORDER
            .iter()
            .filter_map(|k| self.pairs.get_key_value(*k));
        let unknown = self
            .pairs
            .iter()
            .filter(|(k, _)| !CANONICAL_ORDER.contains(&k.as_str()));
        known
            .chain(unknown)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders `key=value&...` without a leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_VALUE),
                    utf8_percent_encode(v, QUERY_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a query string, with or without a leading `?`. `+` is read as a
    /// space. Pairs with an empty key are skipped.
    #[must_use]
    pub fn from_query_string(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut params = Self::new();
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            if key.is_empty() {
                continue;
            }
            params.insert(key, decode_component(value));
        }
        params
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

fn decode_component(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Renders the canonical parameter set for `state`. Defaults are omitted.
#[must_use]
pub fn encode(state: &FilterState) -> QueryParams {
    let mut params = QueryParams::new();

    if !state.location().is_empty() {
        params.insert(KEY_LOCATION, state.location());
    }
    if let Some(category) = state.category() {
        params.insert(KEY_CATEGORY, category.as_code());
    }
    if let Some(region) = state.region() {
        params.insert(KEY_REGION, region);
        if let Some(county) = state.county() {
            params.insert(KEY_COUNTY, county);
        }
    }
    if !state.care_profiles().is_empty() {
        let codes: Vec<&str> = state.care_profiles().iter().map(|p| p.as_code()).collect();
        params.insert(KEY_CARE, codes.join(","));
    }
    match state.price() {
        PriceFilter::Any => {}
        PriceFilter::FreeOnly => params.insert(KEY_FREE, "true"),
        PriceFilter::Range { min, max } => {
            if let Some(min) = min {
                params.insert(KEY_MIN_PRICE, min.to_string());
            }
            if let Some(max) = max {
                params.insert(KEY_MAX_PRICE, max.to_string());
            }
        }
    }
    if let Some(sort) = state.sort().as_param() {
        params.insert(KEY_SORT, sort);
    }
    if let Some(position) = state.user_position() {
        params.insert(KEY_LAT, position.lat.to_string());
        params.insert(KEY_LNG, position.lon.to_string());
    }

    params
}

/// Rebuilds a [`FilterState`] from a parameter set.
#[must_use]
pub fn decode(params: &QueryParams) -> FilterState {
    let mut state = FilterState::new();

    if let Some(q) = params.get(KEY_LOCATION) {
        state.set_location(q);
    }
    state.set_category(params.get(KEY_CATEGORY).and_then(FacilityCategory::from_code));
    state.set_region(params.get(KEY_REGION));
    state.set_county(params.get(KEY_COUNTY));
    if let Some(care) = params.get(KEY_CARE) {
        state.set_care_profiles(CareProfile::parse_list(care));
    }

    state.set_min_price(params.get(KEY_MIN_PRICE).and_then(parse_price));
    state.set_max_price(params.get(KEY_MAX_PRICE).and_then(parse_price));
    if params.get(KEY_FREE).is_some_and(is_truthy) {
        state.set_free_only(true);
    }

    state.set_user_position(parse_position(params));
    if let Some(sort) = params.get(KEY_SORT).and_then(SortMode::from_param) {
        state.set_sort(sort);
    }

    state
}

/// Convenience wrapper: `decode(&QueryParams::from_query_string(raw))`.
#[must_use]
pub fn decode_query_string(raw: &str) -> FilterState {
    decode(&QueryParams::from_query_string(raw))
}

fn parse_price(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "1")
}

fn parse_position(params: &QueryParams) -> Option<GeoPoint> {
    let lat = params.get(KEY_LAT)?.trim().parse::<f64>().ok()?;
    let lon = params.get(KEY_LNG)?.trim().parse::<f64>().ok()?;
    GeoPoint::new(lat, lon).ok()
}
