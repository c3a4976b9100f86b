//! Nominatim `/search` response types.
//!
//! With `format=json` the endpoint returns a bare array of places. Coordinates
//! arrive as decimal strings.

use serde::Deserialize;

/// One element of the `/search` response array. Unused fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub importance: Option<f64>,
}
