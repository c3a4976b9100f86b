//! Domain model and pure building blocks for the facility discovery engine.
//!
//! Everything in this crate is free of I/O: the record store and the
//! geocoding provider appear only as the [`FacilityStore`] and [`Geocoder`]
//! traits, implemented by `kompas-db` and `kompas-geocode` respectively.

pub mod app_config;
pub mod codec;
pub mod config;
pub mod facility;
pub mod filter;
pub mod fuzzy;
pub mod places;
pub mod region;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use codec::{decode, decode_query_string, encode, QueryParams};
pub use config::{load_app_config, load_app_config_from_env};
pub use facility::{
    AddressFields, CareProfile, Coordinate, CoordinateSource, Facility, FacilityCategory,
    FacilityDraft, GeoPoint, PlaceEntry,
};
pub use filter::{FilterState, PriceFilter, SortMode};
pub use places::{load_places, parse_places, PlacesFile};
pub use region::{canonical_region, REGIONS};
pub use store::{FacilityPredicate, FacilityStore, Geocoder, GeocoderError, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read places file {path}: {source}")]
    PlacesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse places file: {0}")]
    PlacesFileParse(#[source] serde_yaml::Error),

    #[error("invalid places file: {0}")]
    PlacesFileValidation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid facility category: {0}")]
    InvalidCategory(String),

    #[error("invalid care profile code: {0}")]
    InvalidCareProfile(String),

    #[error("coordinate out of range: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
}
