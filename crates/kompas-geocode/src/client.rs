//! HTTP client for the Nominatim `/search` endpoint.
//!
//! Wraps `reqwest` with retry/back-off, a configurable User-Agent (required by
//! the Nominatim usage policy) and typed response parsing. Implements
//! [`kompas_core::Geocoder`] so the engine can use it directly.

use std::time::Duration;

use async_trait::async_trait;
use kompas_core::{AppConfig, GeoPoint, Geocoder, GeocoderError};
use reqwest::{Client, Url};

use crate::error::GeocodeError;
use crate::retry::retry_with_backoff;
use crate::types::NominatimPlace;

const DEFAULT_USER_AGENT: &str = "kompas/0.1 (facility-directory)";

/// Client for a Nominatim-compatible forward geocoder.
///
/// Use [`NominatimClient::from_config`] in binaries or
/// [`NominatimClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl NominatimClient {
    /// Builds a client from the geocoder settings in [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`GeocodeError::InvalidBaseUrl`] if `geocoder_url` does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, GeocodeError> {
        Ok(Self::with_base_url(
            &config.geocoder_url,
            &config.geocoder_user_agent,
            config.geocoder_timeout_secs,
        )?
        .with_retry(config.geocoder_max_retries, config.geocoder_backoff_base_ms))
    }

    /// Creates a client with a custom base URL and no retries.
    ///
    /// An empty `user_agent` falls back to the crate default.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        base_url: &str,
        user_agent: &str,
        timeout_secs: u64,
    ) -> Result<Self, GeocodeError> {
        let user_agent = if user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT
        } else {
            user_agent
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join("search")` appends a segment
        // instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Looks up `address` and returns the best match, if any.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx status after
    ///   retries are exhausted.
    /// - [`GeocodeError::Deserialize`] if the body is not the expected array.
    /// - [`GeocodeError::InvalidCoordinate`] if the match has unparseable or
    ///   out-of-range coordinates.
    pub async fn search(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }
        let url = self.build_url(address)?;
        let places = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_places(&url)
        })
        .await?;

        let Some(best) = places.into_iter().next() else {
            tracing::debug!(address, "geocoder found no match");
            return Ok(None);
        };
        let point = parse_point(&best)?;
        tracing::debug!(
            address,
            lat = point.lat,
            lon = point.lon,
            display_name = best.display_name.as_deref().unwrap_or_default(),
            "geocoder match"
        );
        Ok(Some(point))
    }

    /// Builds `<base>/search?format=json&q=<address>&limit=1` with the address
    /// percent-encoded.
    fn build_url(&self, address: &str) -> Result<Url, GeocodeError> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("q", address)
            .append_pair("limit", "1");
        Ok(url)
    }

    async fn request_places(&self, url: &Url) -> Result<Vec<NominatimPlace>, GeocodeError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

fn parse_point(place: &NominatimPlace) -> Result<GeoPoint, GeocodeError> {
    let invalid = || GeocodeError::InvalidCoordinate {
        lat: place.lat.clone(),
        lon: place.lon.clone(),
    };
    let lat = place.lat.trim().parse::<f64>().map_err(|_| invalid())?;
    let lon = place.lon.trim().parse::<f64>().map_err(|_| invalid())?;
    GeoPoint::new(lat, lon).map_err(|_| invalid())
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>, GeocoderError> {
        self.search(address).await.map_err(|err| match err {
            GeocodeError::Http(e) => GeocoderError::Transport(e.to_string()),
            GeocodeError::InvalidBaseUrl { .. } => GeocoderError::Transport(err.to_string()),
            GeocodeError::Deserialize { .. } | GeocodeError::InvalidCoordinate { .. } => {
                GeocoderError::InvalidResponse(err.to_string())
            }
        })
    }
}
