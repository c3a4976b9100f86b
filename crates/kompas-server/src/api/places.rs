//! Place autocomplete and place-index refresh.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use kompas_core::{FacilityCategory, PlaceEntry};
use kompas_engine::{PlaceIndex, SuggestOptions, SuggestionEngine};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_SUGGEST_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub(super) struct SuggestQuery {
    #[serde(default)]
    q: String,
    woj: Option<String>,
    powiat: Option<String>,
    limit: Option<usize>,
    /// `dps` or `sds`; anything else counts every category.
    #[serde(rename = "type", alias = "typ")]
    category: Option<String>,
    /// Caller's sequence token, echoed back so stale responses can be dropped.
    seq: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SuggestResponse {
    pub places: Vec<PlaceEntry>,
    pub total: usize,
    pub seq: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshResponse {
    pub places: usize,
    pub previous: usize,
}

fn normalize_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_SUGGEST_LIMIT)
}

/// GET /api/v1/places/suggest
pub(super) async fn suggest_places(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SuggestQuery>,
) -> Json<ApiResponse<SuggestResponse>> {
    let options = SuggestOptions {
        min_len: state.settings.suggest_min_len,
        limit: normalize_limit(query.limit, state.settings.suggest_limit),
        region: query.woj,
        county: query.powiat,
        category: query.category.as_deref().and_then(FacilityCategory::from_code),
    };
    let found = SuggestionEngine::new(Arc::clone(&state.places)).suggest(&query.q, &options);

    Json(ApiResponse {
        data: SuggestResponse {
            places: found.places,
            total: found.total,
            seq: query.seq,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

/// POST /api/v1/admin/places/refresh
pub(super) async fn refresh_places(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let (places, previous) = reload_place_index(&state).await.map_err(|e| {
        tracing::error!(error = %e, "place index refresh failed");
        ApiError::new(req_id.0.clone(), "internal_error", "place index refresh failed")
    })?;

    Ok(Json(ApiResponse {
        data: RefreshResponse { places, previous },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Rebuilds the place index from the YAML seed when one is configured,
/// otherwise from the facility table. Returns the new and previous sizes.
///
/// A failed load leaves the current snapshot in place.
pub(crate) async fn reload_place_index(state: &AppState) -> anyhow::Result<(usize, usize)> {
    let entries = match &state.settings.places_path {
        Some(path) => kompas_core::load_places(path)?.places,
        None => kompas_db::list_place_entries(&state.pool).await?,
    };
    let places = entries.len();
    let previous = state.places.replace(PlaceIndex::new(entries)).len();
    tracing::info!(places, previous, "place index refreshed");
    Ok((places, previous))
}
