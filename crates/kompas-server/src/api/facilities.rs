use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    Extension, Json,
};
use kompas_core::{decode_query_string, encode, Facility};
use kompas_engine::{RankedFacility, SearchError, SearchExecutor};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SearchResponse {
    /// Canonical query string for the filter state actually applied.
    pub query: String,
    pub total: usize,
    pub hits: Vec<RankedFacility>,
}

/// GET /api/v1/facilities/search
///
/// Accepts the same keys the directory puts in its page URL. Unknown keys and
/// malformed values are ignored rather than rejected.
pub(super) async fn search_facilities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RawQuery(raw): RawQuery,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let filter = decode_query_string(raw.as_deref().unwrap_or_default());
    let results = SearchExecutor::new(Arc::clone(&state.store))
        .search(&filter)
        .await
        .map_err(|e| match e {
            SearchError::Store(err) => map_store_error(req_id.0.clone(), &err),
        })?;

    Ok(Json(ApiResponse {
        data: SearchResponse {
            query: encode(&filter).to_query_string(),
            total: results.len(),
            hits: results.hits,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/facilities/{id}
pub(super) async fn get_facility(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Facility>>, ApiError> {
    let facility = kompas_db::get_facility(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "not_found", format!("facility {id} not found"))
        })?;

    Ok(Json(ApiResponse {
        data: facility,
        meta: ResponseMeta::new(req_id.0),
    }))
}
