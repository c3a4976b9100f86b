mod admin;
mod facilities;
mod places;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use kompas_core::{AppConfig, FacilityStore, Geocoder, StoreError};
use kompas_db::PgFacilityStore;
use kompas_engine::{CoordinateResolver, PlaceIndex, PlaceIndexHandle};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{admin_gate, request_id, AdminGate, RequestId};

pub(crate) use places::reload_place_index;

/// Knobs the handlers read from [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
    pub suggest_min_len: usize,
    pub suggest_limit: usize,
    pub places_path: Option<PathBuf>,
}

impl ApiSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            suggest_min_len: config.suggest_min_len,
            suggest_limit: config.suggest_limit,
            places_path: config.places_path.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: Arc<dyn FacilityStore>,
    pub places: Arc<PlaceIndexHandle>,
    pub resolver: Arc<CoordinateResolver<Arc<dyn Geocoder>>>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    /// Production wiring: the Postgres store over `pool` and an empty place
    /// index until the first refresh.
    pub fn new(pool: PgPool, geocoder: Arc<dyn Geocoder>, settings: ApiSettings) -> Self {
        Self {
            store: Arc::new(PgFacilityStore::new(pool.clone())),
            pool,
            places: Arc::new(PlaceIndexHandle::new(PlaceIndex::default())),
            resolver: Arc::new(CoordinateResolver::new(geocoder)),
            settings: Arc::new(settings),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    places: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "store_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &kompas_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    match error {
        StoreError::NotFound(id) => {
            ApiError::new(request_id, "not_found", format!("facility {id} not found"))
        }
        StoreError::Unavailable(_) => {
            tracing::error!(error = %error, "record store unavailable");
            ApiError::new(
                request_id,
                "store_unavailable",
                "facility records are temporarily unavailable",
            )
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router(gate: AdminGate) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/admin/facilities/check-duplicate",
            get(admin::check_duplicate),
        )
        .route("/api/v1/admin/facilities", post(admin::create_facility))
        .route(
            "/api/v1/admin/facilities/{id}",
            patch(admin::update_facility),
        )
        .route("/api/v1/admin/places/refresh", post(places::refresh_places))
        .layer(axum::middleware::from_fn_with_state(gate, admin_gate))
}

pub fn build_app(state: AppState, gate: AdminGate) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/places/suggest", get(places::suggest_places))
        .route(
            "/api/v1/facilities/search",
            get(facilities::search_facilities),
        )
        .route("/api/v1/facilities/{id}", get(facilities::get_facility));

    Router::new()
        .merge(public_routes)
        .merge(admin_router(gate))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);
    let places = state.places.snapshot().len();

    match kompas_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                    places,
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                        places,
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
