//! Facility write handlers for administrators: duplicate check, create, update.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use kompas_core::{canonical_region, Coordinate, Facility, FacilityDraft};
use kompas_db::DbError;
use kompas_engine::{DuplicateCandidate, DuplicateMatch, DuplicateResolver};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_NAME_LEN: usize = 300;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct WriteFacilityRequest {
    pub facility: FacilityDraft,
    /// Save even when a likely duplicate exists.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct DuplicateCheckResponse {
    pub duplicate: Option<DuplicateMatch>,
}

#[derive(Debug, Serialize)]
pub(super) struct WriteFacilityResponse {
    pub facility: Facility,
    /// Set when `force` overrode a duplicate warning.
    pub duplicate: Option<DuplicateMatch>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validation_error(req_id: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(req_id, "validation_error", message)
}

fn require_text(req_id: &str, field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(validation_error(req_id, format!("'{field}' must not be empty")));
    }
    Ok(())
}

/// Checks required fields and rewrites the region to its canonical spelling.
fn validate_draft(req_id: &str, draft: &mut FacilityDraft) -> Result<(), ApiError> {
    draft.name = draft.name.trim().to_owned();
    require_text(req_id, "name", &draft.name)?;
    if draft.name.chars().count() > MAX_NAME_LEN {
        return Err(validation_error(
            req_id,
            format!("'name' must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    require_text(req_id, "locality", &draft.locality)?;
    require_text(req_id, "county", &draft.county)?;

    let Some(region) = canonical_region(&draft.region) else {
        return Err(validation_error(
            req_id,
            format!("'{}' is not a known voivodeship", draft.region),
        ));
    };
    draft.region = region.to_owned();

    if draft.monthly_cost.is_some_and(|c| c < Decimal::ZERO) {
        return Err(validation_error(req_id, "'monthly_cost' must not be negative"));
    }
    if draft.seat_count.is_some_and(|n| n < 0) || draft.subsidized_seat_count.is_some_and(|n| n < 0)
    {
        return Err(validation_error(req_id, "seat counts must not be negative"));
    }
    Ok(())
}

fn candidate_for(draft: &FacilityDraft, exclude_id: Option<i64>) -> DuplicateCandidate {
    DuplicateCandidate {
        name: draft.name.clone(),
        locality: draft.locality.clone(),
        street: draft.street.clone(),
        phone: draft.phone.clone(),
        exclude_id,
    }
}

/// Runs the duplicate check. A match is an error unless `force` is set, in
/// which case it is returned for the response body.
async fn guard_duplicate(
    state: &AppState,
    req_id: &str,
    candidate: &DuplicateCandidate,
    force: bool,
) -> Result<Option<DuplicateMatch>, ApiError> {
    let found = DuplicateResolver::new(Arc::clone(&state.store))
        .find_duplicate(candidate)
        .await
        .map_err(|e| map_store_error(req_id.to_owned(), &e))?;

    match found {
        Some(m) if !force => Err(ApiError::new(
            req_id,
            "conflict",
            format!(
                "possible duplicate of facility {} '{}' (matched by {}, {} confidence)",
                m.facility_id,
                m.facility_name,
                m.matched_by.as_str(),
                m.confidence.as_str()
            ),
        )),
        other => Ok(other),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/facilities/check-duplicate
pub(super) async fn check_duplicate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(candidate): Query<DuplicateCandidate>,
) -> Result<Json<ApiResponse<DuplicateCheckResponse>>, ApiError> {
    let duplicate = DuplicateResolver::new(Arc::clone(&state.store))
        .find_duplicate(&candidate)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: DuplicateCheckResponse { duplicate },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/admin/facilities: duplicate check, geocode, insert.
pub(super) async fn create_facility(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<WriteFacilityRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WriteFacilityResponse>>), ApiError> {
    let rid = &req_id.0;
    let mut draft = body.facility;
    validate_draft(rid, &mut draft)?;

    let duplicate = guard_duplicate(&state, rid, &candidate_for(&draft, None), body.force).await?;

    draft.coordinate = state
        .resolver
        .resolve_for(&draft.address(), &draft.coordinate)
        .await;

    let facility = kompas_db::insert_facility(&state.pool, &draft)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: WriteFacilityResponse {
                facility,
                duplicate,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/admin/facilities/{id}: full replacement of editable fields;
/// re-geocodes when the address changed.
pub(super) async fn update_facility(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<WriteFacilityRequest>,
) -> Result<Json<ApiResponse<WriteFacilityResponse>>, ApiError> {
    let rid = &req_id.0;
    let mut draft = body.facility;
    validate_draft(rid, &mut draft)?;

    let existing = kompas_db::get_facility(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("facility {id} not found")))?;

    let duplicate =
        guard_duplicate(&state, rid, &candidate_for(&draft, Some(id)), body.force).await?;

    // A manual point in the request wins; otherwise only a previously
    // geocoded point is worth keeping.
    let current = match (draft.coordinate, existing.coordinate) {
        (Coordinate::Manual(_), _) => draft.coordinate,
        (_, Coordinate::Geocoded(_)) => existing.coordinate,
        _ => Coordinate::Absent,
    };
    draft.coordinate = state
        .resolver
        .resolve_after_edit(&existing.address(), &draft.address(), &current)
        .await;

    let facility = match kompas_db::update_facility(&state.pool, id, &draft).await {
        Ok(f) => f,
        Err(DbError::NotFound) => {
            return Err(ApiError::new(
                rid,
                "not_found",
                format!("facility {id} not found"),
            ))
        }
        Err(e) => return Err(map_db_error(rid.clone(), &e)),
    };

    Ok(Json(ApiResponse {
        data: WriteFacilityResponse {
            facility,
            duplicate,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kompas_core::FacilityCategory;

    fn draft() -> FacilityDraft {
        serde_json::from_value(serde_json::json!({
            "name": "  Dom Pomocy Społecznej  ",
            "category": "residential",
            "locality": "Kraków",
            "county": "Kraków",
            "region": "Małopolskie"
        }))
        .expect("draft")
    }

    #[test]
    fn validate_draft_trims_name_and_canonicalizes_region() {
        let mut d = draft();
        validate_draft("req", &mut d).expect("valid");
        assert_eq!(d.name, "Dom Pomocy Społecznej");
        assert_eq!(d.region, "małopolskie");
        assert_eq!(d.category, FacilityCategory::Residential);
    }

    #[test]
    fn validate_draft_rejects_unknown_region() {
        let mut d = draft();
        d.region = "bawaria".to_owned();
        let err = validate_draft("req", &mut d).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn validate_draft_rejects_negative_cost() {
        let mut d = draft();
        d.monthly_cost = Some(Decimal::new(-1, 0));
        assert!(validate_draft("req", &mut d).is_err());
    }

    #[test]
    fn validate_draft_rejects_blank_locality() {
        let mut d = draft();
        d.locality = "   ".to_owned();
        assert!(validate_draft("req", &mut d).is_err());
    }
}
