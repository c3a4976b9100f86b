//! Request correlation for every route, and the gate in front of the admin
//! routes: a bearer-key check followed by a per-caller fixed-window quota.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use kompas_core::AppConfig;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";
/// Longer client-supplied ids are replaced rather than echoed.
const MAX_REQUEST_ID_LEN: usize = 128;
/// Quota bucket shared by every caller while key checks are off.
const OPEN_CALLER: &str = "-";

/// Correlation id of the current request, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Reuses a sane client `x-request-id` or mints a `UUIDv4`, exposes it to
/// handlers as [`RequestId`] and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

// ---------------------------------------------------------------------------
// Admin gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    used: u32,
}

/// Why the gate turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
    Unauthorized,
    RateLimited { retry_after: Duration },
}

/// Shared state behind [`admin_gate`]. Cloning shares the quota windows.
#[derive(Debug, Clone)]
pub struct AdminGate {
    keys: Arc<[String]>,
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl AdminGate {
    /// `keys` empty means every caller is admitted and shares one quota.
    #[must_use]
    pub fn new(keys: Vec<String>, max_requests: u32, window: Duration) -> Self {
        Self {
            keys: keys.into(),
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        if config.admin_api_keys.is_empty() {
            tracing::warn!("KOMPAS_API_KEYS not set; admin routes are open in development");
        }
        Self::new(
            config.admin_api_keys.clone(),
            config.admin_rate_limit,
            Duration::from_secs(config.admin_rate_limit_window_secs),
        )
    }

    /// The matched key names the caller; `None` when the header is missing
    /// or carries an unknown token.
    fn caller<'k>(&'k self, headers: &HeaderMap) -> Option<&'k str> {
        if self.keys.is_empty() {
            return Some(OPEN_CALLER);
        }
        let token = bearer_token(headers)?;
        self.keys
            .iter()
            .find(|key| bool::from(key.as_bytes().ct_eq(token.as_bytes())))
            .map(String::as_str)
    }

    /// Counts one request against `caller`'s window opened no earlier than
    /// `window` before `now`.
    async fn admit_at(&self, caller: &str, now: Instant) -> Result<(), Refusal> {
        let mut windows = self.windows.lock().await;
        let slot = windows.entry(caller.to_owned()).or_insert(Window {
            opened_at: now,
            used: 0,
        });
        let age = now.saturating_duration_since(slot.opened_at);
        if age >= self.window {
            *slot = Window {
                opened_at: now,
                used: 0,
            };
        }
        if slot.used >= self.max_requests {
            return Err(Refusal::RateLimited {
                retry_after: self.window.saturating_sub(age),
            });
        }
        slot.used += 1;
        Ok(())
    }

    async fn check(&self, headers: &HeaderMap) -> Result<(), Refusal> {
        let caller = self.caller(headers).ok_or(Refusal::Unauthorized)?;
        self.admit_at(caller, Instant::now()).await
    }
}

impl Refusal {
    fn into_api_response(self, request_id: String) -> Response {
        match self {
            Refusal::Unauthorized => {
                ApiError::new(request_id, "unauthorized", "missing or invalid bearer token")
                    .into_response()
            }
            Refusal::RateLimited { retry_after } => {
                let mut res =
                    ApiError::new(request_id, "rate_limited", "admin request quota exhausted")
                        .into_response();
                // Whole seconds, rounded up so a client never retries early.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
                res
            }
        }
    }
}

/// Admits a request to the admin routes or answers with the error envelope.
pub async fn admin_gate(
    State(gate): State<AdminGate>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
    next: Next,
) -> Response {
    match gate.check(req.headers()).await {
        Ok(()) => next.run(req).await,
        Err(refusal) => {
            tracing::warn!(
                request_id = %req_id.0,
                path = %req.uri().path(),
                ?refusal,
                "admin request refused"
            );
            refusal.into_api_response(req_id.0)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
