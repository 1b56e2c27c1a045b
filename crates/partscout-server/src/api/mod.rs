mod click;
mod search;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use partscout_core::AppConfig;
use partscout_providers::Provider;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};
use crate::resolve::build_resolver;
use crate::store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub providers: Arc<Vec<Provider>>,
    pub config: Arc<AppConfig>,
    resolver: reqwest::Client,
}

impl AppState {
    /// Builds the shared server state.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the redirect-resolution client cannot
    /// be constructed.
    pub fn new(
        store: SessionStore,
        providers: Arc<Vec<Provider>>,
        config: Arc<AppConfig>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            store,
            providers,
            config,
            resolver: build_resolver()?,
        })
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
    providers: usize,
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
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    // Rate limiting guards search creation only; reads and clicks are
    // cheap and unlimited.
    let search_create = Router::new()
        .route("/api/search", post(search::create_search))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/search/{id}", get(search::get_search))
        .route("/api/click", post(click::record_click))
        .merge(search_create)
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
    (
        StatusCode::OK,
        Json(ApiResponse {
            data: HealthData {
                status: "ok",
                providers: state.providers.len(),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}
