use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use partscout_core::{run_pipeline, NormalizedResult, RankMode};
use partscout_providers::{collect_candidates, fetch_image_base64, SearchRequest};

use crate::hash::search_hash;
use crate::middleware::RequestId;
use crate::resolve::{resolve_final_url, should_resolve_url};
use crate::store::{SearchSession, SessionStatus};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SearchBody {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    ranking: Option<String>,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchCreated {
    session_id: Uuid,
    reused: bool,
}

/// `POST /api/search` — runs a search and returns the session id.
///
/// A recent completed session with the same search hash is reused unless
/// `force_refresh` is set. The fan-out, core pipeline, and redirect
/// resolution all run within the request; callers poll the session id for
/// results.
pub(super) async fn create_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<ApiResponse<SearchCreated>>, ApiError> {
    let Json(body) =
        body.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.to_string()))?;

    let query = body
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(ToOwned::to_owned);
    let image_url = body
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(ToOwned::to_owned);

    if query.is_none() && image_url.is_none() {
        return Err(ApiError::new(
            req_id.0.clone(),
            "validation_error",
            "provide a query or an image_url",
        ));
    }

    let mode = match body.ranking.as_deref() {
        Some(raw) => raw
            .parse::<RankMode>()
            .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?,
        None => RankMode::Cheapest,
    };

    let hash = search_hash(query.as_deref(), image_url.as_deref());

    if !body.force_refresh {
        let hours = i64::try_from(state.config.session_reuse_window_hours).unwrap_or(i64::MAX);
        let window = chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::MAX);
        if let Some(existing) = state.store.find_reusable(&hash, window).await {
            tracing::debug!(session_id = %existing, "reusing completed search session");
            return Ok(Json(ApiResponse {
                data: SearchCreated {
                    session_id: existing,
                    reused: true,
                },
                meta: ResponseMeta::new(req_id.0),
            }));
        }
    }

    // Worldwide searches carry no country; providers each apply their own
    // marketplace fallbacks.
    let country = body
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "WORLD")
        .map(ToOwned::to_owned);

    let session_id = state
        .store
        .create_session(hash, query.clone(), image_url.clone(), country.clone())
        .await;

    let image_base64 = match (&query, &image_url) {
        (None, Some(url)) if has_visual_search_provider(&state) => {
            match fetch_image_base64(url, state.config.provider_timeout_secs).await {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    tracing::warn!(error = %e, "image fetch for visual search failed");
                    None
                }
            }
        }
        _ => None,
    };

    let request = SearchRequest {
        query,
        image_url,
        image_base64,
        country,
    };

    let batches = collect_candidates(&state.providers, &request).await;
    let results = run_pipeline(batches, mode);
    let results = resolve_results(&state.resolver, results).await;

    if results.is_empty() {
        state
            .store
            .set_status(session_id, SessionStatus::Empty)
            .await;
    } else {
        state.store.store_results(session_id, results).await;
    }

    Ok(Json(ApiResponse {
        data: SearchCreated {
            session_id,
            reused: false,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /api/search/{id}` — the session with its ranked results.
pub(super) async fn get_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SearchSession>>, ApiError> {
    match state.store.get(id).await {
        Some(session) => Ok(Json(ApiResponse {
            data: session,
            meta: ResponseMeta::new(req_id.0),
        })),
        None => Err(ApiError::new(req_id.0, "not_found", "session not found")),
    }
}

fn has_visual_search_provider(state: &AppState) -> bool {
    state.providers.iter().any(|p| p.id() == "ebay")
}

/// Resolves redirect-wrapping URLs concurrently, leaving merchant URLs
/// untouched.
async fn resolve_results(
    client: &reqwest::Client,
    results: Vec<NormalizedResult>,
) -> Vec<NormalizedResult> {
    join_all(results.into_iter().map(|mut result| async move {
        if should_resolve_url(&result.product_url) {
            result.product_url = resolve_final_url(client, &result.product_url).await;
        }
        result
    }))
    .await
}
