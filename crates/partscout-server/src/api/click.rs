use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ClickBody {
    session_id: Uuid,
    result_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct ClickAck {
    recorded: bool,
}

/// `POST /api/click` — records a click-through on a search result.
pub(super) async fn record_click(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ClickBody>, JsonRejection>,
) -> Result<Json<ApiResponse<ClickAck>>, ApiError> {
    let Json(body) =
        body.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.to_string()))?;

    if state.store.record_click(body.session_id, body.result_id).await {
        Ok(Json(ApiResponse {
            data: ClickAck { recorded: true },
            meta: ResponseMeta::new(req_id.0),
        }))
    } else {
        Err(ApiError::new(req_id.0, "not_found", "session not found"))
    }
}
