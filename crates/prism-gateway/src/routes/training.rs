//! `POST /api/training/ensure-model`

use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use serde::Deserialize;

use super::{json_response, read_json, BoxedResponse};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
struct EnsureModelRequest {
    base_model: Option<String>,
    new_model: Option<String>,
    adapter_path: Option<String>,
}

/// Idempotently ensures a model tag exists, creating an alias (with an
/// optional adapter) when it is missing.
pub async fn ensure_model(
    state: &AppState,
    req: Request<Incoming>,
) -> Result<BoxedResponse, ApiError> {
    let body: EnsureModelRequest = read_json(req).await?;
    let base = body.base_model.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let new = body.new_model.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (Some(base), Some(new)) = (base, new) else {
        return Err(ApiError::bad_request("Missing parameters"));
    };

    let outcome = state.runtime.ensure_tag(new, base, body.adapter_path.as_deref()).await;
    if !outcome.ok {
        return Err(ApiError::internal(outcome.detail));
    }
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "ok": true, "detail": outcome.detail }),
    ))
}
