//! `GET /api/models`

use hyper::StatusCode;
use tracing::warn;

use super::{json_response, BoxedResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Lists available model tags, falling back to the statically
/// configured list when the registry is unreachable or empty.
pub async fn get_models(state: &AppState) -> Result<BoxedResponse, ApiError> {
    let models = match state.runtime.list_models().await {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => state.config.default_models.clone(),
        Err(e) => {
            warn!(error = %e, "registry unreachable, serving configured model list");
            state.config.default_models.clone()
        }
    };
    Ok(json_response(StatusCode::OK, &serde_json::json!({ "models": models })))
}
