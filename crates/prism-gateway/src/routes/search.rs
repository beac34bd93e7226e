//! `POST /api/search`

use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use prism_livedata::SearchError;
use serde::Deserialize;

use super::{json_response, read_json, BoxedResponse};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

pub async fn post_search(
    state: &AppState,
    req: Request<Incoming>,
) -> Result<BoxedResponse, ApiError> {
    let body: SearchRequest = read_json(req).await?;
    let query = body.query.trim().to_string();
    if query.chars().count() < 2 {
        return Err(ApiError::bad_request("query must be at least 2 characters"));
    }
    if !(1..=10).contains(&body.limit) {
        return Err(ApiError::bad_request("limit must be between 1 and 10"));
    }

    match state.search.search(&query, body.limit, None).await {
        Ok(results) => Ok(json_response(
            StatusCode::OK,
            &serde_json::json!({ "query": query, "results": results }),
        )),
        Err(e @ (SearchError::NotConfigured | SearchError::EmptyQuery)) => {
            Err(ApiError::bad_request(e.to_string()))
        }
        Err(e) => Err(ApiError::bad_gateway(format!("search failure: {e}"))),
    }
}
