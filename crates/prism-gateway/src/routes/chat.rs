//! `POST /api/chat`, the streaming chat endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::{Request, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use super::{read_json, BoxedResponse};
use crate::chat::{run_chat_turn, ChatEvent, ChatTurn};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    models: Vec<String>,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    options: Option<ChatOptions>,
}

#[derive(Deserialize, Default)]
struct ChatOptions {
    #[serde(default, rename = "weatherUnits")]
    weather_units: Option<String>,
}

/// Validates the request, spawns the orchestrator task and returns its
/// event channel as a newline-delimited JSON stream. Events are
/// forwarded unbatched, in arrival order; the stream closes when the
/// orchestrator reaches a terminal state.
pub async fn post_chat(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<BoxedResponse, ApiError> {
    let body: ChatRequest = read_json(req).await?;
    if body.models.is_empty() || body.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Missing models or prompt"));
    }

    let weather_units = body
        .options
        .unwrap_or_default()
        .weather_units
        .map(|u| u.to_lowercase())
        .filter(|u| !u.is_empty());
    let turn = ChatTurn {
        model: body.models[0].clone(),
        prompt: body.prompt,
        weather_units,
    };

    let (tx, rx) = mpsc::channel::<ChatEvent>(32);
    tokio::spawn(run_chat_turn(state, turn, tx));

    let stream = ReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Frame::data(Bytes::from(event.to_line()))));
    let mut response = Response::new(StreamBody::new(stream).boxed());
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        "application/x-ndjson".parse().expect("valid header"),
    );
    Ok(response)
}
