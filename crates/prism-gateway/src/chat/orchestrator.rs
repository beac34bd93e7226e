//! The live-data chat-turn state machine.
//!
//! One task per turn produces an ordered event stream into a channel
//! the transport drains. Every failure path ends in a terminal answer
//! line; the stream itself always closes cleanly. A dropped receiver
//! (client disconnect) just ends the turn early.

use std::sync::Arc;

use prism_runtime::RuntimeError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::events::{ChatEvent, WeatherBundle};
use super::heuristics::{
    extract_location, is_weather_query, primed_prompt, requires_live_data, SEARCH_TRIGGER,
};
use crate::state::AppState;

/// Inputs for one chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub model: String,
    pub prompt: String,
    pub weather_units: Option<String>,
}

enum TurnAbort {
    /// The caller went away; nothing more can be emitted.
    Disconnected,
    /// Something failed; emit this as the terminal answer.
    Fault(String),
}

async fn emit(tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> Result<(), TurnAbort> {
    tx.send(event).await.map_err(|_| TurnAbort::Disconnected)
}

/// Runs a chat turn to completion, emitting events into `tx`.
pub async fn run_chat_turn(state: Arc<AppState>, turn: ChatTurn, tx: mpsc::Sender<ChatEvent>) {
    let model = turn.model.clone();
    match drive(&state, &turn, &tx).await {
        Ok(()) => {}
        Err(TurnAbort::Disconnected) => {
            debug!(model = %model, "chat client disconnected mid-turn");
        }
        Err(TurnAbort::Fault(message)) => {
            warn!(model = %model, error = %message, "chat turn failed");
            let _ = tx.send(ChatEvent::answer(&model, message)).await;
        }
    }
}

async fn drive(
    state: &AppState,
    turn: &ChatTurn,
    tx: &mpsc::Sender<ChatEvent>,
) -> Result<(), TurnAbort> {
    let model = turn.model.as_str();

    emit(tx, ChatEvent::status(model, "Thinking…")).await?;

    let draft = call_model(state, model, &primed_prompt(&turn.prompt))
        .await
        .map_err(|e| TurnAbort::Fault(format!("Error: {e}")))?;

    // Direct path: the draft stands unless the model asked for a search
    // or the heuristics detect a live query.
    if draft.trim() != SEARCH_TRIGGER && !requires_live_data(&turn.prompt, &draft) {
        emit(tx, ChatEvent::answer(model, draft)).await?;
        return Ok(());
    }

    if is_weather_query(&turn.prompt) {
        weather_path(state, turn, tx).await
    } else {
        search_path(state, turn, tx).await
    }
}

/// Generates against the runtime under the residency policy. The
/// admission outcome is advisory and explicitly discarded.
async fn call_model(state: &AppState, model: &str, prompt: &str) -> Result<String, RuntimeError> {
    let admission = state.residency.admit(model).await;
    debug!(model = %model, admission = ?admission, "residency admission");

    let generation = state.runtime.generate(model, prompt, None).await?;
    state.residency.touch(model);
    Ok(generation.text)
}

async fn weather_path(
    state: &AppState,
    turn: &ChatTurn,
    tx: &mpsc::Sender<ChatEvent>,
) -> Result<(), TurnAbort> {
    let model = turn.model.as_str();
    let units = turn.weather_units.as_deref();

    let Some(location) = extract_location(&turn.prompt) else {
        emit(
            tx,
            ChatEvent::answer(
                model,
                "Please specify a location (e.g., 'weather today in Boston, MA').",
            ),
        )
        .await?;
        return Ok(());
    };

    emit(tx, ChatEvent::status(model, format!("Fetching live weather for {location}…"))).await?;

    let current = match state.weather.realtime(&location, units).await {
        Ok(current) => current,
        Err(e) => {
            emit(tx, ChatEvent::answer(model, format!("Weather service unavailable: {e}"))).await?;
            return Ok(());
        }
    };

    // Tell the user which place geocoding actually resolved.
    let note = current
        .resolved_label
        .clone()
        .or_else(|| current.resolved_location.clone().filter(|r| *r != location));
    if let Some(note) = note {
        emit(tx, ChatEvent::status(model, format!("Using location: {note}"))).await?;
    }

    // Forecasts reuse the resolved location; their failures are
    // non-fatal and degrade to a partial-data notice.
    let forecast_location = current.resolved_location.clone().unwrap_or_else(|| location.clone());
    let (daily, daily_err) = match state.weather.forecast_daily(&forecast_location, units, 7).await
    {
        Ok(daily) => (daily, None),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };
    let (hourly, hourly_err) =
        match state.weather.forecast_hourly(&forecast_location, units, 12).await {
            Ok(hourly) => (hourly, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

    if daily_err.is_some() || hourly_err.is_some() {
        let parts: Vec<String> = [
            daily_err.map(|e| format!("daily: {e}")),
            hourly_err.map(|e| format!("hourly: {e}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        emit(
            tx,
            ChatEvent::status(model, format!("Some forecast data unavailable: {}", parts.join(", "))),
        )
        .await?;
    }

    emit(
        tx,
        ChatEvent::Weather {
            model: model.to_string(),
            weather: WeatherBundle { current, daily, hourly },
        },
    )
    .await?;
    Ok(())
}

async fn search_path(
    state: &AppState,
    turn: &ChatTurn,
    tx: &mpsc::Sender<ChatEvent>,
) -> Result<(), TurnAbort> {
    let model = turn.model.as_str();

    emit(tx, ChatEvent::status(model, "Fetching live search results…")).await?;

    let results = match state.search.search(&turn.prompt, 5, Some("now:1h")).await {
        Ok(results) => results,
        Err(e) => {
            emit(tx, ChatEvent::answer(model, format!("Search unavailable: {e}"))).await?;
            return Ok(());
        }
    };

    if results.is_empty() {
        emit(tx, ChatEvent::answer(model, "No live data was found for this request.")).await?;
        return Ok(());
    }

    let snippets: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            format!("{}. {}\n{}\n{}", idx + 1, result.title, result.snippet, result.url)
        })
        .collect();

    let follow_up = format!(
        "You indicated you needed real-time information. Using ONLY the verified snippets below, \
         answer the user's question. If the snippets do not contain the required information, \
         say so. Cite relevant facts but do not hallucinate.\n\n\
         User question: {}\n\nSearch snippets:\n{}\n\nAnswer:",
        turn.prompt,
        snippets.join("\n")
    );

    emit(tx, ChatEvent::status(model, "Synthesizing answer from live snippets…")).await?;

    let final_text = call_model(state, model, &follow_up)
        .await
        .map_err(|e| TurnAbort::Fault(format!("Error: {e}")))?;
    emit(tx, ChatEvent::answer(model, final_text)).await?;
    Ok(())
}
