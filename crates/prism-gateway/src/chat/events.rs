//! Typed chat events and their NDJSON wire encoding.

use prism_livedata::{CurrentConditions, DailyForecast, HourlyForecast};
use serde::Serialize;

/// Weather payload carried by a terminal weather event.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherBundle {
    pub current: CurrentConditions,
    pub daily: Vec<DailyForecast>,
    pub hourly: Vec<HourlyForecast>,
}

/// One event in a chat turn's ordered stream.
///
/// `Status` lines are progress notices; `Answer` and `Weather` are
/// terminal. Status and answer lines share a wire shape (the UI renders
/// each line as it arrives); the distinction only drives the turn's
/// control flow.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Status { model: String, text: String },
    Answer { model: String, text: String },
    Weather { model: String, weather: WeatherBundle },
}

impl ChatEvent {
    pub fn status(model: &str, text: impl Into<String>) -> Self {
        Self::Status { model: model.to_string(), text: text.into() }
    }

    pub fn answer(model: &str, text: impl Into<String>) -> Self {
        Self::Answer { model: model.to_string(), text: text.into() }
    }

    /// Encodes the event as one newline-terminated JSON line.
    #[must_use]
    pub fn to_line(&self) -> String {
        let value = match self {
            Self::Status { model, text } | Self::Answer { model, text } => {
                serde_json::json!({ "model": model, "response": text })
            }
            Self::Weather { model, weather } => {
                serde_json::json!({ "model": model, "type": "weather", "weather": weather })
            }
        };
        let mut line = value.to_string();
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_events_share_the_wire_shape() {
        let status = ChatEvent::status("m1", "Thinking…").to_line();
        let answer = ChatEvent::answer("m1", "42").to_line();

        let status: serde_json::Value = serde_json::from_str(status.trim()).unwrap();
        let answer: serde_json::Value = serde_json::from_str(answer.trim()).unwrap();
        assert_eq!(status["model"], "m1");
        assert_eq!(status["response"], "Thinking…");
        assert_eq!(answer["response"], "42");
        assert!(status.get("type").is_none());
    }

    #[test]
    fn lines_are_newline_terminated() {
        assert!(ChatEvent::answer("m1", "hi").to_line().ends_with('\n'));
    }
}
