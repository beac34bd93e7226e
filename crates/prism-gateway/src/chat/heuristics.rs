//! Live-data decision heuristics for the chat turn.
//!
//! Keyword tables, not NLP: the contract is a reproducible decision
//! procedure, not linguistic accuracy.

use once_cell::sync::Lazy;
use prism_livedata::{parse_latlon, strip_time_suffix};
use regex::Regex;

/// Reserved token the model emits when it cannot answer from training
/// data.
pub const SEARCH_TRIGGER: &str = "NEEDS_SEARCH";

const SYSTEM_INSTRUCTION: &str = concat!(
    "You are an assistant embedded in Prism. Answer concisely using your training data. ",
    "When you include code, return it as fenced Markdown code blocks with the correct ",
    "language identifier (e.g., ```python, ```sql). ",
    "If the question requires current/live information or anything you are unsure about, ",
    "respond with ONLY the token NEEDS_SEARCH.",
);

/// Builds the system-primed prompt for the draft generation.
#[must_use]
pub fn primed_prompt(user_prompt: &str) -> String {
    format!("{SYSTEM_INSTRUCTION}\n\nUser request:\n{user_prompt}")
}

// Obvious time-sensitive intents in the user's prompt.
const PROMPT_NEEDLES: &[&str] = &[
    "weather",
    "forecast",
    "temperature",
    "today",
    "now",
    "current",
    "latest",
    "breaking",
    "news",
    "stock",
    "price",
    "exchange rate",
    "btc",
    "bitcoin",
    "eth",
    "traffic",
    "score",
    "game score",
    "live",
];

// Model disclaimers implying it could not answer with live data.
const RESPONSE_FLAGS: &[&str] = &[
    "according to my training data",
    "i don't have real-time",
    "i do not have real-time",
    "i don't have browsing",
    "i cannot browse",
    "i can't browse",
    "cannot provide live updates",
    "can't provide live updates",
    "no real-time access",
    "i don't have access to current",
    "as an ai language model",
];

const WEATHER_NEEDLES: &[&str] =
    &["weather", "temperature", "forecast", "rain", "snow", "wind", "humidity", "uv index"];

/// Decides whether the turn should fall back to an external lookup,
/// from the original prompt and the draft the model produced.
#[must_use]
pub fn requires_live_data(prompt: &str, draft: &str) -> bool {
    let p = prompt.to_lowercase();
    if PROMPT_NEEDLES.iter().any(|needle| p.contains(needle)) {
        return true;
    }
    let d = draft.to_lowercase();
    RESPONSE_FLAGS.iter().any(|flag| d.contains(flag))
}

/// True when the prompt reads as a weather question.
#[must_use]
pub fn is_weather_query(prompt: &str) -> bool {
    let p = prompt.to_lowercase();
    WEATHER_NEEDLES.iter().any(|needle| p.contains(needle))
}

static PREPOSITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in|at|for)\s+([A-Za-z\s,]+)$").expect("valid preposition regex")
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("valid word regex"));

/// Extracts a location phrase from a weather prompt.
///
/// Fixed rule order: the phrase after a trailing `in`/`at`/`for`; else
/// the last three alphabetic words when the prompt has at least three;
/// else an explicit `lat,lon` pair. Trailing time words are stripped in
/// the first two rules.
#[must_use]
pub fn extract_location(prompt: &str) -> Option<String> {
    let p = prompt.trim();

    if let Some(caps) = PREPOSITION_RE.captures(p) {
        let location = strip_time_suffix(&caps[1]);
        if !location.is_empty() {
            return Some(location);
        }
    }

    let words: Vec<&str> = WORD_RE.find_iter(p).map(|m| m.as_str()).collect();
    if words.len() >= 3 {
        let tail = strip_time_suffix(&words[words.len() - 3..].join(" "));
        if !tail.is_empty() {
            return Some(tail);
        }
    }

    parse_latlon(p).map(|(lat, lon)| format!("{lat},{lon}"))
}
