//! The chat-turn state machine and its event protocol.

pub mod events;
pub mod heuristics;
pub mod orchestrator;

pub use events::{ChatEvent, WeatherBundle};
pub use orchestrator::{run_chat_turn, ChatTurn};
