//! Runtime client and model-residency policy for Prism.
//!
//! This crate talks to a local Ollama-compatible runtime over its REST
//! API and layers an LRU admission policy on top of it: at most N models
//! are kept resident, and the least-recently-used one is unloaded before
//! a newly requested model is used.

pub mod client;
pub mod error;
pub mod residency;

pub use client::{
    GenerateChunk, GenerateOptions, GenerateStream, Generation, RuntimeClient, TagOutcome,
    DEFAULT_RUNTIME_HOST,
};
pub use error::RuntimeError;
pub use residency::{Admission, ModelRegistry, ResidencyController};
