//! Replay orchestration for recorded dialogues.
//!
//! This crate composes a log parser and a similarity matcher into the
//! `ReplayEngine`, which loads history once and answers live questions from
//! it when a historical question is similar enough.

pub mod engine;
pub mod error;
pub mod factory;
pub mod result;

/// Replay engine and session counters.
pub use engine::{ReplayEngine, ReplayStats};
/// Engine error type.
pub use error::EngineError;
/// Config-driven construction helpers.
pub use factory::{resolve_matcher_kind, threshold_for};
/// Match outcome.
pub use result::MatchResult;
