//! Async shell around the oceanic-core conflict probe: a single engine
//! task driven over channels, plus environment-backed configuration.

pub mod config;
pub mod engine;

pub use engine::{Engine, EngineCommand, EngineError, EngineHandle};
