//! Engine configuration: TOML file plus environment overrides.

pub mod engine;

pub use engine::{EngineConfig, LookupSection, ModelSection};
