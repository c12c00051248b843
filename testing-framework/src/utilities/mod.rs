// File: testing-framework/src/utilities/mod.rs
//
// Testing Utilities
//
// Failure artifacts, their inspection, and the harness logger.

/// Failure artifact collection for failed scenarios
pub mod artifacts;

/// Artifact loading, validation and summaries
pub mod replay;

/// Logger writing to the per-scenario trace file
pub mod logging;

pub use artifacts::{ArtifactCollector, ScenarioArtifact, ScenarioMetadata};
pub use logging::{init_logging, TraceSink};
pub use replay::{load_artifact, print_artifact_summary, validate_artifact};
