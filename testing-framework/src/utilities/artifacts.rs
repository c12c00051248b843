// File: testing-framework/src/utilities/artifacts.rs
//
// Failure Artifact Collection
//
// A failed scenario leaves a JSON file next to the gateway and harness logs
// with everything needed to understand the failure without re-running it:
// the failure reason, the saved values, and the full protocol trace.

use crate::config::ConfigVariant;
use crate::orchestrator::{SessionOutcome, TraceEntry};
use crate::template::SavedValues;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Complete scenario failure artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioArtifact {
    pub metadata: ScenarioMetadata,
    /// Values saved during the run
    pub saved_values: SavedValues,
    /// Every stanza exchanged, in order
    pub trace: Vec<TraceEntry>,
    /// Steps that never executed
    pub remaining_steps: usize,
    /// Stepper execution log
    pub log: Vec<String>,
}

/// Scenario metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    pub scenario_name: String,
    pub config_variant: ConfigVariant,
    /// RFC 3339 time the scenario started
    pub timestamp: String,
    pub duration_ms: u64,
    pub failure_reason: Option<String>,
    pub expected_exit_code: i32,
    /// Gateway exit code, when it could be collected
    pub exit_code: Option<i32>,
}

/// Artifact collector for one scenario run
///
/// # Examples
///
/// ```rust,ignore
/// use gateway_testing_framework::utilities::artifacts::ArtifactCollector;
///
/// let mut collector = ArtifactCollector::new("simple_kick");
/// collector.record_outcome(&outcome);
/// if !outcome.passed() {
///     let path = collector.save("./").await?;
///     println!("Artifact saved to: {}", path.display());
/// }
/// ```
pub struct ArtifactCollector {
    metadata: ScenarioMetadata,
    saved_values: SavedValues,
    trace: Vec<TraceEntry>,
    remaining_steps: usize,
    log: Vec<String>,
}

impl ArtifactCollector {
    pub fn new(scenario_name: impl Into<String>) -> Self {
        Self {
            metadata: ScenarioMetadata {
                scenario_name: scenario_name.into(),
                config_variant: ConfigVariant::default(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                duration_ms: 0,
                failure_reason: None,
                expected_exit_code: 0,
                exit_code: None,
            },
            saved_values: SavedValues::new(),
            trace: Vec::new(),
            remaining_steps: 0,
            log: Vec::new(),
        }
    }

    pub fn set_config_variant(&mut self, variant: ConfigVariant) {
        self.metadata.config_variant = variant;
    }

    pub fn set_expected_exit_code(&mut self, code: i32) {
        self.metadata.expected_exit_code = code;
    }

    pub fn set_failure_reason(&mut self, reason: impl Into<String>) {
        self.metadata.failure_reason = Some(reason.into());
    }

    /// Copy everything a session observed
    pub fn record_outcome(&mut self, outcome: &SessionOutcome) {
        self.metadata.duration_ms = outcome.duration.as_millis() as u64;
        self.metadata.exit_code = outcome.exit_code;
        self.metadata.failure_reason = outcome.failure_reason();
        self.saved_values = outcome.saved_values.clone();
        self.trace = outcome.trace.clone();
        self.remaining_steps = outcome.remaining_steps;
        self.log = outcome.report.log.clone();
    }

    pub fn artifact(&self) -> ScenarioArtifact {
        ScenarioArtifact {
            metadata: self.metadata.clone(),
            saved_values: self.saved_values.clone(),
            trace: self.trace.clone(),
            remaining_steps: self.remaining_steps,
            log: self.log.clone(),
        }
    }

    /// Save the artifact as `<scenario>_<timestamp>.json` in `output_dir`
    pub async fn save(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)
            .await
            .context("Failed to create artifact directory")?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.json", self.metadata.scenario_name, timestamp);
        let filepath = output_dir.join(filename);

        let json = serde_json::to_string_pretty(&self.artifact())
            .context("Failed to serialize artifact")?;

        let mut file = fs::File::create(&filepath)
            .await
            .context("Failed to create artifact file")?;
        file.write_all(json.as_bytes())
            .await
            .context("Failed to write artifact data")?;
        file.flush()
            .await
            .context("Failed to flush artifact file")?;

        Ok(filepath)
    }

    /// Load an artifact from disk
    pub async fn load(filepath: impl AsRef<Path>) -> Result<ScenarioArtifact> {
        let filepath = filepath.as_ref();
        let content = fs::read_to_string(filepath)
            .await
            .with_context(|| format!("Failed to read artifact file {}", filepath.display()))?;

        let artifact: ScenarioArtifact =
            serde_json::from_str(&content).context("Failed to parse artifact JSON")?;

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Direction;

    fn entry(direction: Direction, stanza: &str) -> TraceEntry {
        TraceEntry {
            direction,
            stanza: stanza.to_string(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_collector_defaults() {
        let collector = ArtifactCollector::new("simple_kick");
        let artifact = collector.artifact();
        assert_eq!(artifact.metadata.scenario_name, "simple_kick");
        assert_eq!(artifact.metadata.config_variant, ConfigVariant::Basic);
        assert!(artifact.metadata.failure_reason.is_none());
        assert!(artifact.trace.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_artifact() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let mut collector = ArtifactCollector::new("execute_hello_adhoc_command");
        collector.set_config_variant(ConfigVariant::FixedServer);
        collector.set_failure_reason("Received stanza <iq/> did not match expected xpath /iq[@type='result']");
        collector.saved_values.insert("sessionid", "3f2a");
        collector.trace.push(entry(Direction::Outbound, "<iq type='set'/>"));
        collector.trace.push(entry(Direction::Inbound, "<iq/>"));
        collector.remaining_steps = 4;

        let filepath = collector.save(temp_dir.path()).await?;
        assert!(filepath.exists());
        let file_name = filepath.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(file_name.starts_with("execute_hello_adhoc_command_"));
        assert!(file_name.ends_with(".json"));

        let loaded = ArtifactCollector::load(&filepath).await?;
        assert_eq!(loaded.metadata.config_variant, ConfigVariant::FixedServer);
        assert_eq!(loaded.saved_values.get("sessionid"), Some("3f2a"));
        assert_eq!(loaded.trace.len(), 2);
        assert_eq!(loaded.trace[1].direction, Direction::Inbound);
        assert_eq!(loaded.remaining_steps, 4);
        Ok(())
    }

    #[test]
    fn test_saved_values_serialize_as_a_map() {
        let mut collector = ArtifactCollector::new("simple_mam");
        collector.saved_values.insert("first_timestamp", "2026-01-01T00:00:05.967Z");
        let json = serde_json::to_string(&collector.artifact()).unwrap();
        assert!(json.contains("\"saved_values\":{\"first_timestamp\":\"2026-01-01T00:00:05.967Z\"}"));
        assert!(json.contains("\"config_variant\":\"basic\""));
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(ArtifactCollector::load(&path).await.is_err());
    }
}
