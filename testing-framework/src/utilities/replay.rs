// File: testing-framework/src/utilities/replay.rs
//
// Artifact Inspection
//
// Loading, validating and printing the JSON artifacts of failed scenarios.

use super::artifacts::{ArtifactCollector, ScenarioArtifact};
use crate::orchestrator::Direction;
use anyhow::Result;
use std::path::Path;

/// Load artifact from disk
pub async fn load_artifact(filepath: impl AsRef<Path>) -> Result<ScenarioArtifact> {
    ArtifactCollector::load(filepath).await
}

/// Print artifact summary to stdout
pub fn print_artifact_summary(artifact: &ScenarioArtifact) {
    let metadata = &artifact.metadata;
    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║                SCENARIO FAILURE ARTIFACT SUMMARY               ║");
    println!("╠════════════════════════════════════════════════════════════════╣");
    println!("║ Scenario:      {:47} ║", metadata.scenario_name);
    println!("║ Config:        {:47} ║", metadata.config_variant.as_str());
    println!("║ Timestamp:     {:47} ║", metadata.timestamp);
    println!("║ Duration:      {:47} ║", format!("{} ms", metadata.duration_ms));
    println!(
        "║ Exit code:     {:47} ║",
        match metadata.exit_code {
            Some(code) => format!("{} (expected {})", code, metadata.expected_exit_code),
            None => format!("N/A (expected {})", metadata.expected_exit_code),
        }
    );

    if let Some(ref reason) = metadata.failure_reason {
        println!("╠════════════════════════════════════════════════════════════════╣");
        println!("║ FAILURE REASON:                                                ║");
        for line in reason.lines().flat_map(|l| textwrap::wrap(l, 62)) {
            println!("║ {:62} ║", line);
        }
    }

    println!("╠════════════════════════════════════════════════════════════════╣");
    let sent = count(artifact, Direction::Outbound);
    let received = count(artifact, Direction::Inbound);
    println!("║ Stanzas:       {:47} ║", format!("{} sent, {} received", sent, received));
    println!("║ Unexecuted:    {:47} ║", format!("{} step(s)", artifact.remaining_steps));

    if !artifact.saved_values.is_empty() {
        println!("╠════════════════════════════════════════════════════════════════╣");
        println!("║ SAVED VALUES:                                                  ║");
        for (name, value) in artifact.saved_values.iter() {
            println!("║   {:60} ║", truncate(&format!("{} = {}", name, value), 60));
        }
    }

    if !artifact.trace.is_empty() {
        println!("╠════════════════════════════════════════════════════════════════╣");
        println!("║ LAST STANZAS (last 5):                                         ║");
        for entry in artifact.trace.iter().rev().take(5).rev() {
            let arrow = match entry.direction {
                Direction::Outbound => "->",
                Direction::Inbound => "<-",
                Direction::Ignored => "<~",
            };
            println!("║ {} {:59} ║", arrow, truncate(&entry.stanza, 59));
        }
    }
    println!("╚════════════════════════════════════════════════════════════════╝");
}

fn count(artifact: &ScenarioArtifact, direction: Direction) -> usize {
    artifact
        .trace
        .iter()
        .filter(|e| e.direction == direction)
        .count()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let head: String = text.chars().take(width - 3).collect();
    format!("{}...", head)
}

/// Validate artifact integrity
pub fn validate_artifact(artifact: &ScenarioArtifact) -> Result<()> {
    if artifact.metadata.scenario_name.is_empty() {
        anyhow::bail!("Artifact has empty scenario name");
    }

    if chrono::DateTime::parse_from_rfc3339(&artifact.metadata.timestamp).is_err() {
        anyhow::bail!("Artifact has invalid timestamp '{}'", artifact.metadata.timestamp);
    }

    if artifact.metadata.failure_reason.is_none() {
        anyhow::bail!("Artifact of a failed scenario has no failure reason");
    }

    let mut last = 0;
    for entry in &artifact.trace {
        if entry.elapsed_ms < last {
            anyhow::bail!(
                "Trace is not in chronological order ({} ms after {} ms)",
                entry.elapsed_ms,
                last
            );
        }
        last = entry.elapsed_ms;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigVariant;
    use crate::orchestrator::TraceEntry;
    use crate::template::SavedValues;
    use crate::utilities::artifacts::ScenarioMetadata;

    fn artifact(reason: Option<&str>, trace: Vec<(Direction, u64)>) -> ScenarioArtifact {
        ScenarioArtifact {
            metadata: ScenarioMetadata {
                scenario_name: "simple_kick".to_string(),
                config_variant: ConfigVariant::Basic,
                timestamp: "2026-10-18T12:00:00+00:00".to_string(),
                duration_ms: 1500,
                failure_reason: reason.map(str::to_string),
                expected_exit_code: 0,
                exit_code: Some(0),
            },
            saved_values: SavedValues::new(),
            trace: trace
                .into_iter()
                .map(|(direction, elapsed_ms)| TraceEntry {
                    direction,
                    stanza: "<presence type='unavailable'/>".to_string(),
                    elapsed_ms,
                })
                .collect(),
            remaining_steps: 3,
            log: vec![],
        }
    }

    #[tokio::test]
    async fn test_load_artifact() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let mut collector = ArtifactCollector::new("test_load");
        collector.set_failure_reason("boom");

        let filepath = collector.save(temp_dir.path()).await?;
        let loaded = load_artifact(&filepath).await?;

        assert_eq!(loaded.metadata.scenario_name, "test_load");
        validate_artifact(&loaded)?;
        Ok(())
    }

    #[test]
    fn test_validate_artifact_success() {
        let a = artifact(Some("no match"), vec![(Direction::Outbound, 0), (Direction::Inbound, 12)]);
        assert!(validate_artifact(&a).is_ok());
    }

    #[test]
    fn test_validate_artifact_without_reason() {
        let a = artifact(None, vec![]);
        assert!(validate_artifact(&a).is_err());
    }

    #[test]
    fn test_validate_artifact_out_of_order_trace() {
        let a = artifact(Some("no match"), vec![(Direction::Inbound, 40), (Direction::Inbound, 10)]);
        let err = validate_artifact(&a).unwrap_err();
        assert!(err.to_string().contains("chronological"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("“quoted” stanza text", 10), "“quoted...");
    }

    #[test]
    fn test_print_artifact_summary() {
        let a = artifact(
            Some("Received stanza “<presence/>” did not match any of the expected xpaths:\n/presence[@type='unavailable']"),
            vec![(Direction::Outbound, 0), (Direction::Inbound, 5), (Direction::Ignored, 9)],
        );
        // This should not panic
        print_artifact_summary(&a);
    }
}
