//! YAML scenario files
//!
//! A file holds one scenario or a list of scenarios. Steps are tagged by
//! `action`; besides the primitive steps, the helper sequences are available
//! as `handshake`, `connection_sequence` and `channel_join` actions.
//!
//! ```yaml
//! name: "kick_observers"
//! config: "basic"
//! steps:
//!   - action: "handshake"
//!   - action: "channel_join"
//!     channel: "foo"
//!   - action: "expect_unordered"
//!     alternatives:
//!       - ["/iq[@id='kick1'][@type='result']"]
//!       - ["/presence[@type='unavailable']", "/presence/muc_user:x/muc_user:status[@code='307']"]
//!   - action: "pause"
//!     seconds: 1.5
//! ```

use super::sequences::{
    channel_join_sequence, connection_sequence, connection_tls_sequence, handshake_sequence,
    ConnectionOptions,
};
use super::step::Step;
use super::Scenario;
use crate::config::ConfigVariant;
use crate::expectation::{Extractor, SaveValue};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Scenario as written in YAML
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScenarioDocument {
    /// Scenario name
    pub name: String,

    /// Gateway configuration flavour
    #[serde(default)]
    pub config: ConfigVariant,

    /// Exit code expected from the gateway once interrupted
    #[serde(default)]
    pub expected_exit_code: i32,

    /// Execution steps
    pub steps: Vec<StepDocument>,
}

/// Step as written in YAML
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepDocument {
    /// Component handshake
    Handshake,

    /// Send one stanza
    Send { text: String },

    /// Expect one stanza
    Expect {
        xpaths: Vec<String>,
        #[serde(default)]
        optional: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        after: Vec<SaveValue>,
    },

    /// Expect each alternative once, in any order
    ExpectUnordered { alternatives: Vec<Vec<String>> },

    /// Suspend the scenario
    Pause { seconds: f64 },

    /// Save a value for later templates
    SaveValue {
        name: String,
        #[serde(flatten)]
        extractor: Extractor,
    },

    /// Server notices relayed while connecting `jid`
    ConnectionSequence {
        jid: String,
        #[serde(default = "default_irc_host")]
        irc_host: String,
        #[serde(default)]
        tls: bool,
        #[serde(default)]
        fixed_irc_server: bool,
        #[serde(default)]
        expected_irc_presence: bool,
    },

    /// First user joins a channel on the default server
    ChannelJoin { channel: String },
}

fn default_irc_host() -> String {
    "irc.localhost".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Many(Vec<ScenarioDocument>),
    One(ScenarioDocument),
}

impl StepDocument {
    fn into_steps(self) -> Result<Vec<Step>> {
        Ok(match self {
            StepDocument::Handshake => handshake_sequence(),
            StepDocument::Send { text } => vec![Step::send(text)],
            StepDocument::Expect {
                xpaths,
                optional,
                after,
            } => {
                anyhow::ensure!(!xpaths.is_empty(), "expect needs at least one xpath");
                vec![Step::Expect {
                    predicates: xpaths,
                    optional,
                    after,
                }]
            }
            StepDocument::ExpectUnordered { alternatives } => {
                anyhow::ensure!(
                    alternatives.iter().all(|set| !set.is_empty()),
                    "expect_unordered alternatives must not be empty"
                );
                vec![Step::ExpectUnordered { alternatives }]
            }
            StepDocument::Pause { seconds } => {
                let duration = Duration::try_from_secs_f64(seconds)
                    .map_err(|e| anyhow::anyhow!("invalid pause of {} seconds: {}", seconds, e))?;
                vec![Step::pause(duration)]
            }
            StepDocument::SaveValue { name, extractor } => vec![Step::save(name, extractor)],
            StepDocument::ConnectionSequence {
                jid,
                irc_host,
                tls,
                fixed_irc_server,
                expected_irc_presence,
            } => {
                let options = ConnectionOptions {
                    expected_irc_presence,
                    fixed_irc_server,
                };
                if tls {
                    connection_tls_sequence(&irc_host, &jid, options)
                } else {
                    connection_sequence(&irc_host, &jid, options)
                }
            }
            StepDocument::ChannelJoin { channel } => channel_join_sequence(&channel),
        })
    }
}

impl ScenarioDocument {
    /// Expand helper actions and build the runnable scenario
    pub fn into_scenario(self) -> Result<Scenario> {
        anyhow::ensure!(!self.name.is_empty(), "Scenario name cannot be empty");
        anyhow::ensure!(
            !self.steps.is_empty(),
            "Scenario {} must have at least one step",
            self.name
        );

        let mut steps = Vec::new();
        for (index, step) in self.steps.into_iter().enumerate() {
            let expanded = step
                .into_steps()
                .with_context(|| format!("step {} of scenario {}", index + 1, self.name))?;
            steps.extend(expanded);
        }

        Ok(Scenario::new(self.name, steps)
            .with_config(self.config)
            .with_expected_exit_code(self.expected_exit_code))
    }
}

/// Parse one YAML scenario
pub fn parse_scenario(yaml: &str) -> Result<Scenario> {
    let document: ScenarioDocument = serde_yaml::from_str(yaml)
        .map_err(|e| anyhow::anyhow!("Failed to parse YAML scenario: {}", e))?;
    document.into_scenario()
}

/// Parse a YAML document holding one scenario or a list of them
pub fn parse_scenarios(yaml: &str) -> Result<Vec<Scenario>> {
    let file: ScenarioFile = serde_yaml::from_str(yaml)
        .map_err(|e| anyhow::anyhow!("Failed to parse YAML scenario file: {}", e))?;
    let documents = match file {
        ScenarioFile::Many(documents) => documents,
        ScenarioFile::One(document) => vec![document],
    };

    let mut names = std::collections::HashSet::new();
    let mut scenarios = Vec::with_capacity(documents.len());
    for document in documents {
        anyhow::ensure!(
            names.insert(document.name.clone()),
            "Duplicate scenario name: {}",
            document.name
        );
        scenarios.push(document.into_scenario()?);
    }
    Ok(scenarios)
}

/// Load every scenario of a YAML file
pub fn load_scenario_file(path: impl AsRef<Path>) -> Result<Vec<Scenario>> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    parse_scenarios(&yaml).with_context(|| format!("In scenario file {}", path.display()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_simple_scenario() {
        let yaml = r#"
name: "ping"
steps:
  - action: "handshake"
  - action: "send"
    text: "<iq type='set' id='ping-command1' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='ping' action='execute' /></iq>"
  - action: "expect"
    xpaths:
      - "/iq[@type='result']/commands:command[@node='ping'][@status='completed']"
"#;

        let scenario = parse_scenario(yaml).expect("Failed to parse");
        assert_eq!(scenario.name, "ping");
        assert_eq!(scenario.config, ConfigVariant::Basic);
        assert_eq!(scenario.expected_exit_code, 0);
        // handshake expands to two steps
        assert_eq!(scenario.steps.len(), 4);
    }

    #[test]
    fn test_parse_save_value_and_after() {
        let yaml = r#"
name: "hello"
config: "fixed_server"
expected_exit_code: 16
steps:
  - action: "expect"
    xpaths: ["/iq"]
    after:
      - name: "sessionid"
        from: "attribute"
        xpath: "/iq/commands:command"
        attribute: "sessionid"
  - action: "save_value"
    name: "later"
    from: "timestamp_plus"
    seconds: 1
"#;

        let scenario = parse_scenario(yaml).expect("Failed to parse");
        assert_eq!(scenario.config, ConfigVariant::FixedServer);
        assert_eq!(scenario.expected_exit_code, 16);
        match &scenario.steps[0] {
            Step::Expect { after, .. } => {
                assert_eq!(after.len(), 1);
                assert_eq!(after[0].name, "sessionid");
            }
            other => panic!("Expected an expectation, got {}", other),
        }
        assert_eq!(
            scenario.steps[1],
            Step::save_timestamp("later", 1)
        );
    }

    #[test]
    fn test_parse_helpers() {
        let yaml = r#"
name: "join"
steps:
  - action: "connection_sequence"
    jid: "{jid_two}/{resource_one}"
    fixed_irc_server: true
  - action: "channel_join"
    channel: "bar"
  - action: "pause"
    seconds: 0.5
"#;

        let scenario = parse_scenario(yaml).expect("Failed to parse");
        let pause = scenario.steps.last().unwrap();
        assert_eq!(pause, &Step::pause(Duration::from_millis(500)));
        assert!(scenario.steps.len() > 40);
    }

    #[test]
    fn test_parse_list_of_scenarios() {
        let yaml = r#"
- name: "a"
  steps: [{action: "handshake"}]
- name: "b"
  steps: [{action: "handshake"}]
"#;
        let scenarios = parse_scenarios(yaml).expect("Failed to parse");
        assert_eq!(scenarios.len(), 2);
    }

    #[test]
    fn test_validation_duplicate_names() {
        let yaml = r#"
- name: "a"
  steps: [{action: "handshake"}]
- name: "a"
  steps: [{action: "handshake"}]
"#;
        let result = parse_scenarios(yaml);
        assert!(result.unwrap_err().to_string().contains("Duplicate scenario name"));
    }

    #[test]
    fn test_validation_empty_expect() {
        let yaml = r#"
name: "broken"
steps:
  - action: "expect"
    xpaths: []
"#;
        let result = parse_scenario(yaml);
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("at least one xpath"));
    }

    #[test]
    fn test_validation_negative_pause() {
        let yaml = r#"
name: "broken"
steps:
  - action: "pause"
    seconds: -1
"#;
        assert!(parse_scenario(yaml).is_err());
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let yaml = r#"
name: "broken"
steps:
  - action: "mine_block"
"#;
        assert!(parse_scenario(yaml).is_err());
    }
}
