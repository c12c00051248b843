//! Scenarios, their steps and the stepper that runs them
//!
//! Scenarios are written in Rust with the helpers of [`sequences`] (the
//! built-in [`catalog`]) or loaded from YAML files:
//!
//! ## Example Scenario
//!
//! ```yaml
//! name: "execute_hello_adhoc_command"
//! steps:
//!   - action: "handshake"
//!   - action: "send"
//!     text: "<iq type='set' id='hello-command1' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='hello' action='execute' /></iq>"
//!   - action: "expect"
//!     xpaths:
//!       - "/iq[@type='result']/commands:command[@node='hello'][@sessionid][@status='executing']"
//!     after:
//!       - name: "sessionid"
//!         from: "attribute"
//!         xpath: "/iq[@type='result']/commands:command[@node='hello']"
//!         attribute: "sessionid"
//!   - action: "send"
//!     text: "<iq type='set' id='hello-command2' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='hello' sessionid='{sessionid}' action='next'><x xmlns='jabber:x:data' type='submit'><field var='name'><value>COUCOU</value></field></x></command></iq>"
//!   - action: "expect"
//!     xpaths:
//!       - "/iq[@type='result']/commands:command[@node='hello'][@status='completed']/commands:note[@type='info'][text()='Hello COUCOU!']"
//! ```

pub mod catalog;
pub mod executor;
pub mod parser;
pub mod sequences;
pub mod step;

pub use executor::{ExecutionReport, Progress, ScenarioStepper, StepperState};
pub use parser::{load_scenario_file, parse_scenario};
pub use step::{IntoSteps, Step};

use crate::config::ConfigVariant;
use crate::matcher::XPathEvaluator;
use crate::template::Fixtures;
use std::sync::Arc;

/// A named, ordered list of steps plus the gateway setup it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
    /// Gateway configuration written before the run
    pub config: ConfigVariant,
    /// Exit code the gateway must report once interrupted
    pub expected_exit_code: i32,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: impl IntoSteps) -> Self {
        Self {
            name: name.into(),
            steps: steps.into_steps(),
            config: ConfigVariant::default(),
            expected_exit_code: 0,
        }
    }

    pub fn with_config(mut self, config: ConfigVariant) -> Self {
        self.config = config;
        self
    }

    pub fn with_expected_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }

    /// Fresh stepper over a copy of the steps
    pub fn stepper(&self, evaluator: Arc<dyn XPathEvaluator>, fixtures: Fixtures) -> ScenarioStepper {
        ScenarioStepper::new(self.name.clone(), self.steps.clone(), evaluator).with_fixtures(fixtures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::SxdEvaluator;

    #[test]
    fn test_scenario_builder() {
        let scenario = Scenario::new("quit", sequences::handshake_sequence())
            .with_config(ConfigVariant::FixedServer)
            .with_expected_exit_code(16);
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.config, ConfigVariant::FixedServer);
        assert_eq!(scenario.expected_exit_code, 16);
    }

    #[test]
    fn test_each_stepper_starts_fresh() {
        let scenario = Scenario::new("s", crate::steps![Step::send("<a/>")]);
        let evaluator: Arc<dyn XPathEvaluator> = Arc::new(SxdEvaluator);
        let mut first = scenario.stepper(evaluator.clone(), Fixtures::default());
        assert_eq!(first.start(), Progress::Drained);
        let second = scenario.stepper(evaluator, Fixtures::default());
        assert_eq!(second.remaining_steps(), 1);
        assert_eq!(second.state(), StepperState::Idle);
    }
}
