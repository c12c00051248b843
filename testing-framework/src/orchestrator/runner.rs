// File: testing-framework/src/orchestrator/runner.rs
//
// Scenario Runner
//
// Runs one scenario against the real gateway: launch the gateway with the
// scenario's configuration, accept its component connection, then hand over
// to the session run loop. Setup failures become scenario failures; they
// never abort the suite.

use super::clock::Clock;
use super::session::{cancelled, run_session, SessionOutcome, SessionSettings};
use crate::config::{ComponentConfig, HarnessConfig};
use crate::error::HarnessError;
use crate::matcher::XPathEvaluator;
use crate::peer::{ComponentListener, MemoryPeer};
use crate::process::{GatewayProcess, SutProcess};
use crate::scenarios::Scenario;
use crate::template::Fixtures;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::watch;

/// Fixture table matching the component identity the gateway is configured with
pub fn fixtures_for(component: &ComponentConfig) -> Fixtures {
    Fixtures::default()
        .with("biboumi_host", component.jid.clone())
        .with("irc_server_one", format!("irc.localhost@{}", component.jid))
        .with("irc_server_two", format!("localhost@{}", component.jid))
}

/// Runs scenarios one at a time over a shared component listener
pub struct ScenarioRunner<'a> {
    config: &'a HarnessConfig,
    listener: &'a ComponentListener,
    evaluator: Arc<dyn XPathEvaluator>,
    clock: Arc<dyn Clock>,
    fixtures: Fixtures,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        listener: &'a ComponentListener,
        evaluator: Arc<dyn XPathEvaluator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            listener,
            evaluator,
            clock,
            fixtures: fixtures_for(&config.component),
        }
    }

    pub fn settings(&self, scenario: &Scenario) -> SessionSettings {
        SessionSettings {
            expect_timeout: self.config.timeouts.expect(),
            shutdown_timeout: self.config.timeouts.shutdown(),
            expected_exit_code: scenario.expected_exit_code,
        }
    }

    pub async fn run(&self, scenario: &Scenario, cancel: &mut watch::Receiver<bool>) -> SessionOutcome {
        let mut stepper = scenario.stepper(self.evaluator.clone(), self.fixtures.clone());
        let settings = self.settings(scenario);

        let mut gateway = match GatewayProcess::new(self.config, &scenario.name, scenario.config) {
            Ok(gateway) => gateway,
            Err(e) => return SessionOutcome::aborted(stepper, HarnessError::step(format!("{:#}", e))),
        };
        if let Err(e) = gateway.start().await {
            return SessionOutcome::aborted(stepper, e.into());
        }

        let accept_timeout = self.config.timeouts.accept();
        let connection = tokio::select! {
            biased;
            _ = cancelled(cancel) => Err(HarnessError::Cancelled),
            accepted = self.listener.accept(accept_timeout) => accepted.map_err(HarnessError::from),
        };

        let clock = &*self.clock;
        match connection {
            Ok(mut connection) => {
                debug!("Gateway connected for {}", scenario.name);
                run_session(stepper, &mut connection, &mut gateway, clock, cancel, &settings).await
            }
            Err(e) => {
                warn!("No component session for {}: {}", scenario.name, e);
                stepper.fail_with(e);
                // The gateway still has to be shut down and its exit code collected
                let (mut closed, script) = MemoryPeer::pair();
                script.end_session();
                run_session(stepper, &mut closed, &mut gateway, clock, cancel, &settings).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigVariant;
    use crate::matcher::SxdEvaluator;
    use crate::orchestrator::SystemClock;
    use crate::scenarios::Step;
    use std::path::PathBuf;

    #[test]
    fn test_fixtures_follow_component_jid() {
        let component = ComponentConfig {
            jid: "gw.example".to_string(),
            ..ComponentConfig::default()
        };
        let fixtures = fixtures_for(&component);
        assert_eq!(fixtures.get("biboumi_host"), Some("gw.example"));
        assert_eq!(fixtures.get("irc_server_one"), Some("irc.localhost@gw.example"));
        assert_eq!(fixtures.get("nick_one"), Some("Nick"));
    }

    fn config(dir: &tempfile::TempDir, binary: &str) -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.output_dir = dir.path().to_path_buf();
        config.gateway.binary = PathBuf::from(binary);
        config.gateway.config_path = dir.path().join("test.conf");
        config.gateway.db_path = dir.path().join("e2e_test.sqlite");
        config.timeouts.accept_secs = 1;
        config.timeouts.shutdown_secs = 5;
        config
    }

    #[tokio::test]
    async fn test_spawn_failure_fails_the_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, "/nonexistent/biboumi");
        let listener = ComponentListener::bind("127.0.0.1:0".parse().unwrap(), "biboumi.localhost")
            .await
            .unwrap();
        let runner = ScenarioRunner::new(&config, &listener, Arc::new(SxdEvaluator), Arc::new(SystemClock));
        let scenario = Scenario::new("spawn", vec![Step::send("<x/>")]);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = runner.run(&scenario, &mut cancel).await;
        assert!(!outcome.passed());
        assert!(matches!(outcome.error, Some(HarnessError::Process(_))));
        assert_eq!(outcome.remaining_steps, 1);
    }

    #[tokio::test]
    async fn test_gateway_that_never_connects() {
        let dir = tempfile::tempdir().unwrap();
        // `true` exits immediately with code 0 without connecting
        let config = config(&dir, "true");
        let listener = ComponentListener::bind("127.0.0.1:0".parse().unwrap(), "biboumi.localhost")
            .await
            .unwrap();
        let runner = ScenarioRunner::new(&config, &listener, Arc::new(SxdEvaluator), Arc::new(SystemClock));
        let scenario = Scenario::new("no_connection", vec![Step::expect(["/handshake"])])
            .with_config(ConfigVariant::Basic);
        let (_tx, mut cancel) = watch::channel(false);

        let outcome = runner.run(&scenario, &mut cancel).await;
        assert!(matches!(outcome.error, Some(HarnessError::Peer(_))));
        assert_eq!(outcome.exit_code, Some(0));
        assert!(dir.path().join("test.conf").exists());
    }
}
