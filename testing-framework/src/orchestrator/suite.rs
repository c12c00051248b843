// File: testing-framework/src/orchestrator/suite.rs
//
// Test Suite Driver
//
// Runs the selected scenarios strictly one after the other against the
// gateway, with the IRC server started once for the whole suite. Each
// scenario's failure is recorded and the suite moves on; only cancellation
// stops it early.

use super::clock::{Clock, SystemClock};
use super::runner::ScenarioRunner;
use crate::config::HarnessConfig;
use crate::matcher::{SxdEvaluator, XPathEvaluator};
use crate::peer::ComponentListener;
use crate::process::IrcServer;
use crate::scenarios::Scenario;
use crate::utilities::{ArtifactCollector, TraceSink};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Result of one scenario within a suite
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub duration: Duration,
    pub failure: Option<String>,
    /// Failure artifact, when one was written
    pub artifact: Option<PathBuf>,
    /// Stopped by the cancellation signal
    pub cancelled: bool,
}

/// Result of a whole suite
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub results: Vec<ScenarioResult>,
    /// Requested names that match no scenario
    pub unknown: Vec<String>,
    /// The suite was stopped before running every scenario
    pub cancelled: bool,
}

impl SuiteReport {
    /// Failed scenarios plus unknown names
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count() + self.unknown.len()
    }

    /// Process exit status of the CLI
    pub fn exit_code(&self) -> i32 {
        if self.failures() == 0 && !self.cancelled {
            0
        } else {
            1
        }
    }

    /// Closing line of the suite
    pub fn summary(&self) -> String {
        match self.failures() {
            0 if self.cancelled => "Interrupted before every test ran".to_string(),
            0 => "All tests passed successfully".to_string(),
            1 => "1 test failed, please fix it.".to_string(),
            n => format!("{} tests failed, please fix them.", n),
        }
    }
}

/// Split the requested names into known scenarios and unknown names
///
/// An empty request selects everything. Scenarios keep their catalog order.
pub fn select_scenarios(available: Vec<Scenario>, requested: &[String]) -> (Vec<Scenario>, Vec<String>) {
    if requested.is_empty() {
        return (available, Vec::new());
    }
    let unknown = requested
        .iter()
        .filter(|name| !available.iter().any(|s| &s.name == *name))
        .cloned()
        .collect();
    let selected = available
        .into_iter()
        .filter(|s| requested.contains(&s.name))
        .collect();
    (selected, unknown)
}

/// Sequential multi-scenario driver
pub struct TestSuite {
    config: HarnessConfig,
    scenarios: Vec<Scenario>,
    unknown: Vec<String>,
    start_irc_server: bool,
    trace_sink: Option<TraceSink>,
    evaluator: Arc<dyn XPathEvaluator>,
    clock: Arc<dyn Clock>,
}

impl TestSuite {
    pub fn new(config: HarnessConfig) -> Self {
        let start_irc_server = config.irc_server.enabled;
        Self {
            config,
            scenarios: Vec::new(),
            unknown: Vec::new(),
            start_irc_server,
            trace_sink: None,
            evaluator: Arc::new(SxdEvaluator),
            clock: Arc::new(SystemClock),
        }
    }

    /// Scenarios to run, in order
    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// Requested names without a scenario; each counts as a failure
    pub fn with_unknown(mut self, unknown: Vec<String>) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn with_irc_server(mut self, enabled: bool) -> Self {
        self.start_irc_server = enabled;
        self
    }

    /// Switch this sink to `harness_<scenario>_output.txt` for each scenario
    pub fn with_trace_sink(mut self, sink: TraceSink) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Run every scenario
    ///
    /// Fails only when the suite cannot start: the IRC server did not become
    /// ready or the component port cannot be bound.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> Result<SuiteReport> {
        let mut report = SuiteReport {
            unknown: self.unknown.clone(),
            ..SuiteReport::default()
        };
        for name in &self.unknown {
            println!("Unknown scenario: {}", name);
        }

        let irc_server = if self.start_irc_server {
            Some(self.start_irc().await?)
        } else {
            None
        };

        let addr = self.config.component.listen_addr()?;
        let listener = ComponentListener::bind(addr, self.config.component.jid.clone())
            .await
            .with_context(|| format!("Failed to listen on {}", addr))?;
        let runner = ScenarioRunner::new(&self.config, &listener, self.evaluator.clone(), self.clock.clone());

        println!("Running {} checks for biboumi.", self.scenarios.len());
        for scenario in &self.scenarios {
            if *cancel.borrow() {
                report.cancelled = true;
                break;
            }
            let result = self.run_one(&runner, scenario, &mut cancel).await;
            let stop = result.cancelled;
            report.results.push(result);
            if stop {
                report.cancelled = true;
                break;
            }
        }

        if let Some(sink) = &self.trace_sink {
            if let Err(e) = sink.close() {
                warn!("Failed to close the trace file: {}", e);
            }
        }

        if let Some(server) = irc_server {
            println!("Waiting for irc server to exit…");
            if let Err(e) = server.stop(self.config.timeouts.shutdown()).await {
                warn!("IRC server shutdown failed: {}", e);
            }
        }

        Ok(report)
    }

    async fn start_irc(&self) -> Result<IrcServer> {
        let output = self.config.output_path(&self.config.irc_server.output_file);
        println!("Starting irc server…");
        match IrcServer::start(&self.config.irc_server, output.clone()).await {
            Ok(server) => {
                println!("irc server started.");
                Ok(server)
            }
            Err(e) => {
                println!(
                    "IRC server failed to start, see {} for more details. Exiting…",
                    output.display()
                );
                Err(e).context("IRC server failed to start")
            }
        }
    }

    async fn run_one(
        &self,
        runner: &ScenarioRunner<'_>,
        scenario: &Scenario,
        cancel: &mut watch::Receiver<bool>,
    ) -> ScenarioResult {
        let valgrind = if self.config.gateway.valgrind { " (with valgrind)" } else { "" };
        println!("Running scenario: {}{}", scenario.name, valgrind);

        let trace_file = self.config.output_path(format!("harness_{}_output.txt", scenario.name));
        if let Some(sink) = &self.trace_sink {
            if let Err(e) = sink.redirect(&trace_file) {
                warn!("Failed to open {}: {}", trace_file.display(), e);
            }
        }

        let started = Instant::now();
        let outcome = runner.run(scenario, cancel).await;
        let duration = started.elapsed();
        info!("Scenario {} finished in {:?}", scenario.name, duration);

        let mut artifact = None;
        if outcome.passed() {
            println!("Success! ({:.2}s)", duration.as_secs_f64());
        } else {
            let reason = outcome.failure_reason().unwrap_or_default();
            println!("Failure: {}", reason);

            let mut collector = ArtifactCollector::new(&scenario.name);
            collector.set_config_variant(scenario.config);
            collector.set_expected_exit_code(scenario.expected_exit_code);
            collector.record_outcome(&outcome);
            match collector.save(&self.config.output_dir).await {
                Ok(path) => artifact = Some(path),
                Err(e) => warn!("Failed to save the failure artifact: {:#}", e),
            }

            println!(
                "You can check the files harness_{0}_output.txt and biboumi_{0}_output.txt to help you debug.",
                scenario.name
            );
        }

        ScenarioResult {
            name: scenario.name.clone(),
            passed: outcome.passed(),
            duration,
            failure: outcome.failure_reason(),
            artifact,
            cancelled: outcome.was_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::Step;

    fn scenario(name: &str) -> Scenario {
        Scenario::new(name, vec![Step::send("<x/>")])
    }

    fn result(name: &str, passed: bool) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            passed,
            duration: Duration::from_millis(10),
            failure: (!passed).then(|| "boom".to_string()),
            artifact: None,
            cancelled: false,
        }
    }

    #[test]
    fn test_select_keeps_catalog_order_and_reports_unknown() {
        let all = vec![scenario("a"), scenario("b"), scenario("c")];
        let requested = vec!["c".to_string(), "zzz".to_string(), "a".to_string()];
        let (selected, unknown) = select_scenarios(all, &requested);
        let names: Vec<_> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(unknown, vec!["zzz".to_string()]);
    }

    #[test]
    fn test_select_everything_by_default() {
        let (selected, unknown) = select_scenarios(vec![scenario("a"), scenario("b")], &[]);
        assert_eq!(selected.len(), 2);
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_report_summary_lines() {
        let mut report = SuiteReport {
            results: vec![result("a", true)],
            ..SuiteReport::default()
        };
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.summary(), "All tests passed successfully");

        report.results.push(result("b", false));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.summary(), "1 test failed, please fix it.");

        report.unknown.push("nope".to_string());
        assert_eq!(report.summary(), "2 tests failed, please fix them.");
    }

    #[test]
    fn test_cancelled_suite_is_not_a_success() {
        let report = SuiteReport {
            results: vec![result("a", true)],
            cancelled: true,
            ..SuiteReport::default()
        };
        assert_eq!(report.exit_code(), 1);
    }
}
