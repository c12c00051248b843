//! Scenario stepper
//!
//! Drives one scenario's step queue. The stepper is a synchronous state
//! machine: it never waits on I/O itself. The orchestrator feeds it inbound
//! stanzas and timer expirations, and flushes the stanzas it queued for
//! sending after every call.
//!
//! # Example
//!
//! ```rust
//! use gateway_testing_framework::matcher::SxdEvaluator;
//! use gateway_testing_framework::scenarios::{Progress, ScenarioStepper, Step};
//! use gateway_testing_framework::stanza::Stanza;
//! use std::sync::Arc;
//!
//! let steps = vec![Step::expect(["//handshake"]), Step::send("<handshake/>")];
//! let mut stepper = ScenarioStepper::new("basic_handshake", steps, Arc::new(SxdEvaluator));
//!
//! assert_eq!(stepper.start(), Progress::Awaiting);
//! let progress = stepper.deliver(Stanza::new("<handshake>8a3f</handshake>"));
//! assert_eq!(progress, Progress::Drained);
//! assert_eq!(stepper.take_outbox(), vec!["<handshake/>".to_string()]);
//! ```

use super::step::Step;
use crate::error::HarnessError;
use crate::expectation::{Checker, Expectation, MatchResult, UnorderedGroup};
use crate::matcher::{PredicateSet, XPathEvaluator};
use crate::stanza::Stanza;
use crate::template::{render, Fixtures, SavedValues};
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a stepper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperState {
    /// No step popped yet
    Idle,
    /// A step is executing
    Running,
    /// An expectation is installed and no stanza is available for it
    AwaitingStanza,
    /// A pause step is in progress
    Paused,
    /// Every step completed
    Drained,
    /// A step or an expectation failed; nothing else will execute
    Failed,
}

impl StepperState {
    /// Whether the run is over
    pub fn is_terminal(self) -> bool {
        matches!(self, StepperState::Drained | StepperState::Failed)
    }
}

/// What the orchestrator must do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Wait for the next inbound stanza and `deliver` it
    Awaiting,
    /// Wait for the duration, then call `resume`
    Paused(Duration),
    /// Scenario completed
    Drained,
    /// Scenario failed; see `error()`
    Failed,
}

enum StepOutcome {
    Continue,
    Pause(Duration),
}

/// Single-scenario state machine
pub struct ScenarioStepper {
    name: String,
    steps: VecDeque<Step>,
    state: StepperState,

    /// At most one expectation is active at any time
    expectation: Option<Expectation>,

    /// Inbound stanzas not yet offered to an expectation
    inbox: VecDeque<Stanza>,

    /// Rendered stanzas waiting to be written to the peer
    outbox: Vec<String>,

    /// Duration of the pause in progress
    paused_for: Duration,

    /// Most recently consumed stanza, read by `SaveValue` steps
    last_consumed: Option<Stanza>,

    saved: SavedValues,
    fixtures: Fixtures,
    evaluator: Arc<dyn XPathEvaluator>,
    error: Option<HarnessError>,

    /// Execution log
    log: Vec<String>,

    steps_executed: usize,
    stanzas_consumed: usize,

    /// Steps dropped by the failure
    discarded_steps: usize,
}

impl ScenarioStepper {
    /// Create a stepper with the default fixture table
    pub fn new(
        name: impl Into<String>,
        steps: impl IntoIterator<Item = Step>,
        evaluator: Arc<dyn XPathEvaluator>,
    ) -> Self {
        Self {
            name: name.into(),
            steps: steps.into_iter().collect(),
            state: StepperState::Idle,
            expectation: None,
            inbox: VecDeque::new(),
            outbox: Vec::new(),
            paused_for: Duration::ZERO,
            last_consumed: None,
            saved: SavedValues::new(),
            fixtures: Fixtures::default(),
            evaluator,
            error: None,
            log: Vec::new(),
            steps_executed: 0,
            stanzas_consumed: 0,
            discarded_steps: 0,
        }
    }

    /// Replace the fixture table
    pub fn with_fixtures(mut self, fixtures: Fixtures) -> Self {
        self.fixtures = fixtures;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    /// The active expectation, if any
    pub fn expectation(&self) -> Option<&Expectation> {
        self.expectation.as_ref()
    }

    /// Steps not executed yet
    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    /// Steps that never ran because the scenario failed
    pub fn discarded_steps(&self) -> usize {
        self.discarded_steps
    }

    pub fn saved_values(&self) -> &SavedValues {
        &self.saved
    }

    /// Terminal error, once `Failed`
    pub fn error(&self) -> Option<&HarnessError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<HarnessError> {
        self.error.take()
    }

    /// Stanzas rendered since the last call, in send order
    pub fn take_outbox(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    /// Current progress as seen by the orchestrator
    pub fn progress(&self) -> Progress {
        match self.state {
            StepperState::Drained => Progress::Drained,
            StepperState::Failed => Progress::Failed,
            StepperState::Paused => Progress::Paused(self.paused_for),
            StepperState::Idle | StepperState::Running | StepperState::AwaitingStanza => {
                Progress::Awaiting
            }
        }
    }

    /// Description of what the stepper is waiting for
    pub fn pending_description(&self) -> String {
        match &self.expectation {
            Some(expectation) => expectation.to_string(),
            None => "nothing".to_string(),
        }
    }

    /// Pop and run steps until the scenario suspends or terminates
    pub fn start(&mut self) -> Progress {
        if self.state != StepperState::Idle {
            return self.progress();
        }
        self.record(format!("Starting scenario: {}", self.name));
        self.run()
    }

    /// Hand an inbound stanza to the scenario
    ///
    /// Stanzas are offered in arrival order. A stanza arriving while no
    /// expectation is installed (during a pause) waits for the next one.
    /// Stanzas arriving after the run terminated are dropped.
    pub fn deliver(&mut self, stanza: Stanza) -> Progress {
        match self.state {
            StepperState::Drained | StepperState::Failed => {
                debug!("Ignoring stanza received after the end of {}: {}", self.name, stanza);
                return self.progress();
            }
            StepperState::Paused | StepperState::Idle | StepperState::Running => {
                self.inbox.push_back(stanza);
                return self.progress();
            }
            StepperState::AwaitingStanza => self.inbox.push_back(stanza),
        }
        self.run()
    }

    /// Continue after a pause elapsed
    pub fn resume(&mut self) -> Progress {
        if self.state != StepperState::Paused {
            return self.progress();
        }
        self.state = StepperState::Running;
        self.run()
    }

    /// Abort the run from outside
    pub fn cancel(&mut self) -> Progress {
        self.fail(HarnessError::Cancelled);
        self.progress()
    }

    /// Abort the run with an error detected outside the stepper
    pub fn fail_with(&mut self, error: HarnessError) -> Progress {
        self.fail(error);
        self.progress()
    }

    fn run(&mut self) -> Progress {
        loop {
            if self.state.is_terminal() {
                return self.progress();
            }

            if self.expectation.is_some() {
                match self.inbox.pop_front() {
                    Some(stanza) => {
                        self.offer(stanza);
                        continue;
                    }
                    None => {
                        self.state = StepperState::AwaitingStanza;
                        return Progress::Awaiting;
                    }
                }
            }

            let Some(step) = self.steps.pop_front() else {
                self.state = StepperState::Drained;
                if !self.inbox.is_empty() {
                    debug!("{} stanza(s) left unchecked after the last step", self.inbox.len());
                }
                self.record("=== Scenario completed successfully ===".to_string());
                return Progress::Drained;
            };

            self.state = StepperState::Running;
            self.steps_executed += 1;
            self.record(format!("--- Step {}: {} ---", self.steps_executed, step.kind()));

            match self.execute_step(step) {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Pause(duration)) => {
                    self.state = StepperState::Paused;
                    self.paused_for = duration;
                    return Progress::Paused(duration);
                }
                Err(e) => {
                    self.fail(e);
                    return Progress::Failed;
                }
            }
        }
    }

    /// Execute a single step
    fn execute_step(&mut self, step: Step) -> Result<StepOutcome, HarnessError> {
        match step {
            Step::Send { text } => {
                let rendered = render(&text, &self.fixtures, &self.saved)?;
                self.record(format!("  send {}", rendered));
                self.outbox.push(rendered);
                Ok(StepOutcome::Continue)
            }
            Step::Expect {
                predicates,
                optional,
                after,
            } => {
                let set = self.render_set(&predicates)?;
                let checker = Checker::new(set).with_optional(optional).with_after(after);
                checker.validate(&*self.evaluator)?;
                self.install(Expectation::Single(checker));
                Ok(StepOutcome::Continue)
            }
            Step::ExpectUnordered { alternatives } => {
                if alternatives.is_empty() {
                    return Ok(StepOutcome::Continue);
                }
                let sets = alternatives
                    .iter()
                    .map(|set| self.render_set(set))
                    .collect::<Result<Vec<_>, _>>()?;
                let group = UnorderedGroup::new(sets);
                group.validate(&*self.evaluator)?;
                self.install(Expectation::Group(group));
                Ok(StepOutcome::Continue)
            }
            Step::Pause { duration } => {
                self.record(format!("  pause {:?}", duration));
                Ok(StepOutcome::Pause(duration))
            }
            Step::SaveValue(save) => {
                save.apply(self.last_consumed.as_ref(), &*self.evaluator, &mut self.saved)?;
                self.record(format!("  saved {}", save.name));
                Ok(StepOutcome::Continue)
            }
        }
    }

    fn render_set(&self, predicates: &[String]) -> Result<PredicateSet, HarnessError> {
        let rendered = predicates
            .iter()
            .map(|p| render(p, &self.fixtures, &self.saved))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PredicateSet::new(rendered))
    }

    fn install(&mut self, expectation: Expectation) {
        self.record(format!("  expect {}", expectation));
        self.expectation = Some(expectation);
    }

    fn offer(&mut self, stanza: Stanza) {
        let Some(mut expectation) = self.expectation.take() else {
            self.inbox.push_front(stanza);
            return;
        };

        match expectation.offer(&stanza, &*self.evaluator, &mut self.saved) {
            Ok(MatchResult::Advance) => {
                self.consumed(stanza);
            }
            Ok(MatchResult::Reinstall) => {
                self.consumed(stanza);
                self.expectation = Some(expectation);
            }
            Ok(MatchResult::Skip) => {
                self.record("  optional expectation skipped".to_string());
                self.inbox.push_front(stanza);
            }
            Ok(MatchResult::Fail(failure)) => self.fail(failure.into()),
            Err(e) => self.fail(e),
        }
    }

    fn consumed(&mut self, stanza: Stanza) {
        self.stanzas_consumed += 1;
        self.record(format!("  matched {}", stanza));
        self.last_consumed = Some(stanza);
    }

    fn fail(&mut self, error: HarnessError) {
        if self.state.is_terminal() {
            return;
        }
        warn!("Scenario {} failed: {}", self.name, error);
        self.record(format!("Failure: {}", error));
        self.discarded_steps = self.steps.len();
        self.steps.clear();
        self.inbox.clear();
        self.outbox.clear();
        self.expectation = None;
        self.state = StepperState::Failed;
        self.error = Some(error);
    }

    fn record(&mut self, entry: String) {
        debug!("[{}] {}", self.name, entry);
        self.log.push(entry);
    }

    /// Summary of the run so far
    pub fn report(&self) -> ExecutionReport {
        ExecutionReport {
            scenario_name: self.name.clone(),
            steps_executed: self.steps_executed,
            stanzas_consumed: self.stanzas_consumed,
            remaining_steps: self.steps.len(),
            success: self.state == StepperState::Drained,
            failure: self.error.as_ref().map(|e| e.to_string()),
            log: self.log.clone(),
        }
    }
}

/// Execution report for a scenario run
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Scenario name
    pub scenario_name: String,

    /// Number of steps executed
    pub steps_executed: usize,

    /// Number of inbound stanzas matched
    pub stanzas_consumed: usize,

    /// Steps still queued (zero after a failure, which clears the queue)
    pub remaining_steps: usize,

    /// Whether every step completed
    pub success: bool,

    /// Terminal error message, if any
    pub failure: Option<String>,

    /// Execution log
    pub log: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssertionFailure, MatchError};
    use crate::matcher::SxdEvaluator;

    fn stepper(steps: Vec<Step>) -> ScenarioStepper {
        ScenarioStepper::new("test", steps, Arc::new(SxdEvaluator))
    }

    #[test]
    fn test_sends_chain_until_expectation() {
        let mut s = stepper(vec![
            Step::send("<a/>"),
            Step::send("<b/>"),
            Step::expect(["/c"]),
            Step::send("<d/>"),
        ]);
        assert_eq!(s.start(), Progress::Awaiting);
        assert_eq!(s.take_outbox(), vec!["<a/>", "<b/>"]);
        assert_eq!(s.state(), StepperState::AwaitingStanza);
        assert_eq!(s.deliver(Stanza::new("<c/>")), Progress::Drained);
        assert_eq!(s.take_outbox(), vec!["<d/>"]);
    }

    #[test]
    fn test_empty_scenario_drains_immediately() {
        let mut s = stepper(vec![]);
        assert_eq!(s.state(), StepperState::Idle);
        assert_eq!(s.start(), Progress::Drained);
        assert!(s.report().success);
    }

    #[test]
    fn test_failure_clears_queue() {
        let mut s = stepper(vec![Step::expect(["/a"]), Step::send("<never/>")]);
        s.start();
        assert_eq!(s.deliver(Stanza::new("<b/>")), Progress::Failed);
        assert_eq!(s.remaining_steps(), 0);
        assert_eq!(s.discarded_steps(), 1);
        assert!(s.take_outbox().is_empty());
        assert!(matches!(
            s.error(),
            Some(HarnessError::Assertion(AssertionFailure::Unmatched { .. }))
        ));
    }

    #[test]
    fn test_template_error_fails_scenario() {
        let mut s = stepper(vec![Step::send("<iq id='{missing}'/>"), Step::send("<x/>")]);
        assert_eq!(s.start(), Progress::Failed);
        assert!(matches!(s.error(), Some(HarnessError::Template(_))));
        assert!(s.take_outbox().is_empty());
    }

    #[test]
    fn test_pause_then_resume() {
        let mut s = stepper(vec![
            Step::pause(Duration::from_secs(1)),
            Step::send("<a/>"),
        ]);
        assert_eq!(s.start(), Progress::Paused(Duration::from_secs(1)));
        assert!(s.take_outbox().is_empty());
        assert_eq!(s.resume(), Progress::Drained);
        assert_eq!(s.take_outbox(), vec!["<a/>"]);
    }

    #[test]
    fn test_stanza_during_pause_waits_for_next_expectation() {
        let mut s = stepper(vec![Step::pause(Duration::from_secs(1)), Step::expect(["/a"])]);
        s.start();
        assert_eq!(
            s.deliver(Stanza::new("<a/>")),
            Progress::Paused(Duration::from_secs(1))
        );
        assert_eq!(s.state(), StepperState::Paused);
        assert_eq!(s.resume(), Progress::Drained);
    }

    #[test]
    fn test_cancel() {
        let mut s = stepper(vec![Step::expect(["/a"])]);
        s.start();
        assert_eq!(s.cancel(), Progress::Failed);
        assert!(matches!(s.error(), Some(HarnessError::Cancelled)));
        assert_eq!(s.deliver(Stanza::new("<a/>")), Progress::Failed);
    }

    #[test]
    fn test_save_value_step_reads_last_consumed() {
        let mut s = stepper(vec![
            Step::expect(["/iq"]),
            Step::save_attribute("id", "/iq", "id"),
            Step::send("<iq id='{id}'/>"),
        ]);
        s.start();
        assert_eq!(s.deliver(Stanza::new("<iq id='42'/>")), Progress::Drained);
        assert_eq!(s.take_outbox(), vec!["<iq id='42'/>"]);
    }

    #[test]
    fn test_save_value_without_stanza_fails() {
        let mut s = stepper(vec![Step::save_attribute("id", "/iq", "id")]);
        assert_eq!(s.start(), Progress::Failed);
        assert!(matches!(s.error(), Some(HarnessError::Step(_))));
    }

    #[test]
    fn test_malformed_query_in_optional_expectation_fails_on_install() {
        let mut s = stepper(vec![
            Step::send("<a/>"),
            Step::expect_optional(["/presence", "/presence["]),
            Step::expect(["/message"]),
        ]);
        assert_eq!(s.start(), Progress::Failed);
        assert!(matches!(
            s.error(),
            Some(HarnessError::Match(MatchError::MalformedQuery { .. }))
        ));
        assert!(s.take_outbox().is_empty());
        assert_eq!(s.deliver(Stanza::new("<message/>")), Progress::Failed);
    }

    #[test]
    fn test_malformed_query_in_unordered_alternative_fails_on_install() {
        let mut s = stepper(vec![Step::expect_unordered([vec!["/a", "/a["], vec!["/c"]])]);
        assert_eq!(s.start(), Progress::Failed);
        assert!(matches!(
            s.error(),
            Some(HarnessError::Match(MatchError::MalformedQuery { .. }))
        ));
    }

    #[test]
    fn test_report() {
        let mut s = stepper(vec![Step::send("<a/>"), Step::expect(["/b"])]);
        s.start();
        s.deliver(Stanza::new("<b/>"));
        let report = s.report();
        assert_eq!(report.scenario_name, "test");
        assert_eq!(report.steps_executed, 2);
        assert_eq!(report.stanzas_consumed, 1);
        assert!(report.success);
        assert!(report.failure.is_none());
    }
}
