#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//! Session run loop against an in-memory peer and a fake gateway process
//!
//! All tests run under paused tokio time: pauses, per-stanza timeouts and the
//! shutdown deadline elapse instantly through auto-advance.

use async_trait::async_trait;
use gateway_testing_framework::error::{AssertionFailure, HarnessError, PeerError, ProcessError};
use gateway_testing_framework::matcher::SxdEvaluator;
use gateway_testing_framework::orchestrator::{
    run_session, Direction, PausedClock, SessionOutcome, SessionSettings,
};
use gateway_testing_framework::peer::{MemoryPeer, PeerScript};
use gateway_testing_framework::process::SutProcess;
use gateway_testing_framework::scenarios::ScenarioStepper;
use gateway_testing_framework::Step;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Gateway stand-in with a scripted reaction to the interrupt
struct FakeGateway {
    /// Exit code reported once interrupted; `None` ignores the interrupt
    exit_on_interrupt: Option<i32>,
    interrupts: usize,
    killed: bool,
    status: watch::Sender<Option<i32>>,
    exited: watch::Receiver<Option<i32>>,
}

impl FakeGateway {
    fn exiting_with(code: i32) -> Self {
        Self::new(Some(code))
    }

    fn stubborn() -> Self {
        Self::new(None)
    }

    fn new(exit_on_interrupt: Option<i32>) -> Self {
        let (status, exited) = watch::channel(None);
        Self {
            exit_on_interrupt,
            interrupts: 0,
            killed: false,
            status,
            exited,
        }
    }
}

#[async_trait]
impl SutProcess for FakeGateway {
    async fn start(&mut self) -> Result<(), ProcessError> {
        Ok(())
    }

    fn signal_terminate(&mut self) -> Result<(), ProcessError> {
        self.interrupts += 1;
        if let Some(code) = self.exit_on_interrupt {
            self.status.send_replace(Some(code));
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<i32, ProcessError> {
        loop {
            if let Some(code) = *self.exited.borrow_and_update() {
                return Ok(code);
            }
            if self.exited.changed().await.is_err() {
                return Err(ProcessError::NotStarted("fake".to_string()));
            }
        }
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        self.killed = true;
        self.status.send_replace(Some(-9));
        Ok(())
    }
}

struct Harness {
    peer: MemoryPeer,
    script: PeerScript,
    gateway: FakeGateway,
    cancel_tx: watch::Sender<bool>,
    cancel: watch::Receiver<bool>,
    settings: SessionSettings,
}

impl Harness {
    fn new(gateway: FakeGateway) -> Self {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
        let (peer, script) = MemoryPeer::pair();
        let (cancel_tx, cancel) = watch::channel(false);
        Self {
            peer,
            script,
            gateway,
            cancel_tx,
            cancel,
            settings: SessionSettings::default(),
        }
    }

    async fn run(&mut self, steps: Vec<Step>) -> SessionOutcome {
        let stepper = ScenarioStepper::new("session", steps, Arc::new(SxdEvaluator));
        run_session(
            stepper,
            &mut self.peer,
            &mut self.gateway,
            &PausedClock,
            &mut self.cancel,
            &self.settings,
        )
        .await
    }
}

fn handshake() -> Vec<Step> {
    vec![Step::send("<handshake>secret</handshake>"), Step::expect(["//handshake"])]
}

#[tokio::test(start_paused = true)]
async fn test_passing_session() {
    let mut h = Harness::new(FakeGateway::exiting_with(0));
    h.script.stanza("<handshake/>");

    let outcome = h.run(handshake()).await;
    assert!(outcome.passed(), "{:?}", outcome.error);
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(h.gateway.interrupts, 1);
    assert!(!h.gateway.killed);
    assert_eq!(h.script.sent(), vec!["<handshake>secret</handshake>"]);

    let directions: Vec<_> = outcome.trace.iter().map(|e| e.direction).collect();
    assert_eq!(directions, vec![Direction::Outbound, Direction::Inbound]);
    assert!(outcome.report.success);
}

#[tokio::test(start_paused = true)]
async fn test_exit_code_mismatch_fails_passing_run() {
    let mut h = Harness::new(FakeGateway::exiting_with(1));
    h.script.stanza("<handshake/>");

    let outcome = h.run(handshake()).await;
    assert!(matches!(
        outcome.error,
        Some(HarnessError::ProcessExitMismatch { expected: 0, observed: 1 })
    ));
    assert!(!outcome.report.success);
}

#[tokio::test(start_paused = true)]
async fn test_expected_nonzero_exit_code() {
    let mut h = Harness::new(FakeGateway::exiting_with(16));
    h.settings = SessionSettings::default().with_expected_exit_code(16);
    h.script.stanza("<handshake/>");

    let outcome = h.run(handshake()).await;
    assert!(outcome.passed());
    assert_eq!(outcome.exit_code, Some(16));
}

#[tokio::test(start_paused = true)]
async fn test_assertion_failure_still_shuts_down() {
    let mut h = Harness::new(FakeGateway::exiting_with(0));
    h.script.stanza("<presence/>");

    let outcome = h
        .run(vec![
            Step::expect(["/message"]),
            Step::send("<never/>"),
            Step::expect(["/iq"]),
        ])
        .await;
    assert!(matches!(
        outcome.error,
        Some(HarnessError::Assertion(AssertionFailure::Unmatched { .. }))
    ));
    assert_eq!(outcome.remaining_steps, 2);
    assert_eq!(h.gateway.interrupts, 1);
    assert_eq!(outcome.exit_code, Some(0));
    assert!(h.script.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stanza_timeout_names_pending_expectation() {
    let mut h = Harness::new(FakeGateway::exiting_with(0));

    let outcome = h.run(vec![Step::expect(["/message[@type='groupchat']"])]).await;
    match outcome.error {
        Some(HarnessError::Timeout { timeout, ref pending }) => {
            assert_eq!(timeout, Duration::from_secs(60));
            assert!(pending.contains("/message[@type='groupchat']"));
        }
        ref other => panic!("unexpected error: {:?}", other),
    }
    assert!(outcome.duration >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_pause_queues_early_stanzas() {
    let mut h = Harness::new(FakeGateway::exiting_with(0));
    h.script.stanza("<message><body>second line</body></message>");

    let outcome = h
        .run(vec![
            Step::pause(Duration::from_secs(2)),
            Step::expect(["/message/body[text()='second line']"]),
        ])
        .await;
    assert!(outcome.passed(), "{:?}", outcome.error);
    assert!(outcome.duration >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation() {
    let mut h = Harness::new(FakeGateway::exiting_with(0));
    h.cancel_tx.send(true).unwrap();

    let outcome = h.run(handshake()).await;
    assert!(outcome.was_cancelled());
    assert_eq!(h.gateway.interrupts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_end_while_awaiting() {
    let mut h = Harness::new(FakeGateway::exiting_with(0));
    h.script.end_session();

    let outcome = h.run(handshake()).await;
    assert!(matches!(outcome.error, Some(HarnessError::Peer(PeerError::Closed))));
    assert_eq!(outcome.exit_code, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_stubborn_gateway_is_killed() {
    let mut h = Harness::new(FakeGateway::stubborn());
    h.script.stanza("<handshake/>");

    let outcome = h.run(handshake()).await;
    assert!(h.gateway.killed);
    assert_eq!(outcome.exit_code, Some(-9));
    assert!(matches!(
        outcome.error,
        Some(HarnessError::ProcessExitMismatch { observed: -9, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_stanzas_after_the_end_are_traced_not_matched() {
    let mut h = Harness::new(FakeGateway::exiting_with(0));
    h.script.stanza("<handshake/>");
    h.script.stanza("<presence type='unavailable'/>");
    h.script.end_session();

    let outcome = h.run(handshake()).await;
    assert!(outcome.passed(), "{:?}", outcome.error);
    let last = outcome.trace.last().unwrap();
    assert_eq!(last.direction, Direction::Ignored);
    assert_eq!(last.stanza, "<presence type='unavailable'/>");
}
