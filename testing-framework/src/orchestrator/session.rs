// File: testing-framework/src/orchestrator/session.rs
//
// Session Run Loop
//
// Glues one scenario stepper to a live peer channel and SUT process. The loop
// has a single suspension point at a time: the next inbound stanza while an
// expectation is installed, or the pause timer. Outbound stanzas queued by
// the stepper are flushed after every stepper call, so stanza dispatch never
// interleaves with another delivery.

use super::clock::Clock;
use crate::error::{HarnessError, PeerError};
use crate::peer::{PeerChannel, PeerEvent};
use crate::process::SutProcess;
use crate::scenarios::{ExecutionReport, Progress, ScenarioStepper};
use crate::template::SavedValues;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Timing and exit-code expectations of one session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Bound on each wait for an expected stanza
    pub expect_timeout: Duration,
    /// Bound on the SUT's exit after it was interrupted
    pub shutdown_timeout: Duration,
    /// Exit code the SUT must report
    pub expected_exit_code: i32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            expect_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(10),
            expected_exit_code: 0,
        }
    }
}

impl SessionSettings {
    pub fn with_expected_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }
}

/// Which way a stanza travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Harness to gateway
    Outbound,
    /// Gateway to harness
    Inbound,
    /// Gateway to harness after the scenario ended; never matched
    Ignored,
}

/// One stanza of the protocol trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub direction: Direction,
    pub stanza: String,
    /// Milliseconds since the session started
    pub elapsed_ms: u64,
}

/// Result of one session
#[derive(Debug)]
pub struct SessionOutcome {
    pub report: ExecutionReport,
    /// First error of the run, `None` on success
    pub error: Option<HarnessError>,
    /// Exit code observed on the SUT, when it could be collected
    pub exit_code: Option<i32>,
    pub saved_values: SavedValues,
    pub trace: Vec<TraceEntry>,
    pub duration: Duration,
    /// Steps left unexecuted when the run stopped
    pub remaining_steps: usize,
}

impl SessionOutcome {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    /// Whether the run was stopped by the cancellation signal
    pub fn was_cancelled(&self) -> bool {
        matches!(self.error, Some(HarnessError::Cancelled))
    }

    /// Outcome of a scenario whose session could not be set up at all
    pub fn aborted(mut stepper: ScenarioStepper, error: HarnessError) -> Self {
        stepper.fail_with(error);
        let report = stepper.report();
        Self {
            report,
            error: stepper.take_error(),
            exit_code: None,
            saved_values: stepper.saved_values().clone(),
            trace: Vec::new(),
            duration: Duration::ZERO,
            remaining_steps: stepper.discarded_steps(),
        }
    }
}

/// Protocol trace under construction
struct Trace<'a> {
    clock: &'a dyn Clock,
    started: Instant,
    entries: Vec<TraceEntry>,
}

impl<'a> Trace<'a> {
    fn new(clock: &'a dyn Clock) -> Self {
        Self {
            clock,
            started: clock.now(),
            entries: Vec::new(),
        }
    }

    fn push(&mut self, direction: Direction, stanza: &str) {
        match direction {
            Direction::Outbound => debug!(target: "protocol", "SENT: {}", stanza),
            Direction::Inbound => debug!(target: "protocol", "RECEIVED: {}", stanza),
            Direction::Ignored => debug!(target: "protocol", "RECEIVED (ignored): {}", stanza),
        }
        self.entries.push(TraceEntry {
            direction,
            stanza: stanza.to_string(),
            elapsed_ms: self.elapsed().as_millis() as u64,
        });
    }

    fn elapsed(&self) -> Duration {
        self.clock.now() - self.started
    }
}

/// Resolves once the cancellation flag is raised
///
/// A dropped sender never cancels.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run one scenario over a connected peer and a started SUT
///
/// Always ends with SUT shutdown: one interrupt, then the exit code is
/// awaited while the peer is drained, and the process is killed when it does
/// not exit within the shutdown timeout.
pub async fn run_session(
    mut stepper: ScenarioStepper,
    peer: &mut dyn PeerChannel,
    sut: &mut dyn SutProcess,
    clock: &dyn Clock,
    cancel: &mut watch::Receiver<bool>,
    settings: &SessionSettings,
) -> SessionOutcome {
    let mut trace = Trace::new(clock);
    let mut session_open = true;

    let mut progress = stepper.start();
    loop {
        progress = flush(&mut stepper, peer, &mut trace, progress);

        match progress {
            Progress::Drained | Progress::Failed => break,

            Progress::Awaiting => {
                if !session_open {
                    progress = stepper.fail_with(PeerError::Closed.into());
                    continue;
                }
                let timeout = settings.expect_timeout;
                tokio::select! {
                    biased;
                    _ = cancelled(cancel) => {
                        info!("Cancelling scenario {}", stepper.name());
                        progress = stepper.cancel();
                    }
                    event = peer.next_event() => match event {
                        Some(PeerEvent::Stanza(stanza)) => {
                            trace.push(Direction::Inbound, stanza.as_str());
                            progress = stepper.deliver(stanza);
                        }
                        Some(PeerEvent::SessionEnd) | None => {
                            session_open = false;
                            debug!("Component session ended while waiting for {}", stepper.pending_description());
                        }
                    },
                    _ = clock.sleep(timeout) => {
                        let pending = stepper.pending_description();
                        progress = stepper.fail_with(HarnessError::Timeout { timeout, pending });
                    }
                }
            }

            Progress::Paused(duration) => {
                progress = pause(&mut stepper, peer, &mut trace, clock, cancel, duration, &mut session_open).await;
            }
        }
    }

    let (exit_code, shutdown_error) =
        match shutdown(peer, sut, &mut trace, clock, settings.shutdown_timeout, session_open).await {
            Ok(code) => (Some(code), None),
            Err(e) => (None, Some(e)),
        };

    let mut report = stepper.report();
    let remaining_steps = report.remaining_steps + stepper.discarded_steps();
    let mut error = stepper.take_error();

    // Stanza failures take precedence over anything observed at shutdown
    if error.is_none() {
        error = match (exit_code, shutdown_error) {
            (_, Some(e)) => Some(e),
            (Some(observed), None) if observed != settings.expected_exit_code => {
                Some(HarnessError::ProcessExitMismatch {
                    expected: settings.expected_exit_code,
                    observed,
                })
            }
            _ => None,
        };
    } else if let Some(e) = shutdown_error {
        warn!("Gateway shutdown failed after the scenario failure: {}", e);
    }
    report.success = error.is_none();
    report.failure = error.as_ref().map(|e| e.to_string());

    SessionOutcome {
        report,
        error,
        exit_code,
        saved_values: stepper.saved_values().clone(),
        duration: trace.elapsed(),
        trace: trace.entries,
        remaining_steps,
    }
}

/// Write every stanza the stepper queued, in order
fn flush(
    stepper: &mut ScenarioStepper,
    peer: &mut dyn PeerChannel,
    trace: &mut Trace<'_>,
    progress: Progress,
) -> Progress {
    for text in stepper.take_outbox() {
        trace.push(Direction::Outbound, &text);
        if let Err(e) = peer.send(&text) {
            return stepper.fail_with(e.into());
        }
    }
    progress
}

/// Wait out a pause step; stanzas arriving meanwhile are queued in the stepper
async fn pause(
    stepper: &mut ScenarioStepper,
    peer: &mut dyn PeerChannel,
    trace: &mut Trace<'_>,
    clock: &dyn Clock,
    cancel: &mut watch::Receiver<bool>,
    duration: Duration,
    session_open: &mut bool,
) -> Progress {
    let mut timer = clock.sleep(duration);
    loop {
        tokio::select! {
            biased;
            _ = cancelled(cancel) => return stepper.cancel(),
            _ = &mut timer => return stepper.resume(),
            event = peer.next_event(), if *session_open => match event {
                Some(PeerEvent::Stanza(stanza)) => {
                    trace.push(Direction::Inbound, stanza.as_str());
                    stepper.deliver(stanza);
                }
                Some(PeerEvent::SessionEnd) | None => *session_open = false,
            },
        }
    }
}

/// Interrupt the SUT and collect its exit code
async fn shutdown(
    peer: &mut dyn PeerChannel,
    sut: &mut dyn SutProcess,
    trace: &mut Trace<'_>,
    clock: &dyn Clock,
    timeout: Duration,
    mut session_open: bool,
) -> Result<i32, HarnessError> {
    if let Err(e) = sut.signal_terminate() {
        warn!("Failed to interrupt the gateway: {}", e);
    }

    let mut deadline = clock.sleep(timeout);
    loop {
        tokio::select! {
            biased;
            event = peer.next_event(), if session_open => match event {
                Some(PeerEvent::Stanza(stanza)) => trace.push(Direction::Ignored, stanza.as_str()),
                Some(PeerEvent::SessionEnd) | None => session_open = false,
            },
            code = sut.wait() => return Ok(code?),
            _ = &mut deadline => break,
        }
    }

    error!("Gateway did not exit within {:?}, killing it", timeout);
    sut.kill().await?;
    Ok(sut.wait().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::clock::PausedClock;

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_resolves_on_raise() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move {
            cancelled(&mut rx).await;
            true
        });
        tokio::task::yield_now().await;
        tx.send(true).unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_never_resolves_after_sender_drop() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let result = tokio::time::timeout(Duration::from_secs(1), cancelled(&mut rx)).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trace_records_elapsed_time() {
        let clock = PausedClock;
        let mut trace = Trace::new(&clock);
        trace.push(Direction::Outbound, "<a/>");
        clock.advance(Duration::from_millis(250)).await;
        trace.push(Direction::Inbound, "<b/>");
        assert_eq!(trace.entries[0].elapsed_ms, 0);
        assert_eq!(trace.entries[1].elapsed_ms, 250);
        assert_eq!(trace.entries[1].direction, Direction::Inbound);
    }
}
