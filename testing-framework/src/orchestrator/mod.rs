// File: testing-framework/src/orchestrator/mod.rs
//
// Orchestrator Module
//
// Everything that waits: the clock, the per-scenario run loop over a peer
// channel and a SUT process, the real-gateway scenario runner, and the suite
// driver.

/// Clock abstractions for pause steps and timeouts
pub mod clock;
/// Async run loop of one scenario
pub mod session;
/// One scenario against a freshly launched gateway
pub mod runner;
/// Sequential multi-scenario driver
pub mod suite;

pub use clock::{Clock, PausedClock, SystemClock};
pub use runner::{fixtures_for, ScenarioRunner};
pub use session::{run_session, Direction, SessionOutcome, SessionSettings, TraceEntry};
pub use suite::{select_scenarios, ScenarioResult, SuiteReport, TestSuite};
