//! # Gateway Testing Framework
//!
//! Scenario engine for end-to-end conformance testing of an XMPP-IRC gateway
//! that connects as an external XMPP component.
//!
//! ## Architecture Overview
//!
//! - **Matcher**: XPath predicates (with `!` negation) evaluated on stanzas
//! - **Expectation**: ordered, optional and unordered stanza expectations
//! - **Scenario Stepper**: synchronous state machine over a step queue
//! - **Peer Channel**: the component-protocol connection with the gateway
//! - **Orchestrator**: async run loop, gateway lifecycle, suite driver
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gateway_testing_framework::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_handshake() {
//!     let scenario = Scenario::new("basic_handshake", handshake_sequence());
//!     let stepper = scenario.stepper(Arc::new(SxdEvaluator), Fixtures::default());
//!     let (mut peer, script) = MemoryPeer::pair();
//!     script.stanza("<handshake/>");
//!     // ... drive `run_session` with a fake SUT process
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **One active expectation**: every inbound stanza is checked against
//!    exactly one predicate set or unordered group
//! 2. **Contained failures**: a failed scenario never stops the suite
//! 3. **Deterministic tests**: the Clock abstraction runs pauses and timeouts
//!    under paused tokio time

#![warn(clippy::all)]

/// Error taxonomy of a scenario run
pub mod error;

/// Inbound stanza text
pub mod stanza;

/// XPath predicates and their evaluation
pub mod matcher;

/// Template substitution over fixtures and saved values
pub mod template;

/// Single, optional and unordered expectations
pub mod expectation;

/// Steps, scenarios, the stepper and the scenario catalog
pub mod scenarios;

/// Component-protocol peer channel
pub mod peer;

/// Gateway and IRC server processes
pub mod process;

/// Core orchestration - Clock, run loop, suite driver
pub mod orchestrator;

/// Harness and gateway configuration
pub mod config;

/// Failure artifacts and logging
pub mod utilities;

// Convenient re-exports for common usage
pub mod prelude;

// Re-export commonly used types at crate root
pub use error::HarnessError;
pub use orchestrator::{Clock, PausedClock, SystemClock, TestSuite};
pub use scenarios::{Scenario, ScenarioStepper, Step};

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
