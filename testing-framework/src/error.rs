// File: testing-framework/src/error.rs
//
// Error Taxonomy
//
// Every way a scenario run can go wrong. All of these are contained within one
// scenario: the suite driver records them and moves on to the next scenario.

use std::time::Duration;
use thiserror::Error;

/// An inbound stanza violated the active expectation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionFailure {
    /// A non-optional predicate-set was not satisfied
    #[error("Received stanza\n{stanza}\ndid not match expected xpath\n{predicate}")]
    Unmatched {
        /// Serialized form of the offending stanza
        stanza: String,
        /// First predicate (as written, with its `!` prefix) that did not hold
        predicate: String,
    },

    /// No pending alternative of an unordered group was satisfied
    #[error("Received stanza “{stanza}” did not match any of the expected xpaths:\n{}", .remaining.join("\n"))]
    NoAlternative {
        /// Serialized form of the offending stanza
        stanza: String,
        /// Every alternative still pending, one rendered predicate-set per line
        remaining: Vec<String>,
    },
}

/// Template substitution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unknown template key '{key}' in: {template}")]
    MissingKey { key: String, template: String },

    #[error("Single '{brace}' encountered in format string: {template}")]
    UnbalancedBrace { brace: char, template: String },
}

/// Predicate evaluation failures
///
/// A malformed query is a scenario authoring bug: it must never be reported
/// as a plain "does not match".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("Malformed xpath '{query}': {reason}")]
    MalformedQuery { query: String, reason: String },

    #[error("Received data is not a well-formed stanza ({reason}): {stanza}")]
    MalformedStanza { stanza: String, reason: String },

    #[error("Failed to evaluate xpath '{query}': {reason}")]
    Evaluation { query: String, reason: String },
}

/// Peer channel failures
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("No component connected within {0:?}")]
    AcceptTimeout(Duration),

    #[error("Session with the component is closed")]
    Closed,

    #[error("Peer channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// System-under-test process failures
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process '{0}' is not running")]
    NotStarted(String),

    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    #[error("{program} exited before printing '{marker}'")]
    NotReady { program: String, marker: String },

    #[error("Process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal error of a scenario run
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    #[error("Templating error: {0}")]
    Template(#[from] TemplateError),

    #[error("Fatal matcher error: {0}")]
    Match(#[from] MatchError),

    #[error("Wrong return code from the gateway's process: {observed} (expected {expected})")]
    ProcessExitMismatch { expected: i32, observed: i32 },

    #[error("Step failed: {0}")]
    Step(String),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("No stanza received within {timeout:?} while waiting for: {pending}")]
    Timeout { timeout: Duration, pending: String },

    #[error("Scenario cancelled")]
    Cancelled,
}

impl HarnessError {
    /// Step failure from any displayable cause
    pub fn step(cause: impl std::fmt::Display) -> Self {
        HarnessError::Step(cause.to_string())
    }
}
