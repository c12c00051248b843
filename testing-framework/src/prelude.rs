//! Commonly used types for writing and running scenarios
//!
//! ```rust
//! use gateway_testing_framework::prelude::*;
//! ```

pub use crate::config::{ConfigVariant, HarnessConfig};
pub use crate::error::{AssertionFailure, HarnessError, MatchError, PeerError, ProcessError, TemplateError};
pub use crate::expectation::{Extractor, MatchResult, SaveValue};
pub use crate::matcher::{Predicate, PredicateSet, SxdEvaluator, XPathEvaluator};
pub use crate::orchestrator::{
    run_session, Clock, PausedClock, SessionOutcome, SessionSettings, SystemClock, TestSuite,
};
pub use crate::peer::{MemoryPeer, PeerChannel, PeerEvent, PeerScript};
pub use crate::process::SutProcess;
pub use crate::scenarios::sequences::*;
pub use crate::scenarios::{IntoSteps, Progress, Scenario, ScenarioStepper, Step};
pub use crate::stanza::Stanza;
pub use crate::steps;
pub use crate::template::{Fixtures, SavedValues};

pub use std::sync::Arc;
pub use tokio::time::Duration;
