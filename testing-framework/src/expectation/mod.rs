// File: testing-framework/src/expectation/mod.rs
//
// Expectations
//
// The active expectation is either a single ordered `Checker` or an
// `UnorderedGroup` of alternatives. Offering a stanza to it yields an explicit
// `MatchResult` telling the stepper how to proceed.

/// Ordered single-stanza expectation
pub mod checker;
/// Values extracted from matched stanzas
pub mod extract;
/// Order-independent burst of expected stanzas
pub mod unordered;

pub use checker::Checker;
pub use extract::{Extractor, SaveValue};
pub use unordered::UnorderedGroup;

use crate::error::{AssertionFailure, HarnessError};
use crate::matcher::XPathEvaluator;
use crate::stanza::Stanza;
use crate::template::SavedValues;
use std::fmt;

/// Outcome of offering one stanza to the active expectation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Stanza consumed; the expectation is complete
    Advance,
    /// Stanza consumed; the expectation stays active with what is left
    Reinstall,
    /// Optional expectation abandoned; the stanza was not consumed
    Skip,
    /// Stanza violated the expectation
    Fail(AssertionFailure),
}

/// The single active expectation owned by the stepper
#[derive(Debug, Clone)]
pub enum Expectation {
    Single(Checker),
    Group(UnorderedGroup),
}

impl Expectation {
    /// Offer a stanza
    ///
    /// `Err` is reserved for fatal problems (malformed query, failed value
    /// extraction); a stanza that simply does not match is `Ok(Fail(..))`.
    pub fn offer(
        &mut self,
        stanza: &Stanza,
        evaluator: &dyn XPathEvaluator,
        saved: &mut SavedValues,
    ) -> Result<MatchResult, HarnessError> {
        match self {
            Expectation::Single(checker) => checker.offer(stanza, evaluator, saved),
            Expectation::Group(group) => Ok(group.offer(stanza, evaluator)?),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Single(checker) => write!(f, "{}", checker),
            Expectation::Group(group) => write!(f, "{}", group),
        }
    }
}
