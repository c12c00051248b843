// File: testing-framework/src/matcher/mod.rs
//
// Structural Stanza Matching
//
// A predicate is one XPath query, optionally prefixed with `!` to invert its
// result. A predicate-set is the conjunction of its predicates. Evaluation is
// delegated to an `XPathEvaluator`, which only reports whether the query
// selects something.

/// Namespace prefix table bound for every query
pub mod namespaces;
/// XPath evaluator backed by sxd-xpath
pub mod xpath;

use crate::error::MatchError;
use crate::stanza::Stanza;
use std::fmt;

pub use xpath::SxdEvaluator;

/// Black-box structural predicate engine
///
/// Implementations must treat the stanza as a tree with the prefixes of
/// [`namespaces::NAMESPACES`] bound, and return whether `query` selects at
/// least one node (or evaluates to a true value). A query that cannot be
/// compiled is an `Err`, never `Ok(false)`.
pub trait XPathEvaluator: Send + Sync {
    /// Check that `query` compiles, independently of any stanza
    fn validate(&self, query: &str) -> Result<(), MatchError>;

    /// Evaluate `query` against `stanza`
    fn matches(&self, stanza: &Stanza, query: &str) -> Result<bool, MatchError>;

    /// Evaluate every query against one stanza, in order
    ///
    /// All queries are evaluated even once one selects nothing. Implementations
    /// that parse the stanza should do so once for the whole slice.
    fn matches_each(&self, stanza: &Stanza, queries: &[&str]) -> Result<Vec<bool>, MatchError> {
        queries.iter().map(|query| self.matches(stanza, query)).collect()
    }

    /// String value of the first node selected by `query`, if any
    fn select_string(&self, stanza: &Stanza, query: &str) -> Result<Option<String>, MatchError>;
}

/// [`XPathEvaluator::matches_each`] with the result count checked
pub(crate) fn select_each(
    evaluator: &dyn XPathEvaluator,
    stanza: &Stanza,
    queries: &[&str],
) -> Result<Vec<bool>, MatchError> {
    let selected = evaluator.matches_each(stanza, queries)?;
    if selected.len() != queries.len() {
        return Err(MatchError::Evaluation {
            query: queries.join(", "),
            reason: format!("{} results for {} queries", selected.len(), queries.len()),
        });
    }
    Ok(selected)
}

/// One query with its polarity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    raw: String,
    negated: bool,
}

impl Predicate {
    /// Parse a predicate string; a leading `!` inverts the result
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let negated = raw.starts_with('!');
        Self { raw, negated }
    }

    /// The predicate as written, including any `!` prefix
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The query handed to the evaluator
    pub fn query(&self) -> &str {
        if self.negated {
            &self.raw[1..]
        } else {
            &self.raw
        }
    }

    /// Whether the evaluator result is inverted
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Evaluate against a stanza, applying polarity
    pub fn evaluate(
        &self,
        evaluator: &dyn XPathEvaluator,
        stanza: &Stanza,
    ) -> Result<bool, MatchError> {
        let selected = evaluator.matches(stanza, self.query())?;
        Ok(selected != self.negated)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// `evaluate(stanza, predicate) -> bool` on a raw predicate string
pub fn evaluate(
    evaluator: &dyn XPathEvaluator,
    stanza: &Stanza,
    predicate: &str,
) -> Result<bool, MatchError> {
    Predicate::parse(predicate).evaluate(evaluator, stanza)
}

/// Conjunction of predicates describing one expected stanza shape
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PredicateSet {
    predicates: Vec<Predicate>,
}

impl PredicateSet {
    /// Build a set from predicate strings
    pub fn new<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicates: predicates.into_iter().map(Predicate::parse).collect(),
        }
    }

    /// Predicates in declaration order
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Queries handed to the evaluator, without their `!` prefix
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().map(|p| p.query())
    }

    /// Compile every query; a malformed one is reported before any stanza
    /// is offered
    pub fn validate(&self, evaluator: &dyn XPathEvaluator) -> Result<(), MatchError> {
        self.queries().try_for_each(|query| evaluator.validate(query))
    }

    /// First predicate that does not hold, in declaration order
    ///
    /// Every predicate is evaluated against a single parse of the stanza, so
    /// an evaluation error surfaces even after an unmet predicate.
    pub fn first_unmet(
        &self,
        evaluator: &dyn XPathEvaluator,
        stanza: &Stanza,
    ) -> Result<Option<&Predicate>, MatchError> {
        let queries: Vec<&str> = self.queries().collect();
        let selected = select_each(evaluator, stanza, &queries)?;
        Ok(self.first_unmet_in(&selected))
    }

    /// First unmet predicate given the evaluator's result for each query
    pub fn first_unmet_in(&self, selected: &[bool]) -> Option<&Predicate> {
        self.predicates
            .iter()
            .zip(selected)
            .find(|(predicate, selected)| **selected == predicate.is_negated())
            .map(|(predicate, _)| predicate)
    }

    /// Whether every predicate holds
    pub fn all_match(
        &self,
        evaluator: &dyn XPathEvaluator,
        stanza: &Stanza,
    ) -> Result<bool, MatchError> {
        Ok(self.first_unmet(evaluator, stanza)?.is_none())
    }
}

impl fmt::Display for PredicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.predicates.iter().map(|p| p.raw()).collect();
        write!(f, "({})", parts.join(", "))
    }
}
