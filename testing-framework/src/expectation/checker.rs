use super::extract::SaveValue;
use super::MatchResult;
use crate::error::{AssertionFailure, HarnessError, MatchError};
use crate::matcher::{PredicateSet, XPathEvaluator};
use crate::stanza::Stanza;
use crate::template::SavedValues;
use std::fmt;

/// Expects the next stanza to satisfy every predicate of a set
#[derive(Debug, Clone)]
pub struct Checker {
    predicates: PredicateSet,
    optional: bool,
    after: Vec<SaveValue>,
}

impl Checker {
    pub fn new(predicates: PredicateSet) -> Self {
        Self {
            predicates,
            optional: false,
            after: Vec::new(),
        }
    }

    /// An unmet optional checker yields `Skip` instead of `Fail`
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Values to extract from the stanza once it matched
    pub fn with_after(mut self, after: Vec<SaveValue>) -> Self {
        self.after = after;
        self
    }

    pub fn predicates(&self) -> &PredicateSet {
        &self.predicates
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Compile every predicate and extractor query
    ///
    /// Run at install time so a malformed query fails the scenario whatever
    /// stanza arrives, even for an optional checker.
    pub fn validate(&self, evaluator: &dyn XPathEvaluator) -> Result<(), MatchError> {
        self.predicates.validate(evaluator)?;
        self.after
            .iter()
            .try_for_each(|save| save.extractor.validate(evaluator))
    }

    pub fn offer(
        &self,
        stanza: &Stanza,
        evaluator: &dyn XPathEvaluator,
        saved: &mut SavedValues,
    ) -> Result<MatchResult, HarnessError> {
        match self.predicates.first_unmet(evaluator, stanza)? {
            None => {
                for action in &self.after {
                    action.apply(Some(stanza), evaluator, saved)?;
                }
                Ok(MatchResult::Advance)
            }
            Some(_) if self.optional => Ok(MatchResult::Skip),
            Some(unmet) => Ok(MatchResult::Fail(AssertionFailure::Unmatched {
                stanza: stanza.to_string(),
                predicate: unmet.raw().to_string(),
            })),
        }
    }
}

impl fmt::Display for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "optional {}", self.predicates)
        } else {
            write!(f, "{}", self.predicates)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::Extractor;
    use crate::matcher::SxdEvaluator;

    #[test]
    fn test_match_advances() {
        let checker = Checker::new(PredicateSet::new(["//handshake"]));
        let mut saved = SavedValues::new();
        let result = checker
            .offer(&Stanza::new("<handshake/>"), &SxdEvaluator, &mut saved)
            .unwrap();
        assert_eq!(result, MatchResult::Advance);
    }

    #[test]
    fn test_failure_names_offending_predicate() {
        let checker = Checker::new(PredicateSet::new(["/message", "/message[@type='chat']"]));
        let mut saved = SavedValues::new();
        let result = checker
            .offer(
                &Stanza::new("<message type='groupchat'/>"),
                &SxdEvaluator,
                &mut saved,
            )
            .unwrap();
        assert_eq!(
            result,
            MatchResult::Fail(AssertionFailure::Unmatched {
                stanza: "<message type='groupchat'/>".to_string(),
                predicate: "/message[@type='chat']".to_string(),
            })
        );
    }

    #[test]
    fn test_optional_skips() {
        let checker = Checker::new(PredicateSet::new(["/presence"])).with_optional(true);
        let mut saved = SavedValues::new();
        let result = checker
            .offer(&Stanza::new("<message/>"), &SxdEvaluator, &mut saved)
            .unwrap();
        assert_eq!(result, MatchResult::Skip);
    }

    #[test]
    fn test_after_runs_only_on_match() {
        let checker = Checker::new(PredicateSet::new(["/iq[@type='result']"])).with_after(vec![
            SaveValue::new(
                "id",
                Extractor::Attribute {
                    xpath: "/iq".to_string(),
                    attribute: "id".to_string(),
                },
            ),
        ]);
        let mut saved = SavedValues::new();
        checker
            .offer(&Stanza::new("<iq type='error' id='1'/>"), &SxdEvaluator, &mut saved)
            .unwrap();
        assert!(saved.is_empty());
        checker
            .offer(&Stanza::new("<iq type='result' id='2'/>"), &SxdEvaluator, &mut saved)
            .unwrap();
        assert_eq!(saved.get("id"), Some("2"));
    }

    #[test]
    fn test_malformed_query_is_fatal_even_when_optional() {
        let checker = Checker::new(PredicateSet::new(["/iq["])).with_optional(true);
        let mut saved = SavedValues::new();
        assert!(checker
            .offer(&Stanza::new("<iq/>"), &SxdEvaluator, &mut saved)
            .is_err());
    }

    #[test]
    fn test_malformed_query_behind_unmet_predicate_is_fatal() {
        let checker =
            Checker::new(PredicateSet::new(["/presence", "/presence["])).with_optional(true);
        let mut saved = SavedValues::new();
        assert!(checker.validate(&SxdEvaluator).is_err());
        assert!(matches!(
            checker.offer(&Stanza::new("<message/>"), &SxdEvaluator, &mut saved),
            Err(HarnessError::Match(MatchError::MalformedQuery { .. }))
        ));
    }

    #[test]
    fn test_validate_covers_after_extractors() {
        let checker = Checker::new(PredicateSet::new(["/iq"])).with_after(vec![SaveValue::new(
            "id",
            Extractor::Text {
                xpath: "/iq/@id[".to_string(),
            },
        )]);
        assert!(checker.validate(&SxdEvaluator).is_err());
        assert!(Checker::new(PredicateSet::new(["/iq", "!/iq/error"]))
            .validate(&SxdEvaluator)
            .is_ok());
    }
}
