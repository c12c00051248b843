use super::MatchResult;
use crate::error::{AssertionFailure, MatchError};
use crate::matcher::{select_each, PredicateSet, XPathEvaluator};
use crate::stanza::Stanza;
use std::fmt;

/// A burst of stanzas whose arrival order is not specified
///
/// Each inbound stanza consumes the first pending alternative (in declaration
/// order) that it fully satisfies. The group stays active until every
/// alternative has been consumed.
#[derive(Debug, Clone)]
pub struct UnorderedGroup {
    pending: Vec<PredicateSet>,
}

impl UnorderedGroup {
    pub fn new(alternatives: Vec<PredicateSet>) -> Self {
        Self {
            pending: alternatives,
        }
    }

    /// Alternatives not yet matched, in declaration order
    pub fn pending(&self) -> &[PredicateSet] {
        &self.pending
    }

    pub fn is_satisfied(&self) -> bool {
        self.pending.is_empty()
    }

    /// Compile every query of every alternative
    pub fn validate(&self, evaluator: &dyn XPathEvaluator) -> Result<(), MatchError> {
        self.pending
            .iter()
            .try_for_each(|alternative| alternative.validate(evaluator))
    }

    /// Consume the first alternative the stanza satisfies
    ///
    /// The queries of all pending alternatives are evaluated in one pass over
    /// a single parse of the stanza.
    pub fn offer(
        &mut self,
        stanza: &Stanza,
        evaluator: &dyn XPathEvaluator,
    ) -> Result<MatchResult, MatchError> {
        let queries: Vec<&str> = self.pending.iter().flat_map(|set| set.queries()).collect();
        let selected = select_each(evaluator, stanza, &queries)?;

        let mut offset = 0;
        let mut matched = None;
        for (index, alternative) in self.pending.iter().enumerate() {
            let end = offset + alternative.len();
            let results = selected.get(offset..end).unwrap_or_default();
            if alternative.first_unmet_in(results).is_none() {
                matched = Some(index);
                break;
            }
            offset = end;
        }

        match matched {
            Some(index) => {
                self.pending.remove(index);
                if self.pending.is_empty() {
                    Ok(MatchResult::Advance)
                } else {
                    Ok(MatchResult::Reinstall)
                }
            }
            None => Ok(MatchResult::Fail(AssertionFailure::NoAlternative {
                stanza: stanza.to_string(),
                remaining: self.pending.iter().map(|set| set.to_string()).collect(),
            })),
        }
    }
}

impl fmt::Display for UnorderedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sets: Vec<String> = self.pending.iter().map(|s| s.to_string()).collect();
        write!(f, "any of [{}]", sets.join(" | "))
    }
}
