// File: testing-framework/src/scenarios/step.rs
//
// Scenario Steps
//
// A step is a tagged variant dispatched by the stepper. Text fields are
// templates rendered when the step executes, so values saved by earlier steps
// are visible.

use crate::expectation::{Extractor, SaveValue};
use std::fmt;
use std::time::Duration;

/// One unit of scenario work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Transmit one stanza to the gateway
    Send { text: String },
    /// Install a single expectation
    Expect {
        predicates: Vec<String>,
        optional: bool,
        after: Vec<SaveValue>,
    },
    /// Install an unordered group of alternative predicate-sets
    ExpectUnordered { alternatives: Vec<Vec<String>> },
    /// Suspend the scenario for a while
    Pause { duration: Duration },
    /// Extract a value from the last consumed stanza (or from nothing)
    SaveValue(SaveValue),
}

impl Step {
    pub fn send(text: impl Into<String>) -> Self {
        Step::Send { text: text.into() }
    }

    /// Expect one stanza satisfying every predicate
    pub fn expect<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::Expect {
            predicates: predicates.into_iter().map(Into::into).collect(),
            optional: false,
            after: Vec::new(),
        }
    }

    /// Expect a stanza that may not arrive
    pub fn expect_optional<I, S>(predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::Expect {
            predicates: predicates.into_iter().map(Into::into).collect(),
            optional: true,
            after: Vec::new(),
        }
    }

    /// Expect a stanza, then save values from it
    pub fn expect_then<I, S>(predicates: I, after: Vec<SaveValue>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::Expect {
            predicates: predicates.into_iter().map(Into::into).collect(),
            optional: false,
            after,
        }
    }

    /// Expect each alternative exactly once, in any order
    pub fn expect_unordered<A, I, S>(alternatives: A) -> Self
    where
        A: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::ExpectUnordered {
            alternatives: alternatives
                .into_iter()
                .map(|set| set.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn pause(duration: Duration) -> Self {
        Step::Pause { duration }
    }

    pub fn save(name: impl Into<String>, extractor: Extractor) -> Self {
        Step::SaveValue(SaveValue::new(name, extractor))
    }

    /// Save the value of `attribute` on the element at `xpath` of the last
    /// consumed stanza
    pub fn save_attribute(
        name: impl Into<String>,
        xpath: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Step::save(
            name,
            Extractor::Attribute {
                xpath: xpath.into(),
                attribute: attribute.into(),
            },
        )
    }

    /// Save the current UTC timestamp shifted by `seconds`
    pub fn save_timestamp(name: impl Into<String>, seconds: i64) -> Self {
        Step::save(name, Extractor::TimestampPlus { seconds })
    }

    /// Short name of the step kind
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Send { .. } => "send",
            Step::Expect { optional: true, .. } => "expect_optional",
            Step::Expect { .. } => "expect",
            Step::ExpectUnordered { .. } => "expect_unordered",
            Step::Pause { .. } => "pause",
            Step::SaveValue(_) => "save_value",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Send { text } => write!(f, "send {}", text),
            Step::Expect { predicates, .. } => write!(f, "{} ({})", self.kind(), predicates.join(", ")),
            Step::ExpectUnordered { alternatives } => {
                write!(f, "expect_unordered ({} alternatives)", alternatives.len())
            }
            Step::Pause { duration } => write!(f, "pause {:?}", duration),
            Step::SaveValue(save) => write!(f, "save_value {}", save.name),
        }
    }
}

/// Anything that flattens into a list of steps
///
/// Lets scenario authors mix single steps and helper sequences freely:
/// `steps![handshake_sequence(), Step::send(..), Step::expect([..])]`.
pub trait IntoSteps {
    fn into_steps(self) -> Vec<Step>;
}

impl IntoSteps for Step {
    fn into_steps(self) -> Vec<Step> {
        vec![self]
    }
}

impl<T: IntoSteps> IntoSteps for Vec<T> {
    fn into_steps(self) -> Vec<Step> {
        self.into_iter().flat_map(IntoSteps::into_steps).collect()
    }
}

impl<T: IntoSteps, const N: usize> IntoSteps for [T; N] {
    fn into_steps(self) -> Vec<Step> {
        self.into_iter().flat_map(IntoSteps::into_steps).collect()
    }
}

impl<T: IntoSteps> IntoSteps for Option<T> {
    fn into_steps(self) -> Vec<Step> {
        self.map(IntoSteps::into_steps).unwrap_or_default()
    }
}

/// Flatten a mix of steps and step sequences into a `Vec<Step>`
#[macro_export]
macro_rules! steps {
    ($($item:expr),* $(,)?) => {{
        let mut steps: ::std::vec::Vec<$crate::scenarios::Step> = ::std::vec::Vec::new();
        $( steps.extend($crate::scenarios::IntoSteps::into_steps($item)); )*
        steps
    }};
}
