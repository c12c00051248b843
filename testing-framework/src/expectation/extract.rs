use crate::error::{HarnessError, MatchError};
use crate::matcher::XPathEvaluator;
use crate::stanza::Stanza;
use crate::template::SavedValues;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the archive queries of the scenario corpus
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.967Z";

/// Where a saved value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum Extractor {
    /// Attribute of the first element selected by `xpath`
    Attribute { xpath: String, attribute: String },
    /// String value of the first node selected by `xpath`
    Text { xpath: String },
    /// Current UTC time shifted by `seconds`
    TimestampPlus { seconds: i64 },
    /// A fixed value
    Literal { value: String },
}

impl Extractor {
    /// Whether this extractor reads from a stanza
    pub fn needs_stanza(&self) -> bool {
        matches!(self, Extractor::Attribute { .. } | Extractor::Text { .. })
    }

    /// Query evaluated against the stanza, if any
    pub fn query(&self) -> Option<String> {
        match self {
            Extractor::Attribute { xpath, attribute } => Some(format!("{}/@{}", xpath, attribute)),
            Extractor::Text { xpath } => Some(xpath.clone()),
            Extractor::TimestampPlus { .. } | Extractor::Literal { .. } => None,
        }
    }

    /// Compile the query, if any, before a stanza is available
    pub fn validate(&self, evaluator: &dyn XPathEvaluator) -> Result<(), MatchError> {
        match self.query() {
            Some(query) => evaluator.validate(&query),
            None => Ok(()),
        }
    }

    pub fn extract(
        &self,
        stanza: Option<&Stanza>,
        evaluator: &dyn XPathEvaluator,
    ) -> Result<String, HarnessError> {
        match self {
            Extractor::Attribute { xpath, attribute } => {
                let stanza = stanza.ok_or_else(|| no_stanza(xpath))?;
                let query = format!("{}/@{}", xpath, attribute);
                evaluator.select_string(stanza, &query)?.ok_or_else(|| {
                    HarnessError::Step(format!(
                        "attribute '{}' not found at '{}' in {}",
                        attribute, xpath, stanza
                    ))
                })
            }
            Extractor::Text { xpath } => {
                let stanza = stanza.ok_or_else(|| no_stanza(xpath))?;
                evaluator.select_string(stanza, xpath)?.ok_or_else(|| {
                    HarnessError::Step(format!("nothing selected by '{}' in {}", xpath, stanza))
                })
            }
            Extractor::TimestampPlus { seconds } => {
                let when = Utc::now() + chrono::Duration::seconds(*seconds);
                Ok(when.format(TIMESTAMP_FORMAT).to_string())
            }
            Extractor::Literal { value } => Ok(value.clone()),
        }
    }
}

fn no_stanza(xpath: &str) -> HarnessError {
    HarnessError::Step(format!(
        "cannot extract '{}': no stanza has been received yet",
        xpath
    ))
}

/// Store an extracted value under a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveValue {
    pub name: String,
    #[serde(flatten)]
    pub extractor: Extractor,
}

impl SaveValue {
    pub fn new(name: impl Into<String>, extractor: Extractor) -> Self {
        Self {
            name: name.into(),
            extractor,
        }
    }

    /// Extract and store; later templates see the value
    pub fn apply(
        &self,
        stanza: Option<&Stanza>,
        evaluator: &dyn XPathEvaluator,
        saved: &mut SavedValues,
    ) -> Result<(), HarnessError> {
        let value = self.extractor.extract(stanza, evaluator)?;
        log::debug!("Saved value {} = {}", self.name, value);
        saved.insert(self.name.clone(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::SxdEvaluator;

    #[test]
    fn test_attribute_extraction() {
        let stanza = Stanza::new(
            "<iq type='result'><command xmlns='http://jabber.org/protocol/commands' sessionid='abc'/></iq>",
        );
        let extractor = Extractor::Attribute {
            xpath: "/iq/commands:command".to_string(),
            attribute: "sessionid".to_string(),
        };
        assert_eq!(extractor.extract(Some(&stanza), &SxdEvaluator).unwrap(), "abc");
    }

    #[test]
    fn test_validate_compiles_stanza_queries_only() {
        let broken = Extractor::Attribute {
            xpath: "/iq[".to_string(),
            attribute: "id".to_string(),
        };
        assert!(matches!(
            broken.validate(&SxdEvaluator),
            Err(MatchError::MalformedQuery { .. })
        ));
        assert_eq!(broken.query().as_deref(), Some("/iq[/@id"));
        let literal = Extractor::Literal {
            value: "[".to_string(),
        };
        assert!(literal.validate(&SxdEvaluator).is_ok());
        assert!(literal.query().is_none());
    }

    #[test]
    fn test_text_extraction() {
        let stanza = Stanza::new("<message><body>hello</body></message>");
        let extractor = Extractor::Text {
            xpath: "/message/body".to_string(),
        };
        assert_eq!(extractor.extract(Some(&stanza), &SxdEvaluator).unwrap(), "hello");
    }

    #[test]
    fn test_missing_attribute_is_a_step_error() {
        let stanza = Stanza::new("<iq/>");
        let extractor = Extractor::Attribute {
            xpath: "/iq".to_string(),
            attribute: "id".to_string(),
        };
        assert!(matches!(
            extractor.extract(Some(&stanza), &SxdEvaluator),
            Err(HarnessError::Step(_))
        ));
    }

    #[test]
    fn test_stanza_extractor_without_stanza() {
        let extractor = Extractor::Text {
            xpath: "/a".to_string(),
        };
        assert!(extractor.needs_stanza());
        assert!(extractor.extract(None, &SxdEvaluator).is_err());
    }

    #[test]
    fn test_timestamp_layout() {
        let value = Extractor::TimestampPlus { seconds: -1 }
            .extract(None, &SxdEvaluator)
            .unwrap();
        assert_eq!(value.len(), "2016-01-01T00:00:00.967Z".len());
        assert!(value.ends_with(".967Z"));
        assert!(chrono::NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_apply_stores_value() {
        let mut saved = SavedValues::new();
        SaveValue::new(
            "greeting",
            Extractor::Literal {
                value: "hi".to_string(),
            },
        )
        .apply(None, &SxdEvaluator, &mut saved)
        .unwrap();
        assert_eq!(saved.get("greeting"), Some("hi"));
    }
}
