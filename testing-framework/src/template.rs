// File: testing-framework/src/template.rs
//
// Template Substitution
//
// Outbound stanzas and predicate strings are `{name}` templates rendered over
// two namespaces: the fixed fixture table (identities, hosts, nicknames) and
// the values saved earlier in the same scenario run. `{{` and `}}` produce
// literal braces.

use crate::error::TemplateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Named constants available to every template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixtures {
    values: HashMap<String, String>,
}

impl Default for Fixtures {
    fn default() -> Self {
        let values = [
            ("irc_server_one", "irc.localhost@biboumi.localhost"),
            ("irc_server_two", "localhost@biboumi.localhost"),
            ("irc_host_one", "irc.localhost"),
            ("irc_host_two", "localhost"),
            ("biboumi_host", "biboumi.localhost"),
            ("resource_one", "resource1"),
            ("resource_two", "resource2"),
            ("nick_one", "Nick"),
            ("jid_one", "first@example.com"),
            ("jid_two", "second@example.com"),
            ("jid_admin", "admin@example.com"),
            ("nick_two", "Bobby"),
            ("nick_three", "Bernard"),
            ("lower_nick_one", "nick"),
            ("lower_nick_two", "bobby"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { values }
    }
}

impl Fixtures {
    /// Empty fixture table
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Add or replace a fixture
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Look up a fixture
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Values extracted from stanzas during one scenario run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedValues {
    values: BTreeMap<String, String>,
}

impl SavedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Render `template`, resolving keys in `saved` first, then in `fixtures`
pub fn render(
    template: &str,
    fixtures: &Fixtures,
    saved: &SavedValues,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(k) => key.push(k),
                        None => {
                            return Err(TemplateError::UnbalancedBrace {
                                brace: '{',
                                template: template.to_string(),
                            })
                        }
                    }
                }
                let value = saved.get(&key).or_else(|| fixtures.get(&key)).ok_or_else(|| {
                    TemplateError::MissingKey {
                        key: key.clone(),
                        template: template.to_string(),
                    }
                })?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(TemplateError::UnbalancedBrace {
                    brace: '}',
                    template: template.to_string(),
                })
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
