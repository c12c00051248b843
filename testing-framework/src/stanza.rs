//! Serialized stanzas as exchanged with the gateway component

use std::fmt;

/// Default namespace of the component stream; stripped so that scenario
/// queries address top-level elements without a prefix.
pub const COMPONENT_NS: &str = "jabber:component:accept";

/// One complete stanza, kept in its serialized form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    text: String,
}

impl Stanza {
    /// Wraps a serialized stanza, removing the component stream's default
    /// namespace declaration from the root element if present.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            text: strip_root_namespace(&text),
        }
    }

    /// Serialized form used for matching and diagnostics
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Stanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Stanza {
    fn from(text: &str) -> Self {
        Stanza::new(text)
    }
}

impl From<String> for Stanza {
    fn from(text: String) -> Self {
        Stanza::new(text)
    }
}

fn strip_root_namespace(text: &str) -> String {
    let Some(tag_end) = text.find('>') else {
        return text.to_string();
    };
    let head = &text[..tag_end];
    for quote in ['"', '\''] {
        let decl = format!(" xmlns={quote}{COMPONENT_NS}{quote}");
        if let Some(pos) = head.find(&decl) {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..pos]);
            out.push_str(&text[pos + decl.len()..]);
            return out;
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_component_namespace_from_root_only() {
        let stanza = Stanza::new(
            "<message xmlns=\"jabber:component:accept\" to=\"a@b\"><x xmlns='jabber:x:data'/></message>",
        );
        assert_eq!(
            stanza.as_str(),
            "<message to=\"a@b\"><x xmlns='jabber:x:data'/></message>"
        );
    }

    #[test]
    fn test_single_quoted_namespace() {
        let stanza = Stanza::new("<handshake xmlns='jabber:component:accept'/>");
        assert_eq!(stanza.as_str(), "<handshake/>");
    }

    #[test]
    fn test_other_namespaces_are_kept() {
        let raw = "<iq xmlns='jabber:client' type='result'/>";
        assert_eq!(Stanza::new(raw).as_str(), raw);
    }
}
