// File: testing-framework/src/matcher/namespaces.rs
//
// Namespace prefix table
//
// Every query is evaluated with these prefixes bound. The table covers the
// protocol extensions the gateway speaks plus the EXSLT regular expression
// functions.

/// EXSLT regular-expressions namespace, bound to `re`
pub const EXSLT_REGEX_NS: &str = "http://exslt.org/regular-expressions";

/// `(prefix, namespace URI)` pairs available to every query
pub const NAMESPACES: &[(&str, &str)] = &[
    ("re", EXSLT_REGEX_NS),
    ("muc_user", "http://jabber.org/protocol/muc#user"),
    ("muc_owner", "http://jabber.org/protocol/muc#owner"),
    ("muc", "http://jabber.org/protocol/muc"),
    ("disco_info", "http://jabber.org/protocol/disco#info"),
    ("muc_traffic", "http://jabber.org/protocol/muc#traffic"),
    ("disco_items", "http://jabber.org/protocol/disco#items"),
    ("commands", "http://jabber.org/protocol/commands"),
    ("dataform", "jabber:x:data"),
    ("version", "jabber:iq:version"),
    ("mam", "urn:xmpp:mam:2"),
    ("rms", "http://jabber.org/protocol/rsm"),
    ("delay", "urn:xmpp:delay"),
    ("forward", "urn:xmpp:forward:0"),
    ("client", "jabber:client"),
    ("rsm", "http://jabber.org/protocol/rsm"),
    ("carbon", "urn:xmpp:carbons:2"),
    ("hints", "urn:xmpp:hints"),
    ("stanza", "urn:ietf:params:xml:ns:xmpp-stanzas"),
    ("stable_id", "urn:xmpp:sid:0"),
];

/// Namespace URI bound to `prefix`, if any
pub fn lookup(prefix: &str) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
}
