// File: testing-framework/src/scenarios/sequences.rs
//
// Reusable Step Sequences
//
// Helper sequences shared by many scenarios: the component handshake and the
// long series of server notices the gateway relays while it connects a user
// to the local IRC server. The `jid` arguments are templates themselves
// (e.g. `{jid_one}/{resource_one}`) and are rendered with the rest of the
// predicate when the expectation is installed.

use super::step::Step;

/// Notices the IRC server sends during registration, in no fixed order
const REGISTRATION_NOTICES: &str = r"(\*\*\* Checking Ident|\*\*\* Looking up your hostname\.\.\.|\*\*\* Found your hostname: .*|ACK multi-prefix|\*\*\* Got Ident response)";

const MOTD: &str = "- This is charybdis MOTD you might replace it, but if not your friends will\n- laugh at you.\n";

/// Options for the connection sequences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// The user is subscribed to the IRC server's presence
    pub expected_irc_presence: bool,
    /// The gateway runs with a fixed IRC server, so notices come from the
    /// gateway's own address
    pub fixed_irc_server: bool,
}

impl ConnectionOptions {
    pub fn fixed_server() -> Self {
        Self {
            fixed_irc_server: true,
            ..Self::default()
        }
    }

    pub fn with_irc_presence() -> Self {
        Self {
            expected_irc_presence: true,
            ..Self::default()
        }
    }
}

/// Builds the two predicate shapes for notices addressed to `jid`
struct NoticeXPath {
    prefix: String,
}

impl NoticeXPath {
    fn new(irc_host: &str, jid: &str, fixed_irc_server: bool) -> Self {
        let from = if fixed_irc_server {
            "{biboumi_host}".to_string()
        } else {
            format!("{}@{{biboumi_host}}", irc_host)
        };
        Self {
            prefix: format!("/message[@to='{}'][@from='{}']/body", jid, from),
        }
    }

    fn text(&self, body: &str) -> String {
        format!("{}[text()='{}']", self.prefix, body)
    }

    fn regex(&self, pattern: &str) -> String {
        format!("{}[re:test(text(), '{}')]", self.prefix, pattern)
    }
}

/// The gateway opens the stream; the harness answers with an empty
/// handshake.
pub fn handshake_sequence() -> Vec<Step> {
    vec![
        Step::expect(["//handshake"]),
        Step::send("<handshake xmlns='jabber:component:accept'/>"),
    ]
}

/// Plain-text connection attempts up to the registration notices
pub fn connection_begin_sequence(irc_host: &str, jid: &str, options: ConnectionOptions) -> Vec<Step> {
    let xpath = NoticeXPath::new(irc_host, jid, options.fixed_irc_server);
    let mut steps = vec![
        Step::expect([
            xpath.text(&format!("Connecting to {}:6697 (encrypted)", irc_host)),
            "/message/hints:no-copy".to_string(),
            "/message/carbon:private".to_string(),
        ]),
        Step::expect([xpath.text("Connection failed: Connection refused")]),
        Step::expect([xpath.text(&format!("Connecting to {}:6670 (encrypted)", irc_host))]),
        Step::expect([xpath.text("Connection failed: Connection refused")]),
        Step::expect([xpath.text(&format!("Connecting to {}:6667 (not encrypted)", irc_host))]),
        Step::expect([xpath.text("Connected to IRC server.")]),
    ];

    if options.expected_irc_presence {
        steps.push(Step::expect([format!(
            "/presence[@from='{}@{{biboumi_host}}']",
            irc_host
        )]));
    }

    steps.extend(registration_notices(&xpath));
    steps
}

/// TLS connection to port 7778 up to the registration notices
pub fn connection_tls_begin_sequence(irc_host: &str, jid: &str, options: ConnectionOptions) -> Vec<Step> {
    let xpath = NoticeXPath::new(irc_host, jid, options.fixed_irc_server);
    let mut steps = vec![
        Step::expect([
            xpath.text("Connecting to irc.localhost:7778 (encrypted)"),
            "/message/hints:no-copy".to_string(),
            "/message/carbon:private".to_string(),
        ]),
        Step::expect([xpath.text("Connected to IRC server (encrypted).")]),
    ];
    steps.extend(registration_notices(&xpath));
    steps
}

fn registration_notices(xpath: &NoticeXPath) -> Vec<Step> {
    let pattern = format!("^irc.localhost: {}$", REGISTRATION_NOTICES);
    (0..5).map(|_| Step::expect([xpath.regex(&pattern)])).collect()
}

pub fn connection_middle_sequence(irc_host: &str, jid: &str, options: ConnectionOptions) -> Vec<Step> {
    let xpath = NoticeXPath::new(irc_host, jid, options.fixed_irc_server);
    vec![Step::expect([
        xpath.regex(r"^irc.localhost: \*\*\* You are exempt from flood limits$"),
    ])]
}

/// Welcome burst, LUSERS output and the MOTD
pub fn connection_end_sequence(irc_host: &str, jid: &str, options: ConnectionOptions) -> Vec<Step> {
    let xpath = NoticeXPath::new(irc_host, jid, options.fixed_irc_server);
    vec![
        Step::expect([xpath.regex(r"^irc.localhost: Your host is .*$")]),
        Step::expect([xpath.regex(r"^irc.localhost: This server was created .*$")]),
        Step::expect([xpath.regex(
            r"^irc.localhost: There are \d+ users and \d+ invisible on \d+ servers$",
        )]),
        Step::expect_optional([xpath.regex(r"^irc.localhost: \d+ unknown connection\(s\)$")]),
        Step::expect_optional([xpath.regex(r"^irc.localhost: \d+ channels formed$")]),
        Step::expect([xpath.regex(r"^irc.localhost: I have \d+ clients and \d+ servers$")]),
        Step::expect([xpath.regex(
            r"^irc.localhost: \d+ \d+ Current local users \d+, max \d+$",
        )]),
        Step::expect([xpath.regex(
            r"^irc.localhost: \d+ \d+ Current global users \d+, max \d+$",
        )]),
        Step::expect([xpath.regex(
            r"^irc.localhost: Highest connection count: \d+ \(\d+ clients\) \(\d+ connections received\)$",
        )]),
        Step::expect([xpath.text(MOTD)]),
        Step::expect([xpath.regex(r"^User mode for \w+ is \[\+Z?i\]$")]),
    ]
}

/// Everything the gateway relays while connecting `jid` in plain text
pub fn connection_sequence(irc_host: &str, jid: &str, options: ConnectionOptions) -> Vec<Step> {
    let mut steps = connection_begin_sequence(irc_host, jid, options);
    steps.extend(connection_middle_sequence(irc_host, jid, options));
    steps.extend(connection_end_sequence(irc_host, jid, options));
    steps
}

/// Everything the gateway relays while connecting `jid` over TLS
pub fn connection_tls_sequence(irc_host: &str, jid: &str, options: ConnectionOptions) -> Vec<Step> {
    let mut steps = connection_tls_begin_sequence(irc_host, jid, options);
    steps.extend(connection_middle_sequence(irc_host, jid, options));
    steps.extend(connection_end_sequence(irc_host, jid, options));
    steps
}

/// First user joins `#channel`, connecting to the IRC server on the way
///
/// Ends after the mode message, the self-presence and the empty subject.
pub fn channel_join_sequence(channel: &str) -> Vec<Step> {
    let mut steps = vec![Step::send(format!(
        "<presence from='{{jid_one}}/{{resource_one}}' to='#{}%{{irc_server_one}}/{{nick_one}}' />",
        channel
    ))];
    steps.extend(connection_sequence(
        "irc.localhost",
        "{jid_one}/{resource_one}",
        ConnectionOptions::default(),
    ));
    steps.push(Step::expect([format!(
        "/message/body[text()='Mode #{} [+nt] by {{irc_host_one}}']",
        channel
    )]));
    steps.push(Step::expect([
        format!(
            "/presence[@to='{{jid_one}}/{{resource_one}}'][@from='#{}%{{irc_server_one}}/{{nick_one}}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
            channel
        ),
        "/presence/muc_user:x/muc_user:status[@code='110']".to_string(),
    ]));
    steps.push(Step::expect([format!(
        "/message[@from='#{}%{{irc_server_one}}'][@type='groupchat']/subject[not(text())]",
        channel
    )]));
    steps
}
