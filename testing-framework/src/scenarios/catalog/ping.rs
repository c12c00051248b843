// File: testing-framework/src/scenarios/catalog/ping.rs
//
// Self Ping and Version
//
// Pings and version requests a user sends to its own in-room JID. The
// gateway reflects them back to the user's resources and answers the
// original request once one of them replies.

use super::{first_join, jid_one, join_foo, join_presence, self_join_burst, FOO};
use crate::config::ConfigVariant;
use crate::expectation::{Extractor, SaveValue};
use crate::scenarios::sequences::{handshake_sequence, ConnectionOptions};
use crate::scenarios::step::Step;
use crate::scenarios::Scenario;
use crate::steps;

/// Save an attribute of the consumed iq
fn iq_attribute(name: &str) -> SaveValue {
    SaveValue::new(
        name,
        Extractor::Attribute {
            xpath: "/iq".to_string(),
            attribute: name.to_string(),
        },
    )
}

fn self_ping(id: &str, from: &str, room: &str) -> Step {
    Step::send(format!(
        "<iq type='get' from='{}' id='{}' to='{}/{{nick_one}}'><ping xmlns='urn:xmpp:ping' /></iq>",
        from, id, room
    ))
}

/// Ping answered by the gateway on behalf of `{nick_one}` in `room`
fn ping_answered(id: &str, room: &str, to: &str) -> Step {
    Step::expect([format!(
        "/iq[@from='{}/{{nick_one}}'][@type='result'][@to='{}'][@id='{}']",
        room, to, id
    )])
}

/// The reflected ping request the gateway sends to `{jid_one}/{resource_one}`
const REFLECTED_PING: &str =
    "/iq[@from='{lower_nick_one}%{irc_server_one}'][@type='get'][@to='{jid_one}/{resource_one}'][@id='gnip_tsrif']";

fn ping_error_reply(condition: &str) -> Step {
    Step::send(format!(
        "<iq from='{{jid_one}}/{{resource_one}}' id='gnip_tsrif' to='{{lower_nick_one}}%{{irc_server_one}}' type='error'><error type='cancel'><{} xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error></iq>",
        condition
    ))
}

pub fn self_ping_with_error() -> Scenario {
    Scenario::new(
        "self_ping_with_error",
        steps![
            handshake_sequence(),
            join_foo(),
            // Any error reply except a timeout still proves the user is there
            self_ping("first_ping", jid_one(), FOO),
            Step::expect([REFLECTED_PING]),
            ping_error_reply("feature-not-implemented"),
            ping_answered("first_ping", FOO, jid_one()),
            self_ping("first_ping", jid_one(), FOO),
            Step::expect([REFLECTED_PING]),
            ping_error_reply("service-unavailable"),
            ping_answered("first_ping", FOO, jid_one()),
        ],
    )
}

pub fn self_ping_not_in_muc() -> Scenario {
    Scenario::new(
        "self_ping_not_in_muc",
        steps![
            handshake_sequence(),
            join_foo(),
            // Room never joined
            self_ping("first_ping", jid_one(), "#nil%{irc_server_one}"),
            Step::expect(["/iq[@from='#nil%{irc_server_one}/{nick_one}'][@type='error'][@to='{jid_one}/{resource_one}'][@id='first_ping']/error/stanza:not-allowed"]),
            // Room joined, but not from this resource
            self_ping("first_ping", "{jid_one}/{resource_two}", FOO),
            Step::expect(["/iq[@from='#foo%{irc_server_one}/{nick_one}'][@type='error'][@to='{jid_one}/{resource_two}'][@id='first_ping']/error/stanza:not-allowed"]),
        ],
    )
}

/// Ping from `from` once two resources share the nick: the reflected
/// request may go to either, so its `to` is saved and used to reply
fn self_ping_from_either(id: &str, reflected_id: &str, from: &str) -> Vec<Step> {
    vec![
        self_ping(id, from, FOO),
        Step::expect_then(
            [format!(
                "/iq[@from='{{lower_nick_one}}%{{irc_server_one}}'][@type='get'][@to][@id='{}']",
                reflected_id
            )],
            vec![iq_attribute("to")],
        ),
        Step::send(format!(
            "<iq type='result' to='{{lower_nick_one}}%{{irc_server_one}}' id='{}' from='{{to}}'/>",
            reflected_id
        )),
        ping_answered(id, FOO, from),
    ]
}

pub fn self_ping_on_real_channel() -> Scenario {
    Scenario::new(
        "self_ping_on_real_channel",
        steps![
            handshake_sequence(),
            join_foo(),
            self_ping("first_ping", jid_one(), FOO),
            Step::expect([REFLECTED_PING]),
            Step::send("<iq type='result' to='{lower_nick_one}%{irc_server_one}' id='gnip_tsrif' from='{jid_one}/{resource_one}'/>"),
            ping_answered("first_ping", FOO, jid_one()),
            // Second resource behind the same nick
            join_presence("{jid_one}/{resource_two}", "#foo%{irc_server_one}/{nick_one}"),
            self_join_burst(FOO, "{jid_one}/{resource_two}"),
            self_ping_from_either("second_ping", "gnip_dnoces", jid_one()),
            self_ping_from_either("third_ping", "gnip_driht", "{jid_one}/{resource_two}"),
        ],
    )
}

pub fn self_ping_fixed_server() -> Scenario {
    Scenario::new(
        "self_ping_fixed_server",
        steps![
            handshake_sequence(),
            first_join("#foo", "#foo@{biboumi_host}", ConnectionOptions::fixed_server()),
            self_ping("first_ping", jid_one(), "#foo@{biboumi_host}"),
            Step::expect(["/iq[@from='{lower_nick_one}@{biboumi_host}'][@type='get'][@to='{jid_one}/{resource_one}'][@id='gnip_tsrif']"]),
            Step::send("<iq type='result' to='{lower_nick_one}@{biboumi_host}' id='gnip_tsrif' from='{jid_one}/{resource_one}'/>"),
            ping_answered("first_ping", "#foo@{biboumi_host}", jid_one()),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

const VERSION_REPLY: &str = "<query xmlns='jabber:iq:version'><name>e2e test</name><version>1.0</version><os>Fedora</os></query>";

fn version_request(id: &str, from: &str, to: &str) -> Step {
    Step::send(format!(
        "<iq type='get' from='{}' id='{}' to='{}'><query xmlns='jabber:iq:version' /></iq>",
        from, id, to
    ))
}

/// Reply to the reflected request saved as `{id}`, from `from`
fn version_reply(from: &str) -> Step {
    Step::send(format!(
        "<iq type='result' to='{{lower_nick_one}}%{{irc_server_one}}' id='{{id}}' from='{}'>{}</iq>",
        from, VERSION_REPLY
    ))
}

/// Version request once two resources share the nick
fn self_version_from_either(from: &str) -> Vec<Step> {
    vec![
        version_request("second_version", from, "#foo%{irc_server_one}/{nick_one}"),
        Step::expect_then(
            ["/iq[@from='{lower_nick_one}%{irc_server_one}'][@type='get'][@to]"],
            vec![iq_attribute("to"), iq_attribute("id")],
        ),
        version_reply("{to}"),
        Step::expect([format!(
            "/iq[@from='#foo%{{irc_server_one}}/{{nick_one}}'][@type='result'][@to='{}'][@id='second_version']",
            from
        )]),
    ]
}

pub fn self_version() -> Scenario {
    Scenario::new(
        "self_version",
        steps![
            handshake_sequence(),
            join_foo(),
            version_request("first_version", jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            Step::expect_then(
                ["/iq[@from='{lower_nick_one}%{irc_server_one}'][@type='get'][@to='{jid_one}/{resource_one}']"],
                vec![iq_attribute("id")],
            ),
            version_reply(jid_one()),
            Step::expect(["/iq[@from='#foo%{irc_server_one}/{nick_one}'][@type='result'][@to='{jid_one}/{resource_one}'][@id='first_version']/version:query/version:name[text()='e2e test (through the biboumi gateway) 1.0 Fedora']"]),
            join_presence("{jid_one}/{resource_two}", "#foo%{irc_server_one}/{nick_one}"),
            self_join_burst(FOO, "{jid_one}/{resource_two}"),
            self_version_from_either("{jid_one}/{resource_two}"),
            self_version_from_either(jid_one()),
        ],
    )
}

pub fn version_on_global_nick() -> Scenario {
    Scenario::new(
        "version_on_global_nick",
        steps![
            handshake_sequence(),
            join_foo(),
            version_request("first_version", jid_one(), "{lower_nick_one}%{irc_server_one}"),
            Step::expect_then(
                ["/iq[@from='{lower_nick_one}%{irc_server_one}'][@type='get'][@to='{jid_one}/{resource_one}']"],
                vec![iq_attribute("id")],
            ),
            version_reply(jid_one()),
            Step::expect(["/iq[@from='{lower_nick_one}%{irc_server_one}'][@type='result'][@to='{jid_one}/{resource_one}'][@id='first_version']/version:query/version:name[text()='e2e test (through the biboumi gateway) 1.0 Fedora']"]),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_uses_saved_recipient() {
        let steps = self_ping_from_either("second_ping", "gnip_dnoces", jid_one());
        assert_eq!(steps.len(), 4);
        match &steps[1] {
            Step::Expect { after, .. } => assert_eq!(after, &vec![iq_attribute("to")]),
            other => panic!("unexpected step: {}", other),
        }
        assert!(matches!(&steps[2], Step::Send { text } if text.contains("from='{to}'")));
    }
}
