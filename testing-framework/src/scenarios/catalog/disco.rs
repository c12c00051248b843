// File: testing-framework/src/scenarios/catalog/disco.rs
//
// Channel Service Discovery

use super::{join_foo, FOO};
use crate::config::ConfigVariant;
use crate::scenarios::sequences::handshake_sequence;
use crate::scenarios::step::Step;
use crate::scenarios::Scenario;
use crate::steps;

fn disco_info(id: &str, room: &str) -> Step {
    Step::send(format!(
        "<iq from='{{jid_one}}/{{resource_one}}' to='{}' id='{}' type='get'><query xmlns='http://jabber.org/protocol/disco#info'/></iq>",
        room, id
    ))
}

/// Identity and features every channel advertises
fn channel_identity(room: &str) -> Vec<String> {
    vec![
        format!(
            "/iq[@from='{}'][@to='{{jid_one}}/{{resource_one}}'][@type='result']/disco_info:query",
            room
        ),
        "/iq[@type='result']/disco_info:query/disco_info:identity[@category='conference'][@type='irc'][@name='#foo on {irc_host_one}']".to_string(),
        "/iq/disco_info:query/disco_info:feature[@var='jabber:iq:version']".to_string(),
        "/iq/disco_info:query/disco_info:feature[@var='http://jabber.org/protocol/commands']".to_string(),
        "/iq/disco_info:query/disco_info:feature[@var='urn:xmpp:ping']".to_string(),
        "/iq/disco_info:query/disco_info:feature[@var='urn:xmpp:mam:2']".to_string(),
    ]
}

const OCCUPANTS_FIELD: &str =
    "/iq/disco_info:query/dataform:x/dataform:field[@var='muc#roominfo_occupants']";

pub fn muc_traffic_info() -> Scenario {
    Scenario::new(
        "muc_traffic_info",
        steps![
            handshake_sequence(),
            Step::send("<iq from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' id='1' type='get'><query xmlns='http://jabber.org/protocol/disco#info' node='http://jabber.org/protocol/muc#traffic'/></iq>"),
            Step::expect(["/iq[@from='#foo%{irc_server_one}'][@to='{jid_one}/{resource_one}'][@type='result']/disco_info:query[@node='http://jabber.org/protocol/muc#traffic']"]),
        ],
    )
}

pub fn muc_disco_info() -> Scenario {
    let mut not_joined = channel_identity(FOO);
    // Occupants are only known once the gateway is in the channel
    not_joined.push(format!("!{}", OCCUPANTS_FIELD));
    Scenario::new(
        "muc_disco_info",
        steps![
            handshake_sequence(),
            disco_info("1", FOO),
            Step::expect(not_joined),
            join_foo(),
            disco_info("2", FOO),
            Step::expect([
                "/iq[@from='#foo%{irc_server_one}'][@to='{jid_one}/{resource_one}'][@type='result']/disco_info:query".to_string(),
                format!("{}/dataform:value[text()='1']", OCCUPANTS_FIELD),
                "/iq/disco_info:query/dataform:x/dataform:field[@var='FORM_TYPE'][@type='hidden']/dataform:value[text()='http://jabber.org/protocol/muc#roominfo']".to_string(),
            ]),
        ],
    )
}

pub fn fixed_muc_disco_info() -> Scenario {
    Scenario::new(
        "fixed_muc_disco_info",
        steps![
            handshake_sequence(),
            disco_info("1", "#foo@{biboumi_host}"),
            Step::expect(channel_identity("#foo@{biboumi_host}")),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}
