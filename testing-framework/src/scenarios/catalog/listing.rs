// File: testing-framework/src/scenarios/catalog/listing.rs
//
// Channel Lists
//
// Disco items on an IRC server JID list its channels, optionally paged with
// RSM. Channel names are escaped the way the gateway escapes them in JIDs.

use super::{
    connect, disable_throttling, first_join, jid_one, join_already_connected, join_foo,
    join_presence, leave_presence, loose_join_burst,
};
use crate::scenarios::sequences::{handshake_sequence, ConnectionOptions};
use crate::scenarios::step::Step;
use crate::scenarios::Scenario;
use crate::steps;

/// Disco items request on the first IRC server, with an optional RSM set
fn list_channels(id: &str, set: Option<&str>) -> Step {
    let set = set
        .map(|inner| format!("<set xmlns='http://jabber.org/protocol/rsm'>{}</set>", inner))
        .unwrap_or_default();
    Step::send(format!(
        "<iq from='{{jid_one}}/{{resource_one}}' id='{}' to='{{irc_server_one}}' type='get'><query xmlns='http://jabber.org/protocol/disco#items'>{}</query></iq>",
        id, set
    ))
}

fn listed(channel: &str) -> String {
    format!(
        "/iq/disco_items:query/disco_items:item[@jid='#{}%{{irc_server_one}}']",
        channel
    )
}

/// A page of the channel list: its items, the RSM bounds and, once the
/// gateway knows it, the total count
fn channel_page(channels: &[&str], first_index: usize, count: Option<usize>) -> Step {
    let mut predicates = vec!["/iq[@type='result']/disco_items:query".to_string()];
    predicates.extend(channels.iter().map(|channel| listed(channel)));
    if let (Some(first), Some(last)) = (channels.first(), channels.last()) {
        predicates.push(format!(
            "/iq/disco_items:query/rsm:set/rsm:first[text()='#{}%{{irc_server_one}}'][@index='{}']",
            first, first_index
        ));
        predicates.push(format!(
            "/iq/disco_items:query/rsm:set/rsm:last[text()='#{}%{{irc_server_one}}']",
            last
        ));
    }
    if let Some(count) = count {
        predicates.push(format!("/iq/disco_items:query/rsm:set/rsm:count[text()='{}']", count));
    }
    Step::expect(predicates)
}

/// Join `#channel` once already connected, checking the mode message and
/// the subject
fn join_another(channel: &str) -> Vec<Step> {
    vec![
        join_presence(jid_one(), &format!("#{}%{{irc_server_one}}/{{nick_one}}", channel)),
        Step::expect([format!(
            "/message/body[text()='Mode #{} [+nt] by {{irc_host_one}}']",
            channel
        )]),
        Step::expect(["/presence"]),
        Step::expect([format!(
            "/message[@from='#{}%{{irc_server_one}}'][@type='groupchat']/subject[not(text())]",
            channel
        )]),
    ]
}

pub fn simple_channel_list() -> Scenario {
    Scenario::new(
        "simple_channel_list",
        steps![
            handshake_sequence(),
            join_foo(),
            join_another("bar"),
            list_channels("id1", None),
            Step::expect([
                "/iq[@type='result']/disco_items:query".to_string(),
                listed("foo"),
                listed("bar"),
            ]),
        ],
    )
}

pub fn channel_list_escaping() -> Scenario {
    Scenario::new(
        "channel_list_escaping",
        steps![
            handshake_sequence(),
            first_join(
                "#true/false",
                "#true\\2ffalse%{irc_server_one}",
                ConnectionOptions::default(),
            ),
        ],
    )
}

pub fn channel_list_with_rsm() -> Scenario {
    Scenario::new(
        "channel_list_with_rsm",
        steps![
            handshake_sequence(),
            join_foo(),
            join_another("bar"),
            join_another("coucou"),
            list_channels("id1", Some("<max>0</max>")),
            Step::expect(["/iq[@type='result']/disco_items:query"]),
            // The gateway does not have the whole list yet, so no count
            list_channels("id1", Some("<max>2</max>")),
            channel_page(&["bar", "coucou"], 0, None),
            list_channels("id1", Some("<max>12</max>")),
            channel_page(&["bar", "coucou", "foo"], 0, Some(3)),
            list_channels("id1", Some("<after>#bar%{irc_server_one}</after><max>1</max>")),
            channel_page(&["coucou"], 1, Some(3)),
            list_channels("id1", Some("<after>#coucou%{irc_server_one}</after><max>1</max>")),
            channel_page(&["foo"], 2, Some(3)),
            // Past the end
            list_channels("id1", Some("<after>#foo%{irc_server_one}</after><max>1</max>")),
            channel_page(&[], 0, Some(3)),
        ],
    )
}

const CHANNELS_IN_LIST: usize = 110;

pub fn default_channel_list_limit() -> Scenario {
    let joins: Vec<Step> = (0..CHANNELS_IN_LIST)
        .flat_map(|n| {
            join_already_connected(jid_one(), &format!("#{}%{{irc_server_one}}/{{nick_one}}", n))
        })
        .collect();
    Scenario::new(
        "default_channel_list_limit",
        steps![
            handshake_sequence(),
            disable_throttling(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            loose_join_burst(),
            joins,
            list_channels("id1", None),
            // Alphabetic order from the IRC server: #foo comes last and
            // #99 after #109
            Step::expect([
                listed("0"),
                listed("1"),
                listed("109"),
                listed("9"),
                format!("!{}", listed("foo")),
                format!("!{}", listed("99")),
                format!("!{}", listed("90")),
            ]),
        ],
    )
}

const PAGED_CHANNELS: [&str; 10] = ["aaa", "bbb", "ccc", "ddd", "eee", "fff", "ggg", "hhh", "iii", "jjj"];

pub fn complete_channel_list_with_pages_of_3() -> Scenario {
    let mut steps = steps![
        handshake_sequence(),
        join_presence(jid_one(), "#aaa%{irc_server_one}/{nick_one}"),
        connect(jid_one()),
        loose_join_burst(),
    ];
    for channel in &PAGED_CHANNELS[1..] {
        steps.extend(join_already_connected(
            jid_one(),
            &format!("#{}%{{irc_server_one}}/{{nick_one}}", channel),
        ));
    }
    let mut after: Option<String> = None;
    for (index, page) in PAGED_CHANNELS.chunks(3).enumerate() {
        let set = match &after {
            Some(channel) => format!("<after>#{}%{{irc_server_one}}</after><max>3</max>", channel),
            None => "<max>3</max>".to_string(),
        };
        steps.push(list_channels("id", Some(&set)));
        // Only the last page knows the total
        let count = (page.len() < 3).then_some(PAGED_CHANNELS.len());
        steps.push(channel_page(page, index * 3, count));
        after = page.last().map(|channel| channel.to_string());
    }
    for channel in &PAGED_CHANNELS {
        steps.push(leave_presence(
            jid_one(),
            &format!("#{}%{{irc_server_one}}/{{nick_one}}", channel),
        ));
    }
    steps.extend(PAGED_CHANNELS.iter().map(|_| Step::expect(["/presence[@type='unavailable']"])));
    Scenario::new("complete_channel_list_with_pages_of_3", steps)
}
