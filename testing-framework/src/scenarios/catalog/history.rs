// File: testing-framework/src/scenarios/catalog/history.rs
//
// Channel History and Archive Paging
//
// History replayed on join (with the MUC history limits) and MAM queries
// paged with RSM over a large archive.

use super::{disable_throttling, first_join, join_foo, send_channel_message, FOO};
use crate::config::ConfigVariant;
use crate::expectation::{Extractor, SaveValue};
use crate::scenarios::sequences::{connection_sequence, handshake_sequence, ConnectionOptions};
use crate::scenarios::step::Step;
use crate::scenarios::Scenario;
use crate::steps;
use std::time::Duration;

/// Own groupchat message echoed back in `room`
fn echoed(room: &str, body: &str) -> Step {
    Step::expect([format!(
        "/message[@from='{}/{{nick_one}}'][@to='{{jid_one}}/{{resource_one}}'][@type='groupchat']/body[text()='{}']",
        room, body
    )])
}

/// History message replayed on join
fn replayed(body: &str) -> Step {
    Step::expect([format!(
        "/message[@from='#foo%{{irc_server_one}}/{{nick_one}}'][@type='groupchat']/body[text()='{}']",
        body
    )])
}

fn leave_foo() -> Vec<Step> {
    vec![
        Step::send("<presence from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='unavailable' />"),
        Step::expect(["/presence[@type='unavailable']"]),
    ]
}

/// Join `#foo` again with `history` as the MUC history element, then expect
/// the replayed `bodies`
fn rejoin_with_history(history: &str, bodies: &[&str]) -> Vec<Step> {
    let mut steps = vec![
        Step::send(format!(
            "<presence from='{{jid_one}}/{{resource_one}}' to='#foo%{{irc_server_one}}/{{nick_one}}'><x xmlns='http://jabber.org/protocol/muc'>{}</x></presence>",
            history
        )),
        Step::expect(["/message"]),
        Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
    ];
    steps.extend(bodies.iter().map(|body| replayed(body)));
    steps.push(Step::expect(["/message/subject"]));
    steps
}

pub fn join_history_limits() -> Scenario {
    let pause = || Step::pause(Duration::from_millis(200));
    Scenario::new(
        "join_history_limits",
        steps![
            handshake_sequence(),
            // Timing based: no throttling
            disable_throttling(),
            join_foo(),
            send_channel_message("coucou"),
            Step::expect([
                "/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='coucou']",
                "/message/stable_id:stanza-id[@by='#foo%{irc_server_one}'][@id]",
            ]),
            send_channel_message("coucou 2"),
            echoed(FOO, "coucou 2"),
            Step::save_timestamp("first_timestamp", 1),
            Step::pause(Duration::from_secs(2)),
            send_channel_message("coucou 3"),
            send_channel_message("coucou 4"),
            Step::expect(["/message[@type='groupchat']/body[text()='coucou 3']"]),
            Step::expect(["/message[@type='groupchat']/body[text()='coucou 4']"]),
            Step::save_timestamp("second_timestamp", 1),
            // Stay connected to the server while #foo is left
            Step::send("<presence from='{jid_one}/{resource_one}' to='#DUMMY%{irc_server_one}/{nick_one}' />"),
            Step::expect(["/message"]),
            Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
            Step::expect(["/message/subject"]),
            leave_foo(),
            pause(),
            rejoin_with_history("<history maxchars='0'/>", &[]),
            leave_foo(),
            pause(),
            rejoin_with_history("<history maxstanzas='3'/>", &["coucou 2", "coucou 3", "coucou 4"]),
            leave_foo(),
            rejoin_with_history("<history since='{first_timestamp}'/>", &["coucou 3", "coucou 4"]),
            leave_foo(),
            rejoin_with_history("<history seconds='1'/>", &["coucou 3", "coucou 4"]),
            leave_foo(),
            rejoin_with_history(
                "<history seconds='5'/>",
                &["coucou", "coucou 2", "coucou 3", "coucou 4"],
            ),
            leave_foo(),
        ],
    )
}

/// Archived groupchat message of `{nick_one}` in `room`; any body when
/// `body` is `None`
fn archived_in(room: &str, queryid: &str, body: Option<&str>) -> Vec<String> {
    let body = match body {
        Some(text) => format!("client:body[text()='{}']", text),
        None => "client:body".to_string(),
    };
    vec![
        format!("/message/mam:result[@queryid='{}']/forward:forwarded/delay:delay", queryid),
        format!(
            "/message/mam:result[@queryid='{}']/forward:forwarded/client:message[@from='{}/{{nick_one}}'][@type='groupchat']/{}",
            queryid, room, body
        ),
    ]
}

/// Last archived message of a page, whose id is saved as `last_uuid`
fn last_of_page(queryid: &str, body: &str) -> Step {
    Step::expect_then(
        archived_in(FOO, queryid, Some(body)),
        vec![SaveValue::new(
            "last_uuid",
            Extractor::Attribute {
                xpath: "/message/mam:result".to_string(),
                attribute: "id".to_string(),
            },
        )],
    )
}

/// One page of the archive: the first and last bodies are checked, the
/// `between` messages in the middle only counted
fn archive_page(queryid: &str, first: &str, between: usize, last: &str) -> Vec<Step> {
    let mut steps = vec![Step::expect(archived_in(FOO, queryid, Some(first)))];
    steps.extend((0..between).map(|_| Step::expect(archived_in(FOO, queryid, None))));
    steps.push(last_of_page(queryid, last));
    steps
}

fn rsm_query(id: &str, queryid: &str, set: &str) -> Step {
    Step::send(format!(
        "<iq to='#foo%{{irc_server_one}}' from='{{jid_one}}/{{resource_one}}' type='set' id='{}'><query xmlns='urn:xmpp:mam:2' queryid='{}' ><set xmlns='http://jabber.org/protocol/rsm'>{}</set></query></iq>",
        id, queryid, set
    ))
}

/// Final iq of a page ending with `{last_uuid}`
fn page_fin(id: &str, complete: bool) -> Step {
    let complete = if complete {
        "/iq//mam:fin[@complete='true']"
    } else {
        "!/iq//mam:fin[@complete='true']"
    };
    Step::expect([
        format!(
            "/iq[@type='result'][@id='{}'][@from='#foo%{{irc_server_one}}'][@to='{{jid_one}}/{{resource_one}}']",
            id
        ),
        "/iq/mam:fin/rsm:set/rsm:last[text()='{last_uuid}']".to_string(),
        complete.to_string(),
        "/iq//mam:fin".to_string(),
    ])
}

const ARCHIVED_MESSAGES: usize = 150;

pub fn default_mam_limit() -> Scenario {
    let filling: Vec<Step> = (0..ARCHIVED_MESSAGES)
        .flat_map(|n| {
            let body = n.to_string();
            vec![send_channel_message(&body), echoed(FOO, &body)]
        })
        .collect();
    Scenario::new(
        "default_mam_limit",
        steps![
            handshake_sequence(),
            disable_throttling(),
            join_foo(),
            filling,
            // No restriction: the first 100 messages
            Step::send("<iq to='#foo%{irc_server_one}' from='{jid_one}/{resource_one}' type='set' id='id1'><query xmlns='urn:xmpp:mam:2' queryid='qid1' /></iq>"),
            archive_page("qid1", "0", 98, "99"),
            page_fin("id1", false),
            // Next page
            rsm_query("id2", "qid2", "<after>{last_uuid}</after>"),
            archive_page("qid2", "100", 48, "149"),
            page_fin("id2", true),
            rsm_query("id3", "qid3", "<after>DUMMY_ID</after>"),
            Step::expect(["/iq[@id='id3'][@type='error']/error[@type='cancel']/stanza:item-not-found"]),
            // Last page
            rsm_query("id3", "qid3", "<before></before>"),
            archive_page("qid3", "50", 98, "149"),
            page_fin("id3", false),
            // Just before the last message, limited
            rsm_query("id4", "qid4", "<before>{last_uuid}</before><max>2</max>"),
            Step::expect(archived_in(FOO, "qid4", Some("147"))),
            last_of_page("qid4", "148"),
            Step::expect([
                "/iq[@type='result'][@id='id4'][@from='#foo%{irc_server_one}'][@to='{jid_one}/{resource_one}']",
                "/iq/mam:fin/rsm:set/rsm:last[text()='{last_uuid}']",
                "!/iq/mam:fin[@complete='true']",
            ]),
            rsm_query("id5", "qid5", "<before></before><max>0</max>"),
            Step::expect([
                "/iq[@type='result'][@id='id5'][@from='#foo%{irc_server_one}'][@to='{jid_one}/{resource_one}']",
                "!/iq/mam:fin[@complete='true']",
            ]),
        ],
    )
}

pub fn mam_on_fixed_server() -> Scenario {
    let room = "#foo@{biboumi_host}";
    let send = |body: &str| {
        Step::send(format!(
            "<message from='{{jid_one}}/{{resource_one}}' to='{}' type='groupchat'><body>{}</body></message>",
            room, body
        ))
    };
    Scenario::new(
        "mam_on_fixed_server",
        steps![
            handshake_sequence(),
            first_join("#foo", room, ConnectionOptions::fixed_server()),
            send("coucou"),
            echoed(room, "coucou"),
            send("coucou 2"),
            echoed(room, "coucou 2"),
            Step::send("<iq to='#foo@{biboumi_host}' from='{jid_one}/{resource_one}' type='set' id='id1'><query xmlns='urn:xmpp:mam:2' queryid='qid1' /></iq>"),
            Step::expect(archived_in(room, "qid1", Some("coucou"))),
            Step::expect(archived_in(room, "qid1", Some("coucou 2"))),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

/// One message, then a second resource joins and gets it replayed
fn history_steps(room: &str, options: ConnectionOptions) -> Vec<Step> {
    let joined = |resource: &str| {
        Step::expect([
            format!(
                "/presence[@to='{{jid_one}}/{{{}}}'][@from='{}/{{nick_one}}']/muc_user:x/muc_user:item[@affiliation='admin'][@jid='~nick@localhost'][@role='moderator']",
                resource, room
            ),
            "/presence/muc_user:x/muc_user:status[@code='110']".to_string(),
        ])
    };
    let subject = || {
        Step::expect([format!(
            "/message[@from='{}'][@type='groupchat']/subject[not(text())]",
            room
        )])
    };
    steps![
        handshake_sequence(),
        Step::send(format!(
            "<presence from='{{jid_one}}/{{resource_one}}' to='{}/{{nick_one}}' />",
            room
        )),
        connection_sequence("irc.localhost", "{jid_one}/{resource_one}", options),
        Step::expect(["/message/body[text()='Mode #foo [+nt] by {irc_host_one}']"]),
        joined("resource_one"),
        subject(),
        Step::send(format!(
            "<message from='{{jid_one}}/{{resource_one}}' to='{}' type='groupchat'><body>coucou</body></message>",
            room
        )),
        echoed(room, "coucou"),
        Step::send(format!(
            "<presence from='{{jid_one}}/{{resource_two}}' to='{}/{{nick_one}}' />",
            room
        )),
        joined("resource_two"),
        Step::expect([
            format!("/message[@from='{}/{{nick_one}}']/body[text()='coucou']", room),
            format!("/message/delay:delay[@from='{}']", room),
        ]),
        subject(),
    ]
}

pub fn channel_history() -> Scenario {
    Scenario::new("channel_history", history_steps(FOO, ConnectionOptions::default()))
}

pub fn channel_history_on_fixed_server() -> Scenario {
    Scenario::new(
        "channel_history_on_fixed_server",
        history_steps("#foo@{biboumi_host}", ConnectionOptions::fixed_server()),
    )
    .with_config(ConfigVariant::FixedServer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_page_length() {
        let page = archive_page("qid1", "0", 98, "99");
        assert_eq!(page.len(), 100);
        assert!(matches!(page.last(), Some(Step::Expect { after, .. }) if after.len() == 1));
    }

    #[test]
    fn test_default_mam_limit_fills_the_archive() {
        let scenario = default_mam_limit();
        let bodies = scenario
            .steps
            .iter()
            .filter(|step| matches!(step, Step::Send { text } if text.contains("type='groupchat'><body>")))
            .count();
        assert_eq!(bodies, ARCHIVED_MESSAGES);
    }

    #[test]
    fn test_rejoin_replays_in_order() {
        let steps = rejoin_with_history("<history maxstanzas='3'/>", &["coucou 2", "coucou 3"]);
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[3], replayed("coucou 2"));
        assert_eq!(steps[4], replayed("coucou 3"));
    }
}
