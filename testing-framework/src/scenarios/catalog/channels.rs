// File: testing-framework/src/scenarios/catalog/channels.rs
//
// Channel Traffic
//
// Messages, private messages, mode changes, invitations and persistence of
// IRC channels joined through the gateway.

use super::{
    connect, first_join, jid_one, join_foo, join_presence, leave_presence,
    second_user_join_burst, self_join_burst, FOO,
};
use crate::scenarios::sequences::{handshake_sequence, ConnectionOptions};
use crate::scenarios::step::Step;
use crate::scenarios::Scenario;
use crate::steps;

const PERSISTENT_FIELD: &str =
    "/iq[@type='result']/muc_owner:query/dataform:x/dataform:field[@var='persistent'][@type='boolean']";

/// Read the persistent flag of `#foo`, expecting `current`
fn check_persistent(current: &str) -> Vec<Step> {
    vec![
        Step::send("<iq from='{jid_one}/{resource_one}' id='conf1' to='#foo%{irc_server_one}' type='get'><query xmlns='http://jabber.org/protocol/muc#owner'/></iq>"),
        Step::expect([format!("{}/dataform:value[text()='{}']", PERSISTENT_FIELD, current)]),
    ]
}

/// Turn `#foo` into a persistent channel through the MUC owner form
fn make_persistent() -> Vec<Step> {
    steps![
        check_persistent("false"),
        Step::send("<iq from='{jid_one}/{resource_one}' id='conf2' to='#foo%{irc_server_one}' type='set'><query xmlns='http://jabber.org/protocol/muc#owner'><x type='submit' xmlns='jabber:x:data'><field var='persistent' xmlns='jabber:x:data'><value>true</value></field></x></query></iq>"),
        Step::expect(["/iq[@type='result']"]),
    ]
}

/// Second user joins `#foo` from `{jid_two}/{resource_one}`, loosely matched
fn second_participant_joins() -> Vec<Step> {
    steps![
        join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
        connect("{jid_two}/{resource_one}"),
        Step::expect_unordered(vec![
            vec!["/presence/muc_user:x/muc_user:item[@affiliation='none'][@role='participant']"],
            vec!["/presence/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']"],
            vec!["/presence/muc_user:x/muc_user:status[@code='110']"],
            vec!["/message/subject"],
        ]),
    ]
}

/// Private message round trip between the two users while `{nick_one}` is
/// in `room`; replies come back from the in-room JID
fn private_round_trip(room: &str, outgoing: &str, reply: &str, reply_checks: &[&str]) -> Vec<Step> {
    let mut reply_predicates = vec![format!(
        "/message[@from='{}/{{nick_two}}'][@to='{{jid_one}}/{{resource_one}}'][@type='chat']/body[text()='{}']",
        room, reply
    )];
    reply_predicates.extend(reply_checks.iter().map(|check| check.to_string()));
    vec![
        Step::send(format!(
            "<message from='{{jid_one}}/{{resource_one}}' to='{}/{{nick_two}}' type='chat'><body>{}</body></message>",
            room, outgoing
        )),
        Step::expect([format!(
            "/message[@from='{{lower_nick_one}}%{{irc_server_one}}'][@to='{{jid_two}}/{{resource_one}}'][@type='chat']/body[text()='{}']",
            outgoing
        )]),
        Step::send(format!(
            "<message from='{{jid_two}}/{{resource_one}}' to='{{lower_nick_one}}%{{irc_server_one}}' type='chat'><body>{}</body></message>",
            reply
        )),
        Step::expect(reply_predicates),
    ]
}

pub fn channel_messages() -> Scenario {
    Scenario::new(
        "channel_messages",
        steps![
            handshake_sequence(),
            join_foo(),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            second_user_join_burst(),
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><body>coucou</body></message>"),
            Step::expect_unordered(vec![
                vec![
                    "/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='coucou']",
                    "/message/stable_id:stanza-id[@by='#foo%{irc_server_one}'][@id]",
                ],
                vec![
                    "/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_two}/{resource_one}'][@type='groupchat']/body[text()='coucou']",
                    "/message/stable_id:stanza-id[@by='#foo%{irc_server_one}'][@id]",
                ],
            ]),
            private_round_trip(FOO, "coucou in private", "yes", &["/message/muc_user:x"]),
            // Same exchange from another channel: the reply must come from
            // that channel's JID
            join_presence(jid_one(), "#dummy%{irc_server_one}/{nick_one}"),
            Step::expect(["/message"]),
            Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
            Step::expect(["/message[@from='#dummy%{irc_server_one}'][@type='groupchat']/subject"]),
            private_round_trip("#dummy%{irc_server_one}", "re in private", "re", &[]),
            // Once out of the room, replies come from the server-wide JID again
            leave_presence(jid_one(), "#dummy%{irc_server_one}/{nick_one}"),
            Step::expect(["/presence[@type='unavailable']/muc_user:x/muc_user:status[@code='110']"]),
            Step::send("<message from='{jid_two}/{resource_one}' to='{lower_nick_one}%{irc_server_one}' type='chat'><body>hihihoho</body></message>"),
            Step::expect(["/message[@from='{lower_nick_two}%{irc_server_one}'][@to='{jid_one}/{resource_one}']"]),
        ],
    )
}

pub fn muc_message_from_unjoined_resource() -> Scenario {
    Scenario::new(
        "muc_message_from_unjoined_resource",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            Step::expect(["/message/body[text()='Mode #foo [+nt] by {irc_host_one}']"]),
            Step::expect(["/presence"]),
            Step::expect(["/message/subject"]),
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><body>coucou</body></message>"),
            Step::expect([
                "/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='coucou']",
                "/message/stable_id:stanza-id[@by='#foo%{irc_server_one}'][@id]",
            ]),
            Step::send("<message from='{jid_one}/{resource_two}' to='#foo%{irc_server_one}' type='groupchat'><body>coucou</body></message>"),
            Step::expect([
                "/message[@type='error']/error[@type='modify']/stanza:text[text()='You are not a participant in this room.']",
                "/message/error/stanza:not-acceptable",
            ]),
        ],
    )
}

pub fn encoded_channel_join() -> Scenario {
    Scenario::new(
        "encoded_channel_join",
        steps![
            handshake_sequence(),
            first_join(
                "#biboumi@louiz.org:80",
                "#biboumi\\40louiz.org\\3a80%{irc_server_one}",
                ConnectionOptions::default(),
            ),
        ],
    )
}

pub fn channel_join_with_different_nick() -> Scenario {
    Scenario::new(
        "channel_join_with_different_nick",
        steps![
            handshake_sequence(),
            join_foo(),
            // The requested nick is ignored: the IRC connection keeps its own
            join_presence(jid_one(), "#bar%{irc_server_one}/{nick_two}"),
            Step::expect(["/message/body[text()='Mode #bar [+nt] by {irc_host_one}']"]),
            self_join_burst("#bar%{irc_server_one}", jid_one()),
        ],
    )
}

/// Mode message and the matching affiliation change, seen by both users
fn mode_change_seen_by_both(mode: &str, affiliation: &str, role: &str) -> Vec<Vec<String>> {
    let mut alternatives: Vec<Vec<String>> = ["{jid_one}", "{jid_two}"]
        .iter()
        .map(|jid| {
            vec![format!(
                "/message[@to='{}/{{resource_one}}']/body[text()='Mode #foo [{}] by {{nick_one}}']",
                jid, mode
            )]
        })
        .collect();
    alternatives.extend(["{jid_two}", "{jid_one}"].iter().map(|jid| {
        vec![format!(
            "/presence[@to='{}/{{resource_one}}'][@from='#foo%{{irc_server_one}}/{{nick_two}}']/muc_user:x/muc_user:item[@affiliation='{}'][@role='{}']",
            jid, affiliation, role
        )]
    }));
    alternatives
}

const MODE_IQ_RESULT: &str =
    "/iq[@id='id1'][@type='result'][@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}']";

/// Admin request on `#foo` from `from`, with the item attributes given
fn muc_admin_set(from: &str, item: &str) -> Step {
    Step::send(format!(
        "<iq from='{}' id='id1' to='#foo%{{irc_server_one}}' type='set'><query xmlns='http://jabber.org/protocol/muc#admin'><item {}/></query></iq>",
        from, item
    ))
}

pub fn mode_change() -> Scenario {
    let with_result = |mut alternatives: Vec<Vec<String>>| {
        alternatives.push(vec![MODE_IQ_RESULT.to_string()]);
        alternatives
    };
    let refused = || {
        Step::expect_unordered(vec![
            vec!["/iq[@type='error']"],
            vec!["/message[@type='chat'][@to='{jid_two}/{resource_one}']"],
        ])
    };
    Scenario::new(
        "mode_change",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            Step::expect(["/message"]),
            Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
            Step::expect(["/message[@type='groupchat']/subject"]),
            second_participant_joins(),
            // Raw /mode command in a channel message
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><body>/mode +v {nick_two}</body></message>"),
            Step::expect_unordered(mode_change_seen_by_both("+v {nick_two}", "member", "participant")),
            muc_admin_set(jid_one(), "affiliation='admin' nick='{nick_two}'"),
            Step::expect_unordered(with_result(mode_change_seen_by_both(
                "+o {nick_two}",
                "admin",
                "moderator",
            ))),
            muc_admin_set(jid_one(), "affiliation='member' nick='{nick_two}' role='participant'"),
            Step::expect_unordered(with_result(mode_change_seen_by_both(
                "+v-o {nick_two} {nick_two}",
                "member",
                "participant",
            ))),
            // Unknown nick
            muc_admin_set(jid_one(), "affiliation='admin' nick='blectre'"),
            Step::expect(["/iq[@type='error']"]),
            // Not an operator
            muc_admin_set("{jid_two}/{resource_one}", "affiliation='admin' nick='{nick_one}'"),
            refused(),
            // No IRC mode for this affiliation
            muc_admin_set("{jid_two}/{resource_one}", "affiliation='owner' nick='{nick_one}'"),
            refused(),
        ],
    )
}

pub fn persistent_channel() -> Scenario {
    Scenario::new(
        "persistent_channel",
        steps![
            handshake_sequence(),
            join_foo(),
            make_persistent(),
            check_persistent("true"),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            Step::expect_unordered(vec![
                vec!["/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']"],
                vec![
                    "/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']",
                    "/presence/muc_user:x/muc_user:status[@code='110']",
                ],
                vec!["/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']"],
            ]),
            Step::expect(["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"]),
            // The gateway stays in the channel, only the leaving user is told
            leave_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            Step::expect([
                "/presence[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='unavailable']/muc_user:x/muc_user:status[@code='110']",
                "/presence/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
            ]),
            Step::send("<message type='groupchat' from='{jid_two}/{resource_one}' to='#foo%{irc_server_one}'><body>coucou</body></message>"),
            Step::expect(["/message[@type='groupchat'][@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']"]),
            Step::send("<presence type='unavailable' from='{jid_two}/{resource_one}' to='#foo%{irc_server_one}/{nick_two}' />"),
            Step::expect(["/presence[@type='unavailable'][@from='#foo%{irc_server_one}/{nick_two}']"]),
        ],
    )
}

pub fn resource_is_removed_from_server_when_last_chan_is_left() -> Scenario {
    Scenario::new(
        "resource_is_removed_from_server_when_last_chan_is_left",
        steps![
            handshake_sequence(),
            join_foo(),
            make_persistent(),
            leave_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            Step::expect(["/presence[@type='unavailable'][@from='#foo%{irc_server_one}/{nick_one}']"]),
            // Same JID, other resource: the channel is still joined
            join_presence("{jid_one}/{resource_two}", "#foo%{irc_server_one}/{nick_one}"),
            self_join_burst(FOO, "{jid_one}/{resource_two}"),
            join_presence("{jid_two}/{resource_one}", "#bar%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            Step::expect(["/message/body[text()='Mode #bar [+nt] by {irc_host_one}']"]),
            Step::expect([
                "/presence[@to='{jid_two}/{resource_one}'][@from='#bar%{irc_server_one}/{nick_two}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
                "/presence/muc_user:x/muc_user:status[@code='110']",
            ]),
            Step::expect(["/message[@from='#bar%{irc_server_one}'][@type='groupchat'][@to='{jid_two}/{resource_one}']/subject[not(text())]"]),
            // Each private message arrives once: the left resource is gone
            Step::send("<message from='{jid_two}/{resource_one}' to='{lower_nick_one}%{irc_server_one}' type='chat'><body>kikoo</body></message>"),
            Step::send("<message from='{jid_two}/{resource_one}' to='{lower_nick_one}%{irc_server_one}' type='chat'><body>second kikoo</body></message>"),
            Step::expect(["/message/body[text()='kikoo']"]),
            Step::expect(["/message/body[text()='second kikoo']"]),
        ],
    )
}

pub fn self_invite() -> Scenario {
    Scenario::new(
        "self_invite",
        steps![
            handshake_sequence(),
            join_foo(),
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}'><x xmlns='http://jabber.org/protocol/muc#user'><invite to='{nick_one}'/></x></message>"),
            Step::expect(["/message/body[text()='{nick_one} is already on channel #foo']"]),
        ],
    )
}

pub fn invite_other() -> Scenario {
    Scenario::new(
        "invite_other",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            Step::expect(["/message"]),
            Step::expect(["/presence"]),
            Step::expect(["/message"]),
            join_presence("{jid_two}/{resource_two}", "#bar%{irc_server_one}@{biboumi_host}/{nick_two}"),
            connect("{jid_two}/{resource_two}"),
            Step::expect(["/message"]),
            Step::expect(["/presence"]),
            Step::expect(["/message"]),
            // An IRC nick is invited on IRC
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}'><x xmlns='http://jabber.org/protocol/muc#user'><invite to='{nick_two}'/></x></message>"),
            Step::expect(["/message/body[text()='{nick_two} has been invited to #foo']"]),
            Step::expect(["/message[@to='{jid_two}/{resource_two}'][@from='#foo%{irc_server_one}']/muc_user:x/muc_user:invite[@from='#foo%{irc_server_one}/{nick_one}']"]),
            // A JID gets a mediated XMPP invitation
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}'><x xmlns='http://jabber.org/protocol/muc#user'><invite to='bertrand@example.com'/></x></message>"),
            Step::expect(["/message[@to='bertrand@example.com'][@from='#foo%{irc_server_one}']/muc_user:x/muc_user:invite[@from='{jid_one}/{resource_one}']"]),
        ],
    )
}

pub fn client_error() -> Scenario {
    Scenario::new(
        "client_error",
        steps![
            handshake_sequence(),
            join_foo(),
            join_presence("{jid_one}/{resource_two}", "#foo%{irc_server_one}/{nick_one}"),
            self_join_burst(FOO, "{jid_one}/{resource_two}"),
            // An error bounced by the first resource makes it leave the room
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%%{irc_server_one}/{nick_one}' type='error'><error type='cancel'><recipient-unavailable xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error></message>"),
            Step::expect([
                "/presence[@type='unavailable'][@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}']/muc_user:x/muc_user:status[@code='110']",
                "/presence/status[text()='Biboumi note: 1 resources are still in this channel.']",
            ]),
        ],
    )
}
