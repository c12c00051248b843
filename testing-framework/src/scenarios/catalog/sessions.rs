// File: testing-framework/src/scenarios/catalog/sessions.rs
//
// Multi-Resource Sessions
//
// One XMPP user behind several resources shares a single IRC connection:
// joins, nick changes, private messages and kicks fan out to every resource.

use super::{connect, jid_one, join_foo, join_presence, leave_presence, FOO};
use crate::scenarios::sequences::handshake_sequence;
use crate::scenarios::step::Step;
use crate::scenarios::Scenario;
use crate::steps;

/// Failed and successful nick changes seen from `{jid_one}/{resource}`
fn nick_change_seen_by(resource: &str) -> Vec<Vec<String>> {
    vec![
        vec![
            format!("/presence[@from='{FOO}/{{nick_one}}'][@to='{{jid_one}}/{{{resource}}}'][@type='unavailable']/muc_user:x/muc_user:item[@nick='Bernard']"),
            "/presence/muc_user:x/muc_user:status[@code='303']".to_string(),
            "/presence/muc_user:x/muc_user:status[@code='110']".to_string(),
        ],
        vec![
            format!("/presence[@from='{FOO}/{{nick_three}}'][@to='{{jid_one}}/{{{resource}}}']"),
            "/presence/muc_user:x/muc_user:status[@code='110']".to_string(),
        ],
    ]
}

pub fn multisessionnick() -> Scenario {
    let mut nick_change = vec![
        vec![
            "/presence[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_two}/{resource_one}'][@type='unavailable']/muc_user:x/muc_user:item[@nick='Bernard']".to_string(),
            "/presence/muc_user:x/muc_user:status[@code='303']".to_string(),
        ],
        vec!["/presence[@from='#foo%{irc_server_one}/{nick_three}'][@to='{jid_two}/{resource_one}']".to_string()],
    ];
    nick_change.extend(nick_change_seen_by("resource_one"));
    nick_change.extend(nick_change_seen_by("resource_two"));

    Scenario::new(
        "multisessionnick",
        steps![
            handshake_sequence(),
            join_foo(),
            // Second resource, same nick: only its own join comes back
            join_presence("{jid_one}/{resource_two}", "#foo%{irc_server_one}/{nick_one}"),
            Step::expect_unordered(vec![
                vec![
                    "/presence[@to='{jid_one}/{resource_two}'][@from='#foo%{irc_server_one}/{nick_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
                    "/presence/muc_user:x/muc_user:status[@code='110']",
                ],
                vec!["/message[@from='#foo%{irc_server_one}'][@type='groupchat'][@to='{jid_one}/{resource_two}']/subject[not(text())]"],
            ]),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            Step::expect_unordered(vec![
                vec!["/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']"],
                vec!["/presence[@to='{jid_one}/{resource_two}'][@from='#foo%{irc_server_one}/{nick_two}']"],
                vec![
                    "/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']",
                    "/presence/muc_user:x/muc_user:status[@code='110']",
                ],
                vec!["/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']"],
                vec!["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"],
            ]),
            // Private message through the room reaches both resources from
            // the server-wide JID
            Step::send("<message from='{jid_two}/{resource_one}' to='#foo%{irc_server_one}/{nick_one}' type='chat'><body>RELLO</body></message>"),
            Step::expect([
                "/message[@from='{lower_nick_two}%{irc_server_one}'][@to='{jid_one}/{resource_one}'][@type='chat']/body[text()='RELLO']",
                "/message/hints:no-copy",
                "/message/carbon:private",
                "!/message/muc_user:x",
            ]),
            Step::expect(["/message[@from='{lower_nick_two}%{irc_server_one}'][@to='{jid_one}/{resource_two}'][@type='chat']/body[text()='RELLO']"]),
            // Nick already taken
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_two}"),
            Step::expect_unordered(vec![
                vec!["/message[@to='{jid_one}/{resource_one}'][@type='chat']/body[text()='irc.localhost: Bobby: Nickname is already in use.']"],
                vec!["/message[@to='{jid_one}/{resource_two}'][@type='chat']/body[text()='irc.localhost: Bobby: Nickname is already in use.']"],
                vec!["/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}'][@type='error']"],
                vec!["/presence[@to='{jid_one}/{resource_two}'][@from='#foo%{irc_server_one}/{nick_two}'][@type='error']"],
            ]),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_three}"),
            Step::expect_unordered(nick_change),
            // One resource leaves: the others stay, so only it is told
            leave_presence("{jid_one}/{resource_two}", "#foo%{irc_server_one}/{nick_one}"),
            Step::expect([
                "/presence[@type='unavailable']/muc_user:x/muc_user:status[@code='110']",
                "/presence/status[text()='Biboumi note: 1 resources are still in this channel.']",
            ]),
            Step::send("<message from='{jid_two}/{resource_one}' to='#foo%{irc_server_one}/{nick_three}' type='chat'><body>first</body></message>"),
            Step::send("<message from='{jid_two}/{resource_one}' to='#foo%{irc_server_one}/{nick_three}' type='chat'><body>second</body></message>"),
            Step::expect_unordered(vec![
                vec!["/message[@from='{lower_nick_two}%{irc_server_one}'][@to='{jid_one}/{resource_one}'][@type='chat']/body[text()='first']"],
                vec!["/message[@from='{lower_nick_two}%{irc_server_one}'][@to='{jid_one}/{resource_one}'][@type='chat']/body[text()='second']"],
            ]),
        ],
    )
}

/// Kick notice delivered to one of the kicked user's resources
fn kicked(to: &str) -> Vec<String> {
    vec![
        format!("/presence[@type='unavailable'][@to='{}']/muc_user:x/muc_user:item[@role='none']/muc_user:actor[@nick='{{nick_one}}']", to),
        "/presence/muc_user:x/muc_user:item/muc_user:reason[text()='reported']".to_string(),
        "/presence/muc_user:x/muc_user:status[@code='307']".to_string(),
        "/presence/muc_user:x/muc_user:status[@code='110']".to_string(),
    ]
}

pub fn multisession_kick() -> Scenario {
    Scenario::new(
        "multisession_kick",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            Step::expect(["/message"]),
            Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
            Step::expect(["/message[@type='groupchat']/subject"]),
            // Second user, from two resources
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            Step::expect_unordered(vec![
                vec!["/presence/muc_user:x/muc_user:item[@affiliation='none'][@role='participant']"],
                vec!["/presence/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']"],
                vec!["/presence/muc_user:x/muc_user:status[@code='110']"],
                vec!["/message/subject"],
            ]),
            join_presence("{jid_two}/{resource_two}", "#foo%{irc_server_one}/{nick_two}"),
            Step::expect(["/presence[@to='{jid_two}/{resource_two}'][@from='#foo%{irc_server_one}/{nick_one}']"]),
            Step::expect([
                "/presence[@to='{jid_two}/{resource_two}'][@from='#foo%{irc_server_one}/{nick_two}']",
                "/presence/muc_user:x/muc_user:status[@code='110']",
            ]),
            Step::expect(["/message[@from='#foo%{irc_server_one}'][@type='groupchat'][@to='{jid_two}/{resource_two}']/subject[not(text())]"]),
            Step::send("<iq id='kick1' to='#foo%{irc_server_one}' from='{jid_one}/{resource_one}' type='set'><query xmlns='http://jabber.org/protocol/muc#admin'><item nick='{nick_two}' role='none'><reason>reported</reason></item></query></iq>"),
            Step::expect_unordered(vec![
                kicked("{jid_two}/{resource_one}"),
                kicked("{jid_two}/{resource_two}"),
                vec![
                    "/presence[@type='unavailable']/muc_user:x/muc_user:item[@role='none']/muc_user:actor[@nick='{nick_one}']".to_string(),
                    "/presence/muc_user:x/muc_user:item/muc_user:reason[text()='reported']".to_string(),
                    "/presence/muc_user:x/muc_user:status[@code='307']".to_string(),
                ],
                vec!["/iq[@id='kick1'][@type='result']".to_string()],
            ]),
        ],
    )
}
