// File: testing-framework/src/scenarios/catalog/mod.rs
//
// Built-in Gateway Scenarios
//
// Each function builds one scenario exercising the gateway through its
// component connection. Scenarios run against the local IRC server started by
// the suite driver, so the relayed server notices are part of what is checked.
// Larger families live in submodules; this file keeps the connection, ad-hoc
// command and global configuration scenarios plus the shared helpers.

mod channels;
mod configure;
mod disco;
mod history;
mod listing;
mod ping;
mod sessions;

use super::sequences::{
    channel_join_sequence, connection_begin_sequence, connection_sequence, connection_tls_sequence,
    handshake_sequence, ConnectionOptions,
};
use super::step::Step;
use super::Scenario;
use crate::config::ConfigVariant;
use crate::expectation::{Extractor, SaveValue};
use crate::steps;
use std::time::Duration;

pub use channels::*;
pub use configure::*;
pub use disco::*;
pub use history::*;
pub use listing::*;
pub use ping::*;
pub use sessions::*;

/// Every built-in scenario, in execution order
pub fn all() -> Vec<Scenario> {
    vec![
        basic_handshake_success(),
        irc_server_connection(),
        irc_server_connection_failure(),
        simple_channel_join(),
        raw_names_command(),
        quit(),
        multiple_channels_join(),
        not_connected_error(),
        channel_join_with_two_users(),
        channel_force_join(),
        channel_join_with_password(),
        channel_custom_topic(),
        multiline_topic(),
        channel_basic_join_on_fixed_irc_server(),
        list_adhoc(),
        list_admin_adhoc(),
        list_adhoc_fixed_server(),
        list_admin_adhoc_fixed_server(),
        list_adhoc_irc(),
        list_muc_user_adhoc(),
        execute_hello_adhoc_command(),
        execute_incomplete_hello_adhoc_command(),
        execute_ping_adhoc_command(),
        execute_reload_adhoc_command(),
        execute_forbidden_adhoc_command(),
        execute_disconnect_user_adhoc_command(),
        execute_admin_disconnect_from_server_adhoc_command(),
        multisessionnick(),
        persistent_channel(),
        channel_join_with_different_nick(),
        notices(),
        multiline_message(),
        channel_messages(),
        muc_message_from_unjoined_resource(),
        encoded_channel_join(),
        self_ping_with_error(),
        self_ping_not_in_muc(),
        self_ping_on_real_channel(),
        self_ping_fixed_server(),
        simple_kick(),
        mode_change(),
        multisession_kick(),
        self_version(),
        version_on_global_nick(),
        self_invite(),
        client_error(),
        simple_mam(),
        mam_with_timestamps(),
        join_history_limits(),
        mam_on_fixed_server(),
        default_mam_limit(),
        channel_history_on_fixed_server(),
        channel_history(),
        simple_channel_list(),
        channel_list_escaping(),
        channel_list_with_rsm(),
        default_channel_list_limit(),
        complete_channel_list_with_pages_of_3(),
        muc_traffic_info(),
        muc_disco_info(),
        fixed_muc_disco_info(),
        raw_message(),
        raw_message_fixed_irc_server(),
        self_disco_info(),
        invite_other(),
        global_configure(),
        global_configure_fixed(),
        global_configure_persistent_by_default(),
        irc_server_configure(),
        irc_channel_configure(),
        irc_channel_configure_xep0045(),
        irc_channel_configure_fixed(),
        irc_tls_connection(),
        get_irc_connection_info(),
        get_irc_connection_info_fixed(),
        irc_server_presence_subscription(),
        fixed_irc_server_presence_subscription(),
        leave_unjoined_chan(),
        basic_subscribe_unsubscribe(),
        resource_is_removed_from_server_when_last_chan_is_left(),
        irc_server_presence_in_roster(),
    ]
}

/// Look up a built-in scenario by name
pub fn find(name: &str) -> Option<Scenario> {
    all().into_iter().find(|scenario| scenario.name == name)
}

fn jid_one() -> &'static str {
    "{jid_one}/{resource_one}"
}

fn connect(jid: &str) -> Vec<Step> {
    connection_sequence("irc.localhost", jid, ConnectionOptions::default())
}

fn join_presence(from: &str, room: &str) -> Step {
    Step::send(format!("<presence from='{}' to='{}' />", from, room))
}

/// Mode message, self-presence and subject, matched loosely
fn loose_join_burst() -> Vec<Step> {
    vec![
        Step::expect(["/message"]),
        Step::expect(["/presence"]),
        Step::expect(["/message"]),
    ]
}

fn save_sessionid(xpath: &str) -> Vec<SaveValue> {
    vec![SaveValue::new(
        "sessionid",
        Extractor::Attribute {
            xpath: xpath.to_string(),
            attribute: "sessionid".to_string(),
        },
    )]
}

/// `#foo` on the first IRC server
const FOO: &str = "#foo%{irc_server_one}";

fn leave_presence(from: &str, room: &str) -> Step {
    Step::send(format!(
        "<presence from='{}' to='{}' type='unavailable' />",
        from, room
    ))
}

/// Moderator self-presence and empty subject sent to `to` once it joined
/// `room` as `{nick_one}`
fn self_join_burst(room: &str, to: &str) -> Vec<Step> {
    vec![
        Step::expect([
            format!(
                "/presence[@to='{}'][@from='{}/{{nick_one}}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
                to, room
            ),
            "/presence/muc_user:x/muc_user:status[@code='110']".to_string(),
        ]),
        Step::expect([format!(
            "/message[@from='{}'][@type='groupchat'][@to='{}']/subject[not(text())]",
            room, to
        )]),
    ]
}

/// First occupant joins `room` (`channel` on IRC) from `{jid_one}/{resource_one}`,
/// connecting to the IRC server on the way
fn first_join(channel: &str, room: &str, options: ConnectionOptions) -> Vec<Step> {
    steps![
        join_presence(jid_one(), &format!("{}/{{nick_one}}", room)),
        connection_sequence("irc.localhost", jid_one(), options),
        Step::expect([format!(
            "/message/body[text()='Mode {} [+nt] by {{irc_host_one}}']",
            channel
        )]),
        self_join_burst(room, jid_one()),
    ]
}

/// First occupant joins `#foo` and connects to the first IRC server
fn join_foo() -> Vec<Step> {
    first_join("#foo", FOO, ConnectionOptions::default())
}

/// Any join of an already connected user: notice, presence, subject
fn join_already_connected(from: &str, room: &str) -> Vec<Step> {
    steps![join_presence(from, room), loose_join_burst()]
}

/// Configure the first IRC server without throttling and with the ports of
/// the local test server
fn disable_throttling() -> Vec<Step> {
    vec![
        Step::send("<iq type='set' id='id1' from='{jid_one}/{resource_one}' to='{irc_server_one}'><command xmlns='http://jabber.org/protocol/commands' node='configure' action='execute' /></iq>"),
        Step::expect_then(
            ["/iq[@type='result']"],
            save_sessionid("/iq[@type='result']/commands:command[@node='configure']"),
        ),
        Step::send(concat!(
            "<iq type='set' id='id2' from='{jid_one}/{resource_one}' to='{irc_server_one}'>",
            "<command xmlns='http://jabber.org/protocol/commands' node='configure' sessionid='{sessionid}' action='next'>",
            "<x xmlns='jabber:x:data' type='submit'>",
            "<field var='ports'><value>6667</value></field>",
            "<field var='tls_ports'><value>6697</value><value>6670</value></field>",
            "<field var='throttle_limit'><value>9999</value></field>",
            "</x></command></iq>"
        )),
        Step::expect([CONFIGURATION_APPLIED]),
    ]
}

const CONFIGURATION_APPLIED: &str = "/iq[@type='result']/commands:command[@node='configure'][@status='completed']/commands:note[@type='info'][text()='Configuration successfully applied.']";

/// Presences exchanged when the second user joins `#foo` after the first
fn second_user_join_burst() -> Step {
    Step::expect_unordered(vec![
        vec!["/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']/muc_user:x/muc_user:item[@affiliation='none'][@role='participant'][@jid='~bobby@localhost']"],
        vec!["/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']"],
        vec![
            "/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']/muc_user:x/muc_user:item[@affiliation='none'][@jid='~bobby@localhost'][@role='participant']",
            "/presence/muc_user:x/muc_user:status[@code='110']",
        ],
        vec!["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"],
    ])
}

pub fn basic_handshake_success() -> Scenario {
    Scenario::new("basic_handshake_success", handshake_sequence())
}

pub fn irc_server_connection() -> Scenario {
    Scenario::new(
        "irc_server_connection",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
        ],
    )
}

pub fn irc_server_connection_failure() -> Scenario {
    Scenario::new(
        "irc_server_connection_failure",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%doesnotexist@{biboumi_host}/{nick_one}"),
            Step::expect(["/message/body[text()='Connecting to doesnotexist:6697 (encrypted)']"]),
            Step::expect([
                "/message/body[re:test(text(), 'Connection failed: (Domain name not found|Name or service not known)')]",
            ]),
            Step::expect([
                "/presence[@from='#foo%doesnotexist@{biboumi_host}/{nick_one}']/muc:x",
                "/presence/error[@type='cancel']/stanza:item-not-found",
                "/presence/error[@type='cancel']/stanza:text[re:test(text(), '(Domain name not found|Name or service not known)')]",
            ]),
        ],
    )
}

pub fn simple_channel_join() -> Scenario {
    Scenario::new(
        "simple_channel_join",
        steps![handshake_sequence(), channel_join_sequence("foo")],
    )
}

pub fn raw_names_command() -> Scenario {
    Scenario::new(
        "raw_names_command",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            Step::expect(["/message/body"]),
            Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
            Step::expect(["/message/subject[not(text())]"]),
            Step::send("<message type='chat' from='{jid_one}/{resource_one}' to='{irc_server_one}'><body>NAMES</body></message>"),
            Step::expect(["/message/body[text()='irc.localhost: = #foo @{nick_one} ']"]),
            Step::expect(["/message/body[text()='irc.localhost: * End of /NAMES list. ']"]),
        ],
    )
}

pub fn quit() -> Scenario {
    Scenario::new(
        "quit",
        steps![
            handshake_sequence(),
            channel_join_sequence("foo"),
            Step::send("<message from='{jid_one}/{resource_one}' to='{irc_server_one}' type='chat'><body>QUIT bye bye</body></message>"),
            Step::expect([
                "/presence[@from='#foo%{irc_server_one}/{nick_one}'][@type='unavailable']/muc_user:x/muc_user:status[@code='110']",
            ]),
        ],
    )
}

pub fn multiple_channels_join() -> Scenario {
    let mut steps = steps![
        handshake_sequence(),
        join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
        join_presence(jid_one(), "#bar%{irc_server_one}/{nick_one}"),
        Step::send("<presence from='{jid_one}/{resource_one}' to='#baz%{irc_server_one}/{nick_one}'>  <x xmlns='http://jabber.org/protocol/muc'><password>SECRET</password></x></presence>"),
        connect(jid_one()),
    ];
    for channel in ["foo", "bar", "baz"] {
        steps.push(Step::expect([format!(
            "/message/body[text()='Mode #{} [+nt] by {{irc_host_one}}']",
            channel
        )]));
        steps.push(Step::expect([
            format!("/presence[@to='{{jid_one}}/{{resource_one}}'][@from='#{}%{{irc_server_one}}/{{nick_one}}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']", channel),
            "/presence/muc_user:x/muc_user:status[@code='110']".to_string(),
        ]));
        steps.push(Step::expect([format!(
            "/message[@from='#{}%{{irc_server_one}}'][@type='groupchat']/subject[not(text())]",
            channel
        )]));
    }
    Scenario::new("multiple_channels_join", steps)
}

pub fn not_connected_error() -> Scenario {
    let mut steps = steps![
        handshake_sequence(),
        Step::send("<presence type='unavailable' from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}/{nick_one}' />"),
    ];
    steps.extend(channel_join_sequence("foo"));
    Scenario::new("not_connected_error", steps)
}

pub fn channel_join_with_two_users() -> Scenario {
    Scenario::new(
        "channel_join_with_two_users",
        steps![
            handshake_sequence(),
            channel_join_sequence("foo"),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            second_user_join_burst(),
        ],
    )
}

pub fn channel_force_join() -> Scenario {
    Scenario::new(
        "channel_force_join",
        steps![
            handshake_sequence(),
            Step::send("<presence from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}/{nick_one}'><x xmlns='http://jabber.org/protocol/muc'/></presence>"),
            connect(jid_one()),
            Step::expect(["/message/body[text()='Mode #foo [+nt] by {irc_host_one}']"]),
            Step::expect([
                "/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@jid='~nick@localhost'][@role='moderator']",
                "/presence/muc_user:x/muc_user:status[@code='110']",
            ]),
            Step::expect(["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"]),
            Step::send("<presence from='{jid_two}/{resource_one}' to='#foo%{irc_server_one}/{nick_two}'><x xmlns='http://jabber.org/protocol/muc'/></presence>"),
            connect("{jid_two}/{resource_one}"),
            second_user_join_burst(),
            // The client believes it left the room; the gateway resends the
            // whole room state.
            Step::send("<presence from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}/{nick_three}'><x xmlns='http://jabber.org/protocol/muc'/></presence>"),
            Step::expect_unordered(vec![
                vec!["/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']/muc_user:x/muc_user:item[@affiliation='none'][@role='participant'][@jid='~bobby@localhost']"],
                vec![
                    "/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
                    "/presence/muc_user:x/muc_user:status[@code='110']",
                ],
                vec!["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"],
            ]),
            Step::expect_unordered(vec![
                vec![
                    "/presence[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_two}/{resource_one}'][@type='unavailable']/muc_user:x/muc_user:item[@nick='Bernard']",
                    "/presence/muc_user:x/muc_user:status[@code='303']",
                ],
                vec!["/presence[@from='#foo%{irc_server_one}/{nick_three}'][@to='{jid_two}/{resource_one}']"],
                vec![
                    "/presence[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='unavailable']/muc_user:x/muc_user:item[@nick='Bernard']",
                    "/presence/muc_user:x/muc_user:status[@code='303']",
                    "/presence/muc_user:x/muc_user:status[@code='110']",
                ],
                vec![
                    "/presence[@from='#foo%{irc_server_one}/{nick_three}'][@to='{jid_one}/{resource_one}']",
                    "/presence/muc_user:x/muc_user:status[@code='110']",
                ],
            ]),
        ],
    )
}

pub fn channel_join_with_password() -> Scenario {
    Scenario::new(
        "channel_join_with_password",
        steps![
            handshake_sequence(),
            channel_join_sequence("foo"),
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><body>/mode +k SECRET</body></message>"),
            Step::expect(["/message[@from='#foo%{irc_server_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='Mode #foo [+k SECRET] by {nick_one}']"]),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            Step::expect(["/message/body[text()='{irc_host_one}: #foo: Cannot join channel (+k) - bad key']"]),
            Step::expect(["/presence[@type='error'][@from='#foo%{irc_server_one}/{nick_two}']/error[@type='auth']/stanza:not-authorized"]),
            Step::send("<presence from='{jid_two}/{resource_one}' to='#foo%{irc_server_one}/{nick_two}'>  <x xmlns='http://jabber.org/protocol/muc'><password>SECRET</password></x></presence>"),
            second_user_join_burst(),
        ],
    )
}

pub fn channel_custom_topic() -> Scenario {
    Scenario::new(
        "channel_custom_topic",
        steps![
            handshake_sequence(),
            channel_join_sequence("foo"),
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><subject>TOPIC TEST</subject></message>"),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@type='groupchat'][@to='{jid_one}/{resource_one}']/subject[text()='TOPIC TEST']"]),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            Step::expect(["/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']/muc_user:x/muc_user:item[@affiliation='none'][@jid='~bobby@localhost'][@role='participant']"]),
            Step::expect(["/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']"]),
            Step::expect([
                "/presence[@to='{jid_two}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']/muc_user:x/muc_user:item[@affiliation='none'][@jid='~bobby@localhost'][@role='participant']",
                "/presence/muc_user:x/muc_user:status[@code='110']",
            ]),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@type='groupchat']/subject[text()='TOPIC TEST']"]),
        ],
    )
}

pub fn multiline_topic() -> Scenario {
    Scenario::new(
        "multiline_topic",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            Step::expect(["/message/body"]),
            Step::expect(["/presence"]),
            Step::expect(["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"]),
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><subject>FIRST LINE\nSECOND LINE.</subject></message>"),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@type='groupchat'][@to='{jid_one}/{resource_one}']/subject[text()='FIRST LINE SECOND LINE.']"]),
        ],
    )
}

pub fn channel_basic_join_on_fixed_irc_server() -> Scenario {
    Scenario::new(
        "channel_basic_join_on_fixed_irc_server",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#zgeg@{biboumi_host}/{nick_one}"),
            connection_sequence("irc.localhost", jid_one(), ConnectionOptions::fixed_server()),
            Step::expect(["/message/body[text()='Mode #zgeg [+nt] by {irc_host_one}']"]),
            Step::expect([
                "/presence[@to='{jid_one}/{resource_one}'][@from='#zgeg@{biboumi_host}/{nick_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
                "/presence/muc_user:x/muc_user:status[@code='110']",
            ]),
            Step::expect(["/message[@from='#zgeg@{biboumi_host}'][@type='groupchat']/subject[not(text())]"]),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

fn list_commands(from: &str, to: &str) -> Step {
    Step::send(format!(
        "<iq type='get' id='idwhatever' from='{}' to='{}'><query xmlns='http://jabber.org/protocol/disco#items' node='http://jabber.org/protocol/commands' /></iq>",
        from, to
    ))
}

const COMMAND_LIST_RESULT: &str =
    "/iq[@type='result']/disco_items:query[@node='http://jabber.org/protocol/commands']";

pub fn list_adhoc() -> Scenario {
    Scenario::new(
        "list_adhoc",
        steps![
            handshake_sequence(),
            list_commands(jid_one(), "{biboumi_host}"),
            Step::expect([
                COMMAND_LIST_RESULT,
                "/iq/disco_items:query/disco_items:item[@node='configure']",
                "/iq/disco_items:query/disco_items:item[4]",
                "!/iq/disco_items:query/disco_items:item[5]",
            ]),
        ],
    )
}

pub fn list_admin_adhoc() -> Scenario {
    Scenario::new(
        "list_admin_adhoc",
        steps![
            handshake_sequence(),
            list_commands("{jid_admin}/{resource_one}", "{biboumi_host}"),
            Step::expect([
                COMMAND_LIST_RESULT,
                "/iq/disco_items:query/disco_items:item[6]",
                "!/iq/disco_items:query/disco_items:item[7]",
            ]),
        ],
    )
}

pub fn list_adhoc_fixed_server() -> Scenario {
    Scenario::new(
        "list_adhoc_fixed_server",
        steps![
            handshake_sequence(),
            list_commands(jid_one(), "{biboumi_host}"),
            Step::expect([
                COMMAND_LIST_RESULT,
                "/iq/disco_items:query/disco_items:item[@node='global-configure']",
                "/iq/disco_items:query/disco_items:item[@node='server-configure']",
                "/iq/disco_items:query/disco_items:item[6]",
                "!/iq/disco_items:query/disco_items:item[7]",
            ]),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

pub fn list_admin_adhoc_fixed_server() -> Scenario {
    Scenario::new(
        "list_admin_adhoc_fixed_server",
        steps![
            handshake_sequence(),
            list_commands("{jid_admin}/{resource_one}", "{biboumi_host}"),
            Step::expect([
                COMMAND_LIST_RESULT,
                "/iq/disco_items:query/disco_items:item[8]",
                "!/iq/disco_items:query/disco_items:item[9]",
            ]),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

pub fn list_adhoc_irc() -> Scenario {
    Scenario::new(
        "list_adhoc_irc",
        steps![
            handshake_sequence(),
            list_commands(jid_one(), "{irc_host_one}@{biboumi_host}"),
            Step::expect([COMMAND_LIST_RESULT, "/iq/disco_items:query/disco_items:item[2]"]),
        ],
    )
}

pub fn list_muc_user_adhoc() -> Scenario {
    Scenario::new(
        "list_muc_user_adhoc",
        steps![
            handshake_sequence(),
            list_commands("{jid_admin}/{resource_one}", "#foo%{irc_server_one}/{nick_one}"),
            Step::expect(["/iq[@type='error']/error[@type='cancel']/stanza:feature-not-implemented"]),
        ],
    )
}

pub fn execute_hello_adhoc_command() -> Scenario {
    Scenario::new(
        "execute_hello_adhoc_command",
        steps![
            handshake_sequence(),
            Step::send("<iq type='set' id='hello-command1' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='hello' action='execute' /></iq>"),
            Step::expect_then(
                [
                    "/iq[@type='result']/commands:command[@node='hello'][@sessionid][@status='executing']",
                    "/iq/commands:command/dataform:x[@type='form']/dataform:title[text()='Configure your name.']",
                    "/iq/commands:command/dataform:x[@type='form']/dataform:instructions[text()='Please provide your name.']",
                    "/iq/commands:command/dataform:x[@type='form']/dataform:field[@type='text-single']/dataform:required",
                    "/iq/commands:command/commands:actions/commands:next",
                ],
                save_sessionid("/iq[@type='result']/commands:command[@node='hello']"),
            ),
            Step::send("<iq type='set' id='hello-command2' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='hello' sessionid='{sessionid}' action='next'><x xmlns='jabber:x:data' type='submit'><field var='name'><value>COUCOU</value></field></x></command></iq>"),
            Step::expect(["/iq[@type='result']/commands:command[@node='hello'][@status='completed']/commands:note[@type='info'][text()='Hello COUCOU!']"]),
        ],
    )
}

pub fn execute_incomplete_hello_adhoc_command() -> Scenario {
    Scenario::new(
        "execute_incomplete_hello_adhoc_command",
        steps![
            handshake_sequence(),
            Step::send("<iq type='set' id='hello-command1' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='hello' action='execute' /></iq>"),
            Step::expect_then(
                [
                    "/iq[@type='result']/commands:command[@node='hello'][@sessionid][@status='executing']",
                    "/iq/commands:command/commands:actions/commands:next",
                ],
                save_sessionid("/iq[@type='result']/commands:command[@node='hello']"),
            ),
            Step::send("<iq type='set' id='hello-command2' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='hello' sessionid='{sessionid}' action='next'><x xmlns='jabber:x:data' type='submit'></x></command></iq>"),
            Step::expect(["/iq[@type='error']"]),
        ],
    )
}

pub fn execute_ping_adhoc_command() -> Scenario {
    Scenario::new(
        "execute_ping_adhoc_command",
        steps![
            handshake_sequence(),
            Step::send("<iq type='set' id='ping-command1' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='ping' action='execute' /></iq>"),
            Step::expect(["/iq[@type='result']/commands:command[@node='ping'][@status='completed']/commands:note[@type='info'][text()='Pong']"]),
        ],
    )
}

pub fn execute_reload_adhoc_command() -> Scenario {
    Scenario::new(
        "execute_reload_adhoc_command",
        steps![
            handshake_sequence(),
            Step::send("<iq type='set' id='ping-command1' from='{jid_admin}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='reload' action='execute' /></iq>"),
            Step::expect(["/iq[@type='result']/commands:command[@node='reload'][@status='completed']/commands:note[@type='info'][text()='Configuration reloaded.']"]),
        ],
    )
}

pub fn execute_forbidden_adhoc_command() -> Scenario {
    Scenario::new(
        "execute_forbidden_adhoc_command",
        steps![
            handshake_sequence(),
            Step::send("<iq type='set' id='command1' from='{jid_one}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='disconnect-user' action='execute' /></iq>"),
            Step::expect([
                "/iq[@type='error'][@id='command1']/commands:command[@node='disconnect-user']",
                "/iq/commands:command/commands:error[@type='cancel']/stanza:forbidden",
            ]),
        ],
    )
}

pub fn execute_disconnect_user_adhoc_command() -> Scenario {
    Scenario::new(
        "execute_disconnect_user_adhoc_command",
        steps![
            handshake_sequence(),
            join_presence("{jid_admin}/{resource_one}", "#foo%{irc_server_one}/{nick_one}"),
            connect("{jid_admin}/{resource_one}"),
            Step::expect(["/message/body[text()='Mode #foo [+nt] by {irc_host_one}']"]),
            Step::expect(["/presence"]),
            Step::expect(["/message"]),
            Step::send("<iq type='set' id='command1' from='{jid_admin}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='disconnect-user' action='execute' /></iq>"),
            Step::expect_then(
                [
                    "/iq[@type='result']/commands:command[@node='disconnect-user'][@sessionid][@status='executing']",
                    "/iq/commands:command/commands:actions/commands:next",
                ],
                save_sessionid("/iq/commands:command[@node='disconnect-user']"),
            ),
            Step::send("<iq type='set' id='command2' from='{jid_admin}/{resource_one}' to='{biboumi_host}'><command xmlns='http://jabber.org/protocol/commands' node='disconnect-user' sessionid='{sessionid}' action='next'><x xmlns='jabber:x:data' type='submit'><field var='jids'><value>{jid_admin}</value></field><field var='quit-message'><value>Disconnected by e2e</value></field></x></command></iq>"),
            Step::expect(["/iq[@type='result']/commands:command[@node='disconnect-user'][@status='completed']/commands:note[@type='info'][text()='1 user has been disconnected.']"]),
            // The IRC server drops our QUIT message, so only the presence is checked
            Step::expect(["/presence[@type='unavailable'][@to='{jid_admin}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']"]),
        ],
    )
}

const DISCONNECT_FROM_SERVER: &str =
    "/iq[@type='result']/commands:command[@node='disconnect-from-irc-server']";

/// Execute or continue the disconnect-from-irc-server command as `from`
fn disconnect_from_server(id: &str, from: &str, form: Option<&str>) -> Step {
    let command = match form {
        None => "action='execute' />".to_string(),
        Some(fields) => format!(
            "sessionid='{{sessionid}}' action='next'><x xmlns='jabber:x:data' type='submit'>{}</x></command>",
            fields
        ),
    };
    Step::send(format!(
        "<iq type='set' id='{}' from='{}' to='{{biboumi_host}}'><command xmlns='http://jabber.org/protocol/commands' node='disconnect-from-irc-server' {}</iq>",
        id, from, command
    ))
}

/// Second page of the command: quit message and the servers to leave
fn server_choice_form(servers: &[&str]) -> Vec<String> {
    let field = "/iq/commands:command/dataform:x[@type='form']/dataform:field";
    let mut predicates = vec![
        format!("{}[@sessionid][@status='executing']", DISCONNECT_FROM_SERVER),
        format!("{}[@var='quit-message'][@type='text-single']", field),
        format!("{}[@var='irc-servers'][@type='list-multi']", field),
    ];
    predicates.extend(servers.iter().map(|server| {
        format!(
            "{}[@var='irc-servers']/dataform:option[@label='{}']/dataform:value[text()='{}']",
            field, server, server
        )
    }));
    predicates.push("/iq/commands:command/commands:actions/commands:next".to_string());
    predicates
}

pub fn execute_admin_disconnect_from_server_adhoc_command() -> Scenario {
    let admin = "{jid_admin}/{resource_one}";
    let save = || save_sessionid("/iq/commands:command[@node='disconnect-from-irc-server']");
    Scenario::new(
        "execute_admin_disconnect_from_server_adhoc_command",
        steps![
            handshake_sequence(),
            // Admin on the first server
            join_presence(admin, "#bar%{irc_server_one}/{nick_one}"),
            connect(admin),
            Step::expect(["/message/body[text()='Mode #bar [+nt] by {irc_host_one}']"]),
            Step::expect(["/presence"]),
            Step::expect(["/message"]),
            // Regular user on the first server
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_two}"),
            connect(jid_one()),
            Step::expect(["/message/body[text()='Mode #foo [+nt] by {irc_host_one}']"]),
            Step::expect(["/presence"]),
            Step::expect(["/message"]),
            // Same user on the second server
            join_presence(jid_one(), "#bon%{irc_server_two}/{nick_three}"),
            connection_sequence("localhost", jid_one(), ConnectionOptions::default()),
            Step::expect(["/message/body[text()='Mode #bon [+nt] by {irc_host_one}']"]),
            Step::expect(["/presence"]),
            Step::expect(["/message"]),
            // The admin first picks the user
            disconnect_from_server("command1", admin, None),
            Step::expect_then(
                [
                    format!("{}[@sessionid][@status='executing']", DISCONNECT_FROM_SERVER),
                    "/iq/commands:command/dataform:x[@type='form']/dataform:field[@var='jid'][@type='list-single']/dataform:option[@label='{jid_one}']/dataform:value[text()='{jid_one}']".to_string(),
                    "/iq/commands:command/dataform:x[@type='form']/dataform:field[@var='jid'][@type='list-single']/dataform:option[@label='{jid_admin}']/dataform:value[text()='{jid_admin}']".to_string(),
                    "/iq/commands:command/commands:actions/commands:next".to_string(),
                ],
                save(),
            ),
            disconnect_from_server(
                "command2",
                admin,
                Some("<field var='jid'><value>{jid_one}</value></field><field var='quit-message'><value>e2e test one</value></field>"),
            ),
            Step::expect_then(server_choice_form(&["localhost", "irc.localhost"]), save()),
            disconnect_from_server(
                "command2",
                admin,
                Some("<field var='irc-servers'><value>localhost</value></field><field var='quit-message'><value>Disconnected by e2e</value></field>"),
            ),
            Step::expect_unordered(vec![
                vec!["/presence[@type='unavailable'][@to='{jid_one}/{resource_one}'][@from='#bon%{irc_server_two}/{nick_three}']".to_string()],
                vec![format!("{}[@status='completed']/commands:note[@type='info'][text()='{{jid_one}} was disconnected from 1 IRC server.']", DISCONNECT_FROM_SERVER)],
            ]),
            // A regular user skips the first page
            disconnect_from_server("command1", jid_one(), None),
            Step::expect_then(server_choice_form(&["irc.localhost"]), save()),
            disconnect_from_server(
                "command2",
                jid_one(),
                Some("<field var='irc-servers'><value>irc.localhost</value></field><field var='quit-message'><value>Disconnected by e2e</value></field>"),
            ),
            Step::expect_unordered(vec![
                vec!["/presence[@type='unavailable'][@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_two}']".to_string()],
                vec![format!("{}[@status='completed']/commands:note[@type='info'][text()='{{jid_one}}/{{resource_one}} was disconnected from 1 IRC server.']", DISCONNECT_FROM_SERVER)],
            ]),
        ],
    )
}

pub fn notices() -> Scenario {
    Scenario::new(
        "notices",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            loose_join_burst(),
            Step::send("<message from='{jid_one}/{resource_one}' to='{irc_server_one}' type='chat'><body>NOTICE {nick_one} :[#foo] Hello in a notice.</body></message>"),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@type='groupchat']/body[text()='[notice] [#foo] Hello in a notice.']"]),
        ],
    )
}

pub fn multiline_message() -> Scenario {
    Scenario::new(
        "multiline_message",
        steps![
            handshake_sequence(),
            channel_join_sequence("foo"),
            Step::send("<message id='the-message-id' from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><body>un\ndeux\ntrois</body></message>"),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id='the-message-id'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='un']"]),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='deux']"]),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='trois']"]),
            Step::send("<message from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><body>hello</body></message>"),
            Step::expect([
                "!/message[@id='']/body[text()='hello']",
                "/message[@id]/body[text()='hello']",
            ]),
            // Give the IRC server time to relay the message before the
            // second user shows up, or the newcomer receives it too.
            Step::pause(Duration::from_secs(1)),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            second_user_join_burst(),
            Step::send("<message id='the-message-id' from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}' type='groupchat'><body>a\nb\nc</body></message>"),
            Step::expect_unordered(vec![
                vec!["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id='the-message-id'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='a']"],
                vec!["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='b']"],
                vec!["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='c']"],
                vec!["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id][@to='{jid_two}/{resource_one}'][@type='groupchat']/body[text()='a']"],
                vec!["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id][@to='{jid_two}/{resource_one}'][@type='groupchat']/body[text()='b']"],
                vec!["/message[@from='#foo%{irc_server_one}/{nick_one}'][@id][@to='{jid_two}/{resource_one}'][@type='groupchat']/body[text()='c']"],
            ]),
        ],
    )
}

fn kick_join_burst() -> Step {
    Step::expect_unordered(vec![
        vec!["/presence[@to='{jid_one}/{resource_one}']/muc_user:x/muc_user:item[@affiliation='none'][@role='participant']"],
        vec![
            "/presence[@to='{jid_two}/{resource_one}']/muc_user:x/muc_user:item[@affiliation='none'][@role='participant']",
            "/presence/muc_user:x/muc_user:status[@code='110']",
        ],
        vec!["/presence[@to='{jid_two}/{resource_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']"],
        vec!["/message/subject"],
    ])
}

pub fn simple_kick() -> Scenario {
    Scenario::new(
        "simple_kick",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            Step::expect(["/message"]),
            Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
            Step::expect(["/message[@type='groupchat']/subject"]),
            join_presence("{jid_two}/{resource_one}", "#foo%{irc_server_one}/{nick_two}"),
            connect("{jid_two}/{resource_one}"),
            kick_join_burst(),
            // Same users in a second channel: the kick from #foo must not
            // leak presences from #bar
            join_presence(jid_one(), "#bar%{irc_server_one}/{nick_one}"),
            Step::expect(["/message"]),
            Step::expect(["/presence/muc_user:x/muc_user:status[@code='110']"]),
            Step::expect(["/message[@type='groupchat']/subject"]),
            join_presence("{jid_two}/{resource_one}", "#bar%{irc_server_one}/{nick_two}"),
            kick_join_burst(),
            Step::send("<iq id='kick1' to='#foo%{irc_server_one}' from='{jid_one}/{resource_one}' type='set'><query xmlns='http://jabber.org/protocol/muc#admin'><item nick='{nick_two}' role='none'><reason>reported</reason></item></query></iq>"),
            Step::expect_unordered(vec![
                vec![
                    "/presence[@type='unavailable'][@to='{jid_two}/{resource_one}']/muc_user:x/muc_user:item[@role='none']/muc_user:actor[@nick='{nick_one}']",
                    "/presence/muc_user:x/muc_user:item/muc_user:reason[text()='reported']",
                    "/presence/muc_user:x/muc_user:status[@code='307']",
                    "/presence/muc_user:x/muc_user:status[@code='110']",
                ],
                vec![
                    "/presence[@type='unavailable'][@to='{jid_one}/{resource_one}']/muc_user:x/muc_user:item[@role='none']/muc_user:actor[@nick='{nick_one}']",
                    "/presence/muc_user:x/muc_user:item/muc_user:reason[text()='reported']",
                    "/presence/muc_user:x/muc_user:status[@code='307']",
                ],
                vec!["/iq[@id='kick1'][@type='result']"],
            ]),
            Step::send("<message from='{jid_two}/{resource_one}' to='{irc_server_one}' type='chat'><body>QUIT bye bye</body></message>"),
            Step::expect_unordered(vec![
                vec!["/presence[@from='#bar%{irc_server_one}/{nick_two}'][@to='{jid_one}/{resource_one}']"],
                vec!["/presence[@from='#bar%{irc_server_one}/{nick_two}'][@to='{jid_two}/{resource_one}']"],
                vec!["/message"],
                vec!["/message"],
            ]),
        ],
    )
}

fn send_channel_message(body: &str) -> Step {
    Step::send(format!(
        "<message from='{{jid_one}}/{{resource_one}}' to='#foo%{{irc_server_one}}' type='groupchat'><body>{}</body></message>",
        body
    ))
}

fn archived(queryid: &str, body: &str) -> Step {
    Step::expect([
        format!("/message/mam:result[@queryid='{}']/forward:forwarded/delay:delay", queryid),
        format!("/message/mam:result/forward:forwarded/client:message[@from='#foo%{{irc_server_one}}/{{nick_one}}'][@type='groupchat']/client:body[text()='{}']", body),
    ])
}

fn mam_query_with_field(id: &str, queryid: &str, field: &str, value: &str) -> Step {
    Step::send(format!(
        "<iq to='#foo%{{irc_server_one}}' from='{{jid_one}}/{{resource_one}}' type='set' id='{id}'>\n\
         <query xmlns='urn:xmpp:mam:2' queryid='{queryid}'>\n\
         <x xmlns='jabber:x:data' type='submit'>\n\
         <field var='FORM_TYPE' type='hidden'> <value>urn:xmpp:mam:2</value></field>\n\
         <field var='{field}'><value>{value}</value></field>\n\
         </x>\n\
         </query></iq>"
    ))
}

fn mam_fin(id: &str) -> String {
    format!(
        "/iq[@type='result'][@id='{}'][@from='#foo%{{irc_server_one}}'][@to='{{jid_one}}/{{resource_one}}']",
        id
    )
}

pub fn simple_mam() -> Scenario {
    Scenario::new(
        "simple_mam",
        steps![
            handshake_sequence(),
            channel_join_sequence("foo"),
            send_channel_message("coucou"),
            Step::expect([
                "/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='coucou']",
                "/message/stable_id:stanza-id[@by='#foo%{irc_server_one}'][@id]",
            ]),
            send_channel_message("coucou 2"),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='coucou 2']"]),
            // Whole archive
            Step::send("<iq to='#foo%{irc_server_one}' from='{jid_one}/{resource_one}' type='set' id='id1'><query xmlns='urn:xmpp:mam:2' queryid='qid1' /></iq>"),
            archived("qid1", "coucou"),
            archived("qid1", "coucou 2"),
            Step::expect([
                mam_fin("id1"),
                "/iq/mam:fin/rsm:set/rsm:last".to_string(),
                "/iq/mam:fin/rsm:set/rsm:first".to_string(),
                "/iq/mam:fin[@complete='true']".to_string(),
            ]),
            // Empty archive: end date before any message
            mam_query_with_field("id2", "qid2", "end", "2000-06-07T00:00:00Z"),
            Step::expect([mam_fin("id2"), "/iq/mam:fin[@complete='true']/rsm:set".to_string()]),
            // Empty archive: start date in the future
            mam_query_with_field("id3", "qid3", "start", "3016-06-07T00:00:00Z"),
            Step::expect([mam_fin("id3"), "/iq/mam:fin[@complete='true']/rsm:set".to_string()]),
            // Limited to one result
            Step::send("<iq to='#foo%{irc_server_one}' from='{jid_one}/{resource_one}' type='set' id='id4'><query xmlns='urn:xmpp:mam:2' queryid='qid4'><set xmlns='http://jabber.org/protocol/rsm'><max>1</max></set></query></iq>"),
            archived("qid4", "coucou"),
            Step::expect([mam_fin("id4"), "!/iq/mam:fin[@complete='true']/rsm:set".to_string()]),
        ],
    )
}

pub fn mam_with_timestamps() -> Scenario {
    Scenario::new(
        "mam_with_timestamps",
        steps![
            handshake_sequence(),
            channel_join_sequence("foo"),
            send_channel_message("coucou"),
            Step::expect([
                "/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='coucou']",
                "/message/stable_id:stanza-id[@by='#foo%{irc_server_one}'][@id]",
            ]),
            send_channel_message("coucou 2"),
            Step::expect(["/message[@from='#foo%{irc_server_one}/{nick_one}'][@to='{jid_one}/{resource_one}'][@type='groupchat']/body[text()='coucou 2']"]),
            Step::save_timestamp("first_timestamp", 1),
            Step::pause(Duration::from_secs(2)),
            send_channel_message("coucou 3"),
            send_channel_message("coucou 4"),
            Step::expect(["/message[@type='groupchat']/body[text()='coucou 3']"]),
            Step::expect(["/message[@type='groupchat']/body[text()='coucou 4']"]),
            Step::save_timestamp("second_timestamp", 1),
            Step::send(
                "<iq to='#foo%{irc_server_one}' from='{jid_one}/{resource_one}' type='set' id='id8'>\n\
                 <query xmlns='urn:xmpp:mam:2' queryid='qid16'>\n\
                 <x type='submit' xmlns='jabber:x:data'>\n\
                 <field var='FORM_TYPE' xmlns='jabber:x:data'><value xmlns='jabber:x:data'>urn:xmpp:mam:2</value></field>\n\
                 <field var='start' xmlns='jabber:x:data'><value xmlns='jabber:x:data'>{first_timestamp}</value></field>\n\
                 <field var='end' xmlns='jabber:x:data'><value xmlns='jabber:x:data'>{second_timestamp}</value></field>\n\
                 </x>\n\
                 </query>\n\
                 </iq>"
            ),
            archived("qid16", "coucou 3"),
            archived("qid16", "coucou 4"),
            Step::expect([mam_fin("id8"), "/iq/mam:fin[@complete='true']/rsm:set".to_string()]),
        ],
    )
}

pub fn raw_message() -> Scenario {
    Scenario::new(
        "raw_message",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            loose_join_burst(),
            Step::send("<message from='{jid_one}/{resource_one}' to='{irc_server_one}' type='chat'><body>WHOIS {nick_one}</body></message>"),
            Step::expect(["/message[@from='{irc_server_one}'][@type='chat']/body[text()='irc.localhost: {nick_one} ~{nick_one} localhost * {nick_one}']"]),
        ],
    )
}

pub fn raw_message_fixed_irc_server() -> Scenario {
    Scenario::new(
        "raw_message_fixed_irc_server",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connection_sequence("irc.localhost", jid_one(), ConnectionOptions::fixed_server()),
            loose_join_burst(),
            Step::send("<message from='{jid_one}/{resource_one}' to='{biboumi_host}' type='chat'><body>WHOIS {nick_one}</body></message>"),
            Step::expect(["/message[@from='{biboumi_host}'][@type='chat']/body[text()='irc.localhost: {nick_one} ~{nick_one} localhost * {nick_one}']"]),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

pub fn self_disco_info() -> Scenario {
    Scenario::new(
        "self_disco_info",
        steps![
            handshake_sequence(),
            Step::send("<iq type='get' id='get1' from='{jid_one}/{resource_one}' to='{biboumi_host}'><query xmlns='http://jabber.org/protocol/disco#info'/></iq>"),
            Step::expect([
                "/iq[@type='result']/disco_info:query/disco_info:identity[@category='conference'][@type='irc'][@name='Biboumi XMPP-IRC gateway']",
                "/iq/disco_info:query/disco_info:feature[@var='jabber:iq:version']",
                "/iq/disco_info:query/disco_info:feature[@var='http://jabber.org/protocol/commands']",
                "/iq/disco_info:query/disco_info:feature[@var='urn:xmpp:ping']",
                "/iq/disco_info:query/disco_info:feature[@var='urn:xmpp:mam:2']",
            ]),
        ],
    )
}

/// Expected configuration form of the global configure command
fn configure_form(node: &str, max_history: &str, record_history: &str, persistent: &str) -> Vec<String> {
    vec![
        format!("/iq[@type='result']/commands:command[@node='{}'][@sessionid][@status='executing']", node),
        "/iq/commands:command/dataform:x[@type='form']/dataform:title[text()='Configure some global default settings.']".to_string(),
        "/iq/commands:command/dataform:x[@type='form']/dataform:instructions[text()='Edit the form, to configure your global settings for the component.']".to_string(),
        format!("/iq/commands:command/dataform:x[@type='form']/dataform:field[@type='text-single'][@var='max_history_length']/dataform:value[text()='{}']", max_history),
        format!("/iq/commands:command/dataform:x[@type='form']/dataform:field[@type='boolean'][@var='record_history']/dataform:value[text()='{}']", record_history),
        format!("/iq/commands:command/dataform:x[@type='form']/dataform:field[@type='boolean'][@var='persistent']/dataform:value[text()='{}']", persistent),
        "/iq/commands:command/commands:actions/commands:next".to_string(),
    ]
}

fn execute_command(id: &str, node: &str) -> Step {
    Step::send(format!(
        "<iq type='set' id='{}' from='{{jid_one}}/{{resource_one}}' to='{{biboumi_host}}'><command xmlns='http://jabber.org/protocol/commands' node='{}' action='execute' /></iq>",
        id, node
    ))
}

/// Execute, submit, re-open and cancel the global configuration command
fn global_configure_steps(node: &str) -> Vec<Step> {
    let command = format!("/iq[@type='result']/commands:command[@node='{}']", node);
    steps![
        handshake_sequence(),
        execute_command("id1", node),
        Step::expect_then(configure_form(node, "20", "true", "false"), save_sessionid(&command)),
        Step::send(format!(
            "<iq type='set' id='id2' from='{{jid_one}}/{{resource_one}}' to='{{biboumi_host}}'><command xmlns='http://jabber.org/protocol/commands' node='{}' sessionid='{{sessionid}}' action='next'><x xmlns='jabber:x:data' type='submit'><field var='record_history'><value>0</value></field><field var='max_history_length'><value>42</value></field></x></command></iq>",
            node
        )),
        Step::expect([format!(
            "{}[@status='completed']/commands:note[@type='info'][text()='Configuration successfully applied.']",
            command
        )]),
        execute_command("id3", node),
        Step::expect_then(configure_form(node, "42", "false", "false"), save_sessionid(&command)),
        Step::send(format!(
            "<iq type='set' id='id4' from='{{jid_one}}/{{resource_one}}' to='{{biboumi_host}}'><command xmlns='http://jabber.org/protocol/commands' action='cancel' node='{}' sessionid='{{sessionid}}' /></iq>",
            node
        )),
        Step::expect([format!("{}[@status='canceled']", command)]),
    ]
}

pub fn global_configure() -> Scenario {
    Scenario::new("global_configure", global_configure_steps("configure"))
}

pub fn global_configure_fixed() -> Scenario {
    Scenario::new(
        "global_configure_fixed",
        steps![
            global_configure_steps("global-configure"),
            execute_command("id1", "server-configure"),
            Step::expect(["/iq[@type='result']/commands:command[@node='server-configure'][@sessionid][@status='executing']"]),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

pub fn global_configure_persistent_by_default() -> Scenario {
    Scenario::new(
        "global_configure_persistent_by_default",
        steps![
            handshake_sequence(),
            execute_command("id1", "configure"),
            Step::expect(configure_form("configure", "20", "true", "true")),
        ],
    )
    .with_config(ConfigVariant::PersistentByDefault)
}

pub fn irc_tls_connection() -> Scenario {
    Scenario::new(
        "irc_tls_connection",
        steps![
            handshake_sequence(),
            // Only one TLS port, without certificate verification
            Step::send("<iq type='set' id='id1' from='{jid_one}/{resource_one}' to='{irc_server_one}'><command xmlns='http://jabber.org/protocol/commands' node='configure' action='execute' /></iq>"),
            Step::expect_then(
                ["/iq[@type='result']"],
                save_sessionid("/iq[@type='result']/commands:command[@node='configure']"),
            ),
            Step::send(concat!(
                "<iq type='set' id='id2' from='{jid_one}/{resource_one}' to='{irc_server_one}'>",
                "<command xmlns='http://jabber.org/protocol/commands' node='configure' sessionid='{sessionid}' action='next'>",
                "<x xmlns='jabber:x:data' type='submit'>",
                "<field var='ports' />",
                "<field var='tls_ports'><value>7778</value></field>",
                "<field var='verify_cert'><value>0</value></field>",
                "<field var='nick'><value>my_special_nickname</value></field>",
                "</x></command></iq>"
            )),
            Step::expect(["/iq[@type='result']/commands:command[@node='configure'][@status='completed']/commands:note[@type='info'][text()='Configuration successfully applied.']"]),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connection_tls_sequence("irc.localhost", jid_one(), ConnectionOptions::default()),
            Step::expect(["/message/body[text()='Mode #foo [+nt] by {irc_host_one}']"]),
            Step::expect([
                "/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/my_special_nickname']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
                "/presence/muc_user:x/muc_user:status[@code='110']",
            ]),
            Step::expect(["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"]),
        ],
    )
}

const CONNECTION_INFO_NOTE: &str = r"/iq/commands:command/commands:note[re:test(text(), 'Connected to IRC server irc.localhost on port 6667 since \d\d\d\d-\d\d-\d\d \d\d:\d\d:\d\d \(\d+ seconds ago\)\.\n#foo from 1 resource: {resource_one}.*')]";

fn connection_info_steps(target: &str, room: &str, options: ConnectionOptions) -> Vec<Step> {
    let command = |id: &str| {
        Step::send(format!(
            "<iq type='set' id='{}' from='{{jid_one}}/{{resource_one}}' to='{}'><command xmlns='http://jabber.org/protocol/commands' node='get-irc-connection-info' action='execute' /></iq>",
            id, target
        ))
    };
    steps![
        handshake_sequence(),
        command("command1"),
        Step::expect(["/iq/commands:command/commands:note[text()='You are not connected to the IRC server irc.localhost']"]),
        join_presence(jid_one(), room),
        connection_sequence("irc.localhost", jid_one(), options),
        loose_join_burst(),
        command("command2"),
        Step::expect([CONNECTION_INFO_NOTE]),
    ]
}

pub fn get_irc_connection_info() -> Scenario {
    Scenario::new(
        "get_irc_connection_info",
        connection_info_steps(
            "{irc_server_one}",
            "#foo%{irc_server_one}/{nick_one}",
            ConnectionOptions::default(),
        ),
    )
}

pub fn get_irc_connection_info_fixed() -> Scenario {
    Scenario::new(
        "get_irc_connection_info_fixed",
        connection_info_steps(
            "{biboumi_host}",
            "#foo@{biboumi_host}/{nick_one}",
            ConnectionOptions::fixed_server(),
        ),
    )
    .with_config(ConfigVariant::FixedServer)
}

pub fn irc_server_presence_subscription() -> Scenario {
    Scenario::new(
        "irc_server_presence_subscription",
        steps![
            handshake_sequence(),
            Step::send("<presence type='subscribe' from='{jid_one}/{resource_one}' to='{irc_server_one}' id='sub1' />"),
            Step::expect(["/presence[@to='{jid_one}'][@from='{irc_server_one}'][@type='subscribed']"]),
        ],
    )
}

pub fn fixed_irc_server_presence_subscription() -> Scenario {
    Scenario::new(
        "fixed_irc_server_presence_subscription",
        steps![
            handshake_sequence(),
            Step::send("<presence type='subscribe' from='{jid_one}/{resource_one}' to='{biboumi_host}' id='sub1' />"),
            Step::expect(["/presence[@to='{jid_one}'][@from='{biboumi_host}'][@type='subscribed']"]),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}

pub fn leave_unjoined_chan() -> Scenario {
    Scenario::new(
        "leave_unjoined_chan",
        steps![
            handshake_sequence(),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connect(jid_one()),
            loose_join_burst(),
            join_presence("{jid_two}/{resource_two}", "#foo%{irc_server_one}/{nick_one}"),
            connection_begin_sequence("irc.localhost", "{jid_two}/{resource_two}", ConnectionOptions::default()),
            Step::expect(["/message[@to='{jid_two}/{resource_two}'][@type='chat']/body[text()='irc.localhost: {nick_one}: Nickname is already in use.']"]),
            Step::expect(["/presence[@type='error']/error[@type='cancel'][@code='409']/stanza:conflict"]),
            Step::send("<presence from='{jid_two}/{resource_two}' to='#foo%{irc_server_one}/{nick_one}' type='unavailable' />"),
        ],
    )
}

pub fn basic_subscribe_unsubscribe() -> Scenario {
    Scenario::new(
        "basic_subscribe_unsubscribe",
        steps![
            handshake_sequence(),
            Step::send("<presence from='{jid_one}' to='{biboumi_host}' type='subscribe' id='subid1' />"),
            Step::expect(["/presence[@type='subscribed'][@id='subid1']"]),
            // Current presence of the gateway
            Step::expect(["/presence"]),
            Step::expect(["/presence[@type='subscribe']"]),
            Step::send("<presence from='{jid_one}' to='{biboumi_host}' type='subscribed' />"),
            Step::send("<presence from='{jid_one}' to='{biboumi_host}' type='unsubscribe' id='unsubid1' />"),
            Step::expect(["/presence[@type='unavailable']"]),
            Step::expect(["/presence[@type='unsubscribed']"]),
            Step::expect(["/presence[@type='unsubscribe']"]),
            Step::send("<presence from='{jid_one}' to='{biboumi_host}' type='unavailable' />"),
            Step::send("<presence from='{jid_one}' to='{biboumi_host}' type='unsubscribed' />"),
        ],
    )
}

pub fn irc_server_presence_in_roster() -> Scenario {
    Scenario::new(
        "irc_server_presence_in_roster",
        steps![
            handshake_sequence(),
            Step::send("<presence from='{jid_one}' to='{irc_server_one}' type='subscribe' id='subid1' />"),
            Step::expect(["/presence[@type='subscribed'][@id='subid1']"]),
            Step::expect(["/presence[@type='subscribe']"]),
            Step::send("<presence from='{jid_one}' to='{irc_server_one}' type='subscribed' />"),
            join_presence(jid_one(), "#foo%{irc_server_one}/{nick_one}"),
            connection_sequence("irc.localhost", jid_one(), ConnectionOptions::with_irc_presence()),
            Step::expect(["/message/body[text()='Mode #foo [+nt] by {irc_host_one}']"]),
            Step::expect([
                "/presence[@to='{jid_one}/{resource_one}'][@from='#foo%{irc_server_one}/{nick_one}']/muc_user:x/muc_user:item[@affiliation='admin'][@role='moderator']",
                "/presence/muc_user:x/muc_user:status[@code='110']",
            ]),
            Step::expect(["/message[@from='#foo%{irc_server_one}'][@type='groupchat']/subject[not(text())]"]),
            // Leaving the last channel disconnects from the server
            Step::send("<presence type='unavailable' from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}/{nick_one}' />"),
            Step::expect(["/presence[@type='unavailable'][@from='#foo%{irc_server_one}/{nick_one}']"]),
            Step::expect(["/presence[@from='{irc_server_one}'][@to='{jid_one}'][@type='unavailable']"]),
        ],
    )
}
