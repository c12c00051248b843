// File: testing-framework/src/scenarios/catalog/configure.rs
//
// Server and Channel Configuration
//
// The `configure` ad-hoc command on IRC server and channel JIDs, and the
// MUC owner form that maps onto the same channel settings.

use super::{save_sessionid, CONFIGURATION_APPLIED};
use crate::config::ConfigVariant;
use crate::scenarios::sequences::handshake_sequence;
use crate::scenarios::step::Step;
use crate::scenarios::Scenario;
use crate::steps;

const CONFIGURE_RESULT: &str = "/iq[@type='result']/commands:command[@node='configure']";
const EXECUTING: &str =
    "/iq[@type='result']/commands:command[@node='configure'][@sessionid][@status='executing']";
const NEXT_ACTION: &str = "/iq/commands:command/commands:actions/commands:next";

/// Field of the returned form, with a value when one is given
fn field(kind: &str, var: &str, value: Option<&str>) -> String {
    let field = format!(
        "/iq/commands:command/dataform:x[@type='form']/dataform:field[@type='{}'][@var='{}']",
        kind, var
    );
    match value {
        Some(value) => format!("{}/dataform:value[text()='{}']", field, value),
        None => field,
    }
}

/// Form field that must carry no value
fn empty_field(var: &str) -> String {
    format!(
        "!/iq/commands:command/dataform:x[@type='form']/dataform:field[@var='{}']/dataform:value",
        var
    )
}

fn execute_on(id: &str, target: &str) -> Step {
    Step::send(format!(
        "<iq type='set' id='{}' from='{{jid_one}}/{{resource_one}}' to='{}'><command xmlns='http://jabber.org/protocol/commands' node='configure' action='execute' /></iq>",
        id, target
    ))
}

fn submit_to(id: &str, target: &str, fields: &str) -> Step {
    Step::send(format!(
        "<iq type='set' id='{}' from='{{jid_one}}/{{resource_one}}' to='{}'><command xmlns='http://jabber.org/protocol/commands' node='configure' sessionid='{{sessionid}}' action='next'><x xmlns='jabber:x:data' type='submit'>{}</x></command></iq>",
        id, target, fields
    ))
}

fn cancel_on(id: &str, target: &str) -> Vec<Step> {
    vec![
        Step::send(format!(
            "<iq type='set' id='{}' from='{{jid_one}}/{{resource_one}}' to='{}'><command xmlns='http://jabber.org/protocol/commands' action='cancel' node='configure' sessionid='{{sessionid}}' /></iq>",
            id, target
        )),
        Step::expect([format!("{}[@status='canceled']", CONFIGURE_RESULT)]),
    ]
}

/// Expect the form, saving the session for the next request
fn form(predicates: Vec<String>) -> Step {
    Step::expect_then(predicates, save_sessionid(CONFIGURE_RESULT))
}

fn server_form_header() -> Vec<String> {
    vec![
        EXECUTING.to_string(),
        "/iq/commands:command/dataform:x[@type='form']/dataform:title[text()='Configure the IRC server irc.localhost']".to_string(),
        "/iq/commands:command/dataform:x[@type='form']/dataform:instructions[text()='Edit the form, to configure the settings of the IRC server irc.localhost']".to_string(),
    ]
}

pub fn irc_server_configure() -> Scenario {
    let server = "{irc_server_one}";

    let mut defaults = server_form_header();
    defaults.extend([
        field("text-multi", "ports", Some("6667")),
        field("text-multi", "tls_ports", Some("6670")),
        field("text-multi", "tls_ports", Some("6697")),
        field("boolean", "verify_cert", Some("true")),
        field("text-single", "fingerprint", None),
        field("text-single", "throttle_limit", None),
        field("text-private", "pass", None),
        field("text-multi", "after_connect_commands", None),
        field("text-single", "nick", None),
        field("text-single", "username", None),
        field("text-single", "realname", None),
        field("text-single", "encoding_in", None),
        field("text-single", "encoding_out", None),
        NEXT_ACTION.to_string(),
    ]);

    let mut submitted = server_form_header();
    submitted.extend([
        "/iq/commands:command/dataform:x[@type='form']/dataform:field[@type='text-multi']".to_string(),
        field("text-multi", "tls_ports", Some("6697")),
        field("text-multi", "tls_ports", Some("6698")),
        field("boolean", "verify_cert", Some("true")),
        field("text-single", "fingerprint", Some("12:12:12")),
        field("text-private", "pass", Some("coucou")),
        field("text-single", "nick", Some("my_nickname")),
        field("text-multi", "after_connect_commands", Some("first command")),
        field("text-multi", "after_connect_commands", Some("second command")),
        field("text-single", "username", Some("username")),
        field("text-single", "realname", Some("realname")),
        field("text-single", "throttle_limit", Some("42")),
        field("text-single", "encoding_in", Some("latin-1")),
        field("text-single", "encoding_out", Some("UTF-8")),
        NEXT_ACTION.to_string(),
    ]);

    let mut emptied = server_form_header();
    emptied.push("!/iq/commands:command/dataform:x/dataform:field[@var='tls_ports']/dataform:value".to_string());
    emptied.extend(
        ["pass", "after_connect_commands", "username", "realname", "encoding_in", "encoding_out"]
            .iter()
            .map(|var| empty_field(var)),
    );
    emptied.push(NEXT_ACTION.to_string());
    // An invalid throttle limit disables throttling
    emptied.push(field("text-single", "throttle_limit", Some("-1")));

    Scenario::new(
        "irc_server_configure",
        steps![
            handshake_sequence(),
            execute_on("id1", server),
            form(defaults),
            submit_to(
                "id2",
                server,
                concat!(
                    "<field var='ports' />",
                    "<field var='tls_ports'><value>6697</value><value>6698</value></field>",
                    "<field var='verify_cert'><value>1</value></field>",
                    "<field var='fingerprint'><value>12:12:12</value></field>",
                    "<field var='pass'><value>coucou</value></field>",
                    "<field var='after_connect_commands'><value>first command</value><value>second command</value></field>",
                    "<field var='nick'><value>my_nickname</value></field>",
                    "<field var='username'><value>username</value></field>",
                    "<field var='throttle_limit'><value>42</value></field>",
                    "<field var='realname'><value>realname</value></field>",
                    "<field var='encoding_out'><value>UTF-8</value></field>",
                    "<field var='encoding_in'><value>latin-1</value></field>"
                ),
            ),
            Step::expect([CONFIGURATION_APPLIED]),
            execute_on("id3", server),
            form(submitted),
            cancel_on("id4", server),
            // Empty some values
            execute_on("id1", server),
            Step::expect_then(["/iq[@type='result']"], save_sessionid(CONFIGURE_RESULT)),
            submit_to(
                "id2",
                server,
                concat!(
                    "<field var='pass'><value></value></field>",
                    "<field var='after_connect_commands'></field>",
                    "<field var='username'><value></value></field>",
                    "<field var='realname'><value></value></field>",
                    "<field var='throttle_limit'><value></value></field>",
                    "<field var='encoding_out'><value></value></field>",
                    "<field var='encoding_in'><value></value></field>"
                ),
            ),
            Step::expect([CONFIGURATION_APPLIED]),
            execute_on("id3", server),
            form(emptied),
            cancel_on("id4", server),
        ],
    )
}

const CHANNEL_FORM_TITLE: &str = "/iq/commands:command/dataform:x[@type='form']/dataform:title[text()='Configure the IRC channel #foo on server irc.localhost']";

const CHANNEL_ENCODINGS: &str = "<field var='ports' /><field var='encoding_out'><value>UTF-8</value></field><field var='encoding_in'><value>latin-1</value></field>";

pub fn irc_channel_configure() -> Scenario {
    let channel = "#foo%{irc_server_one}";
    Scenario::new(
        "irc_channel_configure",
        steps![
            handshake_sequence(),
            // Unknown children of the command element are ignored
            Step::send("<iq type='set' id='id1' from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}'><command xmlns='http://jabber.org/protocol/commands' node='configure' action='execute'><dummy/></command></iq>"),
            form(vec![
                EXECUTING.to_string(),
                field("text-single", "encoding_in", None),
                field("text-single", "encoding_out", None),
                field("list-single", "record_history", Some("unset")),
                "!/iq/commands:command/commands:dummy".to_string(),
            ]),
            submit_to(
                "id2",
                channel,
                &format!(
                    "{}<field var='record_history'><value>true</value></field>",
                    CHANNEL_ENCODINGS
                ),
            ),
            Step::expect([CONFIGURATION_APPLIED]),
            execute_on("id3", channel),
            form(vec![
                EXECUTING.to_string(),
                CHANNEL_FORM_TITLE.to_string(),
                field("text-single", "encoding_in", Some("latin-1")),
                field("text-single", "encoding_out", Some("UTF-8")),
                field("list-single", "record_history", Some("true")),
                NEXT_ACTION.to_string(),
            ]),
            cancel_on("id4", channel),
        ],
    )
}

pub fn irc_channel_configure_xep0045() -> Scenario {
    Scenario::new(
        "irc_channel_configure_xep0045",
        steps![
            handshake_sequence(),
            Step::send("<iq type='get' id='id1' from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}'><query xmlns='http://jabber.org/protocol/muc#owner'/></iq>"),
            Step::expect([
                "/iq[@type='result']/muc_owner:query",
                "/iq/muc_owner:query/dataform:x[@type='form']/dataform:field[@type='text-single'][@var='encoding_in']",
                "/iq/muc_owner:query/dataform:x[@type='form']/dataform:field[@type='text-single'][@var='encoding_out']",
            ]),
            Step::send(format!(
                "<iq type='set' id='id2' from='{{jid_one}}/{{resource_one}}' to='#foo%{{irc_server_one}}'><query xmlns='http://jabber.org/protocol/muc#owner'><x xmlns='jabber:x:data' type='submit'>{}</x></query></iq>",
                CHANNEL_ENCODINGS
            )),
            Step::expect(["/iq[@type='result']"]),
            Step::send("<iq type='set' id='id3' from='{jid_one}/{resource_one}' to='#foo%{irc_server_one}'><query xmlns='http://jabber.org/protocol/muc#owner'>    <x xmlns='jabber:x:data' type='cancel'/></query></iq>"),
            Step::expect(["/iq[@type='result']"]),
        ],
    )
}

pub fn irc_channel_configure_fixed() -> Scenario {
    let channel = "#foo@{biboumi_host}";
    Scenario::new(
        "irc_channel_configure_fixed",
        steps![
            handshake_sequence(),
            execute_on("id1", channel),
            form(vec![
                EXECUTING.to_string(),
                field("text-single", "encoding_in", None),
                field("text-single", "encoding_out", None),
            ]),
            submit_to("id2", channel, CHANNEL_ENCODINGS),
            Step::expect([CONFIGURATION_APPLIED]),
            execute_on("id3", channel),
            form(vec![
                EXECUTING.to_string(),
                CHANNEL_FORM_TITLE.to_string(),
                field("text-single", "encoding_in", Some("latin-1")),
                field("text-single", "encoding_out", Some("UTF-8")),
                NEXT_ACTION.to_string(),
            ]),
            cancel_on("id4", channel),
        ],
    )
    .with_config(ConfigVariant::FixedServer)
}
