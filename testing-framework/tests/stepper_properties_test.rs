#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//! Stepper behavior against scripted stanza streams
//!
//! Covers the matching properties of the engine: negation, conjunction,
//! unordered completeness in any delivery order, first-match tie-break,
//! skip-and-retry of optional expectations, and idempotent failure.

use gateway_testing_framework::error::{AssertionFailure, HarnessError};
use gateway_testing_framework::expectation::{Expectation, Extractor, SaveValue};
use gateway_testing_framework::matcher::{Predicate, SxdEvaluator};
use gateway_testing_framework::scenarios::{Progress, ScenarioStepper, StepperState};
use gateway_testing_framework::stanza::Stanza;
use gateway_testing_framework::Step;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn stepper(steps: Vec<Step>) -> ScenarioStepper {
    ScenarioStepper::new("property", steps, Arc::new(SxdEvaluator))
}

const KICK_ALTERNATIVES: [&str; 4] = [
    "/presence[@type='unavailable'][@to='first@example.com/resource1']",
    "/presence[@type='unavailable'][@to='second@example.com/resource1']",
    "/presence[@type='unavailable'][@to='third@example.com/resource1']",
    "/iq[@type='result'][@id='kick1']",
];

const KICK_STANZAS: [&str; 4] = [
    "<presence type='unavailable' from='#foo%irc.localhost@biboumi.localhost/Nick' to='first@example.com/resource1'/>",
    "<presence type='unavailable' from='#foo%irc.localhost@biboumi.localhost/Nick' to='second@example.com/resource1'/>",
    "<presence type='unavailable' from='#foo%irc.localhost@biboumi.localhost/Nick' to='third@example.com/resource1'/>",
    "<iq type='result' id='kick1' from='#foo%irc.localhost@biboumi.localhost' to='second@example.com/resource1'/>",
];

fn kick_group() -> Step {
    Step::expect_unordered(KICK_ALTERNATIVES.iter().map(|p| vec![*p]))
}

#[test]
fn test_basic_handshake_example() {
    let mut s = stepper(vec![Step::send("<handshake/>"), Step::expect(["//handshake"])]);
    assert_eq!(s.start(), Progress::Awaiting);
    assert_eq!(s.take_outbox(), vec!["<handshake/>"]);

    assert_eq!(s.deliver(Stanza::new("<handshake/>")), Progress::Drained);
    let report = s.report();
    assert!(report.success);
    assert_eq!(report.remaining_steps, 0);
}

#[test]
fn test_kick_group_rejects_fifth_stanza() {
    let mut s = stepper(vec![kick_group(), Step::expect(["/message"])]);
    s.start();
    for stanza in KICK_STANZAS {
        assert_eq!(s.deliver(Stanza::new(stanza)), Progress::Awaiting);
    }
    // The group is done; the next ordered expectation is active
    assert!(matches!(s.expectation(), Some(Expectation::Single(_))));

    let mut s = stepper(vec![kick_group()]);
    s.start();
    for stanza in &KICK_STANZAS[..3] {
        s.deliver(Stanza::new(*stanza));
    }
    let progress = s.deliver(Stanza::new("<presence type='unavailable' to='fourth@example.com/resource1'/>"));
    assert_eq!(progress, Progress::Failed);
    match s.error() {
        Some(HarnessError::Assertion(AssertionFailure::NoAlternative { remaining, .. })) => {
            assert_eq!(remaining.len(), 1);
            assert!(remaining[0].contains("kick1"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_first_match_tie_break() {
    let mut s = stepper(vec![Step::expect_unordered(vec![
        vec!["/message"],
        vec!["/message[@type='chat']"],
    ])]);
    s.start();
    // Satisfies both; the first declared alternative is consumed
    assert_eq!(s.deliver(Stanza::new("<message type='chat'/>")), Progress::Awaiting);
    // Only the typed alternative is left, so an untyped message fails
    assert_eq!(s.deliver(Stanza::new("<message/>")), Progress::Failed);
    match s.error() {
        Some(HarnessError::Assertion(AssertionFailure::NoAlternative { remaining, .. })) => {
            assert_eq!(remaining, &vec!["/message[@type='chat']".to_string()]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_skip_and_retry() {
    let mut s = stepper(vec![
        Step::expect_optional(["/presence"]),
        Step::expect(["/message"]),
    ]);
    s.start();
    assert_eq!(s.deliver(Stanza::new("<message/>")), Progress::Drained);
    assert!(s.error().is_none());
    assert_eq!(s.report().stanzas_consumed, 1);
}

#[test]
fn test_consecutive_optional_expectations_are_all_skipped() {
    let mut s = stepper(vec![
        Step::expect_optional(["/message[body='unknown connections']"]),
        Step::expect_optional(["/message[body='channels formed']"]),
        Step::expect(["/presence"]),
    ]);
    s.start();
    assert_eq!(s.deliver(Stanza::new("<presence/>")), Progress::Drained);
}

#[test]
fn test_single_active_expectation() {
    let mut s = stepper(vec![
        Step::expect_optional(["/presence"]),
        Step::expect(["/message[@type='chat']"]),
        Step::expect(["/iq"]),
    ]);
    s.start();
    assert!(s.pending_description().contains("/presence"));

    s.deliver(Stanza::new("<message type='chat'/>"));
    // Skip installed the message expectation, which consumed the stanza and
    // was replaced by the next one
    let pending = s.pending_description();
    assert!(pending.contains("/iq"));
    assert!(!pending.contains("/presence"));
}

#[test]
fn test_idempotent_failure() {
    let mut s = stepper(vec![
        Step::expect(["/message"]),
        Step::send("<never/>"),
        Step::expect(["/iq"]),
    ]);
    s.start();
    assert_eq!(s.deliver(Stanza::new("<iq/>")), Progress::Failed);
    let consumed = s.report().stanzas_consumed;
    let first_error = s.error().map(|e| e.to_string());

    for _ in 0..3 {
        assert_eq!(s.deliver(Stanza::new("<message/>")), Progress::Failed);
    }
    assert_eq!(s.resume(), Progress::Failed);
    assert!(s.take_outbox().is_empty());
    assert_eq!(s.report().stanzas_consumed, consumed);
    assert_eq!(s.error().map(|e| e.to_string()), first_error);
    assert_eq!(s.state(), StepperState::Failed);
}

#[test]
fn test_sessionid_threading() {
    let after = vec![SaveValue::new(
        "sessionid",
        Extractor::Attribute {
            xpath: "/iq[@type='result']/commands:command[@node='hello']".to_string(),
            attribute: "sessionid".to_string(),
        },
    )];
    let mut s = stepper(vec![
        Step::expect_then(["/iq[@type='result']/commands:command[@node='hello'][@sessionid]"], after),
        Step::send("<iq type='set' id='hello-command2'><command xmlns='http://jabber.org/protocol/commands' node='hello' sessionid='{sessionid}' action='next'/></iq>"),
    ]);
    s.start();
    let progress = s.deliver(Stanza::new(
        "<iq type='result' id='hello-command1'><command xmlns='http://jabber.org/protocol/commands' node='hello' sessionid='1536-9f81a' status='executing'/></iq>",
    ));
    assert_eq!(progress, Progress::Drained);
    assert_eq!(s.saved_values().get("sessionid"), Some("1536-9f81a"));
    let sent = s.take_outbox();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("sessionid='1536-9f81a'"));
}

#[test]
fn test_stanza_during_pause_waits_for_next_expectation() {
    let mut s = stepper(vec![
        Step::pause(Duration::from_secs(1)),
        Step::expect(["/message/body[text()='hello']"]),
    ]);
    assert_eq!(s.start(), Progress::Paused(Duration::from_secs(1)));
    assert_eq!(
        s.deliver(Stanza::new("<message><body>hello</body></message>")),
        Progress::Paused(Duration::from_secs(1))
    );
    assert_eq!(s.resume(), Progress::Drained);
}

#[test]
fn test_templated_unordered_alternatives_use_saved_values() {
    let mut s = stepper(vec![
        Step::save("id", Extractor::Literal { value: "kick1".to_string() }),
        Step::expect_unordered(vec![
            vec!["/iq[@id='{id}']"],
            vec!["/presence[@to='{jid_one}/{resource_one}']"],
        ]),
    ]);
    s.start();
    s.deliver(Stanza::new("<presence to='first@example.com/resource1'/>"));
    assert_eq!(s.deliver(Stanza::new("<iq id='kick1'/>")), Progress::Drained);
}

fn kick_permutation() -> impl Strategy<Value = Vec<usize>> {
    Just((0..KICK_STANZAS.len()).collect::<Vec<_>>()).prop_shuffle()
}

proptest! {
    #[test]
    fn prop_unordered_completeness(order in kick_permutation()) {
        let mut s = stepper(vec![kick_group()]);
        s.start();
        for (delivered, index) in order.iter().enumerate() {
            let progress = s.deliver(Stanza::new(KICK_STANZAS[*index]));
            if delivered + 1 < KICK_STANZAS.len() {
                prop_assert_eq!(progress, Progress::Awaiting);
            } else {
                prop_assert_eq!(progress, Progress::Drained);
            }
        }
        prop_assert_eq!(s.report().stanzas_consumed, KICK_STANZAS.len());
    }

    #[test]
    fn prop_negation(has_type in any::<bool>(), body in "[a-z]{0,8}") {
        let stanza = if has_type {
            Stanza::new(format!("<message type='chat'><body>{}</body></message>", body))
        } else {
            Stanza::new(format!("<message><body>{}</body></message>", body))
        };
        let query = "/message[@type='chat']";
        let plain = Predicate::parse(query).evaluate(&SxdEvaluator, &stanza).unwrap();
        let negated = Predicate::parse(format!("!{}", query)).evaluate(&SxdEvaluator, &stanza).unwrap();
        prop_assert_eq!(plain, has_type);
        prop_assert_eq!(negated, !plain);
    }

    #[test]
    fn prop_conjunction(a in any::<bool>(), b in any::<bool>(), c in any::<bool>()) {
        let mut attributes = String::new();
        for (present, name) in [(a, "a"), (b, "b"), (c, "c")] {
            if present {
                attributes.push_str(&format!(" {}='1'", name));
            }
        }
        let mut s = stepper(vec![Step::expect(["/message[@a]", "/message[@b]", "/message[@c]"])]);
        s.start();
        let progress = s.deliver(Stanza::new(format!("<message{}/>", attributes)));
        if a && b && c {
            prop_assert_eq!(progress, Progress::Drained);
        } else {
            prop_assert_eq!(progress, Progress::Failed);
        }
    }
}
