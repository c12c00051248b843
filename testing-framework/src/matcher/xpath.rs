// File: testing-framework/src/matcher/xpath.rs
//
// sxd-xpath backed evaluator
//
// Parses the stanza into a document once per set of queries, binds the
// namespace table and the EXSLT `re:test` function, and reports the boolean
// value of each query result (a node-set is true when non-empty).

use super::namespaces::{EXSLT_REGEX_NS, NAMESPACES};
use super::XPathEvaluator;
use crate::error::MatchError;
use crate::stanza::Stanza;
use regex::RegexBuilder;
use sxd_document::parser;
use sxd_xpath::context::Evaluation;
use sxd_xpath::function::{self, Function};
use sxd_xpath::{Context, Factory, Value, XPath};

/// XPath 1.0 evaluator with the gateway namespace table
#[derive(Debug, Default, Clone, Copy)]
pub struct SxdEvaluator;

impl SxdEvaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        SxdEvaluator
    }

    fn compile(&self, query: &str) -> Result<XPath, MatchError> {
        Factory::new()
            .build(query)
            .map_err(|e| MatchError::MalformedQuery {
                query: query.to_string(),
                reason: format!("{:?}", e),
            })?
            .ok_or_else(|| MatchError::MalformedQuery {
                query: query.to_string(),
                reason: "empty expression".to_string(),
            })
    }
}

fn context<'d>() -> Context<'d> {
    let mut context = Context::new();
    for (prefix, uri) in NAMESPACES {
        context.set_namespace(prefix, uri);
    }
    context.set_function((EXSLT_REGEX_NS, "test"), RegexTest);
    context
}

impl XPathEvaluator for SxdEvaluator {
    fn validate(&self, query: &str) -> Result<(), MatchError> {
        self.compile(query).map(|_| ())
    }

    fn matches(&self, stanza: &Stanza, query: &str) -> Result<bool, MatchError> {
        let selected = self.matches_each(stanza, &[query])?;
        Ok(selected.first().copied().unwrap_or(false))
    }

    fn matches_each(&self, stanza: &Stanza, queries: &[&str]) -> Result<Vec<bool>, MatchError> {
        let compiled = queries
            .iter()
            .map(|query| self.compile(query))
            .collect::<Result<Vec<_>, _>>()?;
        let package = parse_stanza(stanza)?;
        let document = package.as_document();
        let context = context();
        queries
            .iter()
            .zip(&compiled)
            .map(|(query, xpath)| {
                xpath
                    .evaluate(&context, document.root())
                    .map(|value| value.boolean())
                    .map_err(|e| evaluation_error(query, e))
            })
            .collect()
    }

    fn select_string(&self, stanza: &Stanza, query: &str) -> Result<Option<String>, MatchError> {
        let xpath = self.compile(query)?;
        let package = parse_stanza(stanza)?;
        let document = package.as_document();
        let value = xpath
            .evaluate(&context(), document.root())
            .map_err(|e| evaluation_error(query, e))?;
        Ok(match value {
            Value::Nodeset(nodes) => nodes.document_order_first().map(|node| node.string_value()),
            other => Some(other.string()),
        })
    }
}

fn parse_stanza(stanza: &Stanza) -> Result<sxd_document::Package, MatchError> {
    parser::parse(stanza.as_str()).map_err(|e| MatchError::MalformedStanza {
        stanza: stanza.to_string(),
        reason: format!("{:?}", e),
    })
}

fn evaluation_error(query: &str, e: impl std::fmt::Debug) -> MatchError {
    MatchError::Evaluation {
        query: query.to_string(),
        reason: format!("{:?}", e),
    }
}

/// `re:test(input, pattern[, flags])`
///
/// Search semantics: the pattern may match anywhere in the input. The `i`
/// flag makes it case-insensitive; `g` is accepted and ignored.
struct RegexTest;

impl Function for RegexTest {
    fn evaluate<'c, 'd>(
        &self,
        _context: &Evaluation<'c, 'd>,
        args: Vec<Value<'d>>,
    ) -> Result<Value<'d>, function::Error> {
        if !(2..=3).contains(&args.len()) {
            return Err(function::Error::Other(format!(
                "re:test takes 2 or 3 arguments, got {}",
                args.len()
            )));
        }
        let input = args[0].string();
        let pattern = args[1].string();
        let flags = args.get(2).map(|v| v.string()).unwrap_or_default();

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(flags.contains('i'))
            .build()
            .map_err(|e| function::Error::Other(e.to_string()))?;
        Ok(Value::Boolean(regex.is_match(&input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{evaluate, PredicateSet};

    fn stanza(text: &str) -> Stanza {
        Stanza::new(text)
    }

    #[test]
    fn test_handshake() {
        let eval = SxdEvaluator::new();
        assert!(eval
            .matches(&stanza("<handshake xmlns='jabber:component:accept'>abc</handshake>"), "//handshake")
            .unwrap());
        assert!(!eval.matches(&stanza("<message/>"), "//handshake").unwrap());
    }

    #[test]
    fn test_attribute_and_text_predicates() {
        let eval = SxdEvaluator::new();
        let s = stanza(
            "<message xmlns='jabber:component:accept' to='first@example.com/resource1' \
             from='#foo%irc.localhost@biboumi.localhost' type='groupchat'>\
             <body>coucou</body></message>",
        );
        assert!(eval
            .matches(&s, "/message[@to='first@example.com/resource1'][@type='groupchat']/body[text()='coucou']")
            .unwrap());
        assert!(!eval.matches(&s, "/message[@type='chat']").unwrap());
    }

    #[test]
    fn test_prefixed_namespaces() {
        let eval = SxdEvaluator::new();
        let s = stanza(
            "<presence from='#foo%irc.localhost@biboumi.localhost/Nick' to='first@example.com/resource1'>\
             <x xmlns='http://jabber.org/protocol/muc#user'>\
             <item affiliation='none' role='participant' jid='~nick@localhost'/>\
             <status code='110'/></x></presence>",
        );
        assert!(eval
            .matches(&s, "/presence/muc_user:x/muc_user:item[@affiliation='none'][@role='participant']")
            .unwrap());
        assert!(eval.matches(&s, "/presence/muc_user:x/muc_user:status[@code='110']").unwrap());
        assert!(!eval.matches(&s, "/presence/muc_owner:x").unwrap());
    }

    #[test]
    fn test_regex_function() {
        let eval = SxdEvaluator::new();
        let s = stanza(
            "<message to='first@example.com'><body>irc.localhost: *** Looking up your hostname...</body></message>",
        );
        let query = "/message/body[re:test(text(), '^irc.localhost: (\\*\\*\\* Checking Ident|\\*\\*\\* Looking up your hostname\\.\\.\\.)$')]";
        assert!(eval.matches(&s, query).unwrap());
        assert!(eval
            .matches(&s, "/message/body[re:test(text(), 'LOOKING', 'i')]")
            .unwrap());
        assert!(!eval.matches(&s, "/message/body[re:test(text(), '^Connected')]").unwrap());
    }

    #[test]
    fn test_negation_is_complement() {
        let eval = SxdEvaluator::new();
        let s = stanza("<iq type='result'><query xmlns='http://jabber.org/protocol/commands'/></iq>");
        for q in ["/iq[@type='result']", "/iq/commands:query", "/iq[@type='error']", "//message"] {
            let positive = evaluate(&eval, &s, q).unwrap();
            let negative = evaluate(&eval, &s, &format!("!{}", q)).unwrap();
            assert_eq!(positive, !negative, "{}", q);
        }
    }

    #[test]
    fn test_conjunction() {
        let eval = SxdEvaluator::new();
        let s = stanza("<message type='chat'><body>hi</body></message>");
        assert!(PredicateSet::new(["/message", "/message[@type='chat']", "/message/body"])
            .all_match(&eval, &s)
            .unwrap());
        assert!(!PredicateSet::new(["/message", "/message[@type='groupchat']"])
            .all_match(&eval, &s)
            .unwrap());
    }

    #[test]
    fn test_malformed_query_is_fatal() {
        let eval = SxdEvaluator::new();
        let err = eval.matches(&stanza("<a/>"), "/a[").unwrap_err();
        assert!(matches!(err, MatchError::MalformedQuery { .. }));
    }

    #[test]
    fn test_unknown_prefix_is_not_a_mismatch() {
        let eval = SxdEvaluator::new();
        assert!(eval.matches(&stanza("<a/>"), "/nope:a").is_err());
    }

    #[test]
    fn test_select_string() {
        let eval = SxdEvaluator::new();
        let s = stanza(
            "<iq type='result'><command xmlns='http://jabber.org/protocol/commands' \
             node='hello' sessionid='1234' status='executing'/></iq>",
        );
        assert_eq!(
            eval.select_string(&s, "/iq/commands:command/@sessionid").unwrap(),
            Some("1234".to_string())
        );
        assert_eq!(eval.select_string(&s, "/iq/commands:nothing/@node").unwrap(), None);
    }

    #[test]
    fn test_matches_each_evaluates_every_query() {
        let eval = SxdEvaluator::new();
        let s = stanza("<message type='chat'><body>hi</body></message>");
        assert_eq!(
            eval.matches_each(&s, &["/message", "/presence", "/message/body"]).unwrap(),
            vec![true, false, true]
        );
        let err = eval.matches_each(&s, &["/presence", "/message["]).unwrap_err();
        assert!(matches!(err, MatchError::MalformedQuery { .. }));
        assert!(eval.matches_each(&s, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_validate() {
        let eval = SxdEvaluator::new();
        assert!(eval.validate("/iq/commands:command[@node='ping']").is_ok());
        assert!(matches!(eval.validate("/iq["), Err(MatchError::MalformedQuery { .. })));
    }

    #[test]
    fn test_malformed_stanza() {
        let eval = SxdEvaluator::new();
        let err = eval.matches(&stanza("<a><b></a>"), "/a").unwrap_err();
        assert!(matches!(err, MatchError::MalformedStanza { .. }));
    }
}
