//! End-to-end extraction of time expressions with the shipped tables.

use tablefsm_core::{Pipeline, State, Token};

const TIMES: &str = include_str!("../../machines/times.yaml");

const INVITATION: &str = "\"Hello Myra, the meeting is on 2/5 in room 1300. It will last from 1-2 PM. \
There will be a sumptuous banquet afterward at 1800 hours. The address is 2300 Sycamore Lane. \
Please RSVP by 5:30 PM on February 1 at 786-4819. You can check out our new wide screen set \
with the 16:9 aspect ratio!\"";

fn pipeline() -> Pipeline {
    Pipeline::from_yaml("times", TIMES).unwrap()
}

#[test]
fn test_invitation_statements() {
    let statements = pipeline().extract(INVITATION).unwrap();
    assert_eq!(statements, vec!["1-2 PM", "1800", "5:30 PM"]);
}

#[test]
fn test_invitation_tokens() {
    let tokens = pipeline().tokenize(INVITATION).unwrap();

    assert_eq!(tokens.len(), 61);
    assert_eq!(tokens[0], Token::new("NOT_TOKEN", "\"Hello"));
    assert_eq!(tokens[6], Token::new("NOT_TOKEN", "2/5"));
    assert_eq!(tokens[9], Token::new("24HOUR_TIME", "1300"));
    assert_eq!(
        &tokens[14..18],
        &[
            Token::new("INFORMAL_TIME", "1"),
            Token::new("DASH", "-"),
            Token::new("INFORMAL_TIME", "2"),
            Token::new("AM_PM", " PM"),
        ]
    );
    assert_eq!(tokens[25], Token::new("AT", ""));
    assert_eq!(tokens[37], Token::new("12HOUR_TIME", "5:30"));
    assert_eq!(tokens[57], Token::new("NOT_TOKEN", "16:9"));
    assert_eq!(tokens[60], Token::new("NOT_TOKEN", "\""));
    assert!(tokens.iter().all(|t| t.kind != "SPACE" && t.kind != "PUNCTUATION"));
}

#[test]
fn test_ranges_and_prefixes() {
    let p = pipeline();

    assert_eq!(p.extract("from 10 to 11 AM").unwrap(), vec!["10 to 11 AM"]);
    assert_eq!(p.extract("meet 9:15-10:45 PM").unwrap(), vec!["9:15-10:45 PM"]);
    assert_eq!(p.extract("1300-1500").unwrap(), vec!["1300-1500"]);
    assert_eq!(p.extract("at 0930").unwrap(), vec!["0930"]);
    assert!(p.extract("room 1300.").unwrap().is_empty());
}

#[test]
fn test_grammar_as_matcher() {
    // The grammar table doubles as a recognizer over token labels.
    let grammar = &pipeline().grammar;

    assert!(grammar.accepts_symbols(["INFORMAL_TIME", "DASH", "INFORMAL_TIME", "AM_PM"]));
    assert!(grammar.accepts_symbols(["AT", "24HOUR_TIME"]));
    assert!(!grammar.accepts_symbols(["AT", "NOT_TOKEN"]));
    assert!(!grammar.accepts_symbols(Vec::<&str>::new()));
    assert!(grammar.is_final(&State::from("L")));
}

#[test]
fn test_lexer_as_matcher() {
    let lexer = &pipeline().lexer;

    assert!(lexer.accepts("1800"));
    assert!(lexer.accepts("5:30"));
    assert!(lexer.accepts("PM"));
    assert!(!lexer.accepts("5:3"));
    assert!(!lexer.accepts("5:30 PM"));
}
