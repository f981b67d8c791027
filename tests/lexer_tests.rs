//! Lexer integration tests: token shapes, source locations, and the
//! location laws every token stream must satisfy.

use proptest::prelude::*;
use rill::error::LexError;
use rill::lexer::{tokenize, Token, TokenKind};
use rill::source::FileId;

fn lex(src: &str) -> Vec<Token> {
    tokenize(FileId::default(), &to_lines(src)).unwrap()
}

fn to_lines(src: &str) -> Vec<String> {
    src.split('\n').map(|l| l.to_string()).collect()
}

#[test]
fn every_keyword_is_recognized() {
    let toks = lex("let in if then else for func and or not is as match case on");
    let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Let,
            TokenKind::In,
            TokenKind::If,
            TokenKind::Then,
            TokenKind::Else,
            TokenKind::For,
            TokenKind::Func,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::Is,
            TokenKind::As,
            TokenKind::Match,
            TokenKind::Case,
            TokenKind::On,
        ]
    );
    assert!(kinds.iter().all(|k| k.is_keyword()));
}

#[test]
fn identifiers_may_embed_keywords() {
    let toks = lex("letter infer iffy format android");
    assert!(toks.iter().all(|t| t.kind == TokenKind::Ident));
}

#[test]
fn tokens_carry_their_text() {
    let toks = lex("foo 123 \"bar\"");
    assert_eq!(toks[0].text, "foo");
    assert_eq!(toks[1].text, "123");
    assert_eq!(toks[2].text, "bar");
}

#[test]
fn multi_line_locations() {
    let toks = lex("a\n  b\n\nc");
    let locs: Vec<_> = toks.iter().map(|t| (t.loc.line, t.loc.column)).collect();
    assert_eq!(locs, vec![(0, 0), (1, 2), (3, 0)]);
}

/// Law: every token's line is inside the line table and its column inside
/// its line.
#[test]
fn locations_are_in_bounds() {
    let src = "let xs = [1, 2, 3] in\n  [x * x for x in xs] // comment\n";
    let lines = to_lines(src);
    let toks = tokenize(FileId::default(), &lines).unwrap();
    for tok in &toks {
        assert!(tok.loc.line < lines.len(), "line in bounds for {:?}", tok);
        assert!(
            tok.loc.column < lines[tok.loc.line].chars().count(),
            "column in bounds for {:?}",
            tok
        );
    }
}

/// Law: concatenating token texts reproduces the source minus whitespace
/// and comments (for sources without string literals, whose `text` drops
/// the quotes).
#[test]
fn concatenated_text_reproduces_source() {
    let src = "let x=1 in // tail\n [x,2][0:1]";
    let expected: String = src
        .split('\n')
        .map(|line| line.split("//").next().unwrap())
        .collect::<String>()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let actual: String = lex(src).iter().map(|t| t.text.as_str()).collect();
    assert_eq!(actual, expected);
}

#[test]
fn error_positions_point_at_the_character() {
    let err = tokenize(FileId::default(), &to_lines("ok\n   #")).unwrap_err();
    match err {
        LexError::UnexpectedChar { ch, loc } => {
            assert_eq!(ch, '#');
            assert_eq!((loc.line, loc.column), (1, 3));
        }
        other => panic!("expected unexpected-character error, got {:?}", other),
    }
}

#[test]
fn unterminated_string_reports_opening_quote() {
    let err = tokenize(FileId::default(), &to_lines("x\n\"abc def")).unwrap_err();
    assert!(matches!(err, LexError::UnterminatedString { .. }));
    assert_eq!((err.loc().line, err.loc().column), (1, 0));
}

#[test]
fn strings_may_contain_comment_markers() {
    let toks = lex("\"not // a comment\"");
    assert_eq!(toks.len(), 1);
    assert_eq!(toks[0].text, "not // a comment");
}

proptest! {
    #[test]
    fn arbitrary_identifiers_lex_as_single_token(input in "[a-zA-Z_][a-zA-Z0-9_]{0,40}") {
        let toks = tokenize(FileId::default(), &[input.clone()]).unwrap();
        prop_assert_eq!(toks.len(), 1);
        prop_assert_eq!(&toks[0].text, &input);
    }

    #[test]
    fn arbitrary_digit_runs_lex_as_numbers(input in "[0-9]{1,17}") {
        let toks = tokenize(FileId::default(), &[input.clone()]).unwrap();
        prop_assert_eq!(toks.len(), 1);
        prop_assert_eq!(toks[0].kind, TokenKind::Number);
        prop_assert_eq!(&toks[0].text, &input);
    }

    #[test]
    fn quoted_text_without_escapes_roundtrips(content in "[a-zA-Z0-9 ,.!?]{0,40}") {
        let toks = tokenize(FileId::default(), &[format!("\"{}\"", content)]).unwrap();
        prop_assert_eq!(toks.len(), 1);
        prop_assert_eq!(toks[0].kind, TokenKind::String);
        prop_assert_eq!(&toks[0].text, &content);
    }

    #[test]
    fn lexing_never_panics(input in "[ -~\\t]{0,80}") {
        let _ = tokenize(FileId::default(), &[input]);
    }
}
