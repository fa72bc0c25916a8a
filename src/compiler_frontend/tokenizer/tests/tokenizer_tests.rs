use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorType};
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, TokenKind};

fn lex(source: &str) -> (FileTokens, Vec<CompilerError>) {
    let mut errors = Vec::new();
    let tokens = tokenize(source, &mut errors);
    (tokens, errors)
}

fn kinds(tokens: &FileTokens) -> Vec<TokenKind> {
    tokens.tokens.iter().map(|token| token.kind.clone()).collect()
}

#[test]
fn declaration_tokens_end_with_eof() {
    let (tokens, errors) = lex("int a = 4;");

    assert!(errors.is_empty());
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Int,
            TokenKind::Symbol("a".into()),
            TokenKind::Assign,
            TokenKind::IntLiteral(4),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn reserved_words_become_keywords() {
    let (tokens, _) = lex("if else while for def function return int iffy");

    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::If,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::For,
            TokenKind::Def,
            TokenKind::Function,
            TokenKind::Return,
            TokenKind::Int,
            TokenKind::Symbol("iffy".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn arrow_is_one_token_but_minus_still_works() {
    let (tokens, _) = lex(") -> int a - b");

    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::CloseParenthesis,
            TokenKind::Arrow,
            TokenKind::Int,
            TokenKind::Symbol("a".into()),
            TokenKind::Subtract,
            TokenKind::Symbol("b".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn decimal_point_makes_a_float_literal() {
    let (tokens, errors) = lex("3.25 7");

    assert!(errors.is_empty());
    assert_eq!(tokens.tokens[0].kind, TokenKind::FloatLiteral(3.25));
    assert_eq!(tokens.tokens[1].kind, TokenKind::IntLiteral(7));
}

#[test]
fn comments_produce_no_tokens_and_block_comments_count_lines() {
    let source = "int a = 1; // trailing\n/* one\ntwo\nthree */ int b = 2;";
    let (tokens, errors) = lex(source);

    assert!(errors.is_empty());
    assert_eq!(tokens.length, 11);

    let b = tokens
        .tokens
        .iter()
        .find(|token| token.kind == TokenKind::Symbol("b".into()))
        .unwrap();
    assert_eq!(b.line(), 4);
}

#[test]
fn illegal_character_is_reported_once_and_skipped() {
    let (tokens, errors) = lex("int a = 4 @ ;\nreturn a;");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, ErrorType::Lexical);
    assert!(errors[0].msg.contains("'@'"));
    assert_eq!(errors[0].line(), 1);

    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Int,
            TokenKind::Symbol("a".into()),
            TokenKind::Assign,
            TokenKind::IntLiteral(4),
            TokenKind::Semicolon,
            TokenKind::Return,
            TokenKind::Symbol("a".into()),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn oversized_integer_literal_is_a_lexical_error() {
    let (tokens, errors) = lex("99999999999999999999;");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, ErrorType::Lexical);
    assert_eq!(kinds(&tokens), vec![TokenKind::Semicolon, TokenKind::Eof]);
}

#[test]
fn token_trace_shows_line_kind_and_value() {
    let (tokens, _) = lex("int a = 4;\nreturn a;");
    let trace = tokens.to_string();

    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(lines[0], "1: INT(int)");
    assert_eq!(lines[1], "1: IDENTIFIER(a)");
    assert_eq!(lines[3], "1: NUMBER(4)");
    assert_eq!(lines[5], "2: RETURN(return)");
    assert_eq!(lines.len(), 8);
}

#[test]
fn empty_source_is_just_eof() {
    let (tokens, errors) = lex("   \n\t ");

    assert!(errors.is_empty());
    assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
    assert!(tokens.is_finished());
}

#[test]
fn unclosed_block_comment_is_reported_at_its_opening() {
    let (tokens, errors) = lex("int a = 1;\n/* never closed\nint b = 2;");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, ErrorType::Lexical);
    assert_eq!(errors[0].location.line(), 2);
    assert!(errors[0].msg.contains("never closed"));

    // Everything after the opening is gone, the stream still ends cleanly
    assert_eq!(tokens.length, 6);
    assert_eq!(tokens.tokens[5].kind, TokenKind::Eof);
}
