use lox_lexer::Lexer;
use lox_syntax::{SourceText, TokenKind};

fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input).lex().tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn punctuation_and_operators() {
    use TokenKind::*;
    assert_eq!(
        kinds("(){},.-+;/* ! != = == < <= > >="),
        vec![
            LParen, RParen, LBrace, RBrace, Comma, Dot, Minus, Plus, Semicolon, Slash, Star,
            Bang, BangEq, Eq, EqEq, Lt, Le, Gt, Ge, Eof
        ]
    );
}

#[test]
fn keywords_and_identifiers() {
    use TokenKind::*;
    assert_eq!(
        kinds("and class else false for fun if nil or print return super this true var while foo _x x1"),
        vec![
            KwAnd, KwClass, KwElse, KwFalse, KwFor, KwFun, KwIf, KwNil, KwOr, KwPrint, KwReturn,
            KwSuper, KwThis, KwTrue, KwVar, KwWhile, Ident, Ident, Ident, Eof
        ]
    );
}

#[test]
fn numbers() {
    use TokenKind::*;
    assert_eq!(kinds("1 12.5 0.5"), vec![Number, Number, Number, Eof]);
    // `1.` is a number followed by a dot, `.5` a dot followed by a number.
    assert_eq!(kinds("1."), vec![Number, Dot, Eof]);
    assert_eq!(kinds(".5"), vec![Dot, Number, Eof]);
}

#[test]
fn strings_span_includes_quotes() {
    let result = Lexer::new("\"hi there\"").lex();
    assert_eq!(result.tokens[0].kind, TokenKind::Str);
    assert_eq!(result.tokens[0].span.len(), 10);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn multiline_string_is_one_token() {
    let input = "\"line one\nline two\"";
    let result = Lexer::new(input).lex();
    assert_eq!(result.tokens[0].kind, TokenKind::Str);
    assert_eq!(result.tokens.len(), 2);
}

#[test]
fn line_comment_runs_to_end_of_line() {
    use TokenKind::*;
    assert_eq!(kinds("1 // comment ( ) \"\n2"), vec![Number, Number, Eof]);
}

#[test]
fn unterminated_string_reports_diagnostic() {
    let result = Lexer::new("\"oops").lex();
    assert_eq!(result.tokens.len(), 1); // just Eof
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "Unterminated string.");
}

#[test]
fn unexpected_character_reports_line() {
    let input = "var x = 1;\n@";
    let result = Lexer::new(input).lex();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "Unexpected character.");
    let text = SourceText::new(input.to_string());
    let span = result.diagnostics[0].span.unwrap();
    assert_eq!(text.line(span.start.0), 2);
}

#[test]
fn newlines_advance_line_numbers() {
    let input = "1\n2\n3";
    let result = Lexer::new(input).lex();
    let text = SourceText::new(input.to_string());
    let lines: Vec<u32> = result
        .tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Number)
        .map(|t| text.line(t.span.start.0))
        .collect();
    assert_eq!(lines, vec![1, 2, 3]);
}
