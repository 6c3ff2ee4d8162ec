//! Lexer implementation.
//!
//! Scans source text into tokens (keywords/idents/literals/punctuation) and
//! collects diagnostics. Invalid input (unknown characters, unterminated
//! strings) is reported as a diagnostic and skipped; the token stream itself
//! never carries error tokens.
//!
//! Design: single linear pass over bytes, minimal allocations.
use lox_syntax::{is_ident_continue, is_ident_start, Diagnostic, Span, Token, TokenKind};

/// Lexing result.
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lox lexer.
pub struct Lexer<'a> {
    bytes: &'a [u8],
    i: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    pub fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            i: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Run the lexer and return tokens + diagnostics.
    pub fn lex(mut self) -> LexResult {
        let approx = self.bytes.len().saturating_div(4).max(16);
        self.tokens.reserve(approx);
        while self.i < self.bytes.len() {
            let start = self.i;
            let b = self.bytes[self.i];
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.i += 1;
                }
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b',' => self.single(TokenKind::Comma),
                b'.' => self.single(TokenKind::Dot),
                b'-' => self.single(TokenKind::Minus),
                b'+' => self.single(TokenKind::Plus),
                b';' => self.single(TokenKind::Semicolon),
                b'*' => self.single(TokenKind::Star),
                b'/' => {
                    if self.peek_at(1) == Some(b'/') {
                        while self.i < self.bytes.len() && self.bytes[self.i] != b'\n' {
                            self.i += 1;
                        }
                    } else {
                        self.single(TokenKind::Slash);
                    }
                }
                b'!' => self.one_or_two(TokenKind::Bang, TokenKind::BangEq),
                b'=' => self.one_or_two(TokenKind::Eq, TokenKind::EqEq),
                b'<' => self.one_or_two(TokenKind::Lt, TokenKind::Le),
                b'>' => self.one_or_two(TokenKind::Gt, TokenKind::Ge),
                b'"' => self.string(start),
                b'0'..=b'9' => self.number(start),
                _ if is_ident_start(b) => self.ident_or_keyword(start),
                _ => {
                    // Skip one whole character, not one byte, so a stray
                    // multi-byte character produces a single diagnostic.
                    let width = utf8_width(b);
                    self.i += width;
                    self.diagnostics.push(Diagnostic::error(
                        "Unexpected character.",
                        Some(Span::new(start as u32, start as u32)),
                    ));
                }
            }
        }
        let end = self.bytes.len() as u32;
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(end, end),
        });
        LexResult {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start as u32, end as u32),
        });
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.i;
        self.i += 1;
        self.push(kind, start, self.i);
    }

    fn one_or_two(&mut self, short: TokenKind, long: TokenKind) {
        let start = self.i;
        self.i += 1;
        if self.peek_at(0) == Some(b'=') {
            self.i += 1;
            self.push(long, start, self.i);
        } else {
            self.push(short, start, self.i);
        }
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.i + offset).copied()
    }

    fn string(&mut self, start: usize) {
        self.i += 1;
        while self.i < self.bytes.len() && self.bytes[self.i] != b'"' {
            self.i += 1;
        }
        if self.i >= self.bytes.len() {
            // Report at the point scanning stopped, like the quote-less end
            // of input it is.
            let end = self.bytes.len() as u32;
            self.diagnostics.push(Diagnostic::error(
                "Unterminated string.",
                Some(Span::new(end, end)),
            ));
            return;
        }
        self.i += 1;
        self.push(TokenKind::Str, start, self.i);
    }

    fn number(&mut self, start: usize) {
        while self.peek_at(0).is_some_and(|b| b.is_ascii_digit()) {
            self.i += 1;
        }
        // A fractional part needs a digit after the dot; `1.` is a number
        // followed by a Dot token.
        if self.peek_at(0) == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.i += 1;
            while self.peek_at(0).is_some_and(|b| b.is_ascii_digit()) {
                self.i += 1;
            }
        }
        self.push(TokenKind::Number, start, self.i);
    }

    fn ident_or_keyword(&mut self, start: usize) {
        while self.peek_at(0).is_some_and(is_ident_continue) {
            self.i += 1;
        }
        let kind = match &self.bytes[start..self.i] {
            b"and" => TokenKind::KwAnd,
            b"class" => TokenKind::KwClass,
            b"else" => TokenKind::KwElse,
            b"false" => TokenKind::KwFalse,
            b"for" => TokenKind::KwFor,
            b"fun" => TokenKind::KwFun,
            b"if" => TokenKind::KwIf,
            b"nil" => TokenKind::KwNil,
            b"or" => TokenKind::KwOr,
            b"print" => TokenKind::KwPrint,
            b"return" => TokenKind::KwReturn,
            b"super" => TokenKind::KwSuper,
            b"this" => TokenKind::KwThis,
            b"true" => TokenKind::KwTrue,
            b"var" => TokenKind::KwVar,
            b"while" => TokenKind::KwWhile,
            _ => TokenKind::Ident,
        };
        self.push(kind, start, self.i);
    }
}

fn utf8_width(b: u8) -> usize {
    match b {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}
