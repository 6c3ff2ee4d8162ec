//! Lexer for Lox source text.

mod lexer;

pub use lexer::{LexResult, Lexer};
