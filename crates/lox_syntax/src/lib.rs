//! Shared syntax types: spans, source text, tokens, diagnostics.

mod diagnostic;
mod render;
mod source;
mod span;
mod token;

pub use diagnostic::Diagnostic;
pub use render::{render_diagnostic, render_diagnostics};
pub use source::{SourceFile, SourceText};
pub use span::{ByteIndex, Span};
pub use token::{Token, TokenKind};

/// Leading character of an identifier.
pub fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

/// Continuation character of an identifier.
pub fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}
