use crate::Span;

/// A compile-time problem tied to a location in the source.
///
/// `span` points at the offending token when there is one; `at_end` marks
/// errors reported after the last token (unexpected end of input).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Option<Span>,
    pub at_end: bool,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            span,
            at_end: false,
        }
    }

    pub fn error_at_end(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
            at_end: true,
        }
    }
}
