use crate::{Diagnostic, SourceFile};

/// Render one diagnostic in the `[line N] Error …` format.
pub fn render_diagnostic(source: &SourceFile, diag: &Diagnostic) -> String {
    match diag.span {
        Some(span) => {
            let line = source.text.line(span.start.0);
            if diag.at_end {
                format!("[line {}] Error at end: {}", line, diag.message)
            } else if span.is_empty() {
                format!("[line {}] Error: {}", line, diag.message)
            } else {
                let lexeme = source.text.slice(span);
                format!("[line {}] Error at '{}': {}", line, lexeme, diag.message)
            }
        }
        None => format!("Error: {}", diag.message),
    }
}

pub fn render_diagnostics(source: &SourceFile, diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for (idx, d) in diagnostics.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&render_diagnostic(source, d));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    #[test]
    fn renders_token_anchored_error() {
        let source = SourceFile::new("test.lox", "var = 1;".to_string());
        let diag = Diagnostic::error("Expect variable name.", Some(Span::new(4, 5)));
        assert_eq!(
            render_diagnostic(&source, &diag),
            "[line 1] Error at '=': Expect variable name."
        );
    }

    #[test]
    fn renders_at_end_error() {
        let source = SourceFile::new("test.lox", "print 1".to_string());
        let diag = Diagnostic::error_at_end("Expect ';' after value.", Span::new(7, 7));
        assert_eq!(
            render_diagnostic(&source, &diag),
            "[line 1] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn renders_bare_scanner_error_with_line() {
        let source = SourceFile::new("test.lox", "ok\n@".to_string());
        let diag = Diagnostic::error("Unexpected character.", Some(Span::new(3, 3)));
        assert_eq!(
            render_diagnostic(&source, &diag),
            "[line 2] Error: Unexpected character."
        );
    }
}
