use crate::Span;

/// Source text plus a line-start index for span-to-line mapping.
#[derive(Clone, Debug)]
pub struct SourceText {
    text: String,
    line_starts: Vec<u32>,
}

impl SourceText {
    pub fn new(text: String) -> Self {
        let mut line_starts = Vec::with_capacity(text.len().saturating_div(32).max(8));
        line_starts.push(0u32);
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn slice(&self, span: Span) -> &str {
        let start = span.start.0 as usize;
        let end = span.end.0 as usize;
        &self.text[start..end]
    }

    /// 1-based line number containing the given byte offset.
    pub fn line(&self, byte: u32) -> u32 {
        let byte = byte.min(self.text.len() as u32);
        let idx = match self.line_starts.binary_search(&byte) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        idx as u32 + 1
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }
}

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub text: SourceText,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: String) -> Self {
        Self {
            name: name.into(),
            text: SourceText::new(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup() {
        let text = SourceText::new("one\ntwo\nthree".to_string());
        assert_eq!(text.line(0), 1);
        assert_eq!(text.line(3), 1);
        assert_eq!(text.line(4), 2);
        assert_eq!(text.line(8), 3);
        assert_eq!(text.line(12), 3);
        // Offsets past the end clamp to the last line.
        assert_eq!(text.line(999), 3);
    }

    #[test]
    fn empty_source_has_one_line() {
        let text = SourceText::new(String::new());
        assert_eq!(text.line_count(), 1);
        assert_eq!(text.line(0), 1);
    }
}
