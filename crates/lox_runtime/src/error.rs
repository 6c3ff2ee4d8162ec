use std::fmt;

/// A runtime failure: message plus a call-frame backtrace, innermost first.
#[derive(Debug)]
pub struct RuntimeError {
    pub message: String,
    /// `(line, frame description)` per active frame; the description is
    /// `script` for the top level and `name()` for functions.
    pub trace: Vec<(u32, String)>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: Vec::new(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (line, frame) in &self.trace {
            write!(f, "\n[line {}] in {}", line, frame)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}
