use crate::Level;
use serde::Serialize;
use std::fmt;

/// One leveled, human readable finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub text: String,
}

impl Diagnostic {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Level::Info, text)
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(Level::Warn, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error, text)
    }

    pub fn ignored(text: impl Into<String>) -> Self {
        Self::new(Level::Ignored, text)
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.text)
    }
}

/// Count the ERROR entries of a diagnostics list
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

/// Calculate the worst level present in a list of diagnostics
pub fn overall_level(diagnostics: &[Diagnostic]) -> Option<Level> {
    diagnostics.iter().map(|d| d.level).max()
}

/// Outcome of one validation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// `operationId` (or `METHOD template` when absent) of the matched operation
    pub operation: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn overall_level(&self) -> Option<Level> {
        overall_level(&self.diagnostics)
    }

    /// Rendered `"<LEVEL>: <text>"` lines in insertion order
    pub fn lines(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::error("orderId: path is required");
        assert_eq!(diagnostic.to_string(), "ERROR: orderId: path is required");
        assert_eq!(Diagnostic::ignored("x").to_string(), "IGNORED: x");
    }

    #[test]
    fn test_overall_level() {
        assert_eq!(overall_level(&[]), None);

        let diagnostics = vec![
            Diagnostic::info("matched"),
            Diagnostic::warn("deprecated"),
            Diagnostic::ignored("skipped"),
        ];
        assert_eq!(overall_level(&diagnostics), Some(Level::Warn));
        assert_eq!(error_count(&diagnostics), 0);
    }
}
