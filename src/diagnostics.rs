//! Severity-tagged diagnostics and the final validation verdict.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

const RESET: &str = "\x1b[0m";

/// How bad a finding is. Only [`Severity::Error`] affects validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// ANSI prefix used by [`Diagnostic::coloured`]. Info stays uncoloured.
    fn colour(self) -> Option<&'static str> {
        match self {
            Severity::Info => None,
            Severity::Warning => Some("\x1b[33m"), // yellow
            Severity::Error => Some("\x1b[31m"),   // red
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// One finding produced while replaying a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The message wrapped in terminal colour codes for its severity.
    pub fn coloured(&self) -> String {
        match self.severity.colour() {
            Some(code) => format!("{code}{}{RESET}", self.message),
            None => self.message.clone(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Outcome of validating one candidate solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub logs: Vec<Diagnostic>,
    /// Raw facts that some parsing layer consumed.
    pub recognized: BTreeSet<String>,
}

impl ValidationResult {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.logs.iter().filter(|d| d.is_error())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.logs.iter().filter(|d| d.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_is_not_coloured() {
        assert_eq!(Diagnostic::info("fine").coloured(), "fine");
    }

    #[test]
    fn errors_are_red() {
        assert_eq!(Diagnostic::error("bad").coloured(), "\x1b[31mbad\x1b[0m");
        assert_eq!(Diagnostic::warning("odd").coloured(), "\x1b[33modd\x1b[0m");
    }

    #[test]
    fn serializes_severity_in_lowercase() {
        let json = serde_json::to_string(&Diagnostic::warning("x")).expect("serialize");
        assert_eq!(json, r#"{"severity":"warning","message":"x"}"#);
    }
}
