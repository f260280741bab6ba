//! Types for standardized reports to the user about hub construction.
//!
//! Recoverable conditions, e.g. a track that cannot take part in an overlay,
//! are logged as they happen *and* collected in a [`Report`], so that callers
//! (and tests) can inspect exactly what was skipped.
//!

use serde::Serialize;

/// The [`CommandOutput<U>`] type output is generic over some data output
/// from a command, and a [`Report`] that reports information to the user.
#[derive(Debug)]
pub struct CommandOutput<U> {
    pub value: U,
    pub report: Report,
}

impl<U> CommandOutput<U> {
    pub fn new(value: U, report: Report) -> Self {
        Self { value, report }
    }
}

/// A type to (semi) standardize reporting to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    entries: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue and emit it as a warning.
    pub fn add_issue(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.entries.push(message)
    }

    /// Append all issues from another report, without re-logging them.
    pub fn extend(&mut self, other: Report) {
        self.entries.extend(other.entries)
    }

    pub fn issues(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_collects_issues() {
        let mut report = Report::new();
        assert!(report.is_empty());
        report.add_issue("first".to_string());

        let mut other = Report::new();
        other.add_issue("second".to_string());
        report.extend(other);

        assert_eq!(report.len(), 2);
        assert_eq!(report.issues()[1], "second");
    }
}
