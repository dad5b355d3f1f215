//! Outcome types returned by a pipeline run.

use std::fmt;

use serde::Serialize;

use trendbot_shared::LogEntry;

/// Per-source tally for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub published: usize,
    pub failed: usize,
    /// Set when the source could not be fetched at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

/// Result of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub sources: Vec<SourceReport>,
}

impl BatchReport {
    /// Articles analyzed and published.
    pub fn processed(&self) -> usize {
        self.sources.iter().map(|s| s.published).sum()
    }

    /// Articles whose publish failed.
    pub fn failed(&self) -> usize {
        self.sources.iter().map(|s| s.failed).sum()
    }

    pub fn fetched(&self) -> usize {
        self.sources.iter().map(|s| s.fetched).sum()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} processed, {} failed", self.processed(), self.failed())?;
        if self.sources.is_empty() {
            return Ok(());
        }

        let parts: Vec<String> = self
            .sources
            .iter()
            .map(|s| match &s.fetch_error {
                Some(_) => format!("{}: unavailable", s.source),
                None => format!("{}: {}/{}", s.source, s.published, s.fetched),
            })
            .collect();
        write!(f, " ({})", parts.join(", "))
    }
}

/// What a run produced, depending on its mode.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Context mode: the accumulated log of the single threaded article.
    Log(Vec<LogEntry>),
    /// Batch mode: counts per source.
    Batch(BatchReport),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    writeln!(f, "{:>2}. {entry}", i + 1)?;
                }
                Ok(())
            }
            Self::Batch(report) => write!(f, "{report}"),
        }
    }
}
