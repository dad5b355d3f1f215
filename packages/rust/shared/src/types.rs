//! Core domain types threaded through the fetch → analyze → save pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendbotError};

/// Placeholder written when an article has no sample code.
pub const NO_SAMPLE_CODE: &str = "none";

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// Which kind of upstream produced an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// An RSS/Atom syndication feed.
    Feed,
    /// A community aggregator listing (Reddit).
    Aggregator,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Aggregator => "aggregator",
        }
    }
}

/// A normalized news item. Read-only once a fetcher has produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Upstream kind.
    pub source: SourceKind,
    /// Configured display name of the source, e.g. "TechCrunch".
    pub category: String,
    /// Headline.
    pub title: String,
    /// Canonical link back to the item.
    pub source_url: String,
    /// Plain-text body or description, when the upstream had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Article {
    /// Text handed to the summarizer: the body if present, otherwise the title.
    pub fn body_or_title(&self) -> &str {
        match self.content.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => &self.title,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

/// Structured output of the summarization agent for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    /// Generated snippet, or [`NO_SAMPLE_CODE`].
    pub sample_code: String,
    /// Name of the model provider that produced this result.
    pub provider: String,
}

impl AnalysisResult {
    pub fn has_sample_code(&self) -> bool {
        self.sample_code != NO_SAMPLE_CODE
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Pipeline stage that produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Fetch,
    Analyze,
    Save,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Analyze => "analyze",
            Self::Save => "save",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only record of a stage completing or failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub step: Step,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Component that did the work, e.g. "RSSFetcher".
    pub agent: String,
    pub note: String,
}

impl LogEntry {
    /// UTC time of the entry, for human-readable output.
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} | {}: {}",
            self.time().format("%H:%M:%S"),
            self.step,
            self.agent,
            self.note
        )
    }
}

// ---------------------------------------------------------------------------
// PipelineContext
// ---------------------------------------------------------------------------

/// State carried through the context-threading run.
///
/// Every update consumes the context and returns a new one, so a stage never
/// holds on to the value after handing it back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<Article>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl PipelineContext {
    /// Empty context: no article, no analysis, empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(self, article: Article) -> Self {
        Self {
            article: Some(article),
            ..self
        }
    }

    /// Attach an analysis. Fails when no article has been set yet.
    pub fn with_analysis(self, analysis: AnalysisResult) -> Result<Self> {
        if self.article.is_none() {
            return Err(TrendbotError::missing(
                "cannot attach an analysis before an article",
            ));
        }
        Ok(Self {
            analysis: Some(analysis),
            ..self
        })
    }

    /// Append a log entry stamped with the current time.
    pub fn with_log(self, step: Step, agent: impl Into<String>, note: impl Into<String>) -> Self {
        self.with_log_at(Utc::now().timestamp_millis(), step, agent, note)
    }

    /// Append a log entry with an explicit timestamp. The timestamp is raised to
    /// the previous entry's if needed so the log stays non-decreasing.
    pub fn with_log_at(
        mut self,
        timestamp: i64,
        step: Step,
        agent: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        let floor = self.log.last().map_or(i64::MIN, |e| e.timestamp);
        self.log.push(LogEntry {
            step,
            timestamp: timestamp.max(floor),
            agent: agent.into(),
            note: note.into(),
        });
        self
    }

    pub fn into_log(self) -> Vec<LogEntry> {
        self.log
    }
}

// ---------------------------------------------------------------------------
// ArticleRecord
// ---------------------------------------------------------------------------

/// Flattened article + analysis, as handed to a publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub source_url: String,
    /// Source display name, written to the store's source/category field.
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub summary: String,
    pub sample_code: String,
    pub llm_provider: String,
    pub fetched_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn new(article: &Article, analysis: &AnalysisResult) -> Self {
        Self {
            title: article.title.clone(),
            source_url: article.source_url.clone(),
            category: article.category.clone(),
            content: article.content.clone(),
            summary: analysis.summary.clone(),
            sample_code: analysis.sample_code.clone(),
            llm_provider: analysis.provider.clone(),
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            source: SourceKind::Feed,
            category: "TechCrunch".into(),
            title: "X".into(),
            source_url: "https://example.com/x".into(),
            content: Some("Y".into()),
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            summary: "summary text".into(),
            sample_code: NO_SAMPLE_CODE.into(),
            provider: "DeepSeek".into(),
        }
    }

    #[test]
    fn new_context_is_empty() {
        let ctx = PipelineContext::new();
        assert!(ctx.article.is_none());
        assert!(ctx.analysis.is_none());
        assert!(ctx.log.is_empty());
    }

    #[test]
    fn analysis_requires_article() {
        let err = PipelineContext::new().with_analysis(analysis()).unwrap_err();
        assert!(matches!(err, TrendbotError::MissingPrerequisite { .. }));

        let ctx = PipelineContext::new()
            .with_article(article())
            .with_analysis(analysis())
            .expect("article is set");
        assert_eq!(ctx.analysis.unwrap().summary, "summary text");
    }

    #[test]
    fn log_appends_in_order() {
        let ctx = PipelineContext::new()
            .with_log(Step::Fetch, "RSSFetcher", "Fetched X")
            .with_log(Step::Analyze, "DeepSeek", "Analyzed X");
        assert_eq!(ctx.log.len(), 2);
        assert_eq!(ctx.log[0].step, Step::Fetch);
        assert_eq!(ctx.log[1].agent, "DeepSeek");
    }

    #[test]
    fn log_timestamps_never_decrease() {
        let ctx = PipelineContext::new()
            .with_log_at(2_000, Step::Fetch, "a", "first")
            .with_log_at(1_000, Step::Analyze, "b", "clock went backwards")
            .with_log_at(3_000, Step::Save, "c", "third");
        let stamps: Vec<i64> = ctx.log.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![2_000, 2_000, 3_000]);
    }

    #[test]
    fn body_or_title_falls_back() {
        let mut a = article();
        assert_eq!(a.body_or_title(), "Y");
        a.content = Some("   ".into());
        assert_eq!(a.body_or_title(), "X");
        a.content = None;
        assert_eq!(a.body_or_title(), "X");
    }

    #[test]
    fn step_serializes_lowercase() {
        let json = serde_json::to_string(&Step::Save).unwrap();
        assert_eq!(json, r#""save""#);
    }

    #[test]
    fn record_flattens_article_and_analysis() {
        let record = ArticleRecord::new(&article(), &analysis());
        assert_eq!(record.title, "X");
        assert_eq!(record.category, "TechCrunch");
        assert_eq!(record.summary, "summary text");
        assert_eq!(record.llm_provider, "DeepSeek");
        assert!(!analysis().has_sample_code());
    }
}
