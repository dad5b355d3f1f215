//! Article summarization through a remote text-generation agent.
//!
//! [`Analyzer::analyze`] never fails: agent errors and unparseable replies
//! degrade to a fallback [`AnalysisResult`] so a batch run keeps going.

mod agent;
pub mod parse;
pub mod prompt;

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use trendbot_shared::{
    AgentConfig, AnalysisResult, Article, NO_SAMPLE_CODE, PipelineContext, PromptStyle, Result,
    Step,
};

pub use agent::{Agent, ChatAgent};

/// Summary recorded when the agent could not be reached or failed.
pub const FALLBACK_SUMMARY: &str = "Summary unavailable: the analysis service returned an error.";

/// Turns articles into summaries with optional sample code.
pub struct Analyzer {
    agent: Arc<dyn Agent>,
    style: PromptStyle,
    max_summary_chars: usize,
}

impl Analyzer {
    pub fn new(agent: Arc<dyn Agent>, style: PromptStyle, max_summary_chars: usize) -> Self {
        Self {
            agent,
            style,
            max_summary_chars,
        }
    }

    /// Analyzer backed by a [`ChatAgent`] built from the runtime config.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let agent = ChatAgent::new(config, prompt::INSTRUCTIONS)?;
        Ok(Self::new(
            Arc::new(agent),
            config.prompt_style,
            config.max_summary_chars,
        ))
    }

    pub fn provider(&self) -> &str {
        self.agent.provider()
    }

    /// Like [`analyze`](Self::analyze) but returns the agent error instead of
    /// the fallback result.
    pub async fn try_analyze(&self, article: &Article) -> Result<AnalysisResult> {
        let request = prompt::build(self.style, article, self.max_summary_chars);
        let response = self.agent.generate(&request).await?;

        let mut summary = parse::extract_summary(&response);
        if self.style == PromptStyle::Social {
            summary = parse::truncate_chars(&summary, self.max_summary_chars);
        }

        Ok(AnalysisResult {
            summary,
            sample_code: parse::extract_sample_code(&response),
            provider: self.agent.provider().to_string(),
        })
    }

    /// Summarize one article. On any agent failure the fallback result is
    /// returned and the error is logged.
    #[instrument(skip_all, fields(title = %article.title, provider = %self.agent.provider()))]
    pub async fn analyze(&self, article: &Article) -> AnalysisResult {
        match self.try_analyze(article).await {
            Ok(result) => {
                info!(
                    summary_chars = result.summary.chars().count(),
                    has_code = result.has_sample_code(),
                    "article analyzed"
                );
                result
            }
            Err(e) => {
                error!(error = %e, "analysis failed, using fallback");
                self.fallback()
            }
        }
    }

    /// Context-threading analyze. Without an article the context is returned
    /// with an `analyze` error entry and no agent call is made.
    pub async fn analyze_context(&self, ctx: PipelineContext) -> PipelineContext {
        let Some(article) = ctx.article.as_ref() else {
            warn!("analyze called without an article");
            return ctx.with_log(
                Step::Analyze,
                self.agent.provider(),
                "Error: No article provided for analysis",
            );
        };

        let title = article.title.clone();
        let (analysis, note) = match self.try_analyze(article).await {
            Ok(result) => (result, format!("Analyzed {title}")),
            Err(e) => {
                error!(title = %title, error = %e, "analysis failed, using fallback");
                (self.fallback(), format!("Error analyzing {title}: {e}"))
            }
        };

        PipelineContext {
            analysis: Some(analysis),
            ..ctx
        }
        .with_log(Step::Analyze, self.agent.provider(), note)
    }

    fn fallback(&self) -> AnalysisResult {
        AnalysisResult {
            summary: FALLBACK_SUMMARY.to_string(),
            sample_code: NO_SAMPLE_CODE.to_string(),
            provider: self.agent.provider().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trendbot_shared::{SourceKind, TrendbotError};

    /// Agent that replies with a canned response and counts calls.
    struct Canned {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(msg: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(msg.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Agent for Canned {
        fn provider(&self) -> &str {
            "DeepSeek"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(TrendbotError::Network)
        }
    }

    fn article() -> Article {
        Article {
            source: SourceKind::Feed,
            category: "TechCrunch".into(),
            title: "X".into(),
            source_url: "https://news.example.com/x".into(),
            content: Some("Y".into()),
        }
    }

    #[tokio::test]
    async fn parses_labeled_reply() {
        let agent = Canned::ok("**要約：** summary text\n**サンプルコード：** none");
        let analyzer = Analyzer::new(agent, PromptStyle::Digest, 140);

        let result = analyzer.analyze(&article()).await;
        assert_eq!(result.summary, "summary text");
        assert_eq!(result.sample_code, NO_SAMPLE_CODE);
        assert_eq!(result.provider, "DeepSeek");
    }

    #[tokio::test]
    async fn agent_failure_gives_fallback() {
        let analyzer = Analyzer::new(Canned::failing("timeout"), PromptStyle::Social, 140);

        let result = analyzer.analyze(&article()).await;
        assert_eq!(result.summary, FALLBACK_SUMMARY);
        assert_eq!(result.sample_code, NO_SAMPLE_CODE);
        assert!(analyzer.try_analyze(&article()).await.is_err());
    }

    #[tokio::test]
    async fn social_style_caps_summary() {
        let reply = format!("**要約：** {}\n**サンプルコード：** なし", "a".repeat(300));
        let analyzer = Analyzer::new(Canned::ok(&reply), PromptStyle::Social, 140);

        let result = analyzer.analyze(&article()).await;
        assert_eq!(result.summary.chars().count(), 140);
    }

    #[tokio::test]
    async fn digest_style_keeps_full_summary() {
        let reply = format!("**要約：** {}", "a".repeat(300));
        let analyzer = Analyzer::new(Canned::ok(&reply), PromptStyle::Digest, 140);

        let result = analyzer.analyze(&article()).await;
        assert_eq!(result.summary.chars().count(), 300);
    }

    #[tokio::test]
    async fn context_without_article_skips_agent() {
        let agent = Canned::ok("unused");
        let analyzer = Analyzer::new(agent.clone(), PromptStyle::Digest, 140);

        let ctx = analyzer.analyze_context(PipelineContext::new()).await;
        assert!(ctx.analysis.is_none());
        assert_eq!(ctx.log.len(), 1);
        assert_eq!(ctx.log[0].step, Step::Analyze);
        assert_eq!(ctx.log[0].note, "Error: No article provided for analysis");
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn context_analysis_is_attached_and_logged() {
        let analyzer = Analyzer::new(
            Canned::ok("**要約：** summary text\n**サンプルコード：** none"),
            PromptStyle::Digest,
            140,
        );
        let ctx = PipelineContext::new().with_article(article());

        let ctx = analyzer.analyze_context(ctx).await;
        assert_eq!(ctx.analysis.as_ref().unwrap().summary, "summary text");
        assert_eq!(ctx.log[0].agent, "DeepSeek");
        assert_eq!(ctx.log[0].note, "Analyzed X");
    }

    #[tokio::test]
    async fn context_agent_failure_logs_error_with_title() {
        let analyzer = Analyzer::new(Canned::failing("HTTP 500"), PromptStyle::Digest, 140);
        let ctx = PipelineContext::new().with_article(article());

        let ctx = analyzer.analyze_context(ctx).await;
        assert_eq!(ctx.analysis.unwrap().summary, FALLBACK_SUMMARY);
        assert!(ctx.log[0].note.starts_with("Error analyzing X:"));
    }
}
