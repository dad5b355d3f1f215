//! Fetch → analyze → publish orchestration, in context or batch mode.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Span, error, info, instrument, warn};
use uuid::Uuid;

use trendbot_analyzer::Analyzer;
use trendbot_fetcher::{ArticleSource, fetch_all, fetch_into_context};
use trendbot_publisher::{Publisher, publish_context};
use trendbot_shared::{ArticleRecord, PipelineContext, Result, RunMode, TrendbotError};

use crate::report::{BatchReport, RunOutcome, SourceReport};
use crate::state::{RunState, RunTracker};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each article is analyzed and published.
    fn article(&self, title: &str, current: usize, total: usize);
    /// Called when the run completes successfully.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn article(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

/// Sources, analyzer and publisher wired together for one or more runs.
pub struct Pipeline {
    sources: Vec<Arc<dyn ArticleSource>>,
    analyzer: Analyzer,
    publisher: Arc<dyn Publisher>,
}

impl Pipeline {
    /// `sources[0]` is the primary source used by context mode.
    pub fn new(
        sources: Vec<Arc<dyn ArticleSource>>,
        analyzer: Analyzer,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            sources,
            analyzer,
            publisher,
        }
    }

    pub fn sources(&self) -> &[Arc<dyn ArticleSource>] {
        &self.sources
    }

    pub fn publisher(&self) -> &dyn Publisher {
        self.publisher.as_ref()
    }

    /// Run once in the given mode.
    #[instrument(skip_all, fields(mode = ?mode, run_id = tracing::field::Empty))]
    pub async fn run(&self, mode: RunMode, progress: &dyn ProgressReporter) -> Result<RunOutcome> {
        let run_id = Uuid::now_v7();
        Span::current().record("run_id", tracing::field::display(run_id));

        let start = Instant::now();
        let mut tracker = RunTracker::for_mode(mode);

        let result = match mode {
            RunMode::Context => self
                .run_context(&mut tracker, progress)
                .await
                .map(|ctx| RunOutcome::Log(ctx.into_log())),
            RunMode::Batch => self
                .run_batch(&mut tracker, progress)
                .await
                .map(RunOutcome::Batch),
        };

        match &result {
            Ok(outcome) => {
                tracker.advance(RunState::Done);
                progress.done(outcome);
                info!(elapsed_ms = start.elapsed().as_millis(), "run complete");
            }
            Err(e) => {
                tracker.advance(RunState::Failed);
                error!(error = %e, state_history = ?tracker.history(), "run failed");
            }
        }
        result
    }

    /// Thread a single article from the primary source through all stages.
    ///
    /// Fetch and analyze failures are recorded in the log; a missing article
    /// or a failed save aborts the run.
    pub async fn run_context(
        &self,
        tracker: &mut RunTracker,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineContext> {
        let source = self
            .sources
            .first()
            .ok_or_else(|| TrendbotError::config("no article sources configured"))?;

        // --- Phase 1: Fetch ---
        tracker.advance(RunState::Fetching);
        progress.phase(&format!("Fetching from {}", source.name()));
        let ctx = fetch_into_context(source.as_ref(), PipelineContext::new()).await;

        // --- Phase 2: Analyze ---
        tracker.advance(RunState::Analyzing);
        progress.phase("Analyzing article");
        let ctx = self.analyzer.analyze_context(ctx).await;

        // --- Phase 3: Save ---
        tracker.advance(RunState::Publishing);
        progress.phase(&format!("Saving to {}", self.publisher.name()));
        let log_so_far = ctx.log.clone();
        match publish_context(self.publisher.as_ref(), ctx).await {
            Ok(ctx) => {
                info!(entries = ctx.log.len(), "context run complete");
                Ok(ctx)
            }
            Err(e) => {
                for entry in &log_so_far {
                    warn!(step = %entry.step, agent = %entry.agent, note = %entry.note, "log before failure");
                }
                Err(e)
            }
        }
    }

    /// Fetch every source concurrently, then analyze and publish each article.
    ///
    /// Never fails as a whole: fetch failures leave a source empty and publish
    /// failures are counted per article. A failed article moves the tracker to
    /// `Failed` and the next article resumes at `Analyzing`.
    pub async fn run_batch(
        &self,
        tracker: &mut RunTracker,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        // --- Phase 1: Fetch (fan-out / join) ---
        tracker.advance(RunState::Fetching);
        progress.phase(&format!("Fetching from {} sources", self.sources.len()));
        let batches = fetch_all(&self.sources).await;

        let total: usize = batches.iter().map(|b| b.articles.len()).sum();
        let mut report = BatchReport::default();
        let mut current = 0;

        // --- Phase 2: Analyze + publish per article ---
        for batch in batches {
            let mut tally = SourceReport {
                source: batch.source,
                fetched: batch.articles.len(),
                fetch_error: batch.error,
                ..SourceReport::default()
            };

            for article in &batch.articles {
                current += 1;
                progress.article(&article.title, current, total);

                tracker.advance(RunState::Analyzing);
                let analysis = self.analyzer.analyze(article).await;

                tracker.advance(RunState::Publishing);
                let record = ArticleRecord::new(article, &analysis);
                match self.publisher.publish(&record).await {
                    Ok(handle) => {
                        info!(title = %article.title, id = %handle.id, "article published");
                        tally.published += 1;
                    }
                    Err(e) => {
                        error!(title = %article.title, error = %e, "failed to publish article");
                        tracker.advance(RunState::Failed);
                        tally.failed += 1;
                    }
                }
            }

            report.sources.push(tally);
        }

        info!(
            fetched = report.fetched(),
            processed = report.processed(),
            failed = report.failed(),
            "batch run complete"
        );
        Ok(report)
    }
}
