//! Flow orchestration for TrendBot.
//!
//! Ties the fetcher, analyzer and publisher crates into a single run, either
//! threading one article through a [`PipelineContext`](trendbot_shared::PipelineContext)
//! or processing every fetched article in a batch.

pub mod pipeline;
pub mod report;
pub mod setup;
pub mod state;

pub use pipeline::{Pipeline, ProgressReporter, SilentProgress};
pub use report::{BatchReport, RunOutcome, SourceReport};
pub use setup::{build_pipeline, build_publisher, build_sources};
pub use state::{RunState, RunTracker};
