//! Shared types, error model, and configuration for TrendBot.
//!
//! This crate is the foundation depended on by all other TrendBot crates.
//! It provides:
//! - [`TrendbotError`], the unified error type
//! - Domain types ([`Article`], [`AnalysisResult`], [`LogEntry`], [`PipelineContext`])
//! - Configuration ([`AppConfig`], the runtime configs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AgentConfig, AgentSection, AppConfig, DefaultsConfig, FeedConfig, FeedEntry, NotionConfig,
    NotionSection, PromptStyle, PropertyNames, PublishTarget, RedditConfig, RedditSection, RunMode,
    StorageSection, SubredditEntry, config_dir, config_file_path, init_config, init_config_at,
    load_config, load_config_from, require_env,
};
pub use error::{Result, TrendbotError};
pub use types::{
    AnalysisResult, Article, ArticleRecord, LogEntry, NO_SAMPLE_CODE, PipelineContext, SourceKind,
    Step,
};
