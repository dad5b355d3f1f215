//! Building a [`Pipeline`] from the application config.
//!
//! Every credential is resolved here, before any network call, so a missing
//! key fails the run up front instead of halfway through.

use std::sync::Arc;

use tracing::info;

use trendbot_analyzer::Analyzer;
use trendbot_fetcher::{ArticleSource, FeedSource, RedditSource};
use trendbot_publisher::{NotionPublisher, Publisher, TablePublisher};
use trendbot_shared::{
    AgentConfig, AppConfig, FeedConfig, NotionConfig, PublishTarget, RedditConfig, Result,
};

use crate::pipeline::Pipeline;

/// All configured sources: feeds in file order, then the aggregator if enabled.
pub fn build_sources(config: &AppConfig) -> Result<Vec<Arc<dyn ArticleSource>>> {
    let mut sources: Vec<Arc<dyn ArticleSource>> = Vec::new();
    for feed in FeedConfig::all_from(config) {
        sources.push(Arc::new(FeedSource::new(feed)?));
    }
    if let Some(reddit) = RedditConfig::from_app(config) {
        sources.push(Arc::new(RedditSource::new(reddit)?));
    }
    Ok(sources)
}

pub async fn build_publisher(
    config: &AppConfig,
    target: PublishTarget,
) -> Result<Arc<dyn Publisher>> {
    match target {
        PublishTarget::Notion => {
            let notion = NotionConfig::from_app(config)?;
            Ok(Arc::new(NotionPublisher::new(&notion)?))
        }
        PublishTarget::Table => {
            let path = config.storage.resolved_path()?;
            Ok(Arc::new(TablePublisher::open(&path).await?))
        }
    }
}

/// Wire up sources, analyzer and publisher.
pub async fn build_pipeline(config: &AppConfig, target: PublishTarget) -> Result<Pipeline> {
    let agent = AgentConfig::from_app(config)?;
    let analyzer = Analyzer::from_config(&agent)?;
    let publisher = build_publisher(config, target).await?;
    let sources = build_sources(config)?;

    info!(
        sources = sources.len(),
        provider = %agent.provider,
        model = %agent.model,
        publisher = publisher.name(),
        "pipeline ready"
    );
    Ok(Pipeline::new(sources, analyzer, publisher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendbot_shared::TrendbotError;

    #[test]
    fn default_sources_are_feed_then_reddit() {
        let sources = build_sources(&AppConfig::default()).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["TechCrunch", "Reddit"]);
    }

    #[test]
    fn disabled_reddit_is_left_out() {
        let mut config = AppConfig::default();
        config.reddit.enabled = false;
        let sources = build_sources(&config).unwrap();
        assert_eq!(sources.len(), 1);
    }

    #[tokio::test]
    async fn missing_agent_key_fails_before_anything_else() {
        let mut config = AppConfig::default();
        config.agent.api_key_env = "TRENDBOT_TEST_SETUP_UNSET_AGENT_KEY".into();

        let err = build_pipeline(&config, PublishTarget::Notion)
            .await
            .err()
            .expect("missing key");
        assert!(matches!(err, TrendbotError::Config { .. }));
        assert!(err.to_string().contains("TRENDBOT_TEST_SETUP_UNSET_AGENT_KEY"));
    }

    #[tokio::test]
    async fn missing_notion_credentials_is_config_error() {
        let mut config = AppConfig::default();
        config.notion.api_key_env = "TRENDBOT_TEST_SETUP_UNSET_NOTION_KEY".into();

        let err = build_publisher(&config, PublishTarget::Notion)
            .await
            .err()
            .expect("missing key");
        assert!(matches!(err, TrendbotError::Config { .. }));
    }

    #[tokio::test]
    async fn table_target_opens_database() {
        let mut config = AppConfig::default();
        let path = std::env::temp_dir().join(format!("tb_setup_{}.db", uuid::Uuid::now_v7()));
        config.storage.path = path.display().to_string();

        let publisher = build_publisher(&config, PublishTarget::Table).await.unwrap();
        assert_eq!(publisher.name(), "ArticleTable");
        assert!(path.exists());
    }
}
