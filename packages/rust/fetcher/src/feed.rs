//! RSS/Atom feed source.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};

use trendbot_shared::{Article, FeedConfig, Result, SourceKind, TrendbotError};

use crate::{ArticleSource, USER_AGENT, build_client, get_bytes, html_to_text};

/// Fetches the newest items of one syndication feed.
pub struct FeedSource {
    config: FeedConfig,
    client: Client,
}

impl FeedSource {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = build_client(USER_AGENT, config.timeout_secs)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ArticleSource for FeedSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn agent(&self) -> &str {
        "RSSFetcher"
    }

    #[instrument(skip_all, fields(feed = %self.config.name, url = %self.config.url))]
    async fn fetch(&self) -> Result<Vec<Article>> {
        info!("fetching feed");
        let bytes = get_bytes(&self.client, &self.config.url).await?;

        let feed = feed_rs::parser::parse(&bytes[..]).map_err(|e| {
            TrendbotError::parse(format!("{}: invalid feed document: {e}", self.config.url))
        })?;

        let total = feed.entries.len();
        let articles: Vec<Article> = feed
            .entries
            .into_iter()
            .filter_map(|entry| entry_to_article(entry, &self.config.name))
            .take(self.config.limit)
            .collect();

        debug!(total, kept = articles.len(), limit = self.config.limit, "feed parsed");
        Ok(articles)
    }
}

/// Map a feed entry to an article, or `None` if it lacks a title or a link.
fn entry_to_article(entry: feed_rs::model::Entry, category: &str) -> Option<Article> {
    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())?;

    let source_url = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|h| !h.is_empty())?;

    let content = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .map(|raw| html_to_text(&raw))
        .filter(|c| !c.is_empty());

    Some(Article {
        source: SourceKind::Feed,
        category: category.to_string(),
        title,
        source_url,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://news.example.com/</link>
    <description>Latest items</description>
    {items}
  </channel>
</rss>"#
        )
    }

    fn item(n: usize) -> String {
        format!(
            "<item><title>Story {n}</title><link>https://news.example.com/story-{n}</link>\
             <description>Body {n}</description></item>"
        )
    }

    async fn serve(body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/rss+xml")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;
        server
    }

    fn source(server: &MockServer, limit: usize) -> FeedSource {
        FeedSource::new(FeedConfig {
            name: "TechCrunch".into(),
            url: format!("{}/feed/", server.uri()),
            limit,
            timeout_secs: 5,
        })
        .expect("build source")
    }

    #[tokio::test]
    async fn maps_single_item() {
        let server = serve(rss(
            "<item><title>X</title><link>https://news.example.com/a</link><description>Y</description></item>",
        ))
        .await;

        let articles = source(&server, 2).fetch().await.expect("fetch");
        assert_eq!(
            articles,
            vec![Article {
                source: SourceKind::Feed,
                category: "TechCrunch".into(),
                title: "X".into(),
                source_url: "https://news.example.com/a".into(),
                content: Some("Y".into()),
            }]
        );
    }

    #[tokio::test]
    async fn skips_items_without_title_or_link() {
        let items = format!(
            "{}<item><title>No link</title><description>d</description></item>\
             <item><link>https://news.example.com/untitled</link><description>d</description></item>{}",
            item(1),
            item(2)
        );
        let server = serve(rss(&items)).await;

        let articles = source(&server, 10).fetch().await.expect("fetch");
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Story 1", "Story 2"]);
    }

    #[tokio::test]
    async fn caps_at_limit() {
        let items: String = (1..=6).map(item).collect();
        let server = serve(rss(&items)).await;

        let articles = source(&server, 2).fetch().await.expect("fetch");
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Story 1");
        assert_eq!(articles[1].title, "Story 2");
    }

    #[tokio::test]
    async fn missing_description_gives_no_content() {
        let server = serve(rss(
            "<item><title>Bare</title><link>https://news.example.com/bare</link></item>",
        ))
        .await;

        let articles = source(&server, 2).fetch().await.expect("fetch");
        assert_eq!(articles.len(), 1);
        assert!(articles[0].content.is_none());
    }

    #[tokio::test]
    async fn html_description_becomes_text() {
        let server = serve(rss(
            "<item><title>Rich</title><link>https://news.example.com/rich</link>\
             <description><![CDATA[<p>Hello <b>world</b></p>]]></description></item>",
        ))
        .await;

        let articles = source(&server, 2).fetch().await.expect("fetch");
        assert_eq!(articles[0].content.as_deref(), Some("Hello world"));
    }

    #[tokio::test]
    async fn http_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source(&server, 2).fetch().await.unwrap_err();
        assert!(matches!(err, TrendbotError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn malformed_document_is_parse_error() {
        let server = serve("this is not xml at all".to_string()).await;

        let err = source(&server, 2).fetch().await.unwrap_err();
        assert!(matches!(err, TrendbotError::Parse { .. }));
    }

    #[tokio::test]
    async fn failure_absorbed_at_pipeline_boundary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let batch = crate::fetch_articles(&source(&server, 2)).await;
        assert!(batch.articles.is_empty());
        assert!(batch.error.is_some());
    }
}
