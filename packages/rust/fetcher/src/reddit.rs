//! Reddit listing source (the community aggregator).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use trendbot_shared::{Article, RedditConfig, Result, SourceKind, TrendbotError};

use crate::{ArticleSource, build_client, get_bytes};

// ---------------------------------------------------------------------------
// Listing wire format: data.children[].data
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    stickied: Option<bool>,
    #[serde(default)]
    removed: Option<bool>,
    #[serde(default)]
    removed_by_category: Option<String>,
}

impl Post {
    fn is_hidden(&self) -> bool {
        self.stickied.unwrap_or(false)
            || self.removed.unwrap_or(false)
            || self.removed_by_category.is_some()
    }
}

// ---------------------------------------------------------------------------
// RedditSource
// ---------------------------------------------------------------------------

/// Fetches hot posts from a fixed set of subreddits.
pub struct RedditSource {
    config: RedditConfig,
    client: Client,
}

impl RedditSource {
    pub fn new(config: RedditConfig) -> Result<Self> {
        let client = build_client(&config.user_agent, config.timeout_secs)?;
        Ok(Self { config, client })
    }

    fn listing_url(&self, subreddit: &str, limit: usize) -> String {
        format!(
            "{}/r/{subreddit}/hot.json?limit={limit}",
            self.config.base_url
        )
    }

    async fn fetch_subreddit(&self, subreddit: &str, limit: usize) -> Result<Vec<Article>> {
        let url = self.listing_url(subreddit, limit);
        let bytes = get_bytes(&self.client, &url).await?;

        let listing: Listing = serde_json::from_slice(&bytes)
            .map_err(|e| TrendbotError::parse(format!("{url}: unexpected listing shape: {e}")))?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter_map(|c| self.post_to_article(c.data))
            .collect())
    }

    fn post_to_article(&self, post: Post) -> Option<Article> {
        if post.is_hidden() {
            return None;
        }
        let title = post
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())?
            .to_string();
        let permalink = post.permalink.as_deref().filter(|p| !p.is_empty())?;

        let content = match post.selftext.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => body.to_string(),
            _ => title.clone(),
        };

        Some(Article {
            source: SourceKind::Aggregator,
            category: self.config.name.clone(),
            title,
            source_url: format!("{}{permalink}", self.config.base_url),
            content: Some(content),
        })
    }
}

#[async_trait]
impl ArticleSource for RedditSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn agent(&self) -> &str {
        "RedditFetcher"
    }

    /// A subreddit that fails is logged and skipped; the others still count.
    /// When every subreddit fails, the last error is returned.
    #[instrument(skip_all, fields(source = %self.config.name))]
    async fn fetch(&self) -> Result<Vec<Article>> {
        info!(subreddits = self.config.subreddits.len(), "fetching reddit posts");
        let mut articles = Vec::new();
        let mut succeeded = 0usize;
        let mut last_error = None;

        for (subreddit, limit) in &self.config.subreddits {
            match self.fetch_subreddit(subreddit, *limit).await {
                Ok(mut posts) => {
                    debug!(subreddit, count = posts.len(), "subreddit fetched");
                    succeeded += 1;
                    articles.append(&mut posts);
                }
                Err(e) => {
                    warn!(subreddit, error = %e, "subreddit fetch failed, skipping");
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        articles.truncate(self.config.limit);
        Ok(articles)
    }
}
