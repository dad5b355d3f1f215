//! Article fetching from syndication feeds and aggregator listings.
//!
//! Every source implements [`ArticleSource`], which reports failures honestly.
//! The free functions in this module are the pipeline-facing boundary: they
//! absorb those failures into empty results or log entries so the rest of the
//! run always has something to work with.

mod feed;
mod reddit;
mod text;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, instrument, warn};

use trendbot_shared::{Article, PipelineContext, Result, Step, TrendbotError};

pub use feed::FeedSource;
pub use reddit::RedditSource;
pub use text::html_to_text;

/// Default User-Agent for feed requests.
const USER_AGENT: &str = concat!("TrendBot/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// ArticleSource
// ---------------------------------------------------------------------------

/// A remote upstream that yields normalized articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Display name, also used as the article category (e.g. "TechCrunch").
    fn name(&self) -> &str;

    /// Component name recorded in pipeline log entries.
    fn agent(&self) -> &str;

    /// Fetch, parse, filter, and cap. Errors are returned, not absorbed.
    async fn fetch(&self) -> Result<Vec<Article>>;
}

/// Outcome of fetching one source in batch mode.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    /// Source display name.
    pub source: String,
    /// Articles fetched; empty on failure.
    pub articles: Vec<Article>,
    /// Failure message, when the source could not be fetched at all.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline-facing entry points
// ---------------------------------------------------------------------------

/// Fetch one source, turning any failure into an empty batch.
#[instrument(skip_all, fields(source = %source.name()))]
pub async fn fetch_articles(source: &dyn ArticleSource) -> SourceBatch {
    match source.fetch().await {
        Ok(articles) => {
            info!(count = articles.len(), "fetched articles");
            SourceBatch {
                source: source.name().to_string(),
                articles,
                error: None,
            }
        }
        Err(e) => {
            error!(error = %e, "fetch failed, continuing with no articles");
            SourceBatch {
                source: source.name().to_string(),
                articles: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Fetch every source concurrently and wait for all of them.
///
/// Results come back in the same order as `sources`.
pub async fn fetch_all(sources: &[Arc<dyn ArticleSource>]) -> Vec<SourceBatch> {
    let batches =
        futures::future::join_all(sources.iter().map(|s| fetch_articles(s.as_ref()))).await;

    let total: usize = batches.iter().map(|b| b.articles.len()).sum();
    let failed = batches.iter().filter(|b| b.error.is_some()).count();
    info!(sources = batches.len(), failed, total, "fetch phase complete");

    batches
}

/// Context-threading fetch: put the first usable article into the context.
///
/// Never fails. On error or an empty feed the context comes back without an
/// article and with a `fetch` log entry saying why.
#[instrument(skip_all, fields(source = %source.name()))]
pub async fn fetch_into_context(
    source: &dyn ArticleSource,
    ctx: PipelineContext,
) -> PipelineContext {
    match source.fetch().await {
        Ok(articles) => match articles.into_iter().next() {
            Some(article) => {
                info!(title = %article.title, "fetched article");
                let note = format!("Fetched {}", article.title);
                ctx.with_article(article)
                    .with_log(Step::Fetch, source.agent(), note)
            }
            None => {
                warn!("no usable articles found");
                ctx.with_log(
                    Step::Fetch,
                    source.agent(),
                    format!("No articles found in {}", source.name()),
                )
            }
        },
        Err(e) => {
            error!(error = %e, "fetch failed");
            ctx.with_log(
                Step::Fetch,
                source.agent(),
                format!("Error fetching {}: {e}", source.name()),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
pub(crate) fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TrendbotError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET a URL and return the body bytes, treating non-2xx as a network error.
pub(crate) async fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TrendbotError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TrendbotError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| TrendbotError::Network(format!("{url}: failed to read body: {e}")))?;

    Ok(body.to_vec())
}
