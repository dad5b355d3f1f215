//! Persistence of analyzed articles to an external store.
//!
//! [`Publisher`] is the seam: [`NotionPublisher`] creates pages in a Notion
//! database, [`TablePublisher`] inserts into the local `articles` table.

mod mapping;
mod notion;
mod table;

use async_trait::async_trait;
use tracing::{error, info, instrument};

use trendbot_shared::{ArticleRecord, PipelineContext, Result, Step, TrendbotError};

pub use mapping::{PropertyMapping, RICH_TEXT_LIMIT};
pub use notion::{DatabaseInfo, NotionPublisher};
pub use table::TablePublisher;

/// Identifier of a record created by a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHandle {
    pub id: String,
    /// Link to the record, when the store has one.
    pub url: Option<String>,
}

/// A store that accepts one record per analyzed article.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Component name recorded in pipeline log entries.
    fn name(&self) -> &str;

    /// Create one record. Failures are returned to the caller.
    async fn publish(&self, record: &ArticleRecord) -> Result<RecordHandle>;
}

/// Context-threading save. Requires both an article and an analysis; when
/// either is missing nothing is written.
#[instrument(skip_all, fields(publisher = %publisher.name()))]
pub async fn publish_context(
    publisher: &dyn Publisher,
    ctx: PipelineContext,
) -> Result<PipelineContext> {
    let (Some(article), Some(analysis)) = (ctx.article.as_ref(), ctx.analysis.as_ref()) else {
        return Err(TrendbotError::missing(
            "article and analysis are required before saving",
        ));
    };

    let record = ArticleRecord::new(article, analysis);
    match publisher.publish(&record).await {
        Ok(handle) => {
            info!(id = %handle.id, title = %record.title, "article saved");
            Ok(ctx.with_log(
                Step::Save,
                publisher.name(),
                format!("Saved {}", record.title),
            ))
        }
        Err(e) => {
            error!(title = %record.title, error = %e, "save failed");
            Err(e)
        }
    }
}
