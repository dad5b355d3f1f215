//! Publisher that writes into the managed `articles` table.

use std::path::Path;

use async_trait::async_trait;
use tracing::instrument;

use trendbot_shared::{ArticleRecord, Result};
use trendbot_storage::Storage;

use crate::{Publisher, RecordHandle};

pub struct TablePublisher {
    storage: Storage,
}

impl TablePublisher {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Open (and migrate) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Storage::open(path).await?))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl Publisher for TablePublisher {
    fn name(&self) -> &str {
        "ArticleTable"
    }

    #[instrument(skip_all, fields(title = %record.title))]
    async fn publish(&self, record: &ArticleRecord) -> Result<RecordHandle> {
        let id = self.storage.insert_article(record).await?;
        Ok(RecordHandle { id, url: None })
    }
}
