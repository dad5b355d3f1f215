//! libSQL storage for the managed `articles` table.
//!
//! The [`Storage`] struct wraps a local libSQL database. The table publisher
//! writes through [`Storage::open`]; listing commands can use
//! [`Storage::open_readonly`] so they never create or migrate a database.

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, params};
use serde::Serialize;
use trendbot_shared::{ArticleRecord, Result, TrendbotError};
use uuid::Uuid;

/// One row of the `articles` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredArticle {
    pub id: String,
    /// Source display name, e.g. "TechCrunch".
    pub source: String,
    pub source_url: String,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub sample_code: Option<String>,
    pub llm_provider: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> TrendbotError {
    TrendbotError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TrendbotError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for reading only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TrendbotError::Storage(format!(
                "no article database at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TrendbotError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(TrendbotError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Article operations
    // -----------------------------------------------------------------------

    /// Insert one article row. Returns the generated id.
    ///
    /// No deduplication: inserting the same `source_url` twice stores two rows.
    pub async fn insert_article(&self, record: &ArticleRecord) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        self.conn
            .execute(
                "INSERT INTO articles (id, source, source_url, title, content, summary, sample_code, llm_provider, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.as_str(),
                    record.category.as_str(),
                    record.source_url.as_str(),
                    record.title.as_str(),
                    record.content.as_deref(),
                    record.summary.as_str(),
                    record.sample_code.as_str(),
                    record.llm_provider.as_str(),
                    record.fetched_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .await
            .map_err(storage_err)?;

        tracing::debug!(id = %id, url = %record.source_url, "article row inserted");
        Ok(id)
    }

    /// Most recently fetched articles first.
    pub async fn list_articles(&self, limit: u32) -> Result<Vec<StoredArticle>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source, source_url, title, content, summary, sample_code, llm_provider, fetched_at
                 FROM articles ORDER BY fetched_at DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_article(&row)?);
        }
        Ok(results)
    }

    /// All rows stored for one URL.
    pub async fn find_by_url(&self, source_url: &str) -> Result<Vec<StoredArticle>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source, source_url, title, content, summary, sample_code, llm_provider, fetched_at
                 FROM articles WHERE source_url = ?1 ORDER BY fetched_at",
                params![source_url],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_article(&row)?);
        }
        Ok(results)
    }

    pub async fn count_articles(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM articles", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)?.max(0) as u64),
            None => Ok(0),
        }
    }
}

fn row_to_article(row: &libsql::Row) -> Result<StoredArticle> {
    let fetched_at: String = row.get(8).map_err(storage_err)?;
    Ok(StoredArticle {
        id: row.get::<String>(0).map_err(storage_err)?,
        source: row.get::<String>(1).map_err(storage_err)?,
        source_url: row.get::<String>(2).map_err(storage_err)?,
        title: row.get::<String>(3).map_err(storage_err)?,
        content: row.get::<String>(4).ok(),
        summary: row.get::<String>(5).ok(),
        sample_code: row.get::<String>(6).ok(),
        llm_provider: row.get::<String>(7).ok(),
        fetched_at: DateTime::parse_from_rfc3339(&fetched_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| TrendbotError::Storage(format!("invalid date: {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("tb_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn record(title: &str, url: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.into(),
            source_url: url.into(),
            category: "TechCrunch".into(),
            content: Some("Body".into()),
            summary: "summary text".into(),
            sample_code: "none".into(),
            llm_provider: "DeepSeek".into(),
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
        assert_eq!(storage.count_articles().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("tb_test_{}.db", Uuid::now_v7()));
        let first = Storage::open(&tmp).await.expect("first open");
        drop(first);
        let second = Storage::open(&tmp).await.expect("second open");
        assert_eq!(second.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn insert_and_list() {
        let storage = test_storage().await;
        let id = storage
            .insert_article(&record("X", "https://news.example.com/x"))
            .await
            .expect("insert");
        assert!(!id.is_empty());

        let rows = storage.list_articles(10).await.expect("list");
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.source, "TechCrunch");
        assert_eq!(row.title, "X");
        assert_eq!(row.content.as_deref(), Some("Body"));
        assert_eq!(row.summary.as_deref(), Some("summary text"));
        assert_eq!(row.llm_provider.as_deref(), Some("DeepSeek"));
    }

    #[tokio::test]
    async fn missing_content_is_null() {
        let storage = test_storage().await;
        let mut r = record("Bare", "https://news.example.com/bare");
        r.content = None;
        storage.insert_article(&r).await.unwrap();

        let rows = storage.list_articles(10).await.unwrap();
        assert!(rows[0].content.is_none());
    }

    #[tokio::test]
    async fn same_url_is_stored_twice() {
        let storage = test_storage().await;
        let r = record("Dup", "https://news.example.com/dup");
        storage.insert_article(&r).await.unwrap();
        storage.insert_article(&r).await.unwrap();

        assert_eq!(storage.count_articles().await.unwrap(), 2);
        let found = storage
            .find_by_url("https://news.example.com/dup")
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_ne!(found[0].id, found[1].id);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_limited() {
        let storage = test_storage().await;
        let now = Utc::now();
        for (i, title) in ["old", "mid", "new"].iter().enumerate() {
            let mut r = record(title, &format!("https://news.example.com/{title}"));
            r.fetched_at = now - Duration::minutes(10 - i as i64);
            storage.insert_article(&r).await.unwrap();
        }

        let rows = storage.list_articles(2).await.unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid"]);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("tb_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_article(&record("X", "https://news.example.com/x"))
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_articles(10).await.unwrap().len(), 1);
        let err = ro
            .insert_article(&record("Y", "https://news.example.com/y"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("tb_missing_{}.db", Uuid::now_v7()));
        assert!(Storage::open_readonly(&tmp).await.is_err());
    }
}
