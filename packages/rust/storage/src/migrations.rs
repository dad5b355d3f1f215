//! SQL migration definitions for the TrendBot article table.
//!
//! Migrations are applied in order on database open. Each one is a batch of
//! statements that also records its version in `schema_migrations`.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: articles",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per published article. source_url is indexed but not unique:
-- the same story may be stored more than once.
CREATE TABLE IF NOT EXISTS articles (
    id           TEXT PRIMARY KEY,
    source       TEXT NOT NULL,
    source_url   TEXT NOT NULL,
    title        TEXT NOT NULL,
    content      TEXT,
    summary      TEXT,
    sample_code  TEXT,
    llm_provider TEXT,
    fetched_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_source_url ON articles(source_url);
CREATE INDEX IF NOT EXISTS idx_articles_fetched_at ON articles(fetched_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
