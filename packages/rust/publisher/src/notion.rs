//! Notion database publisher.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};
use url::Url;

use trendbot_shared::{ArticleRecord, NotionConfig, Result, TrendbotError};

use crate::mapping::PropertyMapping;
use crate::{Publisher, RecordHandle};

#[derive(Debug, Deserialize)]
struct PageResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatabaseResponse {
    id: String,
    #[serde(default)]
    title: Vec<PlainText>,
}

#[derive(Debug, Deserialize)]
struct PlainText {
    #[serde(default)]
    plain_text: String,
}

/// Notion's error envelope: `{"object":"error","code":..,"message":..}`.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Summary of the target database, returned by a connection check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub id: String,
    pub title: String,
}

/// Creates one page per article in a Notion database.
pub struct NotionPublisher {
    client: Client,
    base_url: Url,
    api_key: String,
    database_id: String,
    api_version: String,
    code_language: String,
    mapping: PropertyMapping,
}

impl NotionPublisher {
    pub fn new(config: &NotionConfig) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))
            .map_err(|e| TrendbotError::config(format!("invalid Notion base URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrendbotError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            database_id: config.database_id.clone(),
            api_version: config.api_version.clone(),
            code_language: config.code_language.clone(),
            mapping: PropertyMapping::from(&config.properties),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TrendbotError::config(format!("invalid Notion endpoint {path}: {e}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", &self.api_version)
    }

    /// Retrieve the target database to prove the credentials and id work.
    #[instrument(skip_all, fields(database = %self.database_id))]
    pub async fn check_connection(&self) -> Result<DatabaseInfo> {
        let url = self.endpoint(&format!("v1/databases/{}", self.database_id))?;
        let response = self
            .authorized(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| TrendbotError::Network(format!("{url}: {e}")))?;

        let db: DatabaseResponse = read_json(response).await?;
        let title = db
            .title
            .iter()
            .map(|t| t.plain_text.as_str())
            .collect::<String>();

        info!(title = %title, "Notion database reachable");
        Ok(DatabaseInfo { id: db.id, title })
    }
}

impl fmt::Debug for NotionPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionPublisher")
            .field("base_url", &self.base_url.as_str())
            .field("database_id", &self.database_id)
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Publisher for NotionPublisher {
    fn name(&self) -> &str {
        "NotionAPI"
    }

    #[instrument(skip_all, fields(title = %record.title))]
    async fn publish(&self, record: &ArticleRecord) -> Result<RecordHandle> {
        let url = self.endpoint("v1/pages")?;
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": self.mapping.page_properties(record, &self.code_language),
        });

        let response = self
            .authorized(self.client.post(url.clone()))
            .json(&body)
            .send()
            .await
            .map_err(|e| TrendbotError::Network(format!("{url}: {e}")))?;

        let page: PageResponse = read_json(response).await?;
        debug!(page_id = %page.id, "Notion page created");
        Ok(RecordHandle {
            id: page.id,
            url: page.url,
        })
    }
}

/// Decode a success body, or turn Notion's error envelope into a publish error.
async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ApiError>(&body) {
            Ok(err) if !err.message.is_empty() => format!("{}: {}", err.code, err.message),
            _ => body.chars().take(200).collect(),
        };
        return Err(TrendbotError::Publish(format!(
            "Notion API returned {status}: {detail}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| TrendbotError::parse(format!("unexpected Notion response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Value;
    use trendbot_shared::PropertyNames;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, properties: PropertyNames) -> NotionConfig {
        NotionConfig {
            api_key: "secret_abc".into(),
            database_id: "db123".into(),
            base_url: server.uri(),
            api_version: "2022-06-28".into(),
            code_language: "typescript".into(),
            properties,
            timeout_secs: 5,
        }
    }

    fn record() -> ArticleRecord {
        ArticleRecord {
            title: "X".into(),
            source_url: "https://news.example.com/x".into(),
            category: "TechCrunch".into(),
            content: Some("Y".into()),
            summary: "summary text".into(),
            sample_code: "none".into(),
            llm_provider: "DeepSeek".into(),
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn creates_page_with_mapped_properties() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .and(header("authorization", "Bearer secret_abc"))
            .and(header("notion-version", "2022-06-28"))
            .and(body_partial_json(json!({
                "parent": { "database_id": "db123" },
                "properties": {
                    "記事タイトル": { "title": [{ "text": { "content": "X" } }] },
                    "summary": { "rich_text": [{ "text": { "content": "summary text" } }] },
                    "source": { "select": { "name": "TechCrunch" } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "page",
                "id": "page-1",
                "url": "https://www.notion.so/page-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let publisher = NotionPublisher::new(&config(&server, PropertyNames::default())).unwrap();
        let handle = publisher.publish(&record()).await.expect("publish");

        assert_eq!(handle.id, "page-1");
        assert_eq!(handle.url.as_deref(), Some("https://www.notion.so/page-1"));

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let props = body["properties"].as_object().unwrap();
        assert_eq!(props.len(), 4, "sample code is excluded by default");
    }

    #[tokio::test]
    async fn api_rejection_is_publish_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "object": "error",
                "status": 400,
                "code": "validation_error",
                "message": "sampleCode is not a property that exists."
            })))
            .mount(&server)
            .await;

        let publisher = NotionPublisher::new(&config(&server, PropertyNames::default())).unwrap();
        let err = publisher.publish(&record()).await.unwrap_err();

        assert!(matches!(err, TrendbotError::Publish(_)));
        assert!(err.to_string().contains("validation_error"));
        assert!(err.to_string().contains("sampleCode is not a property"));
    }

    #[tokio::test]
    async fn check_connection_reads_database_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/databases/db123"))
            .and(header("notion-version", "2022-06-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "database",
                "id": "db123",
                "title": [{ "plain_text": "Trend " }, { "plain_text": "Articles" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let publisher = NotionPublisher::new(&config(&server, PropertyNames::default())).unwrap();
        let info = publisher.check_connection().await.expect("check");
        assert_eq!(info.id, "db123");
        assert_eq!(info.title, "Trend Articles");
    }

    #[tokio::test]
    async fn check_connection_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "object": "error",
                "code": "unauthorized",
                "message": "API token is invalid."
            })))
            .mount(&server)
            .await;

        let publisher = NotionPublisher::new(&config(&server, PropertyNames::default())).unwrap();
        let err = publisher.check_connection().await.unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let mut cfg = NotionConfig {
            api_key: "secret_xyz".into(),
            database_id: "d".into(),
            base_url: "not a url".into(),
            api_version: "2022-06-28".into(),
            code_language: "typescript".into(),
            properties: PropertyNames::default(),
            timeout_secs: 5,
        };
        assert!(matches!(
            NotionPublisher::new(&cfg).unwrap_err(),
            TrendbotError::Config { .. }
        ));

        cfg.base_url = "https://api.notion.com".into();
        let publisher = NotionPublisher::new(&cfg).unwrap();
        assert!(!format!("{publisher:?}").contains("secret_xyz"));
    }
}
