//! Field mapping from [`ArticleRecord`] to Notion page properties.

use serde_json::{Map, Value, json};

use trendbot_shared::{ArticleRecord, PropertyNames};

/// Notion rejects rich-text items longer than this many characters.
pub const RICH_TEXT_LIMIT: usize = 2000;

/// Database column name for each record field. `None` leaves the field out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMapping {
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub summary: Option<String>,
    pub sample_code: Option<String>,
    pub source: Option<String>,
}

fn column(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

impl From<&PropertyNames> for PropertyMapping {
    fn from(names: &PropertyNames) -> Self {
        Self {
            title: column(&names.title),
            source_url: column(&names.source_url),
            summary: column(&names.summary),
            sample_code: column(&names.sample_code),
            source: column(&names.source),
        }
    }
}

impl Default for PropertyMapping {
    fn default() -> Self {
        Self::from(&PropertyNames::default())
    }
}

impl PropertyMapping {
    /// Build the `properties` object of a page-create request.
    ///
    /// `code_language` tags the fence around sample code when that field is
    /// mapped and the record carries code.
    pub fn page_properties(&self, record: &ArticleRecord, code_language: &str) -> Map<String, Value> {
        let mut props = Map::new();

        if let Some(name) = &self.title {
            props.insert(name.clone(), title(&record.title));
        }
        if let Some(name) = &self.source_url {
            props.insert(name.clone(), rich_text(&record.source_url));
        }
        if let Some(name) = &self.summary {
            props.insert(name.clone(), rich_text(&record.summary));
        }
        if let Some(name) = &self.sample_code {
            let value = if record.sample_code == trendbot_shared::NO_SAMPLE_CODE {
                record.sample_code.clone()
            } else {
                format!("```{code_language}\n{}\n```", record.sample_code)
            };
            props.insert(name.clone(), rich_text(&value));
        }
        if let Some(name) = &self.source {
            props.insert(name.clone(), select(&record.category));
        }

        props
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(RICH_TEXT_LIMIT).collect()
}

fn title(text: &str) -> Value {
    json!({ "title": [{ "text": { "content": truncate(text) } }] })
}

fn rich_text(text: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": truncate(text) } }] })
}

/// Select option names may not contain commas.
fn select(name: &str) -> Value {
    json!({ "select": { "name": name.replace(',', " ") } })
}
