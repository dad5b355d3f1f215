//! Application configuration for TrendBot.
//!
//! User config lives at `~/.trendbot/trendbot.toml`. Every field has a default,
//! so a missing file is equivalent to an empty one. Secrets never live in the
//! file: it only names the environment variables that hold them, and those are
//! resolved once at startup into the runtime configs below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendbotError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "trendbot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".trendbot";

// ---------------------------------------------------------------------------
// Config structs (matching trendbot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// RSS/Atom feeds, in priority order. The first one drives context mode.
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedEntry>,

    #[serde(default)]
    pub reddit: RedditSection,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub notion: NotionSection,

    #[serde(default)]
    pub storage: StorageSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            feeds: default_feeds(),
            reddit: RedditSection::default(),
            agent: AgentSection::default(),
            notion: NotionSection::default(),
            storage: StorageSection::default(),
        }
    }
}

/// Which orchestration variant a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One article threaded through a single context.
    Context,
    /// Fetch everything, then analyze and publish per article.
    Batch,
}

/// Where analyzed articles are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishTarget {
    /// A Notion database, one page per article.
    Notion,
    /// The managed libSQL `articles` table.
    Table,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_mode")]
    pub mode: RunMode,

    #[serde(default = "default_publisher")]
    pub publisher: PublishTarget,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            publisher: default_publisher(),
            http_timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_mode() -> RunMode {
    RunMode::Batch
}
fn default_publisher() -> PublishTarget {
    PublishTarget::Notion
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[[feeds]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Display name, also written as the article's source category.
    pub name: String,
    pub url: String,
    /// Maximum articles taken from this feed per run.
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

fn default_feeds() -> Vec<FeedEntry> {
    vec![FeedEntry {
        name: "TechCrunch".into(),
        url: "https://techcrunch.com/feed/".into(),
        limit: default_feed_limit(),
    }]
}
fn default_feed_limit() -> usize {
    2
}

/// `[reddit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reddit_name")]
    pub name: String,

    #[serde(default = "default_reddit_base")]
    pub base_url: String,

    /// Reddit rejects requests without a descriptive User-Agent.
    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,

    /// Maximum articles across all subreddits per run.
    #[serde(default = "default_reddit_limit")]
    pub limit: usize,

    #[serde(default = "default_subreddits")]
    pub subreddits: Vec<SubredditEntry>,
}

impl Default for RedditSection {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_reddit_name(),
            base_url: default_reddit_base(),
            user_agent: default_reddit_user_agent(),
            limit: default_reddit_limit(),
            subreddits: default_subreddits(),
        }
    }
}

/// `[[reddit.subreddits]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubredditEntry {
    pub name: String,
    /// Listing size requested from this subreddit.
    #[serde(default = "default_subreddit_limit")]
    pub limit: usize,
}

fn default_true() -> bool {
    true
}
fn default_reddit_name() -> String {
    "Reddit".into()
}
fn default_reddit_base() -> String {
    "https://www.reddit.com".into()
}
fn default_reddit_user_agent() -> String {
    "TrendBot/1.0 (by /u/trendbot)".into()
}
fn default_reddit_limit() -> usize {
    3
}
fn default_subreddit_limit() -> usize {
    1
}
fn default_subreddits() -> Vec<SubredditEntry> {
    vec![
        SubredditEntry {
            name: "technology".into(),
            limit: 2,
        },
        SubredditEntry {
            name: "programming".into(),
            limit: 1,
        },
        SubredditEntry {
            name: "artificial".into(),
            limit: 1,
        },
    ]
}

/// Prompt flavour sent to the summarization agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Three-line technical digest of title, URL and body.
    Digest,
    /// Short casual post for social timelines, capped in length.
    Social,
}

/// `[agent]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    /// Provider name recorded with every analysis.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_agent_base")]
    pub base_url: String,

    #[serde(default = "default_agent_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_agent_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_prompt_style")]
    pub prompt_style: PromptStyle,

    /// Character cap applied to summaries in the social style.
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_agent_base(),
            model: default_agent_model(),
            api_key_env: default_agent_key_env(),
            prompt_style: default_prompt_style(),
            max_summary_chars: default_max_summary_chars(),
        }
    }
}

fn default_provider() -> String {
    "DeepSeek".into()
}
fn default_agent_base() -> String {
    "https://api.deepseek.com/v1".into()
}
fn default_agent_model() -> String {
    "deepseek-chat".into()
}
fn default_agent_key_env() -> String {
    "DEEPSEEK_API_KEY".into()
}
fn default_prompt_style() -> PromptStyle {
    PromptStyle::Social
}
fn default_max_summary_chars() -> usize {
    140
}

/// `[notion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionSection {
    #[serde(default = "default_notion_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_notion_db_env")]
    pub database_id_env: String,

    #[serde(default = "default_notion_base")]
    pub base_url: String,

    /// Value of the `Notion-Version` header.
    #[serde(default = "default_notion_version")]
    pub api_version: String,

    /// Language tag used to fence sample code when that field is written.
    #[serde(default = "default_code_language")]
    pub code_language: String,

    #[serde(default)]
    pub properties: PropertyNames,
}

impl Default for NotionSection {
    fn default() -> Self {
        Self {
            api_key_env: default_notion_key_env(),
            database_id_env: default_notion_db_env(),
            base_url: default_notion_base(),
            api_version: default_notion_version(),
            code_language: default_code_language(),
            properties: PropertyNames::default(),
        }
    }
}

fn default_notion_key_env() -> String {
    "NOTION_API_KEY".into()
}
fn default_notion_db_env() -> String {
    "NOTION_DATABASE_ID".into()
}
fn default_notion_base() -> String {
    "https://api.notion.com".into()
}
fn default_notion_version() -> String {
    "2022-06-28".into()
}
fn default_code_language() -> String {
    "typescript".into()
}

/// `[notion.properties]`: database column names. An empty string leaves the
/// field out of every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyNames {
    #[serde(default = "default_title_prop")]
    pub title: String,
    #[serde(default = "default_url_prop")]
    pub source_url: String,
    #[serde(default = "default_summary_prop")]
    pub summary: String,
    /// Excluded by default: the column type in the reference database does
    /// not accept rich text.
    #[serde(default)]
    pub sample_code: String,
    #[serde(default = "default_source_prop")]
    pub source: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: default_title_prop(),
            source_url: default_url_prop(),
            summary: default_summary_prop(),
            sample_code: String::new(),
            source: default_source_prop(),
        }
    }
}

fn default_title_prop() -> String {
    "記事タイトル".into()
}
fn default_url_prop() -> String {
    "sourceUrl".into()
}
fn default_summary_prop() -> String {
    "summary".into()
}
fn default_source_prop() -> String {
    "source".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// Path of the libSQL database holding the managed `articles` table.
    /// A leading `~/` is expanded to the home directory.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.trendbot/trendbot.db".into()
}

impl StorageSection {
    pub fn resolved_path(&self) -> Result<PathBuf> {
        expand_home(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (built once at startup, injected into components)
// ---------------------------------------------------------------------------

/// Runtime settings for one RSS/Atom feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub limit: usize,
    pub timeout_secs: u64,
}

impl FeedConfig {
    /// One runtime config per `[[feeds]]` entry.
    pub fn all_from(config: &AppConfig) -> Vec<Self> {
        config
            .feeds
            .iter()
            .map(|f| Self {
                name: f.name.clone(),
                url: f.url.clone(),
                limit: f.limit,
                timeout_secs: config.defaults.http_timeout_secs,
            })
            .collect()
    }
}

/// Runtime settings for the Reddit aggregator source.
#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub name: String,
    pub base_url: String,
    pub user_agent: String,
    pub limit: usize,
    /// `(subreddit, listing size)` pairs.
    pub subreddits: Vec<(String, usize)>,
    pub timeout_secs: u64,
}

impl RedditConfig {
    /// `None` when the aggregator is disabled.
    pub fn from_app(config: &AppConfig) -> Option<Self> {
        let r = &config.reddit;
        if !r.enabled {
            return None;
        }
        Some(Self {
            name: r.name.clone(),
            base_url: r.base_url.trim_end_matches('/').to_string(),
            user_agent: r.user_agent.clone(),
            limit: r.limit,
            subreddits: r
                .subreddits
                .iter()
                .map(|s| (s.name.clone(), s.limit))
                .collect(),
            timeout_secs: config.defaults.http_timeout_secs,
        })
    }
}

/// Runtime settings for the summarization agent, with the API key resolved.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub prompt_style: PromptStyle,
    pub max_summary_chars: usize,
    pub timeout_secs: u64,
}

impl AgentConfig {
    /// Resolve the agent settings. Fails when the API key env var is unset.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        let a = &config.agent;
        Ok(Self {
            provider: a.provider.clone(),
            base_url: a.base_url.trim_end_matches('/').to_string(),
            model: a.model.clone(),
            api_key: require_env(&a.api_key_env, "agent API key")?,
            prompt_style: a.prompt_style,
            max_summary_chars: a.max_summary_chars,
            timeout_secs: config.defaults.http_timeout_secs,
        })
    }
}

/// Runtime settings for the Notion publisher, with credentials resolved.
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
    pub base_url: String,
    pub api_version: String,
    pub code_language: String,
    pub properties: PropertyNames,
    pub timeout_secs: u64,
}

impl NotionConfig {
    /// Resolve the Notion settings. Fails before any write when either the API
    /// key or the database id is missing from the environment.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        let n = &config.notion;
        Ok(Self {
            api_key: require_env(&n.api_key_env, "Notion API key")?,
            database_id: require_env(&n.database_id_env, "Notion database id")?,
            base_url: n.base_url.trim_end_matches('/').to_string(),
            api_version: n.api_version.clone(),
            code_language: n.code_language.clone(),
            properties: n.properties.clone(),
            timeout_secs: config.defaults.http_timeout_secs,
        })
    }
}

/// Read a required, non-empty environment variable.
pub fn require_env(var_name: &str, what: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(TrendbotError::config(format!(
            "{what} not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.trendbot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| TrendbotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.trendbot/trendbot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TrendbotError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TrendbotError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| TrendbotError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| TrendbotError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| TrendbotError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(())
}

fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| TrendbotError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
