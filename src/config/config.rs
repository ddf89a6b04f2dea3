// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::catalog::{self, Category};
use crate::downloader::batch::DEFAULT_MAX_CONCURRENCY;
use crate::downloader::client::DEFAULT_REQUEST_TIMEOUT;
use crate::downloader::urls::{
    DEFAULT_EXCEL_BASE_URL, DEFAULT_QUERY_SUFFIX, DEFAULT_TEXT_MAP_BASE_URL,
};
use crate::downloader::{BatchOptions, UrlTemplates};
use crate::logging::LogFormat;
use crate::store::PersistPolicy;

/// Selector that expands to the whole catalog of a category
pub const ALL_IDENTIFIERS: &str = "*";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mirror root; `langs/` and `data/` are created beneath it
    pub data_root: PathBuf,

    /// Base URL of the language text maps
    pub text_map_base_url: String,

    /// Base URL of the Excel config data exports
    pub excel_base_url: String,

    /// Query string appended to every resource URL
    pub query_suffix: String,

    /// Language codes to mirror, or `["*"]` for all of them
    pub languages: Vec<String>,

    /// Data file names to mirror, or `["*"]` for all of them
    pub data_files: Vec<String>,

    /// Maximum concurrent downloads and file writes
    pub max_concurrency: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Optional deadline for a whole batch in seconds
    pub batch_deadline_secs: Option<u64>,

    /// Cancel the rest of a batch as soon as one download fails
    pub fail_fast: bool,

    /// How a batch write treats partial failures
    pub persist_policy: PersistPolicy,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("GENKA_CONFIG")
            .unwrap_or_else(|_| "genka.toml".to_string());

        let mut config: Config = if std::path::Path::new(&config_path).exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path))?
        } else {
            // Use default configuration
            Config::default()
        };

        // Apply environment variable overrides
        if let Ok(val) = std::env::var("GENKA_DATA_ROOT") {
            config.data_root = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("GENKA_TEXT_MAP_BASE_URL") {
            config.text_map_base_url = val;
        }
        if let Ok(val) = std::env::var("GENKA_EXCEL_BASE_URL") {
            config.excel_base_url = val;
        }
        if let Ok(val) = std::env::var("GENKA_QUERY_SUFFIX") {
            config.query_suffix = val;
        }
        if let Ok(val) = std::env::var("GENKA_LANGUAGES") {
            config.languages = split_list(&val);
        }
        if let Ok(val) = std::env::var("GENKA_DATA_FILES") {
            config.data_files = split_list(&val);
        }
        if let Ok(val) = std::env::var("GENKA_MAX_CONCURRENCY") {
            config.max_concurrency = val.parse().context("GENKA_MAX_CONCURRENCY")?;
        }
        if let Ok(val) = std::env::var("GENKA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = val.parse().context("GENKA_REQUEST_TIMEOUT_SECS")?;
        }
        if let Ok(val) = std::env::var("GENKA_BATCH_DEADLINE_SECS") {
            config.batch_deadline_secs = Some(val.parse().context("GENKA_BATCH_DEADLINE_SECS")?);
        }
        if let Ok(val) = std::env::var("GENKA_FAIL_FAST") {
            config.fail_fast = val.parse().context("GENKA_FAIL_FAST")?;
        }
        if let Ok(val) = std::env::var("GENKA_PERSIST_POLICY") {
            config.persist_policy = match val.as_str() {
                "all_or_nothing" => PersistPolicy::AllOrNothing,
                "best_effort" => PersistPolicy::BestEffort,
                other => anyhow::bail!("Unknown GENKA_PERSIST_POLICY: {}", other),
            };
        }
        if let Ok(val) = std::env::var("GENKA_LOG_LEVEL") {
            config.log_level = val;
        }
        if let Ok(val) = std::env::var("GENKA_LOG_FORMAT") {
            config.log_format = val.parse()?;
        }

        Ok(config)
    }

    pub fn url_templates(&self) -> anyhow::Result<UrlTemplates> {
        UrlTemplates::new(&self.text_map_base_url, &self.excel_base_url, &self.query_suffix)
            .context("Invalid resource base URL")
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            max_concurrency: self.max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
            fail_fast: self.fail_fast,
            deadline: self.batch_deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Identifiers selected for `category`, with `*` expanded to the full catalog
    pub fn selected(&self, category: Category) -> Vec<String> {
        let selection = match category {
            Category::LanguageFile => &self.languages,
            Category::DataFile => &self.data_files,
        };

        if selection.iter().any(|id| id == ALL_IDENTIFIERS) {
            catalog::all_identifiers(category)
                .into_iter()
                .map(str::to_string)
                .collect()
        } else {
            selection.clone()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            text_map_base_url: DEFAULT_TEXT_MAP_BASE_URL.to_string(),
            excel_base_url: DEFAULT_EXCEL_BASE_URL.to_string(),
            query_suffix: DEFAULT_QUERY_SUFFIX.to_string(),
            languages: vec!["en".to_string()],
            data_files: Vec::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            batch_deadline_secs: None,
            fail_fast: false,
            persist_policy: PersistPolicy::AllOrNothing,
            log_level: String::from("info"),
            log_format: LogFormat::Pretty,
        }
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
