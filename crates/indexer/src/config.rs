use crate::error::{IndexerError, Result};
use crate::limits::{default_index_concurrency, parse_index_concurrency};
use crate::scanner::ScanOptions;
use goon_code_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_INDEX_CONCURRENCY: &str = "GOON_INDEX_CONCURRENCY";
pub const ENV_TIME_BUDGET_MS: &str = "GOON_INDEX_TIME_BUDGET_MS";
pub const ENV_RESPECT_GITIGNORE: &str = "GOON_RESPECT_GITIGNORE";

/// Configuration for one indexing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub scan: ScanOptions,

    pub chunker: ChunkerConfig,

    /// Directory tasks allowed to run at once
    pub concurrency: usize,

    /// Units still running when the budget runs out are reported as cancelled
    pub time_budget_ms: Option<u64>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            chunker: ChunkerConfig::default(),
            concurrency: default_index_concurrency(),
            time_budget_ms: None,
        }
    }
}

impl IndexerConfig {
    /// Defaults overlaid with `GOON_*` environment variables
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.concurrency =
            parse_index_concurrency(lookup(ENV_INDEX_CONCURRENCY).as_deref(), self.concurrency);

        if let Some(raw) = lookup(ENV_TIME_BUDGET_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.time_budget_ms = None,
                Ok(ms) => self.time_budget_ms = Some(ms),
                Err(_) => log::warn!("Ignoring invalid {ENV_TIME_BUDGET_MS}={raw:?}"),
            }
        }

        if let Some(raw) = lookup(ENV_RESPECT_GITIGNORE) {
            match parse_bool(&raw) {
                Some(value) => self.scan.respect_gitignore = value,
                None => log::warn!("Ignoring invalid {ENV_RESPECT_GITIGNORE}={raw:?}"),
            }
        }

        self
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(IndexerError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.scan.max_file_size == 0 {
            return Err(IndexerError::InvalidConfig(
                "max_file_size must be positive".to_string(),
            ));
        }
        self.chunker.validate().map_err(IndexerError::InvalidConfig)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
