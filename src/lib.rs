//! ATC Harvester: concurrent scraper for the tabletki.ua drug catalogue
//!
//! This crate crawls two shapes of data from the same site:
//! - the ATC classification, a recursively nested taxonomy, materialized as one tree
//! - the flat drug catalogue, expanded through a staged link pipeline and streamed
//!   into a CSV file or a SQLite database

pub mod config;
pub mod crawler;
pub mod extract;
pub mod sink;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Tree crawl error: {0}")]
    Tree(#[from] crawler::TreeError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Link, Page, TreeNode};
pub use extract::DrugRecord;
