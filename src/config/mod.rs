//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The file is optional: every setting has a default, and command-line flags
//! override whatever the file provides.
//!
//! # Example
//!
//! ```no_run
//! use atc_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Scanning with {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, OutputConfig, SourceConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
