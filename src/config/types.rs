use serde::Deserialize;

/// Main configuration structure for the harvester
///
/// Every field has a default, so an empty file (or no file at all) yields
/// the settings the scraper has always shipped with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Worker count for the wide stages (dosage links and drug details)
    pub workers: usize,

    /// Maximum concurrent fetches while expanding the ATC tree (0 = unbounded)
    #[serde(rename = "tree-workers")]
    pub tree_workers: usize,

    /// Capacity of each stage's output stream
    #[serde(rename = "stream-capacity")]
    pub stream_capacity: usize,

    /// Whole-request timeout in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Interval between progress log lines, in seconds (0 disables)
    #[serde(rename = "progress-interval-secs")]
    pub progress_interval_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            tree_workers: 0,
            stream_capacity: 1,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            progress_interval_secs: 10,
            user_agent: format!("atc-harvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CrawlerConfig {
    /// Tree fetch limit, `None` when the tree is expanded without a cap
    pub fn tree_max_in_flight(&self) -> Option<usize> {
        (self.tree_workers > 0).then_some(self.tree_workers)
    }
}

/// Where the crawl starts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root page of the ATC classification
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Display name given to the root of the ATC tree
    #[serde(rename = "tree-root-name")]
    pub tree_root_name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_url: "https://tabletki.ua/atc/".to_string(),
            tree_root_name: "АТХ (ATC) классификация".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Production mode writes to the database instead of CSV/JSON files
    pub production: bool,

    /// CSV file for drugs in debug mode
    #[serde(rename = "csv-path")]
    pub csv_path: String,

    /// JSON file for the ATC tree in debug mode
    #[serde(rename = "json-path")]
    pub json_path: String,

    /// Path to the SQLite database file used in production mode
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Rows per database transaction
    #[serde(rename = "batch-size")]
    pub batch_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            production: false,
            csv_path: "tabletki.csv".to_string(),
            json_path: "ATC_tree.json".to_string(),
            database_path: "drugs.db".to_string(),
            batch_size: 100,
        }
    }
}
