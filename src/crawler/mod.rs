//! Crawler module: fetching, stage plumbing and the two scan shapes
//!
//! This module contains:
//! - the document fetcher and its HTTP implementation
//! - the bounded worker pool that runs one pipeline stage
//! - the recursive tree crawler
//! - the orchestrators for the drug scan and the ATC tree scan
//! - per-stage progress counters and the periodic reporter

mod fetcher;
mod link;
mod pipeline;
mod progress;
mod stage;
mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{build_http_client, DocumentFetcher, FetchError, HttpFetcher, Page};
pub use link::Link;
pub use pipeline::{scan_atc_tree, scan_drugs, Pipeline};
pub use progress::{spawn_progress_reporter, RunProgress, StageProgress, StageSnapshot};
pub use stage::{one_shot, StageRunner};
pub use tree::{NodeState, TreeCrawler, TreeError, TreeNode};
