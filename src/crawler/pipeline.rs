//! Pipeline orchestration
//!
//! Wires stage runners into the four-stage drug scan and hands the final
//! record stream to a sink. The ATC tree scan uses the tree crawler instead
//! and writes the finished tree in one piece.

use crate::config::Config;
use crate::crawler::fetcher::{DocumentFetcher, FetchError};
use crate::crawler::progress::RunProgress;
use crate::crawler::stage::{one_shot, StageRunner};
use crate::crawler::tree::{TreeCrawler, TreeNode};
use crate::crawler::Link;
use crate::extract::{AtcPanel, DosageList, DrugDetails, Extractor, GoodsList};
use crate::sink::{RecordSink, TreeSink};
use crate::{ConfigError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Builds fetch-and-extract stages that share a fetcher and progress registry
pub struct Pipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    capacity: usize,
    progress: Arc<RunProgress>,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, capacity: usize) -> Self {
        Self {
            fetcher,
            capacity: capacity.max(1),
            progress: Arc::new(RunProgress::new()),
        }
    }

    pub fn with_progress(mut self, progress: Arc<RunProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> Arc<RunProgress> {
        Arc::clone(&self.progress)
    }

    /// A closed stream holding the initial links
    pub fn seed(&self, links: Vec<Link>) -> mpsc::Receiver<Link> {
        one_shot(links)
    }

    /// Starts a stage that fetches each incoming link and runs `extractor`
    /// on the page
    ///
    /// Links whose fetch fails are logged and dropped by the stage.
    pub fn stage<E>(
        &self,
        workers: usize,
        input: mpsc::Receiver<Link>,
        extractor: E,
    ) -> mpsc::Receiver<E::Output>
    where
        E: Extractor,
    {
        let name = extractor.name();
        let fetcher = Arc::clone(&self.fetcher);
        let extractor = Arc::new(extractor);

        StageRunner::new(name, workers)
            .with_capacity(self.capacity)
            .with_progress(self.progress.register(name))
            .run(input, move |link: Link| {
                let fetcher = Arc::clone(&fetcher);
                let extractor = Arc::clone(&extractor);
                async move {
                    let page = fetcher.fetch(&link.url).await?;
                    let outputs = extractor.extract(&page);
                    tracing::trace!(url = %link, found = outputs.len(), "Extracted");
                    Ok::<_, FetchError>(outputs)
                }
            })
    }
}

fn root_url(config: &Config) -> Result<Url> {
    Url::parse(&config.source.root_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("{}: {}", config.source.root_url, e)).into()
    })
}

/// Scans the drug catalogue into `sink`, returning the number of records stored
///
/// Stages: ATC root page to categories, categories to goods, goods to
/// dosage pages, dosage pages to records. The first two stages run a single
/// worker; the last two run `crawler.workers` each.
pub async fn scan_drugs(
    config: &Config,
    fetcher: Arc<dyn DocumentFetcher>,
    sink: &mut dyn RecordSink,
    progress: Arc<RunProgress>,
) -> Result<u64> {
    let root = Link::new(root_url(config)?);
    let workers = config.crawler.workers;
    let pipeline =
        Pipeline::new(fetcher, config.crawler.stream_capacity).with_progress(progress);

    tracing::info!(root = %root, workers, "Scanning drugs");

    let categories = pipeline.stage(1, pipeline.seed(vec![root]), AtcPanel);
    let goods = pipeline.stage(1, categories, GoodsList);
    let dosages = pipeline.stage(workers, goods, DosageList);
    let records = pipeline.stage(workers, dosages, DrugDetails);

    let total = sink.accept(records).await?;
    Ok(total)
}

/// Crawls the ATC classification and writes it to `sink`
pub async fn scan_atc_tree(
    config: &Config,
    fetcher: Arc<dyn DocumentFetcher>,
    sink: &mut dyn TreeSink,
    progress: Arc<RunProgress>,
) -> Result<TreeNode> {
    let root = Link::named(root_url(config)?, config.source.tree_root_name.clone());
    tracing::info!(root = %root, "Get ATC tree");

    let tree = TreeCrawler::new(fetcher)
        .with_max_in_flight(config.crawler.tree_max_in_flight())
        .with_progress(progress.register("atc-tree"))
        .crawl(root)
        .await?;

    tracing::info!(
        nodes = tree.node_count(),
        depth = tree.depth(),
        "ATC tree complete"
    );
    sink.write_tree(&tree)?;
    Ok(tree)
}
