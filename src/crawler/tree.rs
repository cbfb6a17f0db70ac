//! Recursive crawler that materializes a category tree
//!
//! Each node's page is fetched and its child links extracted. A node with no
//! children is a leaf. A node with children is complete only once every
//! child subtree has completed; the finished tree is returned as one value.
//!
//! Two scheduling modes share these semantics:
//! - unbounded: one task per child, recursively (the default; the source tree
//!   is shallow and its branching is bounded by the site)
//! - bounded: an arena of nodes with per-node pending-child counters, drained
//!   by at most `n` concurrent fetches, for wider trees

use crate::crawler::fetcher::{DocumentFetcher, FetchError};
use crate::crawler::progress::StageProgress;
use crate::crawler::Link;
use crate::extract::{AtcPanel, Extractor};
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use url::Url;

/// Errors that abort a tree crawl
#[derive(Debug, Error)]
pub enum TreeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Tree expansion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Lifecycle of a node during expansion
///
/// `Fetching` lasts until the node's page is fetched and, for a node with
/// children, until every child has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Fetching,
    Expanded(usize),
    Leaf,
    Failed,
}

impl NodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expanded(_) | Self::Leaf | Self::Failed)
    }
}

/// A completed node of the crawled tree
///
/// Nodes are only built once their subtree has finished, so the child list is
/// fixed from construction. Serializes as `{"name": ..., "children": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    name: String,
    #[serde(skip)]
    link: Url,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(name: String, link: Url, children: Vec<TreeNode>) -> Self {
        Self {
            name,
            link,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link(&self) -> &Url {
        &self.link
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Levels in this subtree; a lone leaf has depth 1
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }
}

type ChildExtractor = Arc<dyn Extractor<Output = Link>>;
type ExpandFuture = Pin<Box<dyn Future<Output = Result<TreeNode, TreeError>> + Send>>;

/// Crawls a tree of pages starting from a root link
pub struct TreeCrawler {
    fetcher: Arc<dyn DocumentFetcher>,
    children: ChildExtractor,
    max_in_flight: Option<usize>,
    progress: Arc<StageProgress>,
}

impl TreeCrawler {
    /// Creates a crawler that follows ATC panel links without a fetch limit
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            fetcher,
            children: Arc::new(AtcPanel),
            max_in_flight: None,
            progress: Arc::new(StageProgress::new("atc-tree")),
        }
    }

    /// Uses a different extractor to find child links
    pub fn with_extractor<E: Extractor<Output = Link>>(mut self, extractor: E) -> Self {
        self.children = Arc::new(extractor);
        self
    }

    /// Caps concurrent fetches; `None` spawns one task per child
    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.max_in_flight = limit.map(|n| n.max(1));
        self
    }

    pub fn with_progress(mut self, progress: Arc<StageProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Expands the whole tree below `root`
    ///
    /// The root's display name is taken from the link. Any fetch failure
    /// fails the crawl.
    pub async fn crawl(&self, root: Link) -> Result<TreeNode, TreeError> {
        let name = root.name.unwrap_or_default();
        let result = match self.max_in_flight {
            None => {
                expand(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.children),
                    Arc::clone(&self.progress),
                    name,
                    root.url,
                )
                .await
            }
            Some(limit) => self.crawl_bounded(name, root.url, limit).await,
        };
        self.progress.mark_finished();
        result
    }

    async fn crawl_bounded(
        &self,
        name: String,
        url: Url,
        limit: usize,
    ) -> Result<TreeNode, TreeError> {
        let mut arena = Arena::default();
        let root = arena.push(name, url, None);
        let mut queue = VecDeque::from([root]);
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < limit {
                let Some(id) = queue.pop_front() else {
                    break;
                };
                let url = arena.begin_fetch(id);
                let fetcher = Arc::clone(&self.fetcher);
                let extractor = Arc::clone(&self.children);
                in_flight.spawn(async move {
                    let result = fetcher
                        .fetch(&url)
                        .await
                        .map(|page| extractor.extract(&page));
                    (id, result)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let (id, result) = joined?;
            match result {
                Ok(links) => {
                    self.progress.record_processed();
                    let ids = arena.expand(id, links);
                    self.progress.record_emitted_n(ids.len() as u64);
                    queue.extend(ids);
                }
                Err(e) => {
                    self.progress.record_failed();
                    arena.fail(id);
                    tracing::error!(url = e.url(), error = %e, "Tree node fetch failed");
                    // Dropping the set aborts the remaining fetches
                    return Err(e.into());
                }
            }
        }

        Ok(arena.into_tree(root))
    }
}

/// Expands one node, spawning a task per child
fn expand(
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: ChildExtractor,
    progress: Arc<StageProgress>,
    name: String,
    url: Url,
) -> ExpandFuture {
    Box::pin(async move {
        tracing::debug!(url = %url, state = ?NodeState::Fetching, "|-- expanding");

        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                progress.record_failed();
                tracing::error!(url = %url, state = ?NodeState::Failed, error = %e, "Tree node fetch failed");
                return Err(e.into());
            }
        };
        progress.record_processed();

        let links = extractor.extract(&page);
        if links.is_empty() {
            tracing::trace!(url = %url, state = ?NodeState::Leaf, "Leaf");
            return Ok(TreeNode::new(name, url, Vec::new()));
        }

        let count = links.len();
        let mut tasks = JoinSet::new();
        for (index, link) in links.into_iter().enumerate() {
            progress.record_emitted();
            let child = expand(
                Arc::clone(&fetcher),
                Arc::clone(&extractor),
                Arc::clone(&progress),
                link.name.unwrap_or_default(),
                link.url,
            );
            tasks.spawn(async move { (index, child.await) });
        }

        // Join every child before looking at any result
        let mut slots: Vec<Option<Result<TreeNode, TreeError>>> =
            (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined?;
            slots[index] = Some(result);
        }

        let children = slots
            .into_iter()
            .flatten()
            .collect::<Result<Vec<_>, _>>()?;

        tracing::trace!(url = %url, state = ?NodeState::Expanded(count), "Expanded");
        Ok(TreeNode::new(name, url, children))
    })
}

#[derive(Debug)]
struct ArenaNode {
    name: String,
    url: Url,
    parent: Option<usize>,
    children: Option<Vec<usize>>,
    pending: usize,
    state: NodeState,
}

/// Flat node storage for the bounded crawl
#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<ArenaNode>,
}

impl Arena {
    fn push(&mut self, name: String, url: Url, parent: Option<usize>) -> usize {
        self.nodes.push(ArenaNode {
            name,
            url,
            parent,
            children: None,
            pending: 0,
            state: NodeState::Pending,
        });
        self.nodes.len() - 1
    }

    fn begin_fetch(&mut self, id: usize) -> Url {
        let node = &mut self.nodes[id];
        node.state = NodeState::Fetching;
        node.url.clone()
    }

    fn fail(&mut self, id: usize) {
        self.nodes[id].state = NodeState::Failed;
    }

    /// Records a fetched node's children and returns their ids
    ///
    /// A node without children settles immediately.
    fn expand(&mut self, id: usize, links: Vec<Link>) -> Vec<usize> {
        debug_assert!(self.nodes[id].children.is_none(), "children set twice");

        let ids: Vec<usize> = links
            .into_iter()
            .map(|link| self.push(link.name.unwrap_or_default(), link.url, Some(id)))
            .collect();

        let node = &mut self.nodes[id];
        node.pending = ids.len();
        node.children = Some(ids.clone());
        if ids.is_empty() {
            self.settle(id);
        }
        ids
    }

    /// Marks a node terminal and completes every ancestor whose last
    /// pending child this was
    fn settle(&mut self, id: usize) {
        let mut current = id;
        loop {
            let node = &mut self.nodes[current];
            let count = node.children.as_ref().map_or(0, Vec::len);
            node.state = if count == 0 {
                NodeState::Leaf
            } else {
                NodeState::Expanded(count)
            };

            let Some(parent) = node.parent else {
                return;
            };
            let parent_node = &mut self.nodes[parent];
            parent_node.pending -= 1;
            if parent_node.pending > 0 {
                return;
            }
            current = parent;
        }
    }

    fn into_tree(mut self, root: usize) -> TreeNode {
        debug_assert!(self.nodes[root].state.is_terminal());
        self.take(root)
    }

    fn take(&mut self, id: usize) -> TreeNode {
        let child_ids = self.nodes[id].children.take().unwrap_or_default();
        let children = child_ids.into_iter().map(|child| self.take(child)).collect();
        let node = &mut self.nodes[id];
        TreeNode::new(std::mem::take(&mut node.name), node.url.clone(), children)
    }
}
