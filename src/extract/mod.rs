//! Extractors: pure functions from a fetched page to links or records
//!
//! An extractor parses the page it is handed and nothing else. Missing
//! sections degrade to empty results; they are never errors.

mod catalog;
mod drug;
mod html;

pub use catalog::{AtcPanel, DosageList, GoodsList, ALL_DOSAGES_LABEL};
pub use drug::{parse_drug, DrugDetails, DrugRecord};

use crate::crawler::Page;

/// Turns a page into an ordered sequence of outputs
pub trait Extractor: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Short name used for stage labels and log fields
    fn name(&self) -> &'static str;

    fn extract(&self, page: &Page) -> Vec<Self::Output>;
}
