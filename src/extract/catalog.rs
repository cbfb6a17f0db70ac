//! Link extractors for the ATC tree and the catalogue listing pages

use crate::crawler::{Link, Page};
use crate::extract::html::{inner_text, resolve_link, select_all};
use crate::extract::Extractor;
use scraper::{ElementRef, Html};

const ATC_PANEL: &str = r#"div[id*="ATCPanel"] > ul > li > a"#;
const GOODS_LIST: &str = r#"div[id*="GoodsListPanel"] > div > a"#;
const DOSAGE_LIST: &str = r#"div[class="search-control-panel"] > div > div > ul > li > a"#;

/// Label of the aggregate entry that leads every dosage list
pub const ALL_DOSAGES_LABEL: &str = "Все дозировки";

fn anchors_to_links(page: &Page, anchors: &[ElementRef<'_>]) -> Vec<Link> {
    anchors
        .iter()
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let url = resolve_link(href, &page.url)?;
            let name = anchor
                .value()
                .attr("title")
                .map(|title| title.trim().to_string())
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| inner_text(anchor));
            Some(Link::named(url, name))
        })
        .collect()
}

/// Child categories of an ATC classification page
///
/// Also lists the top-level categories on the root page. The anchor's
/// `title` attribute is the category's display name.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtcPanel;

impl Extractor for AtcPanel {
    type Output = Link;

    fn name(&self) -> &'static str {
        "atc"
    }

    fn extract(&self, page: &Page) -> Vec<Link> {
        let document = Html::parse_document(&page.body);
        anchors_to_links(page, &select_all(&document, ATC_PANEL))
    }
}

/// Goods (drug base) links listed on an ATC category page
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodsList;

impl Extractor for GoodsList {
    type Output = Link;

    fn name(&self) -> &'static str {
        "goods"
    }

    fn extract(&self, page: &Page) -> Vec<Link> {
        let document = Html::parse_document(&page.body);
        anchors_to_links(page, &select_all(&document, GOODS_LIST))
    }
}

/// Per-dosage detail links on a goods page
///
/// The first entry is the "all dosages" aggregate and is skipped. A page
/// with fewer than two entries has no dosage-specific pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DosageList;

impl Extractor for DosageList {
    type Output = Link;

    fn name(&self) -> &'static str {
        "dosages"
    }

    fn extract(&self, page: &Page) -> Vec<Link> {
        let document = Html::parse_document(&page.body);
        let anchors = select_all(&document, DOSAGE_LIST);

        if anchors.len() < 2 {
            tracing::warn!(url = %page.url, "Drug links not found");
            return Vec::new();
        }

        if inner_text(&anchors[0]) != ALL_DOSAGES_LABEL {
            tracing::warn!(
                url = %page.url,
                first = anchors[0].value().attr("href").unwrap_or_default(),
                "Unexpected first dosage link"
            );
        }

        anchors_to_links(page, &anchors[1..])
    }
}
