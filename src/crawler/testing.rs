//! In-memory site and page fixtures for crawler unit tests

use crate::crawler::{DocumentFetcher, FetchError, Page};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub(crate) const BASE: &str = "https://tabletki.ua";

pub(crate) fn site_url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

/// Serves canned pages by absolute URL; unknown URLs answer 404
#[derive(Default)]
pub(crate) struct FakeSite {
    pages: HashMap<String, String>,
    delays: HashMap<String, u64>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSite {
    pub(crate) fn with_page(mut self, path: &str, body: impl Into<String>) -> Self {
        self.pages.insert(site_url(path), body.into());
        self
    }

    pub(crate) fn with_delay(mut self, path: &str, millis: u64) -> Self {
        self.delays.insert(site_url(path), millis);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for FakeSite {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let millis = self.delays.get(url.as_str()).copied().unwrap_or(1);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url.as_str()) {
            Some(body) => Ok(Page::new(url.clone(), body.clone())),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// ATC classification page listing `(href, title)` children
pub(crate) fn atc_panel(children: &[(&str, &str)]) -> String {
    let items: String = children
        .iter()
        .map(|(href, title)| format!(r#"<li><a href="{}" title="{}">x</a></li>"#, href, title))
        .collect();
    format!(r#"<div id="ctl00_ATCPanel"><ul>{}</ul></div>"#, items)
}

/// ATC category page listing goods
pub(crate) fn goods_list(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| format!(r#"<div><a href="{}">goods</a></div>"#, href))
        .collect();
    format!(r#"<div id="ctl00_MainContent_GoodsListPanel">{}</div>"#, items)
}

/// Goods page whose dosage list starts with the aggregate entry
pub(crate) fn dosage_list(aggregate: &str, hrefs: &[&str]) -> String {
    let items: String = std::iter::once(aggregate)
        .chain(hrefs.iter().copied())
        .enumerate()
        .map(|(i, href)| {
            let label = if i == 0 {
                crate::extract::ALL_DOSAGES_LABEL.to_string()
            } else {
                format!("dose {}", i)
            };
            format!(r#"<li><a href="{}">{}</a></li>"#, href, label)
        })
        .collect();
    format!(
        r#"<div class="search-control-panel"><div><div><ul>{}</ul></div></div></div>"#,
        items
    )
}

/// Drug detail page with a populated info table
pub(crate) fn drug_page(name: &str, manufacturer: &str) -> String {
    format!(
        r#"<div class="header-panel"><h1>{}</h1></div>
           <div itemprop="description">Инструкция</div>
           <div id="InstructionPanel"><table><tbody>
             <tr><td>Производитель</td><td>{}</td></tr>
           </tbody></table></div>"#,
        name, manufacturer
    )
}
