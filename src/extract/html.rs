//! Selector helpers shared by the extractors
//!
//! A query that matches nothing is never an error here: it yields an empty
//! list or an empty string and extraction carries on.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Parses a CSS selector, logging instead of failing on a bad one
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!(selector = css, error = ?e, "Invalid selector");
            None
        }
    }
}

/// All elements matching `css` in document order
pub(crate) fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => document.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// First element matching `css`
pub(crate) fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    selector(css).and_then(|sel| document.select(&sel).next())
}

/// Trimmed text of the first element matching `css`, or an empty string
pub(crate) fn select_text(document: &Html, css: &str) -> String {
    select_first(document, css)
        .map(|element| inner_text(&element))
        .unwrap_or_default()
}

/// Trimmed text of the first descendant of `element` matching `css`
pub(crate) fn select_text_in(element: &ElementRef<'_>, css: &str) -> String {
    selector(css)
        .and_then(|sel| element.select(&sel).next())
        .map(|found| inner_text(&found))
        .unwrap_or_default()
}

/// All text under an element, trimmed at both ends
pub(crate) fn inner_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Direct element children with the given tag name
pub(crate) fn child_elements<'a>(element: &ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == tag)
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// Protocol-relative hrefs (`//host/path`) take the scheme of `base_url`.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
