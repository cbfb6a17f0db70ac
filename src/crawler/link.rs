use std::fmt;
use url::Url;

/// A discovered link: absolute URL plus the anchor's display name, if any
///
/// Links are produced by extractors and consumed exactly once by the next
/// stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: Url,
    pub name: Option<String>,
}

impl Link {
    pub fn new(url: Url) -> Self {
        Self { url, name: None }
    }

    pub fn named(url: Url, name: impl Into<String>) -> Self {
        Self {
            url,
            name: Some(name.into()),
        }
    }

    /// Parses an absolute URL into an unnamed link
    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Url::parse(url).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
