#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wordcrawl::{FetchError, PageFetcher};

pub const BASE: &str = "https://dict.test";
pub const INDEX_TEMPLATE: &str = "https://dict.test/browse/{}/";

/// In-memory fetcher serving canned pages, recording every request
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn delayed(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

pub fn entry_url(slug: &str) -> String {
    format!("{BASE}/dictionary/english/{slug}")
}

/// Entry page with a primary headword and part-of-speech labels
pub fn entry_page(headword: &str, labels: &[&str]) -> String {
    let labels: String = labels
        .iter()
        .map(|label| format!(r#"<span class="pos dpos">{label}</span>"#))
        .collect();
    format!(
        r#"<html><body><article id="page-content">
            <div class="di-title"><span class="hw dhw">{headword}</span></div>
            <div class="posgram">{labels}</div>
        </article></body></html>"#
    )
}

/// Entry page that only carries the fallback headword field
pub fn fallback_entry_page(headword: &str, labels: &[&str]) -> String {
    let labels: String = labels
        .iter()
        .map(|label| format!(r#"<span class="pos dpos">{label}</span>"#))
        .collect();
    format!(
        r#"<html><body><article id="page-content">
            <h2 class="headword">{headword}</h2>
            {labels}
        </article></body></html>"#
    )
}

/// Entry page without any headword field
pub fn headless_page() -> String {
    r#"<html><body><article id="page-content">
        <p>This entry has moved.</p>
    </article></body></html>"#
        .to_string()
}

/// Index page linking to sub-index pages
pub fn index_of_indices(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<li><a class="dil tcbd" href="{href}">range</a></li>"#))
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}

/// Index page linking to entries as `(href, part of speech)` pairs
pub fn index_of_entries(entries: &[(&str, &str)]) -> String {
    let anchors: String = entries
        .iter()
        .map(|(href, pos)| {
            format!(
                r#"<li><a class="tc-bd" href="{href}"><span class="haxa">word</span> <span class="pos">{pos}</span></a></li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}
