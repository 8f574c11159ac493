//! Alphabetical index enumeration
//!
//! For every symbol of the alphabet the enumerator fetches the letter page,
//! walks the sub-index pages it links to, and pushes every entry link it
//! finds into the link queue. Index pages of one symbol are fetched one
//! after another. A failed index fetch only loses that branch.
//!
//! A cancelled walk still returns the totals gathered so far.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Alphabet;
use crate::crawler::{ObserverRegistry, StatsTracker};
use crate::fetch::PageFetcher;
use crate::links::{LinkFilter, PageRole, UrlNormalizer};
use crate::record::Link;

/// Totals for one enumeration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumerationReport {
    /// Symbols enumerated
    pub symbols: usize,
    /// Index pages fetched successfully
    pub index_pages: usize,
    /// Index pages that could not be fetched
    pub index_failures: usize,
    /// Entry links pushed into the link queue
    pub entry_links: usize,
}

/// Walks the index pages of each alphabet symbol
pub struct IndexEnumerator {
    fetcher: Arc<dyn PageFetcher>,
    filter: Arc<LinkFilter>,
    index_url: String,
    observers: Arc<ObserverRegistry>,
    stats: Arc<StatsTracker>,
}

impl IndexEnumerator {
    /// Create an enumerator; `index_url` must contain a `{}` placeholder
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        filter: Arc<LinkFilter>,
        index_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            filter,
            index_url: index_url.into(),
            observers: Arc::new(ObserverRegistry::new()),
            stats: Arc::new(StatsTracker::new()),
        }
    }

    pub(crate) fn with_observability(
        mut self,
        observers: Arc<ObserverRegistry>,
        stats: Arc<StatsTracker>,
    ) -> Self {
        self.observers = observers;
        self.stats = stats;
        self
    }

    /// Index URL of one alphabet symbol
    pub fn index_url_for(&self, symbol: char) -> String {
        self.index_url.replace("{}", &symbol.to_string())
    }

    /// Enumerate every symbol, sending entry links into `links`
    ///
    /// The queue is left open. Returns early if the receiving side is gone.
    pub async fn enumerate(
        &self,
        alphabet: &Alphabet,
        links: &mpsc::UnboundedSender<Link>,
    ) -> EnumerationReport {
        self.enumerate_until(alphabet, links, &CancellationToken::new())
            .await
    }

    /// Like [`IndexEnumerator::enumerate`], stopping once `cancel` fires
    ///
    /// An index fetch in progress is abandoned; the report covers every page
    /// handled before that.
    pub async fn enumerate_until(
        &self,
        alphabet: &Alphabet,
        links: &mpsc::UnboundedSender<Link>,
        cancel: &CancellationToken,
    ) -> EnumerationReport {
        let mut report = EnumerationReport::default();

        for &symbol in alphabet.symbols() {
            report.symbols += 1;
            let start = self.index_url_for(symbol);
            if !self
                .enumerate_symbol(symbol, start, links, cancel, &mut report)
                .await
            {
                tracing::debug!("enumeration stopped early");
                break;
            }
        }

        tracing::info!(
            symbols = report.symbols,
            index_pages = report.index_pages,
            index_failures = report.index_failures,
            entry_links = report.entry_links,
            "enumeration finished"
        );
        report
    }

    /// Walk one symbol's index tree
    ///
    /// `false` when the link queue is closed or the walk was cancelled.
    async fn enumerate_symbol(
        &self,
        symbol: char,
        start: String,
        links: &mpsc::UnboundedSender<Link>,
        cancel: &CancellationToken,
        report: &mut EnumerationReport,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut pending = VecDeque::from([start]);

        while let Some(url) = pending.pop_front() {
            if !visited.insert(UrlNormalizer::normalize(&url)) {
                continue;
            }

            let fetched = tokio::select! {
                biased;

                _ = cancel.cancelled() => return false,
                fetched = self.fetcher.fetch(&url) => fetched,
            };
            let body = match fetched {
                Ok(body) => body,
                Err(error) => {
                    tracing::warn!(%symbol, url = %url, %error, "index page fetch failed");
                    report.index_failures += 1;
                    self.stats.error_encountered();
                    self.observers
                        .notify_fetch_error(&url, &error.to_string())
                        .await;
                    continue;
                }
            };
            report.index_pages += 1;
            self.stats.index_page_fetched();

            let Ok(base) = Url::parse(&url) else {
                tracing::warn!(url = %url, "index URL is not absolute, skipping");
                continue;
            };
            let (sub_indices, entries) = self.scan(&base, &body);
            tracing::debug!(
                url = %url,
                sub_indices = sub_indices.len(),
                entries = entries.len(),
                "index page scanned"
            );

            pending.extend(sub_indices.into_iter().map(Link::into_string));

            for link in entries {
                self.observers.notify_link_queued(&link).await;
                if links.send(link).is_err() {
                    return false;
                }
                report.entry_links += 1;
                self.stats.link_queued();
            }
        }
        true
    }

    /// Both link roles of one page, collected before the next await
    fn scan(&self, base: &Url, body: &str) -> (Vec<Link>, Vec<Link>) {
        let document = scraper::Html::parse_document(body);
        let root = document.root_element();
        let sub_indices = self
            .filter
            .links(&root, base, PageRole::IndexOfIndices)
            .collect();
        let entries = self
            .filter
            .links(&root, base, PageRole::IndexOfEntries)
            .collect();
        (sub_indices, entries)
    }
}
