//! Crawl pipeline driver
//!
//! The crawler wires the stages together:
//! - an enumerator task walking the alphabetical index into the link queue
//! - a fetch task dispatching one future per entry link into the output queue
//! - the consumer loop, which owns the completion detector, the dedup cache,
//!   the counters and the sink
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```ignore
//! use wordcrawl::{Crawler, CsvSink};
//!
//! let crawler = Crawler::builder()
//!     .alphabet("a-c".parse()?)
//!     .quiet_interval(Duration::from_secs(20))
//!     .build()?;
//!
//! let mut sink = CsvSink::create("out.csv")?;
//! let summary = crawler.crawl(&mut sink).await?;
//! println!("accepted {} records", summary.accepted);
//! ```
//!
//! ## Stopping After a Fixed Number of Records
//!
//! ```ignore
//! let crawler = Crawler::builder()
//!     .record_limit(4000)
//!     .build()?;
//! ```
//!
//! ## With Cancellation
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel_token = CancellationToken::new();
//! let summary = crawler.crawl_with_cancellation(&mut sink, cancel_token).await?;
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use futures_util::StreamExt;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::completion::{CloseReason, CompletionDetector, Emission};
use crate::config::{Alphabet, CrawlConfig, Termination};
use crate::dedup::DedupCache;
use crate::enumerate::{EnumerationReport, IndexEnumerator};
use crate::error::{ConfigError, CrawlError};
use crate::extract::EntryRule;
use crate::fetch::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, HttpFetcher, PageFetcher};
use crate::links::LinkFilter;
use crate::record::{FetchOutcome, Link, Record};
use crate::sink::RecordSink;

/// Observer trait for receiving crawl events
///
/// Implement this trait to monitor crawl progress or collect custom
/// metrics. Every callback defaults to a no-op.
///
/// # Example
///
/// ```ignore
/// use wordcrawl::{CrawlObserver, Record};
///
/// struct PrintObserver;
///
/// #[async_trait::async_trait]
/// impl CrawlObserver for PrintObserver {
///     async fn on_record_accepted(&self, index: usize, record: &Record) {
///         println!("[{index}] {}", record.key);
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait CrawlObserver: Send + Sync {
    /// Called when an entry link is pushed into the link queue
    async fn on_link_queued(&self, _link: &Link) {}

    /// Called when an entry page has been fetched
    async fn on_page_fetched(&self, _link: &Link) {}

    /// Called when an index or entry page could not be fetched
    async fn on_fetch_error(&self, _url: &str, _error: &str) {}

    /// Called when a record passes deduplication and reaches the sink
    async fn on_record_accepted(&self, _index: usize, _record: &Record) {}

    /// Called when an entry page yields no headword
    async fn on_unresolved(&self, _link: &Link) {}

    /// Called once the crawl has stopped and the sink is flushed
    async fn on_crawl_complete(&self, _summary: &CrawlSummary) {}
}

/// Registry for managing multiple crawl observers
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Register an observer to receive crawl events
    pub fn register(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub async fn notify_link_queued(&self, link: &Link) {
        for observer in &self.observers {
            observer.on_link_queued(link).await;
        }
    }

    pub async fn notify_page_fetched(&self, link: &Link) {
        for observer in &self.observers {
            observer.on_page_fetched(link).await;
        }
    }

    pub async fn notify_fetch_error(&self, url: &str, error: &str) {
        for observer in &self.observers {
            observer.on_fetch_error(url, error).await;
        }
    }

    pub async fn notify_record_accepted(&self, index: usize, record: &Record) {
        for observer in &self.observers {
            observer.on_record_accepted(index, record).await;
        }
    }

    pub async fn notify_unresolved(&self, link: &Link) {
        for observer in &self.observers {
            observer.on_unresolved(link).await;
        }
    }

    pub async fn notify_crawl_complete(&self, summary: &CrawlSummary) {
        for observer in &self.observers {
            observer.on_crawl_complete(summary).await;
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch-side statistics collected during crawling
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Entry links pushed into the link queue
    pub links_queued: usize,
    /// Index pages fetched
    pub index_pages_fetched: usize,
    /// Entry pages fetched
    pub pages_fetched: usize,
    /// Failed fetches of any kind
    pub errors_encountered: usize,
    pub start_time: Instant,
    pub last_update: Instant,
}

impl CrawlStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            links_queued: 0,
            index_pages_fetched: 0,
            pages_fetched: 0,
            errors_encountered: 0,
            start_time: now,
            last_update: now,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.last_update.duration_since(self.start_time)
    }

    /// Entry pages fetched per second
    pub fn pages_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.pages_fetched as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe statistics tracker with real-time broadcasting
///
/// Updated concurrently by the enumerator and fetch tasks. Accepted and
/// missed counts are not kept here; they belong to the consumer loop.
/// One tracker covers one run.
pub struct StatsTracker {
    links_queued: AtomicUsize,
    index_pages_fetched: AtomicUsize,
    pages_fetched: AtomicUsize,
    errors_encountered: AtomicUsize,
    start_time: Instant,
    tx: Arc<watch::Sender<CrawlStats>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CrawlStats::new());
        Self::with_sender(Arc::new(tx))
    }

    /// Track a new run on an existing channel, resetting what subscribers see
    pub fn with_sender(tx: Arc<watch::Sender<CrawlStats>>) -> Self {
        let stats = CrawlStats::new();
        let start_time = stats.start_time;
        tx.send_replace(stats);
        Self {
            links_queued: AtomicUsize::new(0),
            index_pages_fetched: AtomicUsize::new(0),
            pages_fetched: AtomicUsize::new(0),
            errors_encountered: AtomicUsize::new(0),
            start_time,
            tx,
        }
    }

    /// Subscribe to statistics updates
    pub fn subscribe(&self) -> watch::Receiver<CrawlStats> {
        self.tx.subscribe()
    }

    // Relaxed throughout: the counters are informational and never gate control flow.

    pub fn link_queued(&self) {
        self.links_queued.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn index_page_fetched(&self) {
        self.index_pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn page_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn error_encountered(&self) {
        self.errors_encountered.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    /// Snapshot taken under the channel lock, so the last writer always
    /// publishes the latest counters
    fn broadcast(&self) {
        self.tx.send_modify(|stats| *stats = self.snapshot());
    }

    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            links_queued: self.links_queued.load(Ordering::Relaxed),
            index_pages_fetched: self.index_pages_fetched.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            errors_encountered: self.errors_encountered.load(Ordering::Relaxed),
            start_time: self.start_time,
            last_update: Instant::now(),
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Final result of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Records written to the sink
    pub accepted: usize,
    /// Entry pages without a headword
    pub missed: usize,
    /// Records suppressed by the dedup cache
    pub duplicates: usize,
    /// Why the output queue was closed
    pub close_reason: CloseReason,
    /// Index enumeration totals (empty when links were seeded directly)
    pub enumeration: EnumerationReport,
    /// Fetch-side statistics at shutdown
    pub stats: CrawlStats,
    pub elapsed: Duration,
}

/// Counters and dedup state owned by the consumer loop
struct RunState {
    dedup: DedupCache,
    accepted: usize,
    missed: usize,
    duplicates: usize,
}

impl RunState {
    fn new(cache_capacity: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            dedup: DedupCache::new(cache_capacity)?,
            accepted: 0,
            missed: 0,
            duplicates: 0,
        })
    }
}

/// Where entry links come from
enum LinkSource {
    Enumerate,
    Seeded(Vec<Link>),
}

enum Step {
    Outcome(Option<FetchOutcome>),
    Cancelled,
}

/// Dictionary crawler that manages enumeration, fetching and deduplication
pub struct Crawler {
    config: CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
    observers: Arc<ObserverRegistry>,
    stats_tx: Arc<watch::Sender<CrawlStats>>,
}

impl Crawler {
    /// Create a crawler builder for custom configuration
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::default()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Fetch statistics of the current or most recent run
    pub fn stats(&self) -> CrawlStats {
        self.stats_tx.borrow().clone()
    }

    /// Subscribe to real-time statistics updates
    ///
    /// The channel outlives individual runs; each run starts from zero.
    pub fn subscribe_stats(&self) -> watch::Receiver<CrawlStats> {
        self.stats_tx.subscribe()
    }

    /// Enumerate the configured alphabet and crawl every entry found
    ///
    /// Returns once the completion detector closes the output queue, the
    /// record limit is reached, or every link has been fetched. The sink is
    /// flushed before returning.
    pub async fn crawl<S>(&self, sink: &mut S) -> Result<CrawlSummary, CrawlError>
    where
        S: RecordSink + ?Sized,
    {
        self.crawl_internal(LinkSource::Enumerate, sink, None).await
    }

    /// Like [`Crawler::crawl`], but stops early when `cancel_token` fires
    ///
    /// In-flight fetches are dropped; records already accepted stay in the
    /// sink, which is flushed.
    pub async fn crawl_with_cancellation<S>(
        &self,
        sink: &mut S,
        cancel_token: CancellationToken,
    ) -> Result<CrawlSummary, CrawlError>
    where
        S: RecordSink + ?Sized,
    {
        self.crawl_internal(LinkSource::Enumerate, sink, Some(cancel_token))
            .await
    }

    /// Crawl a fixed set of entry links, skipping index enumeration
    pub async fn crawl_links<I, S>(&self, links: I, sink: &mut S) -> Result<CrawlSummary, CrawlError>
    where
        I: IntoIterator<Item = Link>,
        S: RecordSink + ?Sized,
    {
        let links = links.into_iter().collect();
        self.crawl_internal(LinkSource::Seeded(links), sink, None)
            .await
    }

    async fn crawl_internal<S>(
        &self,
        source: LinkSource,
        sink: &mut S,
        cancel_token: Option<CancellationToken>,
    ) -> Result<CrawlSummary, CrawlError>
    where
        S: RecordSink + ?Sized,
    {
        let started = Instant::now();
        let mut state = RunState::new(self.config.cache_capacity)?;
        let stats = Arc::new(StatsTracker::with_sender(self.stats_tx.clone()));
        let stop_source = CancellationToken::new();

        let (links_tx, links_rx) = mpsc::unbounded_channel::<Link>();
        let (outcomes_tx, mut outcomes_rx) = mpsc::unbounded_channel();

        let fetch_handle = self.launch_fetchers(links_rx, outcomes_tx, stats.clone());
        let source_handle =
            self.launch_link_source(source, links_tx, stats.clone(), stop_source.clone());

        let mut detector = CompletionDetector::new(self.config.termination.quiet_interval());
        let consumed = self
            .consume(&mut detector, &mut outcomes_rx, &mut state, sink, cancel_token)
            .await;

        // Fetches still in flight race with shutdown and are dropped. The
        // link source is stopped rather than aborted so its totals survive.
        fetch_handle.abort();
        let _ = fetch_handle.await;
        stop_source.cancel();
        let enumeration = match source_handle.await {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(%error, "link source task failed");
                EnumerationReport::default()
            }
        };
        drop(outcomes_rx);

        let finished = sink.finish();
        consumed?;
        finished?;

        let summary = CrawlSummary {
            accepted: state.accepted,
            missed: state.missed,
            duplicates: state.duplicates,
            close_reason: detector.close_reason().unwrap_or(CloseReason::Exhausted),
            enumeration,
            stats: stats.snapshot(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            accepted = summary.accepted,
            missed = summary.missed,
            duplicates = summary.duplicates,
            reason = ?summary.close_reason,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "crawl finished"
        );
        self.observers.notify_crawl_complete(&summary).await;

        Ok(summary)
    }

    /// Drain the output queue through dedup into the sink
    async fn consume<S>(
        &self,
        detector: &mut CompletionDetector,
        outcomes: &mut mpsc::UnboundedReceiver<Emission<FetchOutcome>>,
        state: &mut RunState,
        sink: &mut S,
        cancel_token: Option<CancellationToken>,
    ) -> Result<(), CrawlError>
    where
        S: RecordSink + ?Sized,
    {
        let record_limit = self.config.termination.record_limit();

        loop {
            let step = tokio::select! {
                biased;

                _ = async {
                    if let Some(ref token) = cancel_token {
                        token.cancelled().await
                    } else {
                        std::future::pending::<()>().await
                    }
                } => Step::Cancelled,

                outcome = detector.next(outcomes) => Step::Outcome(outcome),
            };

            let outcome = match step {
                Step::Outcome(Some(outcome)) => outcome,
                Step::Outcome(None) => break,
                Step::Cancelled => {
                    detector.close(CloseReason::Cancelled);
                    break;
                }
            };

            match outcome {
                FetchOutcome::Resolved(record) => {
                    if !state.dedup.should_emit(&record.key) {
                        state.duplicates += 1;
                        tracing::debug!(key = %record.key, "duplicate suppressed");
                        continue;
                    }

                    sink.accept(&record)?;
                    let index = state.accepted;
                    state.accepted += 1;
                    tracing::info!(index, missed = state.missed, key = %record.key, "accepted");
                    self.observers.notify_record_accepted(index, &record).await;

                    if record_limit == Some(state.accepted) {
                        detector.close(CloseReason::RecordLimit);
                        break;
                    }
                }
                FetchOutcome::Unresolved(link) => {
                    state.missed += 1;
                    tracing::debug!(link = %link, missed = state.missed, "no headword");
                    self.observers.notify_unresolved(&link).await;
                }
            }
        }

        Ok(())
    }

    /// Start the task feeding the link queue
    ///
    /// The task owns the only sender, so the queue closes when it returns.
    fn launch_link_source(
        &self,
        source: LinkSource,
        links: mpsc::UnboundedSender<Link>,
        stats: Arc<StatsTracker>,
        stop: CancellationToken,
    ) -> JoinHandle<EnumerationReport> {
        match source {
            LinkSource::Enumerate => {
                let enumerator = IndexEnumerator::new(
                    self.fetcher.clone(),
                    Arc::new(self.config.link_filter.clone()),
                    self.config.index_url.clone(),
                )
                .with_observability(self.observers.clone(), stats);
                let alphabet = self.config.alphabet.clone();

                tokio::spawn(async move {
                    enumerator.enumerate_until(&alphabet, &links, &stop).await
                })
            }
            LinkSource::Seeded(seeded) => {
                let observers = self.observers.clone();

                tokio::spawn(async move {
                    let mut report = EnumerationReport::default();
                    for link in seeded {
                        if stop.is_cancelled() {
                            break;
                        }
                        observers.notify_link_queued(&link).await;
                        if links.send(link).is_err() {
                            break;
                        }
                        report.entry_links += 1;
                        stats.link_queued();
                    }
                    report
                })
            }
        }
    }

    /// Start the task fetching entry pages
    ///
    /// Without a configured bound every queued link is fetched at once.
    fn launch_fetchers(
        &self,
        links: mpsc::UnboundedReceiver<Link>,
        outcomes: mpsc::UnboundedSender<Emission<FetchOutcome>>,
        stats: Arc<StatsTracker>,
    ) -> JoinHandle<()> {
        let limit = self.config.max_in_flight;
        let fetcher = self.fetcher.clone();
        let rule = Arc::new(self.config.entry_rule.clone());
        let observers = self.observers.clone();

        tokio::spawn(async move {
            UnboundedReceiverStream::new(links)
                .for_each_concurrent(limit, |link| {
                    let fetcher = fetcher.clone();
                    let rule = rule.clone();
                    let stats = stats.clone();
                    let observers = observers.clone();
                    let outcomes = outcomes.clone();

                    async move {
                        match fetcher.fetch(link.as_str()).await {
                            Ok(body) => {
                                stats.page_fetched();
                                let outcome = rule.outcome(&link, &body);
                                if outcomes.send(Emission::now(outcome)).is_err() {
                                    tracing::debug!(link = %link, "output queue closed, dropping outcome");
                                }
                                observers.notify_page_fetched(&link).await;
                            }
                            Err(error) => {
                                tracing::warn!(link = %link, %error, "entry page fetch failed");
                                stats.error_encountered();
                                observers
                                    .notify_fetch_error(link.as_str(), &error.to_string())
                                    .await;
                            }
                        }
                    }
                })
                .await;
        })
    }
}

/// Builder for configuring a Crawler
pub struct CrawlerBuilder {
    config: CrawlConfig,
    fetcher: Option<Arc<dyn PageFetcher>>,
    user_agent: String,
    request_timeout: Duration,
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlerBuilder {
    pub fn new() -> Self {
        Self {
            config: CrawlConfig::default(),
            fetcher: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            observers: Vec::new(),
        }
    }

    /// Index URL template; `{}` is replaced by each alphabet symbol
    pub fn index_url(mut self, template: impl Into<String>) -> Self {
        self.config.index_url = template.into();
        self
    }

    /// Symbols to enumerate (default: `a` to `z`)
    pub fn alphabet(mut self, alphabet: Alphabet) -> Self {
        self.config.alphabet = alphabet;
        self
    }

    /// Inactivity after which the crawl is declared complete (default: 30s)
    pub fn quiet_interval(mut self, quiet: Duration) -> Self {
        self.config.termination = match self.config.termination {
            Termination::QuietInterval(_) => Termination::QuietInterval(quiet),
            Termination::QuietIntervalOrLimit { limit, .. } => {
                Termination::QuietIntervalOrLimit { quiet, limit }
            }
        };
        self
    }

    /// Also stop once `limit` records have been accepted
    pub fn record_limit(mut self, limit: usize) -> Self {
        self.config.termination = Termination::QuietIntervalOrLimit {
            quiet: self.config.termination.quiet_interval(),
            limit,
        };
        self
    }

    pub fn termination(mut self, termination: Termination) -> Self {
        self.config.termination = termination;
        self
    }

    /// Dedup cache capacity (default: 50)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Cap on concurrent entry page fetches (default: unbounded)
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.config.max_in_flight = Some(limit);
        self
    }

    pub fn link_filter(mut self, filter: LinkFilter) -> Self {
        self.config.link_filter = filter;
        self
    }

    pub fn entry_rule(mut self, rule: EntryRule) -> Self {
        self.config.entry_rule = rule;
        self
    }

    /// Use a custom page fetcher instead of the HTTP client
    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// User agent of the default HTTP fetcher
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-request timeout of the default HTTP fetcher (default: 30s)
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Register an observer to receive crawl events
    pub fn observe_with(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the Crawler with the configured settings
    pub fn build(self) -> Result<Crawler, ConfigError> {
        self.config.validate()?;

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::with_options(
                &self.user_agent,
                self.request_timeout,
            )?),
        };

        let mut registry = ObserverRegistry::new();
        for observer in self.observers {
            registry.register(observer);
        }

        let (stats_tx, _) = watch::channel(CrawlStats::new());

        Ok(Crawler {
            config: self.config,
            fetcher,
            observers: Arc::new(registry),
            stats_tx: Arc::new(stats_tx),
        })
    }
}
