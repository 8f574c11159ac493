// Core modules
mod backend;
pub mod completion;
pub mod config;
pub mod crawler;
pub mod dedup;
pub mod enumerate;
mod error;
pub mod extract;
pub mod fetch;
pub mod links;
mod record;
pub mod sink;

// Public exports
pub use backend::ElementRef;
pub use completion::{CloseReason, CompletionDetector, DetectorState, Emission};
pub use config::{Alphabet, CrawlConfig, Termination};
pub use crawler::{
    CrawlObserver, CrawlStats, CrawlSummary, Crawler, CrawlerBuilder, ObserverRegistry,
    StatsTracker,
};
pub use dedup::DedupCache;
pub use enumerate::{EnumerationReport, IndexEnumerator};
pub use error::{ConfigError, CrawlError, ExtractionError, FetchError, SinkError};
pub use extract::EntryRule;
pub use fetch::{HttpFetcher, PageFetcher};
pub use links::{LinkFilter, PageRole, UrlNormalizer};
pub use record::{Attribute, Attributes, FetchOutcome, Link, Record};
pub use sink::{CsvSink, RecordSink};
