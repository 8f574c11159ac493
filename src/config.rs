//! Crawl configuration and defaults

use std::{fmt, str::FromStr, time::Duration};

use crate::error::ConfigError;
use crate::extract::EntryRule;
use crate::links::LinkFilter;

/// Browse page for one letter; `{}` is replaced by the symbol
pub const DEFAULT_INDEX_URL: &str = "https://dictionary.cambridge.org/browse/english/{}/";
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_CAPACITY: usize = 50;
pub const DEFAULT_FLUSH_EVERY: usize = 300;

/// Ordered symbols to enumerate
///
/// Parsed from a comma separated list of single symbols, runs of symbols
/// (`abc`) or inclusive ranges (`a-f`). Duplicates keep their first position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet(Vec<char>);

impl Alphabet {
    /// Lowercase latin letters `a` to `z`
    pub fn latin() -> Self {
        Self(('a'..='z').collect())
    }

    pub fn new(symbols: impl IntoIterator<Item = char>) -> Self {
        let mut unique = Vec::new();
        for symbol in symbols {
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }
        Self(unique)
    }

    pub fn symbols(&self) -> &[char] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::latin()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.0 {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

impl FromStr for Alphabet {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidAlphabet {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut symbols = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let chars: Vec<char> = part.chars().collect();
            match chars.as_slice() {
                [start, '-', end] => {
                    if start > end {
                        return Err(invalid("range start is after range end"));
                    }
                    symbols.extend(*start..=*end);
                }
                _ if chars.contains(&'-') => {
                    return Err(invalid("ranges must look like 'a-z'"));
                }
                _ => symbols.extend(chars),
            }
        }

        let alphabet = Self::new(symbols.into_iter().filter(|c| !c.is_whitespace()));
        if alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        Ok(alphabet)
    }
}

/// When the pipeline stops accepting records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stop once no record has been emitted for the quiet interval
    QuietInterval(Duration),
    /// Stop after the quiet interval or once `limit` records were accepted,
    /// whichever comes first
    QuietIntervalOrLimit { quiet: Duration, limit: usize },
}

impl Termination {
    pub fn quiet_interval(&self) -> Duration {
        match self {
            Termination::QuietInterval(quiet) => *quiet,
            Termination::QuietIntervalOrLimit { quiet, .. } => *quiet,
        }
    }

    pub fn record_limit(&self) -> Option<usize> {
        match self {
            Termination::QuietInterval(_) => None,
            Termination::QuietIntervalOrLimit { limit, .. } => Some(*limit),
        }
    }
}

/// Validated configuration for a crawl
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub(crate) index_url: String,
    pub(crate) alphabet: Alphabet,
    pub(crate) termination: Termination,
    pub(crate) cache_capacity: usize,
    pub(crate) max_in_flight: Option<usize>,
    pub(crate) link_filter: LinkFilter,
    pub(crate) entry_rule: EntryRule,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            alphabet: Alphabet::latin(),
            termination: Termination::QuietInterval(DEFAULT_QUIET_INTERVAL),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_in_flight: None,
            link_filter: LinkFilter::default(),
            entry_rule: EntryRule::default(),
        }
    }
}

impl CrawlConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.index_url.contains("{}") {
            return Err(ConfigError::MissingPlaceholder(self.index_url.clone()));
        }
        if self.alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        if self.termination.quiet_interval().is_zero() {
            return Err(ConfigError::InvalidQuietInterval);
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity(0));
        }
        if let Some(0) = self.termination.record_limit() {
            return Err(ConfigError::InvalidRecordLimit(0));
        }
        if let Some(0) = self.max_in_flight {
            return Err(ConfigError::InvalidMaxInFlight(0));
        }
        self.entry_rule.validate()
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }
}
