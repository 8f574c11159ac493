//! Entry page extraction rule
//!
//! Turns the body of an entry page into a [`FetchOutcome`]. The headword is
//! read from the primary field, then the fallback field; a page with neither
//! is unresolved. Every part-of-speech label on the page contributes to the
//! record's attributes.
//!
//! ```ignore
//! use wordcrawl::{EntryRule, Link};
//!
//! let rule = EntryRule::default();
//! let outcome = rule.outcome(&Link::from("https://example.com/run"), &body);
//! ```

use crate::backend::{ElementRef, selector_is_valid};
use crate::error::{ConfigError, ExtractionError};
use crate::record::{Attributes, FetchOutcome, Link, Record};

pub const DEFAULT_SCOPE_SELECTOR: &str = "article#page-content";
pub const DEFAULT_HEADWORD_SELECTOR: &str = ".hw.dhw";
pub const DEFAULT_FALLBACK_HEADWORD_SELECTOR: &str = ".headword";
pub const DEFAULT_LABEL_SELECTOR: &str = "span.pos.dpos";

/// Selectors used to read a record from an entry page
#[derive(Debug, Clone)]
pub struct EntryRule {
    scope: String,
    headword: String,
    fallback_headword: String,
    label: String,
}

impl Default for EntryRule {
    fn default() -> Self {
        Self {
            scope: DEFAULT_SCOPE_SELECTOR.to_string(),
            headword: DEFAULT_HEADWORD_SELECTOR.to_string(),
            fallback_headword: DEFAULT_FALLBACK_HEADWORD_SELECTOR.to_string(),
            label: DEFAULT_LABEL_SELECTOR.to_string(),
        }
    }
}

impl EntryRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element containing the entry (default: `article#page-content`)
    pub fn scope(mut self, selector: impl Into<String>) -> Self {
        self.scope = selector.into();
        self
    }

    /// Primary headword field (default: `.hw.dhw`)
    pub fn headword(mut self, selector: impl Into<String>) -> Self {
        self.headword = selector.into();
        self
    }

    /// Headword field consulted when the primary one is absent (default: `.headword`)
    pub fn fallback_headword(mut self, selector: impl Into<String>) -> Self {
        self.fallback_headword = selector.into();
        self
    }

    /// Part-of-speech label markers (default: `span.pos.dpos`)
    pub fn label(mut self, selector: impl Into<String>) -> Self {
        self.label = selector.into();
        self
    }

    /// Check that every selector parses
    pub fn validate(&self) -> Result<(), ConfigError> {
        for selector in [
            &self.scope,
            &self.headword,
            &self.fallback_headword,
            &self.label,
        ] {
            selector_is_valid(selector).map_err(|error| ConfigError::InvalidSelector {
                selector: selector.clone(),
                error,
            })?;
        }
        Ok(())
    }

    /// Extract a record from the page scope element
    ///
    /// A headword made only of whitespace counts as absent.
    pub fn extract<E>(&self, page: &E) -> Result<Record, ExtractionError>
    where
        E: ElementRef,
    {
        let scope = page
            .select_one(&self.scope)
            .ok_or_else(|| ExtractionError::MissingField {
                field: "entry".to_string(),
                selector: self.scope.clone(),
            })?;

        let key = first_text(&scope, &self.headword)
            .or_else(|| first_text(&scope, &self.fallback_headword))
            .ok_or_else(|| ExtractionError::MissingField {
                field: "headword".to_string(),
                selector: format!("{}, {}", self.headword, self.fallback_headword),
            })?;

        let attributes = Attributes::from_labels(scope.child_texts(&self.label));

        Ok(Record::new(key, attributes))
    }

    /// Parse an entry page body and classify the result
    pub fn outcome(&self, link: &Link, body: &str) -> FetchOutcome {
        let document = scraper::Html::parse_document(body);
        match self.extract(&document.root_element()) {
            Ok(record) => FetchOutcome::Resolved(record),
            Err(error) => {
                tracing::debug!(link = %link, %error, "entry page unresolved");
                FetchOutcome::Unresolved(link.clone())
            }
        }
    }
}

fn first_text<E: ElementRef>(scope: &E, selector: &str) -> Option<String> {
    scope
        .select_one(selector)
        .map(|elem| elem.text().trim().to_string())
        .filter(|text| !text.is_empty())
}
