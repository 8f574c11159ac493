//! Link extraction from index pages
//!
//! Index pages come in two roles. An index of indices links to sub-index
//! pages that must be enumerated in turn; an index of entries links to the
//! entry pages themselves. Entry anchors whose part-of-speech label marks an
//! idiom, or whose URL does not have the entry path shape, are dropped.

use regex::Regex;
use url::Url;

use crate::backend::{ElementRef, selector_is_valid};
use crate::error::ConfigError;
use crate::record::Link;

pub const DEFAULT_SUB_INDEX_SELECTOR: &str = "a.dil.tcbd";
pub const DEFAULT_ENTRY_SELECTOR: &str = "a.tc-bd";
pub const DEFAULT_ENTRY_LABEL_SELECTOR: &str = "span.pos";
pub const DEFAULT_IDIOM_PATTERN: &str = "idiom";
pub const DEFAULT_ENTRY_PATH_PATTERN: &str = r"^/dictionary/english/[^/]+/?$";

/// Role a page plays in the index hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRole {
    /// Anchors point to further index pages
    IndexOfIndices,
    /// Anchors point to entry pages
    IndexOfEntries,
}

/// Decides which anchors of an index page become links
#[derive(Debug, Clone)]
pub struct LinkFilter {
    sub_index_selector: String,
    entry_selector: String,
    label_selector: String,
    idiom: Regex,
    entry_path: Regex,
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_SUB_INDEX_SELECTOR,
            DEFAULT_ENTRY_SELECTOR,
            DEFAULT_ENTRY_LABEL_SELECTOR,
            DEFAULT_IDIOM_PATTERN,
            DEFAULT_ENTRY_PATH_PATTERN,
        )
        .expect("default link filter patterns are valid")
    }
}

impl LinkFilter {
    /// Build a filter, validating selectors and compiling patterns
    pub fn new(
        sub_index_selector: &str,
        entry_selector: &str,
        label_selector: &str,
        idiom_pattern: &str,
        entry_path_pattern: &str,
    ) -> Result<Self, ConfigError> {
        for selector in [sub_index_selector, entry_selector, label_selector] {
            selector_is_valid(selector).map_err(|error| ConfigError::InvalidSelector {
                selector: selector.to_string(),
                error,
            })?;
        }

        Ok(Self {
            sub_index_selector: sub_index_selector.to_string(),
            entry_selector: entry_selector.to_string(),
            label_selector: label_selector.to_string(),
            idiom: compile(idiom_pattern)?,
            entry_path: compile(entry_path_pattern)?,
        })
    }

    /// Candidate links of `page` for the given role
    ///
    /// Relative `href`s are resolved against `base`. Anchors without a usable
    /// `href` are skipped.
    pub fn links<'a, E>(
        &'a self,
        page: &E,
        base: &'a Url,
        role: PageRole,
    ) -> impl Iterator<Item = Link> + 'a
    where
        E: ElementRef + 'a,
    {
        let selector = match role {
            PageRole::IndexOfIndices => &self.sub_index_selector,
            PageRole::IndexOfEntries => &self.entry_selector,
        };

        page.select_all(selector)
            .into_iter()
            .filter_map(move |anchor| match role {
                PageRole::IndexOfIndices => resolve(base, &anchor).map(Link::new),
                PageRole::IndexOfEntries => self.entry_link(base, &anchor),
            })
    }

    fn entry_link<E: ElementRef>(&self, base: &Url, anchor: &E) -> Option<Link> {
        let label = anchor.child_texts(&self.label_selector).join(" ");
        if self.idiom.is_match(&label) {
            tracing::trace!(label = %label, "skipping idiom entry");
            return None;
        }

        let url = resolve(base, anchor)?;
        if !self.entry_path.is_match(url.path()) {
            tracing::trace!(url = %url, "skipping link outside entry path");
            return None;
        }

        Some(Link::new(url))
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|error| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        error,
    })
}

fn resolve<E: ElementRef>(base: &Url, anchor: &E) -> Option<Url> {
    let href = anchor.attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

/// Utility for normalizing index URLs before revisit checks
pub struct UrlNormalizer;

impl UrlNormalizer {
    /// Normalize a URL for deduplication
    ///
    /// Removes the fragment and a trailing slash on non-root paths.
    pub fn normalize(url: &str) -> String {
        let mut normalized = url.to_string();

        if let Some(pos) = normalized.find('#') {
            normalized.truncate(pos);
        }

        // A slash right before the query string counts as trailing too.
        if let Some(query_pos) = normalized.find('?') {
            if normalized[..query_pos].ends_with('/')
                && normalized[..query_pos].matches('/').count() > 3
            {
                normalized.remove(query_pos - 1);
            }
        } else if normalized.ends_with('/') && normalized.matches('/').count() > 3 {
            normalized.pop();
        }

        normalized
    }
}
