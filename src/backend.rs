//! HTML backend abstraction used by link extraction and entry parsing

/// Trait representing an HTML element that can be queried with CSS selectors
///
/// Link extraction and the entry rule are written against this trait so the
/// crawl logic does not depend on a particular HTML parser.
pub trait ElementRef {
    /// Select the first descendant matching the CSS selector
    ///
    /// Returns `None` if no element matches or if the selector is invalid.
    fn select_one(&self, selector: &str) -> Option<Self>
    where
        Self: Sized;

    /// Select all descendants matching the CSS selector, in document order
    ///
    /// Returns an empty vector if no elements match or if the selector is invalid.
    fn select_all(&self, selector: &str) -> Vec<Self>
    where
        Self: Sized;

    /// Text content of this element, including all descendants
    fn text(&self) -> String;

    /// Value of an HTML attribute
    fn attr(&self, name: &str) -> Option<&str>;

    /// Trimmed text of every descendant matching the selector
    fn child_texts(&self, selector: &str) -> Vec<String>
    where
        Self: Sized,
    {
        self.select_all(selector)
            .iter()
            .map(|elem| elem.text().trim().to_string())
            .collect()
    }
}

impl<'a> ElementRef for scraper::ElementRef<'a> {
    fn select_one(&self, selector: &str) -> Option<Self> {
        let selector = scraper::Selector::parse(selector).ok()?;
        self.select(&selector).next()
    }

    fn select_all(&self, selector: &str) -> Vec<Self> {
        let selector = match scraper::Selector::parse(selector) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        self.select(&selector).collect()
    }

    fn text(&self) -> String {
        scraper::ElementRef::text(self).collect()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}

/// Check that a CSS selector parses
pub(crate) fn selector_is_valid(selector: &str) -> Result<(), String> {
    scraper::Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
