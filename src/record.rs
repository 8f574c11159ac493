//! Records extracted from entry pages
//!
//! A [`Record`] pairs a headword with the grammatical categories observed on
//! its page. Pages that yield no headword become [`FetchOutcome::Unresolved`],
//! so no headword string is reserved as a sentinel.

use std::fmt;

/// An opaque URL identifying one page
///
/// Two links are equal only when their text is identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link(String);

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Link {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Link {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// Grammatical category recorded for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Noun,
    Adjective,
    Verb,
    PhrasalVerb,
    Adverb,
}

impl Attribute {
    /// Every attribute in CSV column order
    ///
    /// The sink header is derived from this order.
    pub const ALL: [Attribute; 5] = [
        Attribute::Noun,
        Attribute::Adjective,
        Attribute::Verb,
        Attribute::PhrasalVerb,
        Attribute::Adverb,
    ];

    /// Map a part-of-speech label to an attribute
    ///
    /// Labels are compared after trimming surrounding whitespace. Anything
    /// not in the table (idioms, prefixes, determiners...) maps to `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "noun" => Some(Attribute::Noun),
            "adjective" => Some(Attribute::Adjective),
            "verb" => Some(Attribute::Verb),
            "phrasal verb" => Some(Attribute::PhrasalVerb),
            "adverb" => Some(Attribute::Adverb),
            _ => None,
        }
    }

    /// Column name used in the CSV header
    pub fn column(self) -> &'static str {
        match self {
            Attribute::Noun => "noun",
            Attribute::Adjective => "adjective",
            Attribute::Verb => "verb",
            Attribute::PhrasalVerb => "phrasal verb",
            Attribute::Adverb => "adverb",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Attribute::Noun => 1,
            Attribute::Adjective => 1 << 1,
            Attribute::Verb => 1 << 2,
            Attribute::PhrasalVerb => 1 << 3,
            Attribute::Adverb => 1 << 4,
        }
    }
}

/// Set of attributes observed for an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Attributes(u8);

impl Attributes {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Build the set from part-of-speech labels, ignoring unknown labels
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .filter_map(|label| Attribute::from_label(label.as_ref()))
            .fold(Self::empty(), |mut set, attr| {
                set.insert(attr);
                set
            })
    }

    pub fn insert(&mut self, attr: Attribute) {
        self.0 |= attr.bit();
    }

    pub fn contains(&self, attr: Attribute) -> bool {
        self.0 & attr.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Observed attributes in column order
    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::ALL
            .into_iter()
            .filter(move |attr| self.contains(*attr))
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut set = Self::empty();
        for attr in iter {
            set.insert(attr);
        }
        set
    }
}

/// Headword and grammatical categories of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub attributes: Attributes,
}

impl Record {
    pub fn new(key: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            key: key.into(),
            attributes,
        }
    }
}

/// Result of visiting one entry page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A headword was found
    Resolved(Record),
    /// Neither headword field was present on the page
    Unresolved(Link),
}

impl FetchOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, FetchOutcome::Resolved(_))
    }
}
