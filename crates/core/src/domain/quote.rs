use serde::{Deserialize, Serialize};

/// User-supplied text seeding quote generation.
///
/// Stored exactly as typed; [`Keywords::trimmed`] is what reaches the quote service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keywords(pub String);

impl Keywords {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }
}

impl From<&str> for Keywords {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Keywords {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEntry {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl QuoteEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), author: None }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Result of one successful generation. Immutable once received.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteData {
    entries: Vec<QuoteEntry>,
}

impl QuoteData {
    pub fn new(entries: Vec<QuoteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[QuoteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<QuoteEntry> for QuoteData {
    fn from_iter<T: IntoIterator<Item = QuoteEntry>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
