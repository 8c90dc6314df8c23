use std::fmt;

pub type Generation = u64;

/// A resolved content channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
}

/// One listed content item, as returned by the item-listing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStub {
    pub item_id: String,
    pub title: String,
    pub published_at: String,
    pub thumbnail_url: Option<String>,
}

/// Opaque pagination token. Only ever handed back to the listing call that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of checking one item's transcript for the cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub item_id: String,
    pub matched: bool,
    pub snippet: Option<String>,
}

impl MatchResult {
    pub fn no_match(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            matched: false,
            snippet: None,
        }
    }

    pub fn matched(item_id: impl Into<String>, snippet: Option<String>) -> Self {
        Self {
            item_id: item_id.into(),
            matched: true,
            snippet,
        }
    }
}

/// An item whose transcript contains the cue, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedItem {
    pub item: ItemStub,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// One item could not be checked; the search carries on.
    Transient,
    /// A backend is unreachable or erroring; the search stops.
    FatalBackend,
    /// Anything unexpected; the search stops.
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "item unavailable"),
            FailureKind::FatalBackend => write!(f, "backend failure"),
            FailureKind::Unknown => write!(f, "unexpected failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SearchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
