use std::fmt;

use cuefinder_core::{FailureKind, ItemStub, PageCursor, SearchFailure};

/// One page from the item-listing service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemPage {
    pub items: Vec<ItemStub>,
    pub next_cursor: Option<PageCursor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError {
    pub kind: CollaboratorErrorKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(kind: CollaboratorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(CollaboratorErrorKind::Cancelled, "cancelled")
    }

    /// Converts a real failure into the session's failure type. Returns
    /// `None` for cancellation, which is never a failure.
    pub fn into_failure(self) -> Option<SearchFailure> {
        let kind = match self.kind {
            CollaboratorErrorKind::Cancelled => return None,
            CollaboratorErrorKind::Transient => FailureKind::Transient,
            CollaboratorErrorKind::Fatal => FailureKind::FatalBackend,
            CollaboratorErrorKind::Unknown => FailureKind::Unknown,
        };
        Some(SearchFailure::new(kind, self.message))
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CollaboratorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorErrorKind {
    /// The caller's cancellation token fired.
    Cancelled,
    /// This one request failed; others may succeed.
    Transient,
    /// The service is unreachable or erroring.
    Fatal,
    /// The response could not be understood.
    Unknown,
}

impl fmt::Display for CollaboratorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorErrorKind::Cancelled => write!(f, "cancelled"),
            CollaboratorErrorKind::Transient => write!(f, "transient failure"),
            CollaboratorErrorKind::Fatal => write!(f, "service failure"),
            CollaboratorErrorKind::Unknown => write!(f, "unexpected response"),
        }
    }
}
