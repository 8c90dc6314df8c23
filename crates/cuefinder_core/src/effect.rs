use crate::{Generation, PageCursor, SearchFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Channel or cue missing; ask the user for them.
    PromptForInput,
    /// Abort whatever token is live and mint a fresh one for `generation`.
    RenewCancelToken { generation: Generation },
    /// Abort the token owned by `generation`.
    CancelSearch { generation: Generation },
    FetchPage {
        generation: Generation,
        channel_id: String,
        cursor: Option<PageCursor>,
    },
    CheckTranscript {
        generation: Generation,
        item_id: String,
        query: String,
        order: u32,
    },
    /// Tell the user once that the search stopped on an error.
    ReportFailure { failure: SearchFailure },
}
