use crate::{ChannelRef, Generation, ItemStub, MatchResult, PageCursor, SearchFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a resolved channel.
    ChannelSelected(ChannelRef),
    /// User reset the channel selection.
    ChannelCleared,
    /// User edited the cue text.
    CueChanged(String),
    /// User asked to search; `resume` continues a paused search.
    SearchRequested { resume: bool },
    /// User clicked Cancel.
    CancelRequested,
    /// The hosting view went away.
    Unmounted,
    /// Listing service returned one page.
    PageLoaded {
        generation: Generation,
        items: Vec<ItemStub>,
        next_cursor: Option<PageCursor>,
    },
    /// Listing service failed (not cancelled).
    PageFailed {
        generation: Generation,
        failure: SearchFailure,
    },
    /// Transcript lookup finished for one item.
    ItemChecked {
        generation: Generation,
        item_id: String,
        result: Result<MatchResult, SearchFailure>,
    },
    /// A suspended step observed cancellation of its token.
    StepCancelled { generation: Generation },
    /// Fallback for placeholder wiring.
    NoOp,
}
