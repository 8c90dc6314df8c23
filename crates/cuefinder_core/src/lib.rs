//! Cuefinder core: pure search session state machine, transcript matcher and
//! view-model helpers.
mod effect;
mod matcher;
mod msg;
mod state;
mod types;
mod update;
mod view_model;

pub use effect::Effect;
pub use matcher::{match_transcript, normalize, TextMatch, HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN};
pub use msg::Msg;
pub use state::{AppState, SearchSession, SearchStatus};
pub use types::{
    ChannelRef, FailureKind, Generation, ItemStub, MatchResult, MatchedItem, PageCursor,
    SearchFailure,
};
pub use update::update;
pub use view_model::{ResultsBanner, SearchSnapshot};
