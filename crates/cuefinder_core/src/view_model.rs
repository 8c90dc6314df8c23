use crate::{Generation, MatchedItem, SearchFailure, SearchStatus};

/// What the results area should tell the user alongside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultsBanner {
    #[default]
    Idle,
    Searching,
    /// Paused with matches; offer to keep searching.
    ContinueAvailable,
    /// Paused with no matches yet; offer to keep searching.
    NoMatchesYet,
    /// Every item was checked and at least one matched.
    AllSearched,
    /// Every item was checked and none matched.
    NothingFound,
    Failed,
    Cancelled,
}

impl ResultsBanner {
    pub fn derive(status: SearchStatus, result_count: usize) -> Self {
        match status {
            SearchStatus::Idle => ResultsBanner::Idle,
            SearchStatus::FetchingPage | SearchStatus::CheckingItems => ResultsBanner::Searching,
            SearchStatus::BatchComplete if result_count == 0 => ResultsBanner::NoMatchesYet,
            SearchStatus::BatchComplete => ResultsBanner::ContinueAvailable,
            SearchStatus::Completed if result_count == 0 => ResultsBanner::NothingFound,
            SearchStatus::Completed => ResultsBanner::AllSearched,
            SearchStatus::Failed => ResultsBanner::Failed,
            SearchStatus::Cancelled => ResultsBanner::Cancelled,
        }
    }

    pub fn can_continue(self) -> bool {
        matches!(
            self,
            ResultsBanner::ContinueAvailable | ResultsBanner::NoMatchesYet
        )
    }
}

/// Read-only view of the current search handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchSnapshot {
    pub generation: Generation,
    pub status: SearchStatus,
    pub query: String,
    pub channel_id: String,
    pub results: Vec<MatchedItem>,
    pub has_more: bool,
    pub failure: Option<SearchFailure>,
    pub batches: u32,
    pub banner: ResultsBanner,
}

impl SearchSnapshot {
    pub fn is_searching(&self) -> bool {
        self.status.is_in_flight()
    }
}
