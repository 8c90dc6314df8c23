use std::collections::{HashSet, VecDeque};

use crate::view_model::{ResultsBanner, SearchSnapshot};
use crate::{ChannelRef, Generation, ItemStub, MatchedItem, PageCursor, SearchFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    FetchingPage,
    CheckingItems,
    /// A page is exhausted and more pages exist; waits for a resume.
    BatchComplete,
    Completed,
    Cancelled,
    Failed,
}

impl SearchStatus {
    /// A page fetch or transcript lookup is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, SearchStatus::FetchingPage | SearchStatus::CheckingItems)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlightItem {
    order: u32,
    item: ItemStub,
}

/// One cue search over one channel. Replaced wholesale by every fresh search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchSession {
    generation: Generation,
    query: String,
    channel_id: String,
    status: SearchStatus,
    results: Vec<MatchedItem>,
    seen_item_ids: HashSet<String>,
    cursor: Option<PageCursor>,
    has_more: bool,
    pending: VecDeque<ItemStub>,
    in_flight: Option<InFlightItem>,
    next_order: u32,
    failure: Option<SearchFailure>,
    batches: u32,
}

impl SearchSession {
    /// An empty session that has not been started.
    pub(crate) fn idle(generation: Generation) -> Self {
        Self {
            generation,
            has_more: true,
            ..Self::default()
        }
    }

    /// A fresh session about to fetch its first page.
    pub(crate) fn begin(generation: Generation, query: String, channel_id: String) -> Self {
        Self {
            generation,
            query,
            channel_id,
            status: SearchStatus::FetchingPage,
            has_more: true,
            ..Self::default()
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn results(&self) -> &[MatchedItem] {
        &self.results
    }

    pub fn has_seen(&self, item_id: &str) -> bool {
        self.seen_item_ids.contains(item_id)
    }

    pub fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn failure(&self) -> Option<&SearchFailure> {
        self.failure.as_ref()
    }

    pub fn batches(&self) -> u32 {
        self.batches
    }

    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub(crate) fn can_resume(&self, channel_id: &str, query: &str) -> bool {
        self.status == SearchStatus::BatchComplete
            && self.channel_id == channel_id
            && self.query == query
    }

    pub(crate) fn resume(&mut self) {
        self.status = SearchStatus::FetchingPage;
    }

    pub(crate) fn load_page(&mut self, items: Vec<ItemStub>, next_cursor: Option<PageCursor>) {
        self.has_more = next_cursor.is_some();
        self.cursor = next_cursor;
        self.pending = items.into();
        self.next_order = 1;
        self.status = SearchStatus::CheckingItems;
    }

    /// Moves the next pending item in flight and returns its 1-based order
    /// within the page together with its id.
    pub(crate) fn next_item(&mut self) -> Option<(u32, String)> {
        let item = self.pending.pop_front()?;
        let order = self.next_order;
        self.next_order += 1;
        let item_id = item.item_id.clone();
        self.in_flight = Some(InFlightItem { order, item });
        Some((order, item_id))
    }

    /// Takes the in-flight item if it is `item_id`.
    pub(crate) fn take_in_flight(&mut self, item_id: &str) -> Option<(u32, ItemStub)> {
        if self.in_flight.as_ref()?.item.item_id != item_id {
            return None;
        }
        self.in_flight.take().map(|f| (f.order, f.item))
    }

    /// Appends a match unless the item was already recorded. Returns whether
    /// it was appended.
    pub(crate) fn record_match(&mut self, item: ItemStub, snippet: Option<String>) -> bool {
        if !self.seen_item_ids.insert(item.item_id.clone()) {
            return false;
        }
        self.results.push(MatchedItem { item, snippet });
        true
    }

    pub(crate) fn finish_batch(&mut self) {
        self.in_flight = None;
        self.batches += 1;
        self.status = if self.has_more {
            SearchStatus::BatchComplete
        } else {
            SearchStatus::Completed
        };
    }

    pub(crate) fn fail(&mut self, failure: SearchFailure) {
        self.halt(SearchStatus::Failed);
        self.failure = Some(failure);
    }

    pub(crate) fn cancel(&mut self) {
        self.halt(SearchStatus::Cancelled);
    }

    fn halt(&mut self, status: SearchStatus) {
        self.pending.clear();
        self.in_flight = None;
        self.status = status;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    channel: Option<ChannelRef>,
    cue: String,
    session: SearchSession,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            session: SearchSession::idle(0),
            ..Self::default()
        }
    }

    pub fn channel(&self) -> Option<&ChannelRef> {
        self.channel.as_ref()
    }

    pub fn cue(&self) -> &str {
        &self.cue
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn view(&self) -> SearchSnapshot {
        let session = &self.session;
        SearchSnapshot {
            generation: session.generation,
            status: session.status,
            query: session.query.clone(),
            channel_id: session.channel_id.clone(),
            results: session.results.clone(),
            has_more: session.has_more,
            failure: session.failure.clone(),
            batches: session.batches,
            banner: ResultsBanner::derive(session.status, session.results.len()),
        }
    }

    /// Returns whether anything observable changed since the last call, and
    /// clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_channel(&mut self, channel: Option<ChannelRef>) {
        self.channel = channel;
    }

    pub(crate) fn set_cue(&mut self, cue: String) {
        self.cue = cue;
    }

    pub(crate) fn session_mut(&mut self) -> &mut SearchSession {
        &mut self.session
    }

    pub(crate) fn replace_session(&mut self, session: SearchSession) {
        self.session = session;
        self.dirty = true;
    }
}
