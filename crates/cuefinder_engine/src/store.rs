//! Session store: owns the search state, runs the effects the state machine
//! asks for, and notifies observers whenever something observable changes.
//!
//! All state changes go through [`cuefinder_core::update`]. The store's lock
//! is never held across an `.await`; an asynchronous step always re-enters the
//! state machine with the generation it was issued under, so a step that
//! outlives its session cannot change anything.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use cuefinder_core::{
    update, AppState, ChannelRef, Effect, Generation, Msg, PageCursor, SearchFailure,
    SearchSnapshot, SearchStatus,
};
use cuefinder_logging::{search_debug, search_error, search_info, search_warn, with_generation};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{CollaboratorError, ItemPageFetcher, ServiceSettings, TranscriptLookup};
use crate::{ReqwestPageFetcher, ReqwestTranscriptClient};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("choose a channel and enter the cue text first")]
    InputInvalid,
    #[error("search stopped: {0}")]
    Failed(SearchFailure),
}

/// Receives store notifications. Called outside the store's lock, on the
/// task that caused the change.
pub trait SearchObserver: Send + Sync {
    fn on_change(&self, snapshot: &SearchSnapshot);

    /// A search stopped on a fatal or unknown failure. Called once per
    /// failure.
    fn on_failure(&self, _failure: &SearchFailure) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Changed(SearchSnapshot),
    Failed(SearchFailure),
}

/// Forwards notifications into a channel.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StoreEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<StoreEvent>) -> Self {
        Self { tx }
    }
}

impl SearchObserver for ChannelObserver {
    fn on_change(&self, snapshot: &SearchSnapshot) {
        let _ = self.tx.send(StoreEvent::Changed(snapshot.clone()));
    }

    fn on_failure(&self, failure: &SearchFailure) {
        let _ = self.tx.send(StoreEvent::Failed(failure.clone()));
    }
}

struct Shared {
    state: AppState,
    cancel: CancellationToken,
    cancel_generation: Generation,
    observers: BTreeMap<u64, Arc<dyn SearchObserver>>,
    next_observer_id: u64,
}

/// Observer registration; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    shared: Weak<Mutex<Shared>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared).observers.remove(&self.id);
        }
    }
}

/// Handle to the single search slot of one UI surface. Clones share the slot.
#[derive(Clone)]
pub struct SearchStore {
    shared: Arc<Mutex<Shared>>,
    pages: Arc<dyn ItemPageFetcher>,
    transcripts: Arc<dyn TranscriptLookup>,
}

impl SearchStore {
    pub fn new(pages: Arc<dyn ItemPageFetcher>, transcripts: Arc<dyn TranscriptLookup>) -> Self {
        let shared = Shared {
            state: AppState::new(),
            cancel: CancellationToken::new(),
            cancel_generation: 0,
            observers: BTreeMap::new(),
            next_observer_id: 1,
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
            pages,
            transcripts,
        }
    }

    /// Store backed by the HTTP collaborators.
    pub fn from_settings(settings: ServiceSettings) -> Result<Self, CollaboratorError> {
        let pages = ReqwestPageFetcher::new(settings.clone())?;
        let transcripts = ReqwestTranscriptClient::new(settings)?;
        Ok(Self::new(Arc::new(pages), Arc::new(transcripts)))
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        lock(&self.shared).state.view()
    }

    pub fn subscribe(&self, observer: Arc<dyn SearchObserver>) -> Subscription {
        let mut shared = lock(&self.shared);
        let id = shared.next_observer_id;
        shared.next_observer_id += 1;
        shared.observers.insert(id, observer);
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.shared).observers.len()
    }

    pub fn select_channel(&self, channel: ChannelRef) {
        self.dispatch_control(Msg::ChannelSelected(channel));
    }

    pub fn clear_channel(&self) {
        self.dispatch_control(Msg::ChannelCleared);
    }

    pub fn set_cue(&self, cue: impl Into<String>) {
        self.dispatch_control(Msg::CueChanged(cue.into()));
    }

    /// Cancels the running or paused search. Steps already in flight are
    /// aborted and whatever they return later is discarded.
    pub fn cancel(&self) {
        self.dispatch_control(Msg::CancelRequested);
    }

    /// The hosting view went away; cancels only a search that is in flight.
    pub fn unmount(&self) {
        self.dispatch_control(Msg::Unmounted);
    }

    /// Runs one batch: fetches a page and checks its items one at a time.
    ///
    /// With `resume` set, continues a paused search from its stored cursor.
    /// Returns the status the batch ended in; a search that was cancelled or
    /// superseded while running ends in `Ok(SearchStatus::Cancelled)`.
    pub async fn start(&self, resume: bool) -> Result<SearchStatus, SearchError> {
        let effects = self.dispatch(Msg::SearchRequested { resume });
        if effects.contains(&Effect::PromptForInput) {
            return Err(SearchError::InputInvalid);
        }

        let generation = self.snapshot().generation;
        with_generation(generation, || {
            search_info!("{} search batch", if resume { "resuming" } else { "starting" });
        });

        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let Some(work) = self.apply_control(effect) else {
                continue;
            };
            if let Some(msg) = self.run_step(work).await {
                queue.extend(self.dispatch(msg));
            }
        }

        let snapshot = self.snapshot();
        if snapshot.generation != generation {
            with_generation(generation, || search_info!("superseded by a newer search"));
            return Ok(SearchStatus::Cancelled);
        }
        with_generation(generation, || {
            search_info!(
                "batch ended as {:?} with {} matches (more: {})",
                snapshot.status,
                snapshot.results.len(),
                snapshot.has_more
            );
        });
        match (snapshot.status, snapshot.failure) {
            (SearchStatus::Failed, Some(failure)) => Err(SearchError::Failed(failure)),
            (status, _) => Ok(status),
        }
    }

    /// Applies a message and notifies observers if anything observable
    /// changed.
    fn dispatch(&self, msg: Msg) -> Vec<Effect> {
        let (effects, notification) = {
            let mut shared = lock(&self.shared);
            let state = std::mem::take(&mut shared.state);
            let (mut state, effects) = update(state, msg);
            let notification = state.consume_dirty().then(|| {
                let observers: Vec<_> = shared.observers.values().cloned().collect();
                (state.view(), observers)
            });
            shared.state = state;
            (effects, notification)
        };

        if let Some((snapshot, observers)) = notification {
            for observer in observers {
                observer.on_change(&snapshot);
            }
        }
        effects
    }

    /// Dispatches a user action that can only yield synchronous effects.
    fn dispatch_control(&self, msg: Msg) {
        for effect in self.dispatch(msg) {
            if let Some(work) = self.apply_control(effect) {
                search_warn!("dropping unexpected step outside a search: {:?}", work);
            }
        }
    }

    /// Handles token bookkeeping and failure reports in place. Returns the
    /// effect back if it needs to suspend.
    fn apply_control(&self, effect: Effect) -> Option<Effect> {
        match effect {
            Effect::PromptForInput => None,
            Effect::RenewCancelToken { generation } => {
                let mut shared = lock(&self.shared);
                shared.cancel.cancel();
                shared.cancel = CancellationToken::new();
                shared.cancel_generation = generation;
                None
            }
            Effect::CancelSearch { generation } => {
                let shared = lock(&self.shared);
                if shared.cancel_generation == generation {
                    shared.cancel.cancel();
                }
                with_generation(generation, || search_info!("search cancelled"));
                None
            }
            Effect::ReportFailure { failure } => {
                search_error!("search stopped: {}", failure);
                let observers: Vec<_> = lock(&self.shared).observers.values().cloned().collect();
                for observer in observers {
                    observer.on_failure(&failure);
                }
                None
            }
            work @ (Effect::FetchPage { .. } | Effect::CheckTranscript { .. }) => Some(work),
        }
    }

    /// The token for `generation`, or an already-cancelled one if that
    /// generation no longer owns the live token.
    fn token_for(&self, generation: Generation) -> CancellationToken {
        let shared = lock(&self.shared);
        if shared.cancel_generation == generation {
            shared.cancel.clone()
        } else {
            let stale = CancellationToken::new();
            stale.cancel();
            stale
        }
    }

    async fn run_step(&self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::FetchPage {
                generation,
                channel_id,
                cursor,
            } => Some(self.fetch_page(generation, &channel_id, cursor).await),
            Effect::CheckTranscript {
                generation,
                item_id,
                query,
                order,
            } => Some(
                self.check_item(generation, item_id, &query, order)
                    .await,
            ),
            _ => None,
        }
    }

    async fn fetch_page(
        &self,
        generation: Generation,
        channel_id: &str,
        cursor: Option<PageCursor>,
    ) -> Msg {
        let token = self.token_for(generation);
        if token.is_cancelled() {
            return Msg::StepCancelled { generation };
        }
        with_generation(generation, || {
            search_debug!(
                "fetching page for {} (cursor: {})",
                channel_id,
                cursor.as_ref().map_or("<first>", PageCursor::as_str)
            );
        });

        let result = until_cancelled(
            &token,
            self.pages.list_page(channel_id, cursor.as_ref(), &token),
        )
        .await;
        match result {
            Ok(page) => Msg::PageLoaded {
                generation,
                items: page.items,
                next_cursor: page.next_cursor,
            },
            Err(err) => match err.into_failure() {
                Some(failure) => Msg::PageFailed {
                    generation,
                    failure,
                },
                None => Msg::StepCancelled { generation },
            },
        }
    }

    async fn check_item(
        &self,
        generation: Generation,
        item_id: String,
        query: &str,
        order: u32,
    ) -> Msg {
        let token = self.token_for(generation);
        if token.is_cancelled() {
            return Msg::StepCancelled { generation };
        }

        let result = until_cancelled(
            &token,
            self.transcripts
                .check_transcript(&item_id, query, order, &token),
        )
        .await;
        let result = match result {
            Ok(found) => {
                if found.matched {
                    with_generation(generation, || {
                        search_info!("match in item {} (order {})", item_id, order);
                    });
                }
                Ok(found)
            }
            Err(err) => match err.into_failure() {
                Some(failure) => {
                    if failure.is_transient() {
                        with_generation(generation, || {
                            search_warn!("skipping item {} (order {}): {}", item_id, order, failure);
                        });
                    }
                    Err(failure)
                }
                None => return Msg::StepCancelled { generation },
            },
        };
        Msg::ItemChecked {
            generation,
            item_id,
            result,
        }
    }
}

/// Races a collaborator call against its token so a call that ignores
/// cancellation still cannot hold the search up.
async fn until_cancelled<T>(
    token: &CancellationToken,
    call: impl Future<Output = Result<T, CollaboratorError>>,
) -> Result<T, CollaboratorError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CollaboratorError::cancelled()),
        result = call => result,
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
