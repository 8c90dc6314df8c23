use crate::{AppState, Effect, Generation, Msg, SearchFailure, SearchSession, SearchStatus};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages produced by asynchronous steps carry the generation they were
/// issued under; anything from an older generation, or arriving after the
/// session left the matching status, is dropped without touching state.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ChannelSelected(channel) => {
            if state.channel().is_some_and(|current| current.id == channel.id) {
                state.set_channel(Some(channel));
                Vec::new()
            } else {
                let effects = teardown(&mut state);
                state.set_channel(Some(channel));
                effects
            }
        }
        Msg::ChannelCleared => {
            let effects = teardown(&mut state);
            state.set_channel(None);
            state.set_cue(String::new());
            effects
        }
        Msg::CueChanged(cue) => {
            state.set_cue(cue);
            Vec::new()
        }
        Msg::SearchRequested { resume } => start_search(&mut state, resume),
        Msg::CancelRequested => {
            let session = state.session();
            if session.status().is_in_flight() || session.status() == SearchStatus::BatchComplete
            {
                cancel(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::Unmounted => {
            if state.session().status().is_in_flight() {
                cancel(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::PageLoaded {
            generation,
            items,
            next_cursor,
        } => {
            if !accepts(&state, generation, SearchStatus::FetchingPage) {
                return (state, Vec::new());
            }
            state.session_mut().load_page(items, next_cursor);
            state.mark_dirty();
            advance(&mut state)
        }
        Msg::PageFailed {
            generation,
            failure,
        } => {
            if !accepts(&state, generation, SearchStatus::FetchingPage) {
                return (state, Vec::new());
            }
            fail(&mut state, failure)
        }
        Msg::ItemChecked {
            generation,
            item_id,
            result,
        } => {
            if !accepts(&state, generation, SearchStatus::CheckingItems) {
                return (state, Vec::new());
            }
            let Some((_order, item)) = state.session_mut().take_in_flight(&item_id) else {
                return (state, Vec::new());
            };
            match result {
                Ok(found) if found.matched => {
                    if state.session_mut().record_match(item, found.snippet) {
                        state.mark_dirty();
                    }
                    advance(&mut state)
                }
                Ok(_) => advance(&mut state),
                Err(failure) if failure.is_transient() => advance(&mut state),
                Err(failure) => fail(&mut state, failure),
            }
        }
        Msg::StepCancelled { generation } => {
            let session = state.session();
            if session.is_current(generation) && session.status().is_in_flight() {
                state.session_mut().cancel();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_search(state: &mut AppState, resume: bool) -> Vec<Effect> {
    let query = state.cue().trim().to_string();
    let Some(channel_id) = state.channel().map(|channel| channel.id.clone()) else {
        return vec![Effect::PromptForInput];
    };
    if query.is_empty() || channel_id.is_empty() {
        return vec![Effect::PromptForInput];
    }

    let session = state.session();
    if resume && session.status().is_in_flight() {
        return Vec::new();
    }

    if resume && session.can_resume(&channel_id, &query) {
        let generation = session.generation();
        let cursor = session.cursor().cloned();
        state.session_mut().resume();
        state.mark_dirty();
        return vec![Effect::FetchPage {
            generation,
            channel_id,
            cursor,
        }];
    }

    // Fresh search: a new session under a new generation supersedes whatever
    // was running, in flight or not.
    let generation = session.generation() + 1;
    state.replace_session(SearchSession::begin(generation, query, channel_id.clone()));
    vec![
        Effect::RenewCancelToken { generation },
        Effect::FetchPage {
            generation,
            channel_id,
            cursor: None,
        },
    ]
}

/// Issues the lookup for the next pending item, or closes the batch.
fn advance(state: &mut AppState) -> Vec<Effect> {
    let session = state.session_mut();
    match session.next_item() {
        Some((order, item_id)) => vec![Effect::CheckTranscript {
            generation: session.generation(),
            item_id,
            query: session.query().to_string(),
            order,
        }],
        None => {
            session.finish_batch();
            state.mark_dirty();
            Vec::new()
        }
    }
}

fn fail(state: &mut AppState, failure: SearchFailure) -> Vec<Effect> {
    state.session_mut().fail(failure.clone());
    state.mark_dirty();
    vec![Effect::ReportFailure { failure }]
}

fn cancel(state: &mut AppState) -> Vec<Effect> {
    let generation = state.session().generation();
    state.session_mut().cancel();
    state.mark_dirty();
    vec![Effect::CancelSearch { generation }]
}

/// Cancels anything in flight and replaces the session with an empty one.
fn teardown(state: &mut AppState) -> Vec<Effect> {
    let previous = state.session();
    let generation: Generation = previous.generation();
    let effects = if previous.status().is_in_flight() {
        vec![Effect::CancelSearch { generation }]
    } else {
        Vec::new()
    };
    state.replace_session(SearchSession::idle(generation + 1));
    effects
}

fn accepts(state: &AppState, generation: Generation, expected: SearchStatus) -> bool {
    let session = state.session();
    session.is_current(generation) && session.status() == expected
}
