use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Context};
use cuefinder_core::{ChannelRef, Generation, SearchFailure, SearchSnapshot, SearchStatus};
use cuefinder_engine::{
    ChannelResolver, ReqwestChannelResolver, Resolution, SearchError, SearchObserver,
    SearchStore, ServiceSettings,
};
use cuefinder_logging::search_info;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::render;

pub struct SearchArgs {
    pub channel: String,
    pub cue: String,
    pub color: bool,
    /// Keep fetching batches without asking.
    pub all: bool,
}

/// How a search run ended, for the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Failed,
}

/// Where user-facing text goes.
pub trait Console: Send + Sync {
    fn out(&self, line: &str);
    fn err(&self, line: &str);
    /// Text that waits on the same line for an answer.
    fn prompt(&self, text: &str);
}

pub struct Stdio;

impl Console for Stdio {
    fn out(&self, line: &str) {
        println!("{line}");
    }

    fn err(&self, line: &str) {
        eprintln!("{line}");
    }

    fn prompt(&self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Prints each match once, as soon as the store reports it, and the one
/// failure notice of a stopped search.
struct ResultPrinter {
    console: Arc<dyn Console>,
    color: bool,
    printed: Mutex<(Generation, usize)>,
}

impl SearchObserver for ResultPrinter {
    fn on_change(&self, snapshot: &SearchSnapshot) {
        let mut printed = self.printed.lock().unwrap_or_else(PoisonError::into_inner);
        if printed.0 != snapshot.generation {
            *printed = (snapshot.generation, 0);
        }
        for (index, found) in snapshot.results.iter().enumerate().skip(printed.1) {
            self.console
                .out(&render::result_line(index + 1, found, self.color));
        }
        printed.1 = snapshot.results.len();
    }

    fn on_failure(&self, failure: &SearchFailure) {
        self.console.err(&render::failure_message(failure));
    }
}

pub async fn run(services: ServiceSettings, args: SearchArgs) -> anyhow::Result<Outcome> {
    let console: Arc<dyn Console> = Arc::new(Stdio);
    let mut answers = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = CancellationToken::new();
    let watcher = watch_interrupts(interrupted.clone());

    let resolver =
        ReqwestChannelResolver::new(services.clone()).context("building channel client")?;
    let resolution = resolver
        .resolve(&args.channel, &interrupted)
        .await
        .with_context(|| format!("resolving channel {}", args.channel))?;
    let Some(channel) =
        choose_channel(resolution, &mut answers, console.as_ref(), &interrupted).await?
    else {
        console.err("No channel selected.");
        watcher.abort();
        return Ok(Outcome::Finished);
    };
    console.out(&format!("Channel: {} ({})", channel.name, channel.id));

    let store = SearchStore::from_settings(services).context("building search clients")?;
    let subscription = store.subscribe(Arc::new(ResultPrinter {
        console: console.clone(),
        color: args.color,
        printed: Mutex::new((0, 0)),
    }));
    let canceller = tokio::spawn({
        let store = store.clone();
        let interrupted = interrupted.clone();
        async move {
            interrupted.cancelled().await;
            store.cancel();
        }
    });

    store.select_channel(channel);
    store.set_cue(args.cue.as_str());
    let outcome = search_loop(
        &store,
        args.all,
        &mut answers,
        console.as_ref(),
        &interrupted,
    )
    .await;

    canceller.abort();
    watcher.abort();
    store.unmount();
    drop(subscription);
    outcome
}

/// The first Ctrl-C cancels whatever is running; a second one exits.
fn watch_interrupts(interrupted: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        search_info!("interrupted");
        interrupted.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    })
}

async fn choose_channel<R: AsyncBufRead + Unpin>(
    resolution: Resolution,
    answers: &mut Lines<R>,
    console: &dyn Console,
    interrupted: &CancellationToken,
) -> anyhow::Result<Option<ChannelRef>> {
    let mut candidates = match resolution {
        Resolution::Resolved(channel) => return Ok(Some(channel)),
        Resolution::Candidates(candidates) => candidates,
    };
    if candidates.len() == 1 {
        return Ok(candidates.pop());
    }

    for (index, channel) in candidates.iter().enumerate() {
        console.out(&render::candidate_line(index + 1, channel));
    }
    console.prompt(&format!("Pick a channel [1-{}]: ", candidates.len()));
    let picked = read_answer(answers, interrupted)
        .await?
        .and_then(|answer| answer.trim().parse::<usize>().ok())
        .filter(|&n| (1..=candidates.len()).contains(&n));
    Ok(picked.map(|n| candidates.swap_remove(n - 1)))
}

async fn search_loop<R: AsyncBufRead + Unpin>(
    store: &SearchStore,
    all: bool,
    answers: &mut Lines<R>,
    console: &dyn Console,
    interrupted: &CancellationToken,
) -> anyhow::Result<Outcome> {
    let mut resume = false;
    loop {
        let status = match store.start(resume).await {
            Ok(status) => status,
            Err(SearchError::InputInvalid) => bail!("both a channel and a cue are required"),
            // Already reported to the user by the observer.
            Err(SearchError::Failed(_)) => return Ok(Outcome::Failed),
        };

        let snapshot = store.snapshot();
        if let Some(message) = render::banner_message(&snapshot) {
            console.out(&message);
        }
        if status != SearchStatus::BatchComplete || !snapshot.banner.can_continue() {
            return Ok(Outcome::Finished);
        }
        if !all {
            console.prompt("Search the next batch? [y/N] ");
            let answer = read_answer(answers, interrupted).await?;
            if !matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")) {
                return Ok(Outcome::Finished);
            }
        }
        resume = true;
    }
}

/// Next line of input, or `None` at end of input or on interrupt.
async fn read_answer<R: AsyncBufRead + Unpin>(
    answers: &mut Lines<R>,
    interrupted: &CancellationToken,
) -> anyhow::Result<Option<String>> {
    tokio::select! {
        line = answers.next_line() => line.context("reading answer"),
        _ = interrupted.cancelled() => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    use cuefinder_core::{ChannelRef, ItemStub, MatchResult, PageCursor, SearchStatus};
    use cuefinder_engine::{
        CollaboratorError, CollaboratorErrorKind, ItemPage, ItemPageFetcher, Resolution,
        SearchStore, Subscription, TranscriptLookup,
    };
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncBufReadExt, BufReader, Lines};
    use tokio_util::sync::CancellationToken;

    use super::{choose_channel, search_loop, Console, Outcome, ResultPrinter};

    #[derive(Default)]
    struct RecordingConsole {
        out: Mutex<Vec<String>>,
        err: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Console for RecordingConsole {
        fn out(&self, line: &str) {
            self.out.lock().unwrap().push(line.to_string());
        }

        fn err(&self, line: &str) {
            self.err.lock().unwrap().push(line.to_string());
        }

        fn prompt(&self, text: &str) {
            self.prompts.lock().unwrap().push(text.to_string());
        }
    }

    /// Pages chained by cursor: page `n` is requested with cursor `p{n}`.
    struct Pages(Vec<Vec<&'static str>>);

    #[async_trait::async_trait]
    impl ItemPageFetcher for Pages {
        async fn list_page(
            &self,
            _channel_id: &str,
            cursor: Option<&PageCursor>,
            _cancel: &CancellationToken,
        ) -> Result<ItemPage, CollaboratorError> {
            let index = cursor
                .and_then(|c| c.as_str().strip_prefix('p'))
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(0);
            let items = self.0[index]
                .iter()
                .map(|id| ItemStub {
                    item_id: id.to_string(),
                    title: format!("Video {id}"),
                    published_at: "2024-05-01T00:00:00Z".to_string(),
                    thumbnail_url: None,
                })
                .collect();
            let next_cursor =
                (index + 1 < self.0.len()).then(|| PageCursor::new(format!("p{}", index + 1)));
            Ok(ItemPage { items, next_cursor })
        }
    }

    struct Transcripts {
        matches: HashSet<&'static str>,
        fatal: HashMap<&'static str, &'static str>,
    }

    #[async_trait::async_trait]
    impl TranscriptLookup for Transcripts {
        async fn check_transcript(
            &self,
            item_id: &str,
            _query: &str,
            _order: u32,
            _cancel: &CancellationToken,
        ) -> Result<MatchResult, CollaboratorError> {
            if let Some(message) = self.fatal.get(item_id) {
                return Err(CollaboratorError::new(CollaboratorErrorKind::Fatal, *message));
            }
            if self.matches.contains(item_id) {
                Ok(MatchResult::matched(item_id, None))
            } else {
                Ok(MatchResult::no_match(item_id))
            }
        }
    }

    fn store_for(
        pages: Pages,
        transcripts: Transcripts,
        console: &Arc<RecordingConsole>,
    ) -> (SearchStore, Subscription) {
        cuefinder_logging::initialize_for_tests();
        let store = SearchStore::new(Arc::new(pages), Arc::new(transcripts));
        let subscription = store.subscribe(Arc::new(ResultPrinter {
            console: console.clone(),
            color: false,
            printed: Mutex::new((0, 0)),
        }));
        store.select_channel(ChannelRef {
            id: "UC1".to_string(),
            ..ChannelRef::default()
        });
        store.set_cue("cue");
        (store, subscription)
    }

    fn answers(input: &'static str) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(input.as_bytes()).lines()
    }

    fn channel(id: &str) -> ChannelRef {
        ChannelRef {
            id: id.to_string(),
            name: format!("Channel {id}"),
            ..ChannelRef::default()
        }
    }

    #[tokio::test]
    async fn piped_answers_drive_every_batch() {
        let console = Arc::new(RecordingConsole::default());
        let (store, _subscription) = store_for(
            Pages(vec![vec!["1", "2"], vec!["3", "4"], vec!["5", "6"]]),
            Transcripts {
                matches: HashSet::from(["2", "3", "6"]),
                fatal: HashMap::new(),
            },
            &console,
        );

        let outcome = search_loop(
            &store,
            false,
            &mut answers("y\ny\n"),
            console.as_ref(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        assert_eq!(store.snapshot().status, SearchStatus::Completed);
        assert_eq!(console.prompts.lock().unwrap().len(), 2);
        let out = console.out.lock().unwrap();
        assert_eq!(out.iter().filter(|l| l.contains("watch?v=")).count(), 3);
        assert_eq!(
            out.last().map(String::as_str),
            Some("Searched every video: 3 match(es).")
        );
    }

    #[tokio::test]
    async fn declining_stops_after_the_batch() {
        let console = Arc::new(RecordingConsole::default());
        let (store, _subscription) = store_for(
            Pages(vec![vec!["1"], vec!["2"]]),
            Transcripts {
                matches: HashSet::new(),
                fatal: HashMap::new(),
            },
            &console,
        );

        let outcome = search_loop(
            &store,
            false,
            &mut answers("n\ny\n"),
            console.as_ref(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        assert_eq!(store.snapshot().status, SearchStatus::BatchComplete);
    }

    #[tokio::test]
    async fn fatal_failure_is_reported_exactly_once() {
        let console = Arc::new(RecordingConsole::default());
        let (store, _subscription) = store_for(
            Pages(vec![vec!["1", "2", "3"]]),
            Transcripts {
                matches: HashSet::from(["1", "3"]),
                fatal: HashMap::from([("2", "http status 500: boom")]),
            },
            &console,
        );

        let outcome = search_loop(
            &store,
            true,
            &mut answers(""),
            console.as_ref(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(
            *console.err.lock().unwrap(),
            vec!["Search stopped, the service is unavailable: http status 500: boom".to_string()]
        );
        let out = console.out.lock().unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("watch?v=1"));
    }

    #[tokio::test]
    async fn candidates_are_picked_by_number() {
        let console = RecordingConsole::default();
        let picked = choose_channel(
            Resolution::Candidates(vec![channel("a"), channel("b"), channel("c")]),
            &mut answers("2\n"),
            &console,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(picked.map(|c| c.id), Some("b".to_string()));
        assert_eq!(console.out.lock().unwrap().len(), 3);
        assert_eq!(
            *console.prompts.lock().unwrap(),
            vec!["Pick a channel [1-3]: ".to_string()]
        );
    }

    #[tokio::test]
    async fn out_of_range_pick_selects_nothing() {
        let console = RecordingConsole::default();
        let picked = choose_channel(
            Resolution::Candidates(vec![channel("a"), channel("b")]),
            &mut answers("9\n"),
            &console,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(picked, None);
    }

    #[tokio::test]
    async fn single_candidate_is_taken_without_asking() {
        let console = RecordingConsole::default();
        let picked = choose_channel(
            Resolution::Candidates(vec![channel("only")]),
            &mut answers(""),
            &console,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(picked.map(|c| c.id), Some("only".to_string()));
        assert!(console.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn interrupt_ends_a_pending_prompt() {
        let console = RecordingConsole::default();
        let interrupted = CancellationToken::new();
        interrupted.cancel();
        // A reader that never yields a line stands in for an idle terminal.
        let (idle, _keep_open) = tokio::io::duplex(8);
        let mut idle_answers = BufReader::new(idle).lines();

        let picked = choose_channel(
            Resolution::Candidates(vec![channel("a"), channel("b")]),
            &mut idle_answers,
            &console,
            &interrupted,
        )
        .await
        .unwrap();
        assert_eq!(picked, None);
    }
}
