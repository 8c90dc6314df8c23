//! Plain-text rendering of search snapshots for the terminal.

use chrono::DateTime;
use cuefinder_core::{
    ChannelRef, FailureKind, MatchedItem, ResultsBanner, SearchFailure, SearchSnapshot,
    HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN,
};

const EMPHASIS_ON: &str = "\x1b[1;33m";
const EMPHASIS_OFF: &str = "\x1b[0m";

pub fn watch_url(item_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={item_id}")
}

/// `2024-05-01T09:30:00Z` becomes `2024-05-01`; anything unparsable is shown
/// as it came.
pub fn published_date(published_at: &str) -> String {
    DateTime::parse_from_rfc3339(published_at)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| published_at.to_string())
}

/// Swaps the highlight markers for ANSI emphasis, or for brackets when
/// `color` is off.
pub fn highlight(snippet: &str, color: bool) -> String {
    let (open, close) = if color {
        (EMPHASIS_ON, EMPHASIS_OFF)
    } else {
        ("[", "]")
    };
    snippet
        .replace(HIGHLIGHT_OPEN, open)
        .replace(HIGHLIGHT_CLOSE, close)
}

/// One result as printed; `index` is 1-based.
pub fn result_line(index: usize, found: &MatchedItem, color: bool) -> String {
    let item = &found.item;
    let mut line = format!(
        "{index:>3}. {} ({})\n     {}",
        item.title,
        published_date(&item.published_at),
        watch_url(&item.item_id)
    );
    if let Some(snippet) = &found.snippet {
        line.push_str("\n     ");
        line.push_str(&highlight(snippet, color));
    }
    line
}

/// One channel candidate as offered for picking; `index` is 1-based.
pub fn candidate_line(index: usize, channel: &ChannelRef) -> String {
    let mut line = format!("{index:>3}. {} {}", channel.name, channel.url);
    let description = channel.description.lines().next().unwrap_or("").trim();
    if !description.is_empty() {
        line.push_str("\n     ");
        line.push_str(description);
    }
    line
}

/// The single notice shown when a search stops on a failure.
pub fn failure_message(failure: &SearchFailure) -> String {
    match failure.kind {
        FailureKind::FatalBackend => {
            format!("Search stopped, the service is unavailable: {}", failure.message)
        }
        _ => format!("Search stopped on an unexpected error: {}", failure.message),
    }
}

/// Status line after a batch. A failure is reported through
/// [`failure_message`] when it happens, so it has no banner here.
pub fn banner_message(snapshot: &SearchSnapshot) -> Option<String> {
    let found = snapshot.results.len();
    let message = match snapshot.banner {
        ResultsBanner::Idle | ResultsBanner::Failed => return None,
        ResultsBanner::Searching => format!("Searching for \"{}\"...", snapshot.query),
        ResultsBanner::ContinueAvailable => {
            format!("{found} match(es) so far; more videos remain.")
        }
        ResultsBanner::NoMatchesYet => "No matches in this batch; more videos remain.".to_string(),
        ResultsBanner::AllSearched => format!("Searched every video: {found} match(es)."),
        ResultsBanner::NothingFound => {
            format!("No video mentions \"{}\".", snapshot.query)
        }
        ResultsBanner::Cancelled => "Search cancelled.".to_string(),
    };
    Some(message)
}
