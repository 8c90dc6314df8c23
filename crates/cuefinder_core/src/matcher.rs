//! Transcript matching and snippet extraction.
//!
//! Spoken transcripts are segmented arbitrarily by the transcription service,
//! so a cue matches regardless of spacing: both sides are compared with all
//! whitespace removed and lower-cased. The snippet shown for a match is the
//! first sentence containing the cue, windowed around the cue when the
//! sentence is long, with the matched characters wrapped in highlight markup.

pub const HIGHLIGHT_OPEN: &str = "<mark>";
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

/// Sentences longer than this (in characters) are windowed around the cue.
const LONG_SENTENCE_CHARS: usize = 50;
/// Characters of context kept on each side of the cue in a windowed snippet.
const CONTEXT_CHARS: usize = 20;
const ELLIPSIS: &str = "...";
const SENTENCE_DELIMITERS: [char; 3] = ['.', '?', '!'];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextMatch {
    pub matched: bool,
    pub snippet: Option<String>,
}

/// Removes all whitespace and lower-cases the rest.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Tests whether `query` occurs in `transcript` ignoring spacing and case, and
/// builds the highlighted snippet for a match.
///
/// A match that straddles a sentence delimiter is still reported as matched,
/// but without a snippet, since no single sentence contains the cue.
pub fn match_transcript(transcript: &str, query: &str) -> TextMatch {
    let needle = normalize(query);
    if needle.is_empty() || !normalize(transcript).contains(&needle) {
        return TextMatch::default();
    }

    let snippet = split_sentences(transcript)
        .into_iter()
        .find(|sentence| normalize(sentence).contains(&needle))
        .map(|sentence| build_snippet(sentence, query, &needle));

    TextMatch {
        matched: true,
        snippet,
    }
}

/// Splits on terminal punctuation, keeping each delimiter with its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if SENTENCE_DELIMITERS.contains(&c) {
            let end = idx + c.len_utf8();
            sentences.push(text[start..end].trim());
            start = end;
        }
    }
    sentences.push(text[start..].trim());
    sentences.retain(|s| !s.is_empty());
    sentences
}

fn build_snippet(sentence: &str, query: &str, needle: &str) -> String {
    let chars: Vec<char> = sentence.chars().collect();
    let excerpt = if chars.len() > LONG_SENTENCE_CHARS {
        window_around_query(&chars, query, needle)
    } else {
        sentence.to_string()
    };
    highlight(&excerpt, needle)
}

fn window_around_query(chars: &[char], query: &str, needle: &str) -> String {
    let query_chars: Vec<char> = query.trim().chars().collect();
    let span = find_ignore_case(chars, &query_chars)
        .map(|start| (start, start + query_chars.len()))
        .or_else(|| stripped_span(chars, needle));
    let Some((start, end)) = span else {
        return chars.iter().collect();
    };

    let from = start.saturating_sub(CONTEXT_CHARS);
    let to = (end + CONTEXT_CHARS).min(chars.len());
    let body: String = chars[from..to].iter().collect();

    let mut excerpt = String::with_capacity(body.len() + 2 * ELLIPSIS.len());
    if from > 0 {
        excerpt.push_str(ELLIPSIS);
    }
    excerpt.push_str(body.trim());
    if to < chars.len() {
        excerpt.push_str(ELLIPSIS);
    }
    excerpt
}

fn highlight(excerpt: &str, needle: &str) -> String {
    let chars: Vec<char> = excerpt.chars().collect();
    let Some((start, end)) = stripped_span(&chars, needle) else {
        return excerpt.to_string();
    };

    let mut out =
        String::with_capacity(excerpt.len() + HIGHLIGHT_OPEN.len() + HIGHLIGHT_CLOSE.len());
    out.extend(&chars[..start]);
    out.push_str(HIGHLIGHT_OPEN);
    out.extend(&chars[start..end]);
    out.push_str(HIGHLIGHT_CLOSE);
    out.extend(&chars[end..]);
    out
}

/// Case-insensitive search with spacing preserved. Returns a char index.
fn find_ignore_case(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| {
        window
            .iter()
            .zip(needle)
            .all(|(a, b)| a == b || a.to_lowercase().eq(b.to_lowercase()))
    })
}

/// Finds the normalized `needle` in `chars` ignoring whitespace, and maps the
/// hit back to a half-open char range of the original text. The range covers
/// exactly the original characters, including any whitespace inside it.
fn stripped_span(chars: &[char], needle: &str) -> Option<(usize, usize)> {
    // Each folded char remembers the index of the original char it came from.
    let folded: Vec<(char, usize)> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace())
        .flat_map(|(idx, c)| c.to_lowercase().map(move |lower| (lower, idx)))
        .collect();
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || needle.len() > folded.len() {
        return None;
    }

    let hit = folded.windows(needle.len()).position(|window| {
        window
            .iter()
            .map(|(c, _)| *c)
            .eq(needle.iter().copied())
    })?;
    let first = folded[hit].1;
    let last = folded[hit + needle.len() - 1].1;
    Some((first, last + 1))
}
