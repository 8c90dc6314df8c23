use cuefinder_core::ChannelRef;
use cuefinder_logging::{search_info, search_warn};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::http::{build_client, endpoint, get_json, HttpFailure};
use crate::{CollaboratorError, CollaboratorErrorKind, ServiceSettings};

/// How a channel URL identifies its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLocator {
    /// `youtube.com/channel/{id}`
    Id(String),
    /// `youtube.com/@{handle}` or `youtube.com/user/{handle}`, percent-decoded.
    Handle(String),
}

/// Recognises channel URLs, with or without a scheme.
pub fn parse_channel_locator(input: &str) -> Option<ChannelLocator> {
    let input = input.trim();
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;
    if host != "youtube.com" && !host.ends_with(".youtube.com") {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;
    if let Some(handle) = first.strip_prefix('@') {
        return decode_handle(handle).map(ChannelLocator::Handle);
    }
    match first {
        "channel" => {
            let id = segments.next()?;
            let valid = id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            valid.then(|| ChannelLocator::Id(id.to_string()))
        }
        "user" => decode_handle(segments.next()?).map(ChannelLocator::Handle),
        _ => None,
    }
}

fn decode_handle(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    (!decoded.is_empty()).then(|| decoded.into_owned())
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("not a channel url: {0}")]
    InvalidInput(String),
    #[error("no channel found for {0}")]
    NotFound(String),
    #[error("channel lookup failed: {0}")]
    Service(CollaboratorError),
}

/// What the user's channel input turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A channel URL that names exactly one channel.
    Resolved(ChannelRef),
    /// Channels found by name; the user picks one.
    Candidates(Vec<ChannelRef>),
}

/// Turns user input, a channel URL or a channel name, into a channel.
#[async_trait::async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelInfoResponse {
    channel_info: ChannelInfo,
}

/// `channel-search` answers with either one exact channel or a result list.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSearchResponse {
    #[serde(default)]
    channel_info: Option<ChannelInfo>,
    #[serde(default)]
    results: Vec<ChannelInfo>,
}

#[derive(Deserialize)]
struct ChannelInfo {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl ChannelInfo {
    /// `fallback_id` is used when neither the payload nor its url carries one.
    fn into_channel(self, fallback_id: Option<String>) -> Option<ChannelRef> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .or_else(|| channel_id_from_url(&self.url))
            .or(fallback_id)?;
        Some(ChannelRef {
            id,
            name: self.name,
            url: self.url,
            description: self.description,
            thumbnail_url: self.thumbnail,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestChannelResolver {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl ReqwestChannelResolver {
    pub fn new(settings: ServiceSettings) -> Result<Self, CollaboratorError> {
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }

    async fn lookup_url(
        &self,
        input: &str,
        locator: ChannelLocator,
        cancel: &CancellationToken,
    ) -> Result<ChannelRef, ResolveError> {
        let mut url = endpoint(&self.settings.listing_base_url, &["api", "channel-info"])
            .map_err(|failure| map_resolve_failure(input, failure))?;
        url.query_pairs_mut().append_pair("url", input);

        let response: ChannelInfoResponse =
            get_json(&self.client, url, self.settings.max_body_bytes, cancel)
                .await
                .map_err(|failure| map_resolve_failure(input, failure))?;

        let fallback = match locator {
            ChannelLocator::Id(id) => Some(id),
            ChannelLocator::Handle(_) => None,
        };
        let channel = response
            .channel_info
            .into_channel(fallback)
            .ok_or_else(|| missing_id("channel info"))?;
        search_info!("resolved {} to channel {} ({})", input, channel.id, channel.name);
        Ok(channel)
    }

    async fn search_by_name(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        let mut url = endpoint(&self.settings.listing_base_url, &["api", "channel-search"])
            .map_err(|failure| map_resolve_failure(name, failure))?;
        url.query_pairs_mut().append_pair("query", name);

        let response: ChannelSearchResponse =
            get_json(&self.client, url, self.settings.max_body_bytes, cancel)
                .await
                .map_err(|failure| map_resolve_failure(name, failure))?;

        if let Some(info) = response.channel_info {
            let channel = info
                .into_channel(None)
                .ok_or_else(|| missing_id("channel search"))?;
            search_info!("name {} matched channel {} exactly", name, channel.id);
            return Ok(Resolution::Resolved(channel));
        }

        let total = response.results.len();
        let candidates: Vec<ChannelRef> = response
            .results
            .into_iter()
            .filter_map(|info| info.into_channel(None))
            .collect();
        if candidates.len() < total {
            search_warn!(
                "dropped {} channel candidates without an id",
                total - candidates.len()
            );
        }
        if candidates.is_empty() {
            return Err(ResolveError::NotFound(name.to_string()));
        }
        search_info!("name {} matched {} channels", name, candidates.len());
        Ok(Resolution::Candidates(candidates))
    }
}

#[async_trait::async_trait]
impl ChannelResolver for ReqwestChannelResolver {
    async fn resolve(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ResolveError::InvalidInput(input.to_string()));
        }

        match parse_channel_locator(input) {
            // The channel-info lookup cannot match handles written in Hangul,
            // so those are searched by their Hangul words instead.
            Some(ChannelLocator::Handle(handle)) if has_hangul(&handle) => {
                self.search_by_name(&hangul_words(&handle), cancel)
                    .await
                    .map_err(|err| match err {
                        ResolveError::NotFound(_) => ResolveError::NotFound(input.to_string()),
                        other => other,
                    })
            }
            Some(locator) => self
                .lookup_url(input, locator, cancel)
                .await
                .map(Resolution::Resolved),
            None if looks_like_url(input) => Err(ResolveError::InvalidInput(input.to_string())),
            None => self.search_by_name(input, cancel).await,
        }
    }
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

fn has_hangul(text: &str) -> bool {
    text.chars().any(is_hangul_syllable)
}

/// Runs of Hangul syllables joined by single spaces: `"뉴스_채널tv"` gives
/// `"뉴스 채널"`.
fn hangul_words(text: &str) -> String {
    text.split(|c: char| !is_hangul_syllable(c))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Input that is meant as a URL but is not a channel URL.
fn looks_like_url(input: &str) -> bool {
    input.contains("://") || input.starts_with("www.") || input.contains("youtube.com")
}

fn missing_id(source: &str) -> ResolveError {
    ResolveError::Service(CollaboratorError::new(
        CollaboratorErrorKind::Unknown,
        format!("{source} carries no channel id"),
    ))
}

fn channel_id_from_url(url: &str) -> Option<String> {
    match parse_channel_locator(url)? {
        ChannelLocator::Id(id) => Some(id),
        ChannelLocator::Handle(_) => None,
    }
}

fn map_resolve_failure(input: &str, failure: HttpFailure) -> ResolveError {
    match failure {
        HttpFailure::Cancelled => ResolveError::Service(CollaboratorError::cancelled()),
        HttpFailure::Status { code: 400, .. } => ResolveError::InvalidInput(input.to_string()),
        HttpFailure::Status { code: 404, .. } => ResolveError::NotFound(input.to_string()),
        HttpFailure::Decode(msg) => ResolveError::Service(CollaboratorError::new(
            CollaboratorErrorKind::Unknown,
            msg,
        )),
        other => ResolveError::Service(CollaboratorError::new(
            CollaboratorErrorKind::Fatal,
            other.message(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{hangul_words, has_hangul, looks_like_url, parse_channel_locator, ChannelLocator};

    #[test]
    fn parses_channel_id_urls() {
        assert_eq!(
            parse_channel_locator("https://www.youtube.com/channel/UC_abc-123"),
            Some(ChannelLocator::Id("UC_abc-123".to_string()))
        );
        assert_eq!(
            parse_channel_locator("youtube.com/channel/UCx?view=1"),
            Some(ChannelLocator::Id("UCx".to_string()))
        );
        assert_eq!(parse_channel_locator("https://youtube.com/channel/bad.id"), None);
    }

    #[test]
    fn parses_handles_and_decodes_hangul() {
        assert_eq!(
            parse_channel_locator("https://youtube.com/@someone/videos"),
            Some(ChannelLocator::Handle("someone".to_string()))
        );
        assert_eq!(
            parse_channel_locator("https://m.youtube.com/@%ED%95%9C%EA%B8%80"),
            Some(ChannelLocator::Handle("한글".to_string()))
        );
        assert_eq!(
            parse_channel_locator("https://youtube.com/user/legacy"),
            Some(ChannelLocator::Handle("legacy".to_string()))
        );
    }

    #[test]
    fn extracts_hangul_words_from_handles() {
        assert!(has_hangul("한글채널"));
        assert!(!has_hangul("someone_tv"));
        assert_eq!(hangul_words("뉴스_채널tv"), "뉴스 채널");
        assert_eq!(hangul_words("오늘도화이팅"), "오늘도화이팅");
    }

    #[test]
    fn recognises_url_shaped_input() {
        assert!(looks_like_url("https://example.com/x"));
        assert!(looks_like_url("www.example.com"));
        assert!(looks_like_url("youtube.com/watch?v=1"));
        assert!(!looks_like_url("침착맨"));
        assert!(!looks_like_url("some channel"));
    }

    #[test]
    fn rejects_other_urls() {
        assert_eq!(parse_channel_locator("https://example.com/@someone"), None);
        assert_eq!(parse_channel_locator("https://youtube.com/watch?v=abc"), None);
        assert_eq!(parse_channel_locator("https://notyoutube.com/@x"), None);
        assert_eq!(parse_channel_locator(""), None);
    }
}
