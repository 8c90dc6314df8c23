use cuefinder_core::{match_transcript, MatchResult};
use cuefinder_logging::search_debug;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::http::{build_client, endpoint, get_json, HttpFailure};
use crate::{CollaboratorError, CollaboratorErrorKind, ServiceSettings};

/// Checks a single item's transcript for the cue.
#[async_trait::async_trait]
pub trait TranscriptLookup: Send + Sync {
    /// `order` is the item's 1-based position within its page, passed along
    /// for diagnostics only.
    async fn check_transcript(
        &self,
        item_id: &str,
        query: &str,
        order: u32,
        cancel: &CancellationToken,
    ) -> Result<MatchResult, CollaboratorError>;
}

#[derive(Deserialize)]
struct TranscriptResponse {
    transcript: String,
}

/// Fetches the full transcript text and runs the matcher locally.
#[derive(Debug, Clone)]
pub struct ReqwestTranscriptClient {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl ReqwestTranscriptClient {
    pub fn new(settings: ServiceSettings) -> Result<Self, CollaboratorError> {
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }
}

#[async_trait::async_trait]
impl TranscriptLookup for ReqwestTranscriptClient {
    async fn check_transcript(
        &self,
        item_id: &str,
        query: &str,
        order: u32,
        cancel: &CancellationToken,
    ) -> Result<MatchResult, CollaboratorError> {
        let mut url = endpoint(&self.settings.transcript_base_url, &["transcript", item_id])
            .map_err(|failure| map_transcript_failure(item_id, failure))?;
        url.query_pairs_mut()
            .append_pair("order", &order.to_string());

        let response: TranscriptResponse =
            get_json(&self.client, url, self.settings.max_body_bytes, cancel)
                .await
                .map_err(|failure| map_transcript_failure(item_id, failure))?;

        let found = match_transcript(&response.transcript, query);
        search_debug!(
            "item {} (order {}): {} transcript chars, matched={}",
            item_id,
            order,
            response.transcript.chars().count(),
            found.matched
        );
        Ok(MatchResult {
            item_id: item_id.to_string(),
            matched: found.matched,
            snippet: found.snippet,
        })
    }
}

/// A missing transcript or a slow item is skipped; an unreachable or erroring
/// transcript service stops the search.
fn map_transcript_failure(item_id: &str, failure: HttpFailure) -> CollaboratorError {
    let kind = match &failure {
        HttpFailure::Cancelled => return CollaboratorError::cancelled(),
        HttpFailure::Status { code, .. } if *code >= 500 => CollaboratorErrorKind::Fatal,
        HttpFailure::Status { .. } | HttpFailure::Timeout(_) | HttpFailure::TooLarge { .. } => {
            CollaboratorErrorKind::Transient
        }
        HttpFailure::Connect(_) | HttpFailure::InvalidUrl(_) | HttpFailure::Network(_) => {
            CollaboratorErrorKind::Fatal
        }
        HttpFailure::Decode(_) => CollaboratorErrorKind::Unknown,
    };
    CollaboratorError::new(kind, format!("transcript for {item_id}: {}", failure.message()))
}
