use cuefinder_core::{ItemStub, PageCursor};
use cuefinder_logging::search_debug;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::http::{build_client, endpoint, get_json, HttpFailure};
use crate::{CollaboratorError, CollaboratorErrorKind, ItemPage, ServiceSettings};

/// Lists one page of a channel's items.
#[async_trait::async_trait]
pub trait ItemPageFetcher: Send + Sync {
    /// `cursor` is `None` for the first page; the returned `next_cursor` is
    /// `None` once there are no more pages.
    async fn list_page(
        &self,
        channel_id: &str,
        cursor: Option<&PageCursor>,
        cancel: &CancellationToken,
    ) -> Result<ItemPage, CollaboratorError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelVideosResponse {
    #[serde(default)]
    videos: Vec<VideoEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoEntry {
    video_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl From<VideoEntry> for ItemStub {
    fn from(entry: VideoEntry) -> Self {
        ItemStub {
            item_id: entry.video_id,
            title: entry.title,
            published_at: entry.published_at,
            thumbnail_url: entry.thumbnail,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestPageFetcher {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl ReqwestPageFetcher {
    pub fn new(settings: ServiceSettings) -> Result<Self, CollaboratorError> {
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }
}

#[async_trait::async_trait]
impl ItemPageFetcher for ReqwestPageFetcher {
    async fn list_page(
        &self,
        channel_id: &str,
        cursor: Option<&PageCursor>,
        cancel: &CancellationToken,
    ) -> Result<ItemPage, CollaboratorError> {
        let mut url = endpoint(&self.settings.listing_base_url, &["api", "channel-videos"])
            .map_err(map_listing_failure)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("channelId", channel_id);
            if let Some(cursor) = cursor {
                query.append_pair("pageToken", cursor.as_str());
            }
        }

        let response: ChannelVideosResponse =
            get_json(&self.client, url, self.settings.max_body_bytes, cancel)
                .await
                .map_err(map_listing_failure)?;

        let items: Vec<ItemStub> = response.videos.into_iter().map(ItemStub::from).collect();
        let next_cursor = response
            .next_page_token
            .filter(|token| !token.is_empty())
            .map(PageCursor::new);
        search_debug!(
            "listed {} items for channel {} (more: {})",
            items.len(),
            channel_id,
            next_cursor.is_some()
        );
        Ok(ItemPage { items, next_cursor })
    }
}

/// Any listing failure stops the search; only an unreadable body is "unknown".
fn map_listing_failure(failure: HttpFailure) -> CollaboratorError {
    let kind = match failure {
        HttpFailure::Cancelled => return CollaboratorError::cancelled(),
        HttpFailure::Decode(_) => CollaboratorErrorKind::Unknown,
        _ => CollaboratorErrorKind::Fatal,
    };
    CollaboratorError::new(kind, format!("item listing: {}", failure.message()))
}
