//! Shared plumbing for the JSON-over-HTTP collaborators.
use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{CollaboratorError, CollaboratorErrorKind, ServiceSettings};

/// Transport-level outcome; each client decides how these map onto
/// [`CollaboratorErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HttpFailure {
    Cancelled,
    InvalidUrl(String),
    Connect(String),
    Timeout(String),
    Status { code: u16, message: String },
    TooLarge { max_bytes: u64, actual: u64 },
    Decode(String),
    Network(String),
}

impl HttpFailure {
    pub(crate) fn message(&self) -> String {
        match self {
            HttpFailure::Cancelled => "cancelled".to_string(),
            HttpFailure::InvalidUrl(msg)
            | HttpFailure::Connect(msg)
            | HttpFailure::Timeout(msg)
            | HttpFailure::Decode(msg)
            | HttpFailure::Network(msg) => msg.clone(),
            HttpFailure::Status { code, message } => format!("http status {code}: {message}"),
            HttpFailure::TooLarge { max_bytes, actual } => {
                format!("response too large (max {max_bytes}, actual {actual})")
            }
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn build_client(settings: &ServiceSettings) -> Result<Client, CollaboratorError> {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| CollaboratorError::new(CollaboratorErrorKind::Fatal, err.to_string()))
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, HttpFailure> {
    let mut url =
        Url::parse(base).map_err(|err| HttpFailure::InvalidUrl(format!("{base}: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| HttpFailure::InvalidUrl(format!("{base}: not a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// GETs `url` and decodes the JSON body, giving up as soon as `cancel` fires.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    max_bytes: u64,
    cancel: &CancellationToken,
) -> Result<T, HttpFailure> {
    if cancel.is_cancelled() {
        return Err(HttpFailure::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HttpFailure::Cancelled),
        result = fetch_json(client, url, max_bytes) => result,
    }
}

async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    max_bytes: u64,
) -> Result<T, HttpFailure> {
    let response = client.get(url).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(HttpFailure::TooLarge {
                max_bytes,
                actual: content_len,
            });
        }
    }

    let body = read_capped(response, max_bytes).await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        return Err(HttpFailure::Status {
            code: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&body).map_err(|err| HttpFailure::Decode(err.to_string()))
}

async fn read_capped(response: reqwest::Response, max_bytes: u64) -> Result<Vec<u8>, HttpFailure> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(HttpFailure::TooLarge {
                max_bytes,
                actual: next_len,
            });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn map_reqwest_error(err: reqwest::Error) -> HttpFailure {
    if err.is_connect() {
        return HttpFailure::Connect(err.to_string());
    }
    if err.is_timeout() {
        return HttpFailure::Timeout(err.to_string());
    }
    if err.is_decode() {
        return HttpFailure::Decode(err.to_string());
    }
    HttpFailure::Network(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::endpoint;

    #[test]
    fn endpoint_appends_and_encodes_segments() {
        let url = endpoint("http://localhost:5001", &["transcript", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5001/transcript/a%20b%2Fc");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let url = endpoint("http://host/svc/", &["api", "channel-videos"]).unwrap();
        assert_eq!(url.as_str(), "http://host/svc/api/channel-videos");
    }

    #[test]
    fn endpoint_rejects_garbage_base() {
        assert!(endpoint("not a url", &["x"]).is_err());
    }
}
