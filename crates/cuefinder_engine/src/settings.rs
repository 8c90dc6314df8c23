use std::time::Duration;

/// Where the external services live and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Serves channel info and channel item listings.
    pub listing_base_url: String,
    /// Serves raw transcripts per item.
    pub transcript_base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            listing_base_url: "http://localhost:3001".to_string(),
            transcript_base_url: "http://localhost:5001".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}
