//! Cuefinder engine: collaborator clients and the search session store.
mod channel;
mod http;
mod listing;
mod settings;
mod store;
mod transcript;
mod types;

pub use channel::{
    parse_channel_locator, ChannelLocator, ChannelResolver, ReqwestChannelResolver, Resolution,
    ResolveError,
};
pub use listing::{ItemPageFetcher, ReqwestPageFetcher};
pub use settings::ServiceSettings;
pub use store::{
    ChannelObserver, SearchError, SearchObserver, SearchStore, StoreEvent, Subscription,
};
pub use transcript::{ReqwestTranscriptClient, TranscriptLookup};
pub use types::{CollaboratorError, CollaboratorErrorKind, ItemPage};
