//! Key source abstraction for pool bootstrap
//!
//! Defines the `KeyProvider` trait that decouples the pool from wherever the
//! key list actually lives. `StaticKeyProvider` serves a fixed list (tests,
//! locally-supplied keys); `DatasetKeyProvider` fetches the list from a
//! remote dataset endpoint over HTTP. A provider is consulted exactly once,
//! at pool construction — never on the request path.

pub mod dataset;
pub mod static_list;

pub use dataset::DatasetKeyProvider;
pub use static_list::StaticKeyProvider;

use std::future::Future;
use std::pin::Pin;

/// Errors from key source operations (fetch, decode).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("key source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode key payload: {0}")]
    Decode(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Abstraction over where the initial key list comes from.
///
/// `source_id` names a dataset or list within the source; `credential`
/// authenticates the fetch. Both are opaque to the pool. Uses
/// `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn KeyProvider>`).
pub trait KeyProvider: Send + Sync {
    /// Identifier for logging (e.g. "static", "dataset").
    fn id(&self) -> &str;

    /// Fetch the ordered key list for `source_id`.
    ///
    /// An `Ok` with an empty vec is a legal provider result; the pool
    /// rejects it at construction.
    fn fetch_keys<'a>(
        &'a self,
        source_id: &'a str,
        credential: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;
}
