//! Error types for pool operations

/// Errors from pool construction and failure reporting.
///
/// Steady-state rotation never fails: once constructed, cursor and counter
/// operations are pure in-memory work. `UnknownKey` carries only a redacted
/// key fragment so raw credentials never reach logs or error messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty key set: {0}")]
    EmptyKeySet(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("key provider error: {0}")]
    Provider(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
