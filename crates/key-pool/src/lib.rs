//! Rotating pool of interchangeable API credential keys
//!
//! Distributes outbound API calls across a fixed set of keys via round-robin
//! selection, tracks per-key failure counts, and skips keys that have failed
//! too many times. The pool is created once at bootstrap (key list fetched
//! through a `KeyProvider`) and lives for the process lifetime.
//!
//! Steady-state flow:
//! 1. Caller asks for a working key (`next_working_key`)
//! 2. Caller uses the key for an outbound request
//! 3. On failure, caller reports it (`handle_api_failure`) and receives a
//!    replacement key to try next
//! 4. A key at or above the failure threshold is skipped by rotation until
//!    counts are reset (`reset_failure_counts`)

pub mod config;
pub mod error;
pub mod instance;
pub mod pool;

pub use config::Config;
pub use error::{Error, Result};
pub use instance::{get_or_init, reset_for_testing};
pub use pool::{KeyPool, KeysByStatus};
