//! Process-wide shared pool instance
//!
//! The pool is constructed lazily on first request and then lives for the
//! process lifetime. Initialization is double-checked: the fast path takes a
//! read lock and returns the existing instance; the slow path takes the
//! write lock, re-checks, and constructs exactly once even when many first
//! callers race. The provider fetch happens inside the write section, so a
//! provider failure leaves the slot empty and a later call can retry with
//! nothing half-initialized.

use std::sync::Arc;

use key_provider::KeyProvider;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Error, Result};
use crate::pool::KeyPool;

static INSTANCE: RwLock<Option<Arc<KeyPool>>> = RwLock::const_new(None);

/// Return the shared pool, constructing it on first call.
///
/// Fetches the key list through `provider` exactly once across all callers.
/// Provider failures and an empty key list surface as construction errors;
/// the shared slot stays empty in both cases.
pub async fn get_or_init(
    provider: &dyn KeyProvider,
    source_id: &str,
    credential: &str,
    max_failures: u32,
    designated_key: Option<String>,
) -> Result<Arc<KeyPool>> {
    if let Some(pool) = INSTANCE.read().await.as_ref() {
        return Ok(Arc::clone(pool));
    }

    let mut slot = INSTANCE.write().await;
    // Re-check: another caller may have constructed while we waited.
    if let Some(pool) = slot.as_ref() {
        return Ok(Arc::clone(pool));
    }

    let keys = provider
        .fetch_keys(source_id, credential)
        .await
        .map_err(|e| Error::Provider(e.to_string()))?;
    let pool = Arc::new(KeyPool::new(keys, max_failures, designated_key)?);
    info!(provider = provider.id(), source_id, "shared key pool constructed");
    *slot = Some(Arc::clone(&pool));
    Ok(pool)
}

/// Clear the shared instance so each test can construct its own pool.
pub async fn reset_for_testing() {
    *INSTANCE.write().await = None;
}
