//! Fixed-list provider — serves keys supplied at construction.
//!
//! Used when the key list is already at hand (config file, tests). Ignores
//! `source_id` and `credential` entirely; there is nothing to authenticate.

use crate::{KeyProvider, Result};
use std::future::Future;
use std::pin::Pin;

/// Provider that returns a fixed, pre-configured key list.
pub struct StaticKeyProvider {
    keys: Vec<String>,
}

impl StaticKeyProvider {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn id(&self) -> &str {
        "static"
    }

    fn fetch_keys<'a>(
        &'a self,
        _source_id: &'a str,
        _credential: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.keys.clone()) })
    }
}
