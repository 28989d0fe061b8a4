//! HTTP dataset provider — fetches the key list from a remote dataset row.
//!
//! The endpoint is `GET {base_url}/{source_id}` with a bearer credential.
//! Two payload shapes are accepted: a bare JSON array of key strings, or a
//! dataset row object whose `api_keys` column holds the list (either as a
//! nested array or as a JSON-encoded string, which is how dataset exports
//! commonly serialize list columns).

use crate::{Error, KeyProvider, Result};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Provider backed by a remote dataset HTTP endpoint.
pub struct DatasetKeyProvider {
    client: reqwest::Client,
    base_url: String,
}

impl DatasetKeyProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl KeyProvider for DatasetKeyProvider {
    fn id(&self) -> &str {
        "dataset"
    }

    fn fetch_keys<'a>(
        &'a self,
        source_id: &'a str,
        credential: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/{}", self.base_url.trim_end_matches('/'), source_id);
            debug!(source_id, url = %url, "fetching key list");

            let response = self
                .client
                .get(&url)
                .bearer_auth(credential)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let payload: serde_json::Value = response.json().await?;
            let keys = parse_key_payload(payload)?;
            debug!(source_id, keys = keys.len(), "key list fetched");
            Ok(keys)
        })
    }
}

/// Decode a key-list payload into an ordered `Vec<String>`.
fn parse_key_payload(payload: serde_json::Value) -> Result<Vec<String>> {
    match payload {
        serde_json::Value::Array(items) => collect_strings(items),
        serde_json::Value::Object(mut row) => match row.remove("api_keys") {
            Some(serde_json::Value::Array(items)) => collect_strings(items),
            Some(serde_json::Value::String(encoded)) => serde_json::from_str(&encoded)
                .map_err(|e| Error::Decode(format!("api_keys is not a JSON string array: {e}"))),
            Some(other) => Err(Error::Decode(format!(
                "api_keys has unexpected type: {}",
                type_name(&other)
            ))),
            None => Err(Error::Decode("payload object has no api_keys field".into())),
        },
        other => Err(Error::Decode(format!(
            "expected array or object payload, got {}",
            type_name(&other)
        ))),
    }
}

fn collect_strings(items: Vec<serde_json::Value>) -> Result<Vec<String>> {
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(s) => Ok(s),
            other => Err(Error::Decode(format!(
                "non-string entry in key array: {}",
                type_name(&other)
            ))),
        })
        .collect()
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
