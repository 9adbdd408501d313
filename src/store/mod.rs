//! Key-value blob persistence behind endpoint, history, and trace state.

pub mod json_file;

pub use json_file::JsonFileStore;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Whole-blob key-value persistence.
///
/// Every write replaces the entire value for a key; there are no partial
/// updates. Implementations must tolerate concurrent writers on *different*
/// keys.
pub trait Store: Send + Sync {
    /// Load the raw blob for `key`, `None` when absent or empty.
    fn load_raw(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob for `key`.
    fn save_raw(&self, key: &str, value: &str) -> Result<()>;
}

/// Load and deserialize a blob, `None` when absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>> {
    match store.load_raw(key)? {
        Some(raw) => {
            let value =
                serde_json::from_str(&raw).with_context(|| format!("corrupt blob '{key}'"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Serialize and persist a blob.
pub fn save_json<T: Serialize>(store: &dyn Store, key: &str, value: &T) -> Result<()> {
    let raw =
        serde_json::to_string_pretty(value).with_context(|| format!("encode blob '{key}'"))?;
    store.save_raw(key, &raw)
}
