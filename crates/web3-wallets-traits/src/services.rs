//! Host-provided services: name resolution, storage, browser location, notifications.

use async_trait::async_trait;
use web3_wallets_error::Result;

/// Forward and reverse resolution of human-readable names (ENS, .sol).
#[async_trait]
pub trait NameService: Send + Sync {
    /// Resolves a domain name to an address; `Ok(None)` when it does not resolve
    async fn resolve(&self, name: &str) -> Result<Option<String>>;

    /// Resolves an address to its display domain; `Ok(None)` when it has none
    async fn reverse_lookup(&self, address: &str) -> Result<Option<String>>;
}

/// Durable key-value storage (browser `localStorage` or equivalent).
pub trait KeyValueStore: Send + Sync {
    /// Reads a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Browser location and device capabilities.
pub trait Navigator: Send + Sync {
    /// True on phones and tablets, where extensions are replaced by in-app browsers
    fn is_mobile(&self) -> bool;

    /// Current page URL
    fn location_href(&self) -> String;

    /// Opens `url` in a new tab
    fn open(&self, url: &str);

    /// Navigates the current tab to `url`
    fn redirect(&self, url: &str);
}

/// User-visible notifications (toasts).
pub trait Notifier: Send + Sync {
    /// Shows a warning
    fn warn(&self, message: &str);

    /// Shows an informational message
    fn info(&self, _message: &str) {}
}
