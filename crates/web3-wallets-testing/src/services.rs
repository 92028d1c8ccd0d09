use crate::lock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_traits::{KeyValueStore, NameService, Navigator, Notifier};

/// Navigator that records every open and redirect
pub struct RecordingNavigator {
    mobile: bool,
    href: String,
    opened: Mutex<Vec<String>>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Desktop browser at `href`
    pub fn new(href: &str) -> Self {
        Self {
            mobile: false,
            href: href.to_string(),
            opened: Mutex::new(Vec::new()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Mobile browser at `href`
    pub fn mobile(href: &str) -> Self {
        Self {
            mobile: true,
            ..Self::new(href)
        }
    }

    /// URLs opened in new tabs
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }

    /// URLs the current tab was sent to
    pub fn redirects(&self) -> Vec<String> {
        lock(&self.redirects).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn is_mobile(&self) -> bool {
        self.mobile
    }

    fn location_href(&self) -> String {
        self.href.clone()
    }

    fn open(&self, url: &str) {
        lock(&self.opened).push(url.to_string());
    }

    fn redirect(&self, url: &str) {
        lock(&self.redirects).push(url.to_string());
    }
}

/// Notifier that records messages
#[derive(Default)]
pub struct RecordingNotifier {
    warnings: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings shown so far
    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }

    /// Info messages shown so far
    pub fn infos(&self) -> Vec<String> {
        lock(&self.infos).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn warn(&self, message: &str) {
        lock(&self.warnings).push(message.to_string());
    }

    fn info(&self, message: &str) {
        lock(&self.infos).push(message.to_string());
    }
}

/// Name service backed by a fixed table
#[derive(Default)]
pub struct StaticNameService {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
    failing: bool,
    lookups: AtomicUsize,
}

impl StaticNameService {
    /// Empty table; nothing resolves
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` <-> `address` in both directions
    pub fn with_name(mut self, name: &str, address: &str) -> Self {
        self.forward.insert(name.to_lowercase(), address.to_string());
        self.reverse.insert(address.to_lowercase(), name.to_string());
        self
    }

    /// Every call fails with an RPC error
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Calls made so far, both directions
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self, method: &str) -> Result<()> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(WalletsError::RpcRequestError {
                method: method.to_string(),
                reason: "name service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NameService for StaticNameService {
    async fn resolve(&self, name: &str) -> Result<Option<String>> {
        self.check("resolve")?;
        Ok(self.forward.get(&name.to_lowercase()).cloned())
    }

    async fn reverse_lookup(&self, address: &str) -> Result<Option<String>> {
        self.check("reverse_lookup")?;
        Ok(self.reverse.get(&address.to_lowercase()).cloned())
    }
}

/// Store where every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(WalletsError::StorageError("storage unavailable".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(WalletsError::StorageError("storage unavailable".into()))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(WalletsError::StorageError("storage unavailable".into()))
    }
}
