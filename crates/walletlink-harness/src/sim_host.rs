//! Simulated browser extension and preference storage.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use walletlink_app::startup::{ExtensionConnector, ExtensionError, PreferenceStore};

/// Extension connector that succeeds or fails on demand.
#[derive(Debug, Default)]
pub struct SimExtension {
    fail: bool,
    calls: AtomicUsize,
}

impl SimExtension {
    /// Connector whose connect attempts succeed.
    pub fn working() -> Self {
        Self::default()
    }

    /// Connector whose connect attempts fail.
    pub fn broken() -> Self {
        Self { fail: true, calls: AtomicUsize::new(0) }
    }

    /// Number of connect attempts.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtensionConnector for SimExtension {
    async fn connect(&self) -> Result<(), ExtensionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err("extension not installed".into());
        }
        Ok(())
    }
}

/// In-memory preference storage.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a preference.
    pub fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_owned(), value.to_owned());
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}
