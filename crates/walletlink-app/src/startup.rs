//! Connection attempts made when a session starts.
//!
//! A host that previously connected through the browser extension keeps
//! using it. Otherwise a desktop host may ask to start connecting right
//! away instead of waiting for the first request.

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::RemoteConnection;

/// Preference key holding the provider type the user last connected with.
pub const STORAGE_PROVIDER_TYPE: &str = "providerType";

/// Stored provider type selecting the browser extension.
pub const EXTENSION_PROVIDER_TYPE: &str = "extension";

/// Failure reported by an [`ExtensionConnector`].
pub type ExtensionError = Box<dyn StdError + Send + Sync>;

/// Connects through an installed browser extension instead of the remote
/// channel.
#[async_trait]
pub trait ExtensionConnector: Send + Sync + 'static {
    /// Switch the session over to the extension provider.
    async fn connect(&self) -> Result<(), ExtensionError>;
}

/// Host key/value preference storage.
pub trait PreferenceStore: Send + Sync + 'static {
    /// Read a preference.
    fn get(&self, key: &str) -> Option<String>;

    /// Remove a preference.
    fn remove(&self, key: &str);
}

/// Whether the stored provider type selects the extension.
pub fn prefers_extension(store: &dyn PreferenceStore) -> bool {
    store.get(STORAGE_PROVIDER_TYPE).as_deref() == Some(EXTENSION_PROVIDER_TYPE)
}

/// Kick off the startup connection, if any. Never blocks on it.
///
/// - `prefer_extension`: connect through `extension`. On failure the stored
///   provider type is removed so the next start uses the remote channel.
/// - `check_installation_immediately`: start a remote connection in the
///   background on desktop web; ignored with a warning elsewhere. Its
///   failure is ignored.
///
/// Returns the background task, if one was started.
pub fn handle_auto_and_extension_connections(
    connection: &RemoteConnection,
    extension: Option<Arc<dyn ExtensionConnector>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    check_installation_immediately: bool,
    prefer_extension: bool,
) -> Option<JoinHandle<()>> {
    if prefer_extension {
        debug!("extension preferred, connecting with it");
        return Some(tokio::spawn(async move {
            let result = match extension {
                Some(extension) => extension.connect().await,
                None => Err("no extension connector".into()),
            };

            if let Err(error) = result {
                warn!(%error, "can't connect with the wallet extension");
                if let Some(preferences) = preferences {
                    preferences.remove(STORAGE_PROVIDER_TYPE);
                }
            }
        }));
    }

    if !check_installation_immediately {
        return None;
    }

    if !connection.platform().is_desktop_web() {
        warn!("check installation immediately ignored, only supported on desktop web");
        return None;
    }

    debug!("check installation immediately, connecting in the background");
    let connection = connection.clone();
    Some(tokio::spawn(async move {
        if let Err(error) = connection.start_connection().await {
            debug!(%error, "ignoring startup connection failure");
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Store(Mutex<HashMap<String, String>>);

    impl PreferenceStore for Store {
        fn get(&self, key: &str) -> Option<String> {
            self.0.lock().get(key).cloned()
        }

        fn remove(&self, key: &str) {
            self.0.lock().remove(key);
        }
    }

    #[test]
    fn only_the_extension_provider_type_is_preferred() {
        let store = Store::default();
        assert!(!prefers_extension(&store));

        store.0.lock().insert(STORAGE_PROVIDER_TYPE.into(), "remote".into());
        assert!(!prefers_extension(&store));

        store.0.lock().insert(STORAGE_PROVIDER_TYPE.into(), EXTENSION_PROVIDER_TYPE.into());
        assert!(prefers_extension(&store));
    }
}
