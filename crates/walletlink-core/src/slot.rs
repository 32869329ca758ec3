//! Current-channel slot.
//!
//! The orchestrator replaces its channel when a terminated one is recreated.
//! Everyone else holds a [`ChannelSlot`] and reads the current instance from
//! it instead of keeping a reference to a channel that may be gone.

use std::sync::Arc;

use tokio::sync::watch;

use crate::RemoteChannel;

type Current = Option<Arc<dyn RemoteChannel>>;

/// Shared handle on the current channel instance.
#[derive(Debug, Clone)]
pub struct ChannelSlot {
    tx: Arc<watch::Sender<Current>>,
}

impl ChannelSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// The channel currently in use.
    pub fn current(&self) -> Option<Arc<dyn RemoteChannel>> {
        self.tx.borrow().clone()
    }

    /// Install a new channel and return the previous one.
    pub fn replace(&self, channel: Arc<dyn RemoteChannel>) -> Option<Arc<dyn RemoteChannel>> {
        self.tx.send_replace(Some(channel))
    }

    /// Watch for channel replacement.
    ///
    /// The returned receiver has already seen the current value; `changed()`
    /// resolves on the next replacement.
    pub fn watch(&self) -> watch::Receiver<Current> {
        self.tx.subscribe()
    }
}

impl Default for ChannelSlot {
    fn default() -> Self {
        Self::new()
    }
}
