//! Stream bridge between the provider and the remote channel.
//!
//! [`RemoteStream`] is the provider's [`DuplexStream`]. Writes become channel
//! messages, followed by the wallet wake-up policy. Channel messages are
//! filtered by routing tag and queued for the provider's reader. The bridge
//! also forwards channel lifecycle notifications to the provider.
//!
//! # Write policy
//!
//! 1. Not ready and not embedded: the write is dropped and acknowledged.
//! 2. The envelope payload is sent through the channel.
//! 3. Desktop or browserless hosts (outside the embedded runtime) stop here.
//! 4. A method from [`RedirectMethodSet`] opens a reauthorization link.
//! 5. Otherwise a paused channel opens a wake-up link.
//!
//! Any failure from step 2 on is reported as [`StreamError::Disconnected`].

use std::{
    error::Error as StdError,
    sync::{Arc, Weak},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{
    sync::{Mutex, broadcast, broadcast::error::RecvError, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, trace, warn};
use walletlink_proto::{Chunk, ConnectionStatus, InboundChunk, OutboundEnvelope, filter_inbound};

use crate::{
    ChannelEvent, ChannelSlot, DuplexStream, RemoteChannel, SdkProvider, StreamError,
    config::StreamOptions,
    methods::RedirectMethodSet,
    platform::{Platform, suppresses_redirect},
};

type BoxError = Box<dyn StdError + Send + Sync>;

fn subscribe_current(
    slot: &mut watch::Receiver<Option<Arc<dyn RemoteChannel>>>,
) -> Option<broadcast::Receiver<ChannelEvent>> {
    slot.borrow_and_update().as_ref().map(|channel| channel.subscribe())
}

/// Provider stream carried over the current remote channel.
pub struct RemoteStream {
    slot: ChannelSlot,
    platform: Arc<dyn Platform>,
    options: StreamOptions,
    redirect: RedirectMethodSet,
    inbound_tx: mpsc::UnboundedSender<InboundChunk>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<InboundChunk>>,
}

impl RemoteStream {
    /// Create a bridge over whatever channel `slot` holds at write time.
    pub fn new(slot: ChannelSlot, platform: Arc<dyn Platform>, options: StreamOptions) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            slot,
            platform,
            options,
            redirect: RedirectMethodSet,
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
        }
    }

    /// Read path: queue `message` for the provider if it carries our tag.
    pub fn on_message(&self, message: &Value) {
        let Some(chunk) = filter_inbound(message, &self.options.name) else {
            trace!("discarding foreign channel message");
            return;
        };

        if self.inbound_tx.send(chunk).is_err() {
            debug!("provider reader gone, dropping inbound message");
        }
    }

    /// Forward notifications of the current channel to this bridge and
    /// `provider`, following channel replacement.
    ///
    /// The channel already in the slot is subscribed before this returns.
    /// The task ends when the bridge is dropped.
    pub fn listen(self: &Arc<Self>, provider: Weak<SdkProvider>) -> JoinHandle<()> {
        let bridge = Arc::downgrade(self);
        let mut slot = self.slot.watch();
        let mut events = subscribe_current(&mut slot);

        tokio::spawn(async move {
            loop {
                match events.as_mut() {
                    None => {
                        if slot.changed().await.is_err() {
                            break;
                        }
                    },
                    Some(receiver) => {
                        let closed = tokio::select! {
                            changed = slot.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                                false
                            },
                            event = receiver.recv() => match event {
                                Ok(event) => {
                                    let Some(bridge) = bridge.upgrade() else { break };
                                    bridge.handle_channel_event(event, &provider);
                                    continue;
                                },
                                Err(RecvError::Lagged(skipped)) => {
                                    warn!(skipped, "bridge lagged behind channel notifications");
                                    continue;
                                },
                                Err(RecvError::Closed) => true,
                            },
                        };

                        if closed && slot.changed().await.is_err() {
                            break;
                        }
                    },
                }

                events = subscribe_current(&mut slot);
                debug!("bridge subscribed to replaced channel");
            }
            debug!("bridge listener stopped");
        })
    }

    fn handle_channel_event(&self, event: ChannelEvent, provider: &Weak<SdkProvider>) {
        match event {
            ChannelEvent::Message(message) => self.on_message(&message),
            ChannelEvent::ClientsReady => {
                let Some(provider) = provider.upgrade() else { return };
                tokio::spawn(async move {
                    if let Err(error) = provider.force_initialize_state().await {
                        debug!(%error, "ignoring provider initialization failure");
                    }
                    debug!(state = ?provider.state(), "provider state after clients ready");
                });
            },
            ChannelEvent::ConnectionStatus(ConnectionStatus::Terminated) => {
                if let Some(provider) = provider.upgrade() {
                    provider.handle_disconnect(true);
                }
            },
            ChannelEvent::ConnectionStatus(ConnectionStatus::Disconnected) => {
                if let Some(provider) = provider.upgrade() {
                    provider.handle_disconnect(false);
                }
            },
            ChannelEvent::ConnectionStatus(_) | ChannelEvent::ClientsDisconnected => {},
        }
    }

    async fn deliver(&self, channel: &dyn RemoteChannel, chunk: Chunk) -> Result<(), BoxError> {
        let envelope = OutboundEnvelope::from_chunk(chunk);
        channel.send_message(envelope.payload().clone()).await?;

        let platform = self.platform.as_ref();
        if suppresses_redirect(platform) {
            trace!(platform = ?platform.platform_type(), "redirects suppressed");
            return Ok(());
        }

        let pub_key = channel.key_info().map(|k| k.public_key).unwrap_or_default();
        let channel_id = channel.channel_id().unwrap_or_default();
        let is_desktop = platform.is_desktop_web();
        let method = envelope.method();

        if method.is_some_and(|m| self.redirect.contains(m)) && !is_desktop {
            let links = self.options.links.reauthorize(&channel_id, &pub_key)?;
            debug!(?method, link = %links.universal, "reauthorizing sensitive method");
            platform.open_deeplink(&links.universal, &links.deeplink);
        } else if channel.is_paused() && !is_desktop {
            let links = self.options.links.wake(&channel_id, &pub_key)?;
            debug!(?method, link = %links.universal, "waking paused wallet");
            platform.open_deeplink(&links.universal, &links.deeplink);
        }

        Ok(())
    }
}

#[async_trait]
impl DuplexStream for RemoteStream {
    async fn write(&self, chunk: Chunk) -> Result<(), StreamError> {
        let channel = self.slot.current();
        let is_ready = channel.as_ref().is_some_and(|c| c.is_ready());

        if !is_ready && !self.platform.is_embedded_runtime() {
            debug!("channel not ready, dropping write");
            return Ok(());
        }

        let Some(channel) = channel else {
            return Err(StreamError::disconnected("no channel"));
        };

        self.deliver(channel.as_ref(), chunk).await.map_err(|error| {
            debug!(%error, "write failed");
            StreamError::Disconnected(error)
        })
    }

    async fn read(&self) -> Option<InboundChunk> {
        self.inbound_rx.lock().await.recv().await
    }
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream")
            .field("name", &self.options.name)
            .field("channel", &self.slot.current())
            .finish_non_exhaustive()
    }
}
