//! Transport channel abstraction.
//!
//! The channel is an external collaborator: it owns the socket or peer
//! connection, key exchange, framing and persistence of channel state. This
//! layer consumes it only through [`RemoteChannel`], so production uses the
//! real encrypted transport and tests use a simulated one.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use walletlink_proto::{ChannelConfig, ChannelIdentity, ConnectionStatus, DisconnectOptions, KeyInfo};

use crate::{ChannelError, config::ChannelOptions, platform::PlatformType};

/// Notification published by a channel.
///
/// Subscribers receive every notification emitted after they subscribed, in
/// emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A decrypted message from the remote party (`message`).
    Message(Value),
    /// Every party joined and the channel is usable (`clients_ready`).
    ClientsReady,
    /// Every remote party left (`clients_disconnected`).
    ClientsDisconnected,
    /// The channel changed status (`connection_status`).
    ConnectionStatus(ConnectionStatus),
}

impl ChannelEvent {
    /// Notification name used by the transport.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::ClientsReady => "clients_ready",
            Self::ClientsDisconnected => "clients_disconnected",
            Self::ConnectionStatus(_) => "connection_status",
        }
    }
}

/// An authenticated request/response conduit to a remote wallet.
///
/// A channel instance that reached [`ConnectionStatus::Terminated`] stays
/// terminated; further activity needs a new instance from a
/// [`ChannelFactory`].
#[async_trait]
pub trait RemoteChannel: Send + Sync + 'static {
    /// Current status.
    fn status(&self) -> ConnectionStatus;

    /// Whether keys are exchanged and messages can flow.
    fn is_ready(&self) -> bool;

    /// Whether the underlying socket is connected.
    fn is_connected(&self) -> bool;

    /// Whether the wallet side is paused (app in the background).
    fn is_paused(&self) -> bool;

    /// Identifier of the current channel, once one exists.
    fn channel_id(&self) -> Option<String>;

    /// Local key material, once generated.
    fn key_info(&self) -> Option<KeyInfo>;

    /// Persisted record of the current channel.
    fn channel_config(&self) -> Option<ChannelConfig>;

    /// Look for a persisted channel and try to resume it.
    ///
    /// Returns the persisted record when one exists.
    async fn start_auto_connect(&self) -> Option<ChannelConfig>;

    /// Create a fresh channel and return its identity.
    async fn generate_channel_id(&self) -> Result<ChannelIdentity, ChannelError>;

    /// Encrypt and transmit one message.
    async fn send_message(&self, message: Value) -> Result<(), ChannelError>;

    /// Subscribe to notifications.
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;

    /// Leave the channel, terminating it when requested.
    fn disconnect(&self, options: DisconnectOptions);
}

impl fmt::Debug for dyn RemoteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteChannel")
            .field("status", &self.status())
            .field("channel_id", &self.channel_id())
            .finish_non_exhaustive()
    }
}

/// Constructs channel instances from configuration.
pub trait ChannelFactory: Send + Sync + 'static {
    /// Build a new channel for the given host platform.
    fn create(&self, platform: PlatformType, options: &ChannelOptions) -> Arc<dyn RemoteChannel>;
}

/// Host timer kept running while a channel is alive.
///
/// Started after each channel initialization and stopped before the channel
/// is replaced.
pub trait BackgroundTimer: Send + Sync + 'static {
    /// Start ticking at `interval`.
    fn run(&self, interval: Duration);

    /// Stop a running timer.
    fn stop(&self);
}
