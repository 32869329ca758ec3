//! Channel identity, persisted channel record and connection status.
//!
//! These values are produced and owned by the transport. The orchestration
//! layer only reads them to decide between fresh channel creation and silent
//! reconnection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a channel, shared with the wallet through a link or QR code.
///
/// Created once per channel and immutable for the channel's lifetime. A new
/// identity only appears when the channel is torn down and recreated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelIdentity {
    /// Opaque channel identifier.
    pub channel_id: String,
    /// Public key of the application side, hex encoded.
    pub pub_key: String,
}

impl ChannelIdentity {
    /// Create an identity from its parts.
    pub fn new(channel_id: impl Into<String>, pub_key: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into(), pub_key: pub_key.into() }
    }
}

/// Persisted channel record, read at startup.
///
/// `last_active` present means a previously authenticated channel exists and
/// may be resumed without showing a new link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    /// Identifier of the stored channel.
    pub channel_id: String,
    /// Last activity timestamp (milliseconds since the Unix epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<u64>,
}

impl ChannelConfig {
    /// Whether this record describes a channel that may be resumed.
    pub fn is_resumable(&self) -> bool {
        self.last_active.is_some()
    }
}

/// Key material reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    /// ECIES public key of the application side, hex encoded.
    pub public_key: String,
}

/// Channel-level connection status.
///
/// ```text
/// Disconnected ──start──> Connecting ──clients ready──> Linked <──resume── Paused
///                              │                          │  └──pause──────^
///                              └─────── terminate ────────┴──> Terminated
/// ```
///
/// `Terminated` is irreversible for a channel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No session with the wallet.
    #[default]
    Disconnected,
    /// Waiting for the wallet to join the channel.
    Connecting,
    /// Both parties joined and exchanged keys.
    Linked,
    /// The wallet app went to the background.
    Paused,
    /// The channel was torn down for good.
    Terminated,
}

impl ConnectionStatus {
    /// Notification value used by the transport.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Linked => "linked",
            Self::Paused => "paused",
            Self::Terminated => "terminated",
        }
    }

    /// True once the channel can no longer be used.
    pub fn is_terminal(self) -> bool {
        self == Self::Terminated
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport preference advertised in connect links (`comm=` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationLayerPreference {
    /// Socket relay transport.
    #[default]
    Socket,
    /// Peer-to-peer WebRTC transport.
    Webrtc,
}

impl CommunicationLayerPreference {
    /// Value used in link parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Socket => "socket",
            Self::Webrtc => "webrtc",
        }
    }
}

impl fmt::Display for CommunicationLayerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for disconnecting a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisconnectOptions {
    /// Tear the channel down and forget its persisted record.
    #[serde(default)]
    pub terminate: bool,
}

impl DisconnectOptions {
    /// Disconnect and terminate the channel.
    pub fn terminate() -> Self {
        Self { terminate: true }
    }
}
