//! Configuration for channels, the provider stream and the provider.
//!
//! All structs implement `Default` and deserialize with camelCase keys, so
//! hosts can load them from any serde format and override single fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use walletlink_proto::{CommunicationLayerPreference, LinkConfig, PROVIDER_NAME};

/// Metadata about the requesting application, shown by the wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DappMetadata {
    /// Display name.
    pub name: String,
    /// Origin URL.
    pub url: String,
    /// Optional icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Key options handed to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EciesOptions {
    /// Fixed private key, hex encoded. Generated by the transport when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Persistence options handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageOptions {
    /// Persist the channel record between runs.
    pub enabled: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Silent reconnection options. Off unless enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoConnectOptions {
    /// Look for a persisted channel as soon as the channel is created.
    pub enable: bool,
}

/// Everything a [`crate::ChannelFactory`] needs to build a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelOptions {
    /// Preferred transport, advertised in connect links.
    pub communication_layer_preference: CommunicationLayerPreference,
    /// Requesting application.
    pub dapp_metadata: Option<DappMetadata>,
    /// Allowed socket transports (`websocket`, `polling`).
    pub transports: Vec<String>,
    /// Relay server override.
    pub communication_server_url: Option<String>,
    /// Report anonymous connection analytics.
    pub enable_analytics: bool,
    /// Key options.
    pub ecies: EciesOptions,
    /// Persistence options.
    pub storage: StorageOptions,
    /// Silent reconnection options.
    pub auto_connect: AutoConnectOptions,
}

/// Options of the provider stream bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamOptions {
    /// Routing tag of provider messages.
    pub name: String,
    /// Where wake-up and reauthorization links point.
    pub links: LinkConfig,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self { name: PROVIDER_NAME.into(), links: LinkConfig::default() }
    }
}

/// Options of the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderOptions {
    /// Routing tag of provider messages.
    pub name: String,
    /// Give up on a request after this many milliseconds. Unbounded when absent.
    pub request_timeout_ms: Option<u64>,
}

impl ProviderOptions {
    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self { name: PROVIDER_NAME.into(), request_timeout_ms: None }
    }
}
