//! Orchestrator and session options.

use serde::{Deserialize, Serialize};
use walletlink_core::{ChannelOptions, ProviderOptions, StreamOptions};
use walletlink_proto::{LinkConfig, PROVIDER_NAME};

/// Options of a [`crate::RemoteConnection`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionOptions {
    /// Handed to the channel factory on every (re)initialization.
    #[serde(flatten)]
    pub channel: ChannelOptions,
    /// Where connect links point.
    pub links: LinkConfig,
}

/// Options of a whole [`crate::Session`], as a host would load them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionOptions {
    /// Channel options.
    #[serde(flatten)]
    pub channel: ChannelOptions,
    /// Where every wallet link points.
    pub links: LinkConfig,
    /// Provider request timeout in milliseconds. Unbounded when absent.
    pub request_timeout_ms: Option<u64>,
    /// Start connecting as soon as the session starts (desktop web only).
    pub check_installation_immediately: bool,
}

impl SessionOptions {
    /// Orchestrator part.
    pub fn connection(&self) -> ConnectionOptions {
        ConnectionOptions { channel: self.channel.clone(), links: self.links.clone() }
    }

    /// Bridge part.
    pub fn stream(&self) -> StreamOptions {
        StreamOptions { name: PROVIDER_NAME.into(), links: self.links.clone() }
    }

    /// Provider part.
    pub fn provider(&self) -> ProviderOptions {
        ProviderOptions { name: PROVIDER_NAME.into(), request_timeout_ms: self.request_timeout_ms }
    }
}
