//! Provider state payloads sent by the wallet.

use serde::{Deserialize, Serialize};

/// Canonical state snapshot answered to `metamask_getProviderState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStateSnapshot {
    /// Exposed accounts, most recently selected first.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Active chain id, `0x` prefixed.
    pub chain_id: String,
    /// Whether the wallet is unlocked.
    #[serde(default)]
    pub is_unlocked: bool,
    /// Legacy network id; some mobile wallets omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_version: Option<String>,
}

/// Params of a `metamask_chainChanged` notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainChangedParams {
    /// New chain id.
    #[serde(default)]
    pub chain_id: Option<String>,
    /// New network version.
    #[serde(default)]
    pub network_version: Option<String>,
}

/// Params of a `metamask_unlockStateChanged` notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockStateParams {
    /// Accounts exposed after the change.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// New lock state.
    #[serde(default)]
    pub is_unlocked: bool,
}
