//! Provider state as observed by the host application.

use serde::Serialize;

/// Wallet-facing state owned by the provider.
///
/// Mutated only by initialization, chain-changed, unlock-state,
/// accounts-changed and disconnect handling. `initialized` is cleared right
/// before every initialization attempt, so a reader never sees a
/// half-populated state flagged as ready.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderState {
    /// Exposed accounts, selected account first.
    pub accounts: Vec<String>,
    /// Active chain id.
    pub chain_id: Option<String>,
    /// Legacy network id.
    pub network_version: Option<String>,
    /// Whether the wallet is unlocked.
    pub is_unlocked: bool,
    /// Whether the provider can reach the wallet.
    pub is_connected: bool,
    /// Whether the initial snapshot was applied.
    pub initialized: bool,
}

impl ProviderState {
    /// Currently selected account.
    pub fn selected_address(&self) -> Option<&str> {
        self.accounts.first().map(String::as_str)
    }
}
