//! Methods that need the wallet app in the foreground.
//!
//! Writing one of these methods from a phone opens a one-time reauthorization
//! link so the user can approve it in the wallet app.

use std::{collections::HashSet, sync::LazyLock};

/// Methods requiring wallet-app wake-up.
pub const METHODS_TO_REDIRECT: &[&str] = &[
    "eth_requestAccounts",
    "eth_sendTransaction",
    "eth_signTransaction",
    "eth_sign",
    "personal_sign",
    "eth_signTypedData",
    "eth_signTypedData_v3",
    "eth_signTypedData_v4",
    "wallet_requestPermissions",
    "wallet_switchEthereumChain",
    "wallet_addEthereumChain",
    "wallet_watchAsset",
    "metamask_connectSign",
    "metamask_connectWith",
    "metamask_batch",
];

static DEFAULT_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| METHODS_TO_REDIRECT.iter().copied().collect());

/// Fixed membership test over [`METHODS_TO_REDIRECT`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectMethodSet;

impl RedirectMethodSet {
    /// Whether `method` requires waking the wallet app.
    pub fn contains(self, method: &str) -> bool {
        DEFAULT_SET.contains(method)
    }
}
