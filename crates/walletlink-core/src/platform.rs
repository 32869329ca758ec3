//! Host platform capability.
//!
//! Where the application runs decides how a channel is handed to the wallet:
//! a desktop browser cannot open the wallet app, so it shows a scannable
//! code; a phone can open the app directly. The same classification decides
//! whether writes may ever wake the wallet app.

use serde::{Deserialize, Serialize};

/// Host context the application runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformType {
    /// Desktop browser.
    #[serde(rename = "web-desktop")]
    DesktopWeb,
    /// Mobile browser.
    #[serde(rename = "web-mobile")]
    MobileWeb,
    /// The wallet's own in-app browser.
    #[serde(rename = "in-app-browser")]
    MetaMaskMobileWebview,
    /// Process without a browser (server, CLI).
    #[serde(rename = "nodejs")]
    NonBrowser,
    /// Embedded mobile runtime.
    #[serde(rename = "react-native")]
    ReactNative,
}

/// Capability query and link opening provided by the host.
pub trait Platform: Send + Sync + 'static {
    /// Current host context.
    fn platform_type(&self) -> PlatformType;

    /// Whether the host is the embedded mobile runtime.
    fn is_embedded_runtime(&self) -> bool {
        self.platform_type() == PlatformType::ReactNative
    }

    /// Whether the host lacks a browser.
    fn is_not_browser(&self) -> bool {
        matches!(self.platform_type(), PlatformType::NonBrowser | PlatformType::ReactNative)
    }

    /// Whether the host is a desktop browser.
    fn is_desktop_web(&self) -> bool {
        self.platform_type() == PlatformType::DesktopWeb
    }

    /// Open a wallet link in the current browsing context. Fire-and-forget.
    ///
    /// The universal link is preferred; `deeplink` is the app-scheme fallback.
    fn open_deeplink(&self, universal_link: &str, deeplink: &str);
}

/// Whether a fresh channel is handed over as a scannable code.
///
/// True on desktop browsers and on browserless hosts other than the embedded
/// runtime; everywhere else the deeplink is opened directly.
pub fn shows_qr_code<P: Platform + ?Sized>(platform: &P) -> bool {
    platform.is_desktop_web()
        || (platform.platform_type() == PlatformType::NonBrowser && !platform.is_embedded_runtime())
}

/// Whether the host runs on the same device class as the wallet.
pub fn is_trusted_device<P: Platform + ?Sized>(platform: &P) -> bool {
    !shows_qr_code(platform)
}

/// Whether writes from this host must never open a wallet link.
pub fn suppresses_redirect<P: Platform + ?Sized>(platform: &P) -> bool {
    !platform.is_embedded_runtime() && (platform.is_desktop_web() || platform.is_not_browser())
}
