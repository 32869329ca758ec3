//! Simulated host platform.

use parking_lot::Mutex;
use url::Url;
use walletlink_core::{Platform, PlatformType};

/// One `open_deeplink` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedLink {
    /// Universal link.
    pub universal: String,
    /// App-scheme deeplink.
    pub deeplink: String,
    parsed: Option<Url>,
}

impl OpenedLink {
    /// Record a link pair. An unparseable universal link has no path or
    /// params.
    pub fn new(universal: impl Into<String>, deeplink: impl Into<String>) -> Self {
        let universal = universal.into();
        let parsed = Url::parse(&universal).ok();
        Self { universal, deeplink: deeplink.into(), parsed }
    }

    /// Path of the universal link (`connect`, `otp`).
    pub fn path(&self) -> Option<&str> {
        self.parsed.as_ref().map(|url| url.path().trim_start_matches('/'))
    }

    /// Decoded value of query parameter `key` in the universal link.
    pub fn param(&self, key: &str) -> Option<String> {
        self.parsed
            .as_ref()?
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Platform of a fixed type recording every link it opens.
#[derive(Debug)]
pub struct SimPlatform {
    kind: PlatformType,
    opened: Mutex<Vec<OpenedLink>>,
}

impl SimPlatform {
    /// Platform of type `kind`.
    pub fn new(kind: PlatformType) -> Self {
        Self { kind, opened: Mutex::new(Vec::new()) }
    }

    /// Links opened so far, in order.
    pub fn opened(&self) -> Vec<OpenedLink> {
        self.opened.lock().clone()
    }

    /// Forget recorded links.
    pub fn clear(&self) {
        self.opened.lock().clear();
    }
}

impl Platform for SimPlatform {
    fn platform_type(&self) -> PlatformType {
        self.kind
    }

    fn open_deeplink(&self, universal_link: &str, deeplink: &str) {
        self.opened.lock().push(OpenedLink::new(universal_link, deeplink));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_accessors() {
        let link = OpenedLink::new(
            "https://metamask.app.link/otp?channelId=c1&pubkey=04&comm=socket",
            "metamask://otp?channelId=c1&pubkey=04&comm=socket",
        );
        assert_eq!(link.path(), Some("otp"));
        assert_eq!(link.param("channelId").as_deref(), Some("c1"));
        assert_eq!(link.param("redirect"), None);

        let broken = OpenedLink::new("not a url", "metamask://otp");
        assert_eq!(broken.path(), None);
        assert_eq!(broken.param("channelId"), None);
    }
}
