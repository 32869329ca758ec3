//! Connect, wake-up and reauthorization links.
//!
//! Every link exists in two forms: a universal link on the wallet's web host,
//! which the OS routes to the installed app or a web fallback, and an
//! app-scheme deeplink for hosts that cannot resolve universal links.
//!
//! ```text
//! connect      https://<host>/connect?channelId=..&comm=..&pubkey=..[&redirect=true]
//! wake-up      https://<host>/connect?redirect=true&channelId=..&pubkey=..&comm=socket
//! reauthorize  https://<host>/otp?channelId=..&pubkey=..&comm=socket
//! ```
//!
//! Parameter values are form-urlencoded: a space becomes `+` and reserved
//! characters such as `&`, `=` and `/` are percent-escaped. Hex keys and uuid
//! channel ids come out unchanged. Arbitrary strings will not match a link
//! built with plain URI escaping byte for byte.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ChannelIdentity, CommunicationLayerPreference, ProtocolError, Result};

/// Default universal-link host of the wallet.
pub const DEFAULT_UNIVERSAL_HOST: &str = "https://metamask.app.link";

/// Default app scheme of the wallet.
pub const DEFAULT_APP_SCHEME: &str = "metamask";

/// The pair of links that open the same wallet screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletLinks {
    /// HTTPS universal link.
    pub universal: String,
    /// App-scheme deeplink.
    pub deeplink: String,
}

#[derive(Debug, Clone, Copy)]
enum LinkPath {
    Connect,
    Otp,
}

impl LinkPath {
    fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Otp => "otp",
        }
    }
}

/// Where wallet links point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkConfig {
    /// Base URL of universal links.
    pub universal_host: String,
    /// Scheme of app deeplinks.
    pub app_scheme: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { universal_host: DEFAULT_UNIVERSAL_HOST.into(), app_scheme: DEFAULT_APP_SCHEME.into() }
    }
}

impl LinkConfig {
    /// Links that hand a channel identity to the wallet.
    ///
    /// `redirect` asks the wallet to bounce back to the application once the
    /// channel is approved.
    pub fn connect(
        &self,
        identity: &ChannelIdentity,
        comm: CommunicationLayerPreference,
        redirect: bool,
    ) -> Result<WalletLinks> {
        let mut params = vec![
            ("channelId", identity.channel_id.as_str()),
            ("comm", comm.as_str()),
            ("pubkey", identity.pub_key.as_str()),
        ];
        if redirect {
            params.push(("redirect", "true"));
        }
        self.build(LinkPath::Connect, &params)
    }

    /// Links that bring a backgrounded wallet app to the foreground.
    pub fn wake(&self, channel_id: &str, pub_key: &str) -> Result<WalletLinks> {
        self.build(
            LinkPath::Connect,
            &[("redirect", "true"), ("channelId", channel_id), ("pubkey", pub_key), ("comm", "socket")],
        )
    }

    /// One-time links that re-assert host approval for a sensitive method.
    pub fn reauthorize(&self, channel_id: &str, pub_key: &str) -> Result<WalletLinks> {
        self.build(
            LinkPath::Otp,
            &[("channelId", channel_id), ("pubkey", pub_key), ("comm", "socket")],
        )
    }

    fn build(&self, path: LinkPath, params: &[(&str, &str)]) -> Result<WalletLinks> {
        let mut universal = parse_base(&self.universal_host)?;
        universal.set_path(path.as_str());
        universal.query_pairs_mut().extend_pairs(params);

        let mut deeplink = parse_base(&format!("{}://{}", self.app_scheme, path.as_str()))?;
        deeplink.query_pairs_mut().extend_pairs(params);

        Ok(WalletLinks { universal: universal.into(), deeplink: deeplink.into() })
    }
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|source| ProtocolError::InvalidLinkBase { base: base.to_owned(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ChannelIdentity {
        ChannelIdentity::new("abc123", "04ab")
    }

    #[test]
    fn connect_link_for_fresh_channel() {
        let links =
            LinkConfig::default().connect(&identity(), CommunicationLayerPreference::Socket, false).unwrap();

        assert_eq!(links.universal, "https://metamask.app.link/connect?channelId=abc123&comm=socket&pubkey=04ab");
        insta::assert_snapshot!(links.deeplink, @"metamask://connect?channelId=abc123&comm=socket&pubkey=04ab");
    }

    #[test]
    fn connect_link_with_redirect() {
        let links =
            LinkConfig::default().connect(&identity(), CommunicationLayerPreference::Webrtc, true).unwrap();

        insta::assert_snapshot!(
            links.universal,
            @"https://metamask.app.link/connect?channelId=abc123&comm=webrtc&pubkey=04ab&redirect=true"
        );
    }

    #[test]
    fn wake_and_reauthorize_links() {
        let config = LinkConfig::default();

        let wake = config.wake("abc123", "04ab").unwrap();
        insta::assert_snapshot!(
            wake.universal,
            @"https://metamask.app.link/connect?redirect=true&channelId=abc123&pubkey=04ab&comm=socket"
        );
        insta::assert_snapshot!(
            wake.deeplink,
            @"metamask://connect?redirect=true&channelId=abc123&pubkey=04ab&comm=socket"
        );

        let otp = config.reauthorize("abc123", "04ab").unwrap();
        insta::assert_snapshot!(otp.universal, @"https://metamask.app.link/otp?channelId=abc123&pubkey=04ab&comm=socket");
        insta::assert_snapshot!(otp.deeplink, @"metamask://otp?channelId=abc123&pubkey=04ab&comm=socket");
    }

    #[test]
    fn custom_hosts() {
        let config = LinkConfig {
            universal_host: "https://wallet.example".into(),
            app_scheme: "examplewallet".into(),
        };
        let links = config.reauthorize("c1", "04").unwrap();
        assert_eq!(links.universal, "https://wallet.example/otp?channelId=c1&pubkey=04&comm=socket");
        assert_eq!(links.deeplink, "examplewallet://otp?channelId=c1&pubkey=04&comm=socket");
    }

    #[test]
    fn parameter_values_are_form_encoded() {
        let links = LinkConfig::default().reauthorize("a b&c", "04/ab").unwrap();
        assert_eq!(
            links.universal,
            "https://metamask.app.link/otp?channelId=a+b%26c&pubkey=04%2Fab&comm=socket"
        );
    }

    #[test]
    fn invalid_base_is_reported() {
        let config = LinkConfig { universal_host: "not a url".into(), ..LinkConfig::default() };
        let err = config.wake("c1", "04").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidLinkBase { .. }));
    }
}
