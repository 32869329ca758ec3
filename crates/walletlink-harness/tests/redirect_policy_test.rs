//! Write path of the stream bridge.
//!
//! Every write is delivered to the channel first; what happens afterwards
//! depends on the host platform, the method and whether the wallet app is
//! paused:
//! - Mobile hosts open a reauthorization link for sensitive methods
//! - Mobile hosts wake a paused wallet for everything else
//! - Desktop and browserless hosts never open links
//! - Writes on a channel that is not ready are dropped, except in the embedded
//!   runtime

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use serde_json::json;
use walletlink_core::{
    ChannelSlot, DuplexStream, PlatformType, RemoteChannel, RemoteStream, StreamError,
    StreamOptions, methods::METHODS_TO_REDIRECT,
};
use walletlink_harness::{SimChannel, SimPlatform};
use walletlink_proto::{Chunk, ChannelIdentity, PROVIDER_NAME, ProviderMessage};

struct Rig {
    slot: ChannelSlot,
    stream: RemoteStream,
    channel: Arc<SimChannel>,
    platform: Arc<SimPlatform>,
    identity: ChannelIdentity,
}

async fn rig(kind: PlatformType) -> Rig {
    let platform = Arc::new(SimPlatform::new(kind));
    let channel = SimChannel::standalone(kind, 11);
    let identity = channel.generate_channel_id().await.unwrap();

    let slot = ChannelSlot::new();
    slot.replace(channel.clone());
    let stream = RemoteStream::new(slot.clone(), platform.clone(), StreamOptions::default());

    Rig { slot, stream, channel, platform, identity }
}

fn request(method: &str) -> Chunk {
    Chunk::Message(ProviderMessage::new(
        PROVIDER_NAME,
        json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": [] }),
    ))
}

#[tokio::test]
async fn sensitive_method_reauthorizes_on_mobile() {
    let rig = rig(PlatformType::MobileWeb).await;
    rig.channel.set_ready(true);

    rig.stream.write(request("personal_sign")).await.unwrap();

    assert_eq!(rig.channel.sent_methods(), vec!["personal_sign"]);
    let opened = rig.platform.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].path(), Some("otp"));
    assert_eq!(opened[0].param("channelId").as_deref(), Some(rig.identity.channel_id.as_str()));
    assert_eq!(opened[0].param("pubkey").as_deref(), Some(rig.identity.pub_key.as_str()));
    assert!(opened[0].deeplink.starts_with("metamask://otp?"));
}

#[tokio::test]
async fn paused_wallet_is_woken_up() {
    let rig = rig(PlatformType::MetaMaskMobileWebview).await;
    rig.channel.set_ready(true);
    rig.channel.pause();

    rig.stream.write(request("eth_chainId")).await.unwrap();

    let opened = rig.platform.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].path(), Some("connect"));
    assert_eq!(opened[0].param("redirect").as_deref(), Some("true"));
    assert_eq!(opened[0].param("channelId").as_deref(), Some(rig.identity.channel_id.as_str()));
    assert_eq!(opened[0].param("comm").as_deref(), Some("socket"));
}

#[tokio::test]
async fn sensitive_method_on_paused_wallet_opens_one_link() {
    let rig = rig(PlatformType::MobileWeb).await;
    rig.channel.set_ready(true);
    rig.channel.pause();

    rig.stream.write(request("eth_sendTransaction")).await.unwrap();

    let opened = rig.platform.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].path(), Some("otp"));
}

#[tokio::test]
async fn plain_request_on_active_wallet_opens_nothing() {
    let rig = rig(PlatformType::MobileWeb).await;
    rig.channel.set_ready(true);

    rig.stream.write(request("eth_chainId")).await.unwrap();

    assert_eq!(rig.channel.sent_methods(), vec!["eth_chainId"]);
    assert!(rig.platform.opened().is_empty());
}

#[tokio::test]
async fn write_before_ready_is_dropped() {
    let rig = rig(PlatformType::MobileWeb).await;

    rig.stream.write(request("personal_sign")).await.unwrap();

    assert!(rig.channel.sent_messages().is_empty());
    assert!(rig.platform.opened().is_empty());
}

#[tokio::test]
async fn embedded_runtime_writes_before_ready() {
    let rig = rig(PlatformType::ReactNative).await;

    rig.stream.write(request("personal_sign")).await.unwrap();

    assert_eq!(rig.channel.sent_methods(), vec!["personal_sign"]);
    let opened = rig.platform.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].path(), Some("otp"));
}

#[tokio::test]
async fn send_failure_is_a_disconnect() {
    let rig = rig(PlatformType::MobileWeb).await;
    rig.channel.set_ready(true);
    rig.channel.fail_sends(true);

    let err = rig.stream.write(request("personal_sign")).await.unwrap_err();

    assert!(matches!(err, StreamError::Disconnected(_)));
    assert!(rig.platform.opened().is_empty());
}

#[tokio::test]
async fn binary_chunks_are_sent_as_octets() {
    let rig = rig(PlatformType::MobileWeb).await;
    rig.channel.set_ready(true);

    rig.stream.write(Chunk::Binary(Bytes::from_static(&[1, 2, 3]))).await.unwrap();

    assert_eq!(rig.channel.sent_messages(), vec![json!([1, 2, 3])]);
    assert!(rig.platform.opened().is_empty());
}

#[tokio::test]
async fn writes_follow_channel_replacement() {
    let rig = rig(PlatformType::MobileWeb).await;
    rig.channel.set_ready(true);

    let replacement = SimChannel::standalone(PlatformType::MobileWeb, 12);
    replacement.set_ready(true);
    rig.slot.replace(replacement.clone());

    rig.stream.write(request("eth_chainId")).await.unwrap();

    assert!(rig.channel.sent_messages().is_empty());
    assert_eq!(replacement.sent_methods(), vec!["eth_chainId"]);
}

fn method() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(METHODS_TO_REDIRECT).prop_map(str::to_owned),
        "[a-z]{2,8}_[a-zA-Z]{2,16}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn desktop_and_browserless_hosts_never_open_links(
        method in method(),
        paused in any::<bool>(),
        desktop in any::<bool>(),
    ) {
        let kind = if desktop { PlatformType::DesktopWeb } else { PlatformType::NonBrowser };
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let (sent, opened) = runtime.block_on(async {
            let rig = rig(kind).await;
            rig.channel.set_ready(true);
            if paused {
                rig.channel.pause();
            }
            rig.stream.write(request(&method)).await.unwrap();
            (rig.channel.sent_methods(), rig.platform.opened())
        });

        prop_assert_eq!(sent, vec![method]);
        prop_assert!(opened.is_empty());
    }
}
