//! Read path of the stream bridge.
//!
//! Channel `message` notifications reach the provider's reader only when they
//! carry the provider routing tag and an object payload. Lifecycle
//! notifications of a replaced channel keep flowing without rewiring.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use serde_json::json;
use tokio::time::timeout;
use walletlink_core::{ChannelSlot, DuplexStream, PlatformType, RemoteStream, StreamOptions};
use walletlink_harness::{SimChannel, SimPlatform, wait};
use walletlink_proto::{InboundChunk, PROVIDER_NAME, ProviderMessage};

fn bridge(slot: &ChannelSlot) -> Arc<RemoteStream> {
    let platform = Arc::new(SimPlatform::new(PlatformType::MobileWeb));
    Arc::new(RemoteStream::new(slot.clone(), platform, StreamOptions::default()))
}

async fn next(stream: &RemoteStream) -> Option<InboundChunk> {
    timeout(Duration::from_millis(50), stream.read()).await.ok().flatten()
}

#[tokio::test]
async fn only_provider_messages_are_pushed() {
    let slot = ChannelSlot::new();
    let channel = SimChannel::standalone(PlatformType::MobileWeb, 3);
    slot.replace(channel.clone());

    let stream = bridge(&slot);
    let _listener = stream.listen(Weak::new());

    channel.push_message(json!({ "name": "other", "data": {} }));
    channel.push_message(json!({ "name": PROVIDER_NAME, "data": "not an object" }));
    channel.push_message(json!({ "data": { "id": 9 } }));
    channel.push_message(json!({ "name": PROVIDER_NAME, "data": {} }));

    assert_eq!(
        next(&stream).await,
        Some(InboundChunk::Message(ProviderMessage::new(PROVIDER_NAME, json!({}))))
    );
    assert_eq!(next(&stream).await, None);
}

#[tokio::test]
async fn accepted_messages_keep_their_order() {
    let slot = ChannelSlot::new();
    let channel = SimChannel::standalone(PlatformType::MobileWeb, 4);
    slot.replace(channel.clone());

    let stream = bridge(&slot);
    let _listener = stream.listen(Weak::new());

    for id in 0..5 {
        channel.push_message(json!({ "name": PROVIDER_NAME, "data": { "id": id } }));
        channel.push_message(json!({ "name": "metamask-contentscript", "data": { "id": id } }));
    }

    for id in 0..5 {
        let Some(InboundChunk::Message(message)) = next(&stream).await else {
            panic!("message {id} missing");
        };
        assert_eq!(message.data, json!({ "id": id }));
    }
    assert_eq!(next(&stream).await, None);
}

#[tokio::test]
async fn listener_follows_channel_replacement() {
    let slot = ChannelSlot::new();
    let first = SimChannel::standalone(PlatformType::MobileWeb, 5);
    slot.replace(first.clone());

    let stream = bridge(&slot);
    let _listener = stream.listen(Weak::new());

    let second = SimChannel::standalone(PlatformType::MobileWeb, 6);
    slot.replace(second.clone());
    assert!(wait::until(|| second.receiver_count() == 1).await);

    second.push_message(json!({ "name": PROVIDER_NAME, "data": { "from": "second" } }));
    let Some(InboundChunk::Message(message)) = next(&stream).await else {
        panic!("message from replacement channel missing");
    };
    assert_eq!(message.data, json!({ "from": "second" }));
}

#[tokio::test]
async fn listener_waits_for_a_first_channel() {
    let slot = ChannelSlot::new();
    let stream = bridge(&slot);
    let _listener = stream.listen(Weak::new());

    let channel = SimChannel::standalone(PlatformType::MobileWeb, 8);
    slot.replace(channel.clone());
    assert!(wait::until(|| channel.receiver_count() == 1).await);

    channel.push_message(json!({ "name": PROVIDER_NAME, "data": { "id": 1 } }));
    assert!(next(&stream).await.is_some());
}
