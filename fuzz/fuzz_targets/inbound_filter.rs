//! Fuzz the inbound routing-tag filter with arbitrary channel messages.
//!
//! Accepted messages always carry the provider tag; buffer payloads decode
//! to exactly the octets they list.

#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use walletlink_proto::{InboundChunk, PROVIDER_NAME, filter_inbound};

fuzz_target!(|data: &[u8]| {
    let Ok(message) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    match filter_inbound(&message, PROVIDER_NAME) {
        Some(InboundChunk::Message(accepted)) => {
            assert_eq!(accepted.name, PROVIDER_NAME);
            assert!(accepted.data.is_object());
        },
        Some(InboundChunk::Binary(bytes)) => {
            let octets = message["data"]["data"].as_array().map(Vec::len);
            assert_eq!(octets, Some(bytes.len()));
        },
        None => {},
    }
});
