//! Fuzz JSON-RPC classification of provider payloads.

#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use walletlink_proto::InboundRpc;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    if let Ok(InboundRpc::Response(response)) = InboundRpc::from_value(payload) {
        // Must not panic regardless of which half is present.
        let _ = response.into_result();
    }
});
