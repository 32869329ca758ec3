//! Provider envelopes and inbound message filtering.
//!
//! The provider multiplexes its traffic by routing tag: every message it
//! writes is `{ name, data }` where `name` selects the substream. Outgoing
//! writes become an [`OutboundEnvelope`] whose `data` is handed to the
//! channel. Incoming channel messages are only accepted when they carry the
//! provider's own tag; anything else sharing the channel is noise.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Routing tag reserved for the wallet provider substream.
pub const PROVIDER_NAME: &str = "metamask-provider";

/// Marker used to ship raw byte buffers through a JSON channel.
const BUFFER_TYPE: &str = "Buffer";

/// A message addressed to a named provider substream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// Routing tag.
    pub name: String,
    /// RPC payload.
    pub data: Value,
}

impl ProviderMessage {
    /// Create a message for the given routing tag.
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self { name: name.into(), data }
    }
}

/// One write issued by the provider side of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// A structured, tagged message.
    Message(ProviderMessage),
    /// A raw byte buffer.
    Binary(Bytes),
}

/// Channel-ready form of a provider write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEnvelope {
    /// Routing tag, absent for raw buffers.
    pub name: Option<String>,
    /// Payload handed to the channel.
    pub data: Value,
    /// Set when `data` was reconstructed from a byte buffer.
    pub is_binary: bool,
}

impl OutboundEnvelope {
    /// Convert a provider write into its transportable shape.
    ///
    /// Byte buffers travel as an array of octets and are flagged so the
    /// receiver can rebuild them.
    pub fn from_chunk(chunk: Chunk) -> Self {
        match chunk {
            Chunk::Message(ProviderMessage { name, data }) => {
                Self { name: Some(name), data, is_binary: false }
            },
            Chunk::Binary(bytes) => {
                let octets = bytes.iter().map(|b| Value::from(*b)).collect();
                Self { name: None, data: Value::Array(octets), is_binary: true }
            },
        }
    }

    /// The inner payload sent through the channel.
    pub fn payload(&self) -> &Value {
        &self.data
    }

    /// RPC method carried by the payload, if any.
    pub fn method(&self) -> Option<&str> {
        self.data.get("method").and_then(Value::as_str)
    }
}

/// A message accepted by the read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundChunk {
    /// A tagged provider message.
    Message(ProviderMessage),
    /// A byte buffer rebuilt from its JSON form.
    Binary(Bytes),
}

/// Decide whether an inbound channel message belongs to the provider.
///
/// A message is accepted only when it is an object, its `data` field is an
/// object, it carries a `name`, and that name equals `name`. Buffer-shaped
/// payloads (`{"type":"Buffer","data":[..]}`) are rebuilt into bytes. Every
/// other message is discarded without error.
pub fn filter_inbound(message: &Value, name: &str) -> Option<InboundChunk> {
    let object = message.as_object()?;
    let data = object.get("data").filter(|d| d.is_object())?;
    let tag = object.get("name").and_then(Value::as_str).filter(|t| !t.is_empty())?;

    if tag != name {
        return None;
    }

    if let Some(bytes) = data.as_object().and_then(buffer_bytes) {
        return Some(InboundChunk::Binary(bytes));
    }

    Some(InboundChunk::Message(ProviderMessage::new(tag, data.clone())))
}

fn buffer_bytes(object: &Map<String, Value>) -> Option<Bytes> {
    if object.get("type").and_then(Value::as_str) != Some(BUFFER_TYPE) {
        return None;
    }

    let octets = object.get("data")?.as_array()?;
    octets
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect::<Option<Vec<u8>>>()
        .map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_provider_tag() {
        let msg = json!({ "name": PROVIDER_NAME, "data": { "id": 1, "result": "0x1" } });
        let accepted = filter_inbound(&msg, PROVIDER_NAME).unwrap();
        assert_eq!(
            accepted,
            InboundChunk::Message(ProviderMessage::new(
                PROVIDER_NAME,
                json!({ "id": 1, "result": "0x1" })
            ))
        );
    }

    #[test]
    fn rejects_foreign_and_malformed() {
        let cases = [
            json!(null),
            json!("metamask-provider"),
            json!([1, 2, 3]),
            json!({ "name": "other", "data": {} }),
            json!({ "name": PROVIDER_NAME }),
            json!({ "name": PROVIDER_NAME, "data": "text" }),
            json!({ "name": PROVIDER_NAME, "data": null }),
            json!({ "data": {} }),
            json!({ "name": "", "data": {} }),
        ];

        for case in cases {
            assert!(filter_inbound(&case, PROVIDER_NAME).is_none(), "accepted {case}");
        }
    }

    #[test]
    fn rebuilds_buffer_payloads() {
        let msg = json!({ "name": PROVIDER_NAME, "data": { "type": "Buffer", "data": [1, 2, 255] } });
        assert_eq!(
            filter_inbound(&msg, PROVIDER_NAME),
            Some(InboundChunk::Binary(Bytes::from_static(&[1, 2, 255])))
        );

        // Out-of-range octets are not a buffer; the object passes through untouched.
        let msg = json!({ "name": PROVIDER_NAME, "data": { "type": "Buffer", "data": [256] } });
        assert!(matches!(filter_inbound(&msg, PROVIDER_NAME), Some(InboundChunk::Message(_))));
    }

    #[test]
    fn binary_chunks_are_flagged() {
        let envelope = OutboundEnvelope::from_chunk(Chunk::Binary(Bytes::from_static(&[7, 8])));
        assert!(envelope.is_binary);
        assert_eq!(envelope.name, None);
        assert_eq!(envelope.payload(), &json!([7, 8]));
        assert_eq!(envelope.method(), None);
    }

    #[test]
    fn message_chunks_expose_method() {
        let chunk = Chunk::Message(ProviderMessage::new(
            PROVIDER_NAME,
            json!({ "jsonrpc": "2.0", "id": 3, "method": "eth_chainId" }),
        ));
        let envelope = OutboundEnvelope::from_chunk(chunk);
        assert!(!envelope.is_binary);
        assert_eq!(envelope.method(), Some("eth_chainId"));
    }

    proptest! {
        #[test]
        fn only_the_reserved_tag_is_accepted(tag in "[a-z-]{0,20}", id in any::<u32>()) {
            let msg = json!({ "name": &tag, "data": { "id": id } });
            let accepted = filter_inbound(&msg, PROVIDER_NAME).is_some();
            prop_assert_eq!(accepted, tag == PROVIDER_NAME);
        }
    }
}
