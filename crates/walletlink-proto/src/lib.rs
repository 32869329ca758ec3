//! Wire and data types for walletlink.
//!
//! The remote channel carries opaque JSON payloads between an application and
//! a wallet running on another device or process. This crate defines the
//! shapes that cross that boundary: the channel identity the wallet scans or
//! follows, the persisted channel record used for silent reconnection, the
//! envelopes written by the provider and filtered on the way back, the
//! JSON-RPC request/response framing, and the connect/reauthorize links.
//!
//! Nothing here performs I/O. Encryption, key exchange and framing belong to
//! the transport and are out of reach of this crate.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod envelope;
pub mod errors;
pub mod links;
pub mod rpc;
pub mod state;

pub use channel::{
    ChannelConfig, ChannelIdentity, CommunicationLayerPreference, ConnectionStatus,
    DisconnectOptions, KeyInfo,
};
pub use envelope::{
    Chunk, InboundChunk, OutboundEnvelope, PROVIDER_NAME, ProviderMessage, filter_inbound,
};
pub use errors::{ProtocolError, Result};
pub use links::{LinkConfig, WalletLinks};
pub use rpc::{
    InboundRpc, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestArguments,
    methods,
};
pub use state::{ChainChangedParams, ProviderStateSnapshot, UnlockStateParams};
