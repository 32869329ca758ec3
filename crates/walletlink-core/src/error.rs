//! Error types for channel, stream and provider operations.

use std::error::Error as StdError;

use thiserror::Error;
use walletlink_proto::{JsonRpcError, ProtocolError};

/// Failures reported by the transport channel collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A fresh channel identity could not be produced.
    #[error("channel identity generation failed: {0}")]
    IdentityGeneration(String),

    /// A message could not be handed to the transport.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The channel instance was terminated.
    #[error("channel terminated")]
    Terminated,
}

/// Failure of a single write on the provider stream.
///
/// Every failure after the readiness check is reported as a disconnect; the
/// write is not retried and the channel stays usable.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The write could not be delivered over the remote channel.
    #[error("remote stream disconnected")]
    Disconnected(#[source] Box<dyn StdError + Send + Sync>),
}

impl StreamError {
    pub(crate) fn disconnected(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Disconnected(source.into())
    }
}

/// Failures surfaced by the wallet provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The wallet answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the wallet.
        message: String,
    },

    /// State initialization was attempted on an initialized provider.
    #[error("provider already initialized")]
    AlreadyInitialized,

    /// The state snapshot could not be fetched or decoded.
    #[error("failed to get initial state: {0}")]
    StateFetch(#[source] Box<ProviderError>),

    /// The request could not be written to the stream.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The pending request was dropped before an answer arrived.
    #[error("request {method} was dropped before completion")]
    ResponseDropped {
        /// Method of the dropped request.
        method: String,
    },

    /// No answer arrived within the configured timeout.
    #[error("request {method} timed out")]
    Timeout {
        /// Method of the timed out request.
        method: String,
    },

    /// A payload did not have the expected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<JsonRpcError> for ProviderError {
    fn from(error: JsonRpcError) -> Self {
        Self::Rpc { code: error.code, message: error.message }
    }
}
