//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while building or interpreting protocol values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A configured link base could not be parsed as a URL.
    #[error("invalid link base {base:?}: {source}")]
    InvalidLinkBase {
        /// The offending base string.
        base: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// A payload did not have the expected JSON shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
