//! Connection orchestration errors.

use thiserror::Error;
use walletlink_core::{ChannelError, ProviderError};
use walletlink_proto::ProtocolError;

/// Failures of connection establishment and session setup.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The channel could not produce a fresh identity. Not retried.
    #[error("channel identity generation failed")]
    ChannelIdentity(#[source] ChannelError),

    /// A connection attempt must run before its link can be read.
    #[error("connection not started. run start_connection() first.")]
    NotStarted,

    /// The channel was terminated and replaced while the attempt was pending.
    #[error("channel terminated before the connection completed")]
    Terminated,

    /// The account request through the provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A connect link could not be built.
    #[error(transparent)]
    Link(#[from] ProtocolError),

    /// A session was built without a required collaborator.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}
