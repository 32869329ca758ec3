//! Duplex stream capability between the provider and the channel bridge.
//!
//! The provider writes [`Chunk`]s into the stream and reads back whatever the
//! bridge accepted from the channel. Anything implementing [`DuplexStream`]
//! can sit under a provider, which is how tests drive the provider without a
//! channel.

use async_trait::async_trait;
use walletlink_proto::{Chunk, InboundChunk};

use crate::StreamError;

/// Separate write and read halves of a provider stream.
#[async_trait]
pub trait DuplexStream: Send + Sync + 'static {
    /// Write one chunk toward the wallet.
    ///
    /// Completion means the chunk was handed over or deliberately dropped.
    async fn write(&self, chunk: Chunk) -> Result<(), StreamError>;

    /// Next accepted inbound chunk.
    ///
    /// Returns `None` once the stream is closed.
    async fn read(&self) -> Option<InboundChunk>;
}
