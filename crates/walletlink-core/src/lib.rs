//! Walletlink core
//!
//! Everything between the host application's wallet requests and the remote
//! channel, except connection orchestration.
//!
//! # Architecture
//!
//! External concerns are consumed through narrow contracts: the encrypted
//! transport through [`RemoteChannel`], host detection and link opening
//! through [`Platform`], on-screen modals through [`ModalFactory`]. Production
//! hosts plug in their own implementations; the harness plugs in simulated
//! ones.
//!
//! Requests flow through two layers:
//!
//! ```text
//! host ──request──▶ SdkProvider ──Chunk──▶ RemoteStream ──message──▶ RemoteChannel
//!      ◀──events─── (state shim)  ◀─read─── (bridge)     ◀─notify──
//! ```
//!
//! The bridge never owns the channel. It reads the current instance from a
//! [`ChannelSlot`] on every write, so a channel recreated after termination
//! is picked up without rewiring.
//!
//! # Components
//!
//! - [`provider`]: Provider State Shim ([`SdkProvider`]) and the
//!   [`WalletProvider`] interface
//! - [`bridge`]: Transport Stream Bridge ([`RemoteStream`])
//! - [`transport`]: Remote channel, channel factory and timer contracts
//! - [`platform`]: Host capability query and link opening
//! - [`methods`]: Methods that wake the wallet app
//! - [`rpc`]: JSON-RPC request correlation
//! - [`slot`]: Current-channel slot
//! - [`ui`]: Modal handles
//! - [`config`]: Options for channels, stream and provider
//! - [`error`]: Error types

#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod methods;
pub mod platform;
pub mod provider;
pub mod rpc;
pub mod slot;
pub mod stream;
pub mod transport;
pub mod ui;

pub use bridge::RemoteStream;
pub use config::{ChannelOptions, ProviderOptions, StreamOptions};
pub use error::{ChannelError, ProviderError, StreamError};
pub use methods::RedirectMethodSet;
pub use platform::{Platform, PlatformType};
pub use provider::{ProviderEvent, ProviderState, SdkProvider, WalletProvider};
pub use slot::ChannelSlot;
pub use stream::DuplexStream;
pub use transport::{BackgroundTimer, ChannelEvent, ChannelFactory, RemoteChannel};
pub use ui::{ModalFactory, ModalHandle};
