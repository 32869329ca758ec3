//! Walletlink application layer
//!
//! Connection orchestration on top of [`walletlink_core`], plus the wiring
//! that assembles a working session from host collaborators.
//!
//! # Components
//!
//! - [`RemoteConnection`]: Connection Orchestrator (channel lifecycle, QR vs
//!   deeplink, secure reconnection)
//! - [`Session`]: Slot, bridge, provider and orchestrator wired together
//! - [`startup`]: Extension and immediate connections at session start
//! - [`ConnectionError`]: Orchestration errors

#![forbid(unsafe_code)]

mod config;
mod connection;
mod error;
mod session;
pub mod startup;

pub use config::{ConnectionOptions, SessionOptions};
pub use connection::{BACKGROUND_TIMER_INTERVAL, Collaborators, RemoteConnection};
pub use error::ConnectionError;
pub use session::{Session, SessionBuilder};
