//! Deterministic simulation harness for walletlink.
//!
//! Simulated implementations of every host collaborator: the remote channel
//! and its factory, the wallet on the other end, the platform, modals, timer,
//! extension and preference storage. Tests drive the wallet side explicitly
//! and observe what the application side did.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_channel;
pub mod sim_host;
pub mod sim_platform;
pub mod sim_ui;
pub mod sim_wallet;
pub mod wait;
pub mod world;

pub use sim_channel::{SimChannel, SimChannelFactory};
pub use sim_host::{MemoryPreferences, SimExtension};
pub use sim_platform::{OpenedLink, SimPlatform};
pub use sim_ui::{ModalKind, RecordingModals, SimTimer};
pub use sim_wallet::SimWallet;
pub use world::{World, WorldConfig};

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
