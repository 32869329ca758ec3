//! Connection orchestrator.
//!
//! [`RemoteConnection`] owns the remote channel. It decides how a fresh
//! channel reaches the wallet (scannable code on desktop and browserless
//! hosts, deeplink elsewhere), runs the secure-reconnection protocol when a
//! persisted channel is resumed, and recreates the channel after
//! termination.
//!
//! ```text
//! start_connection ─▶ ready? ──yes──────────────────────────────▶ Ok(true)
//!                       │no
//!                       ▼
//!              start_auto_connect ─ resumable ─▶ secure reconnection ─┐
//!                       │ none                                        │
//!                       ▼                                             ▼
//!              fresh identity ─▶ QR modal | deeplink ─▶ wait clients_ready
//!                                                                     │
//!                                       eth_requestAccounts (once) ◀──┘
//! ```

use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use walletlink_core::{
    BackgroundTimer, ChannelEvent, ChannelFactory, ChannelSlot, ModalFactory,
    ModalHandle, Platform, ProviderEvent, RemoteChannel, WalletProvider,
    platform::{is_trusted_device, shows_qr_code},
};
use walletlink_proto::{
    ChannelConfig, ChannelIdentity, DisconnectOptions, KeyInfo, RequestArguments, methods,
};

use crate::{ConnectionError, config::ConnectionOptions};

/// Interval the background timer is started with.
pub const BACKGROUND_TIMER_INTERVAL: Duration = Duration::from_secs(5);

/// Host collaborators of a [`RemoteConnection`].
#[derive(Clone)]
pub struct Collaborators {
    /// Builds channel instances.
    pub factory: Arc<dyn ChannelFactory>,
    /// Host capability query and link opening.
    pub platform: Arc<dyn Platform>,
    /// Wallet request interface used for account requests.
    pub provider: Arc<dyn WalletProvider>,
    /// Modal display.
    pub modals: Arc<dyn ModalFactory>,
    /// Optional host timer kept running while a channel is alive.
    pub timer: Option<Arc<dyn BackgroundTimer>>,
}

struct Inner {
    options: ConnectionOptions,
    deps: Collaborators,
    slot: ChannelSlot,
    channel: RwLock<Arc<dyn RemoteChannel>>,
    sent_first_connect: AtomicBool,
    universal_link: Mutex<Option<String>>,
    displayed_modal: Mutex<Option<Box<dyn ModalHandle>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Owner of the remote channel and its establishment protocols.
///
/// Cheap to clone; clones share one channel. Must be created inside a tokio
/// runtime.
#[derive(Clone)]
pub struct RemoteConnection {
    inner: Arc<Inner>,
}

impl RemoteConnection {
    /// Create the orchestrator and initialize its first channel.
    ///
    /// The channel is published through `slot`.
    pub fn new(options: ConnectionOptions, slot: ChannelSlot, deps: Collaborators) -> Self {
        let channel = deps.factory.create(deps.platform.platform_type(), &options.channel);
        let inner = Inner {
            options,
            deps,
            slot,
            channel: RwLock::new(channel),
            sent_first_connect: AtomicBool::new(false),
            universal_link: Mutex::new(None),
            displayed_modal: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        };

        let connection = Self { inner: Arc::new(inner) };
        let channel = connection.channel();
        connection.install_channel(channel);
        connection
    }

    /// Recreate the channel from configuration.
    ///
    /// Stops the background timer, abandons listeners of the previous channel
    /// and closes any displayed modal before the new channel is published.
    pub fn initialize_channel(&self) {
        let inner = &self.inner;
        debug!("re-initializing channel");

        if let Some(timer) = &inner.deps.timer {
            timer.stop();
        }
        for task in inner.tasks.lock().drain(..) {
            task.abort();
        }
        self.close_modal();

        let channel = inner.deps.factory.create(inner.deps.platform.platform_type(), &inner.options.channel);
        *inner.channel.write() = Arc::clone(&channel);
        self.install_channel(channel);
    }

    fn install_channel(&self, channel: Arc<dyn RemoteChannel>) {
        let inner = &self.inner;
        inner.sent_first_connect.store(false, Ordering::SeqCst);
        inner.slot.replace(Arc::clone(&channel));

        let events = channel.subscribe();
        self.track(tokio::spawn(reset_on_clients_disconnected(events, Arc::downgrade(inner))));

        if inner.options.channel.auto_connect.enable {
            let connection = self.downgrade();
            let channel = Arc::clone(&channel);
            self.track(tokio::spawn(async move {
                let Some(config) = channel.start_auto_connect().await else { return };
                if !config.is_resumable() {
                    return;
                }
                let Some(connection) = Self::upgrade(&connection) else { return };
                if let Err(error) = connection.handle_secure_reconnection(&config, false) {
                    warn!(%error, "secure reconnection after auto connect failed");
                }
            }));
        }

        if let Some(timer) = &inner.deps.timer {
            timer.run(BACKGROUND_TIMER_INTERVAL);
        }
    }

    /// Make sure a channel to the wallet is established.
    ///
    /// Resolves immediately when the channel is ready. Otherwise resumes a
    /// persisted channel or hands a fresh identity to the wallet, then waits
    /// for the wallet to join. The first join triggers exactly one account
    /// request per fresh connection.
    ///
    /// Fails with [`ConnectionError::Terminated`] if the channel is replaced
    /// while waiting.
    pub async fn start_connection(&self) -> Result<bool, ConnectionError> {
        let channel = self.channel();
        let platform = self.inner.deps.platform.as_ref();

        debug!(
            ready = channel.is_ready(),
            connected = channel.is_connected(),
            paused = channel.is_paused(),
            provider_connected = self.inner.deps.provider.is_connected(),
            "starting connection"
        );

        if channel.is_ready() {
            debug!("already connected");
            return Ok(true);
        }

        let show_qr_code = shows_qr_code(platform);
        let mut events = channel.subscribe();
        let mut replaced = self.inner.slot.watch();

        let config = channel.start_auto_connect().await;
        debug!(?config, "auto connect finished");

        match config.filter(ChannelConfig::is_resumable) {
            Some(config) => self.handle_secure_reconnection(&config, true)?,
            None => {
                let identity =
                    channel.generate_channel_id().await.map_err(ConnectionError::ChannelIdentity)?;
                let comm = self.inner.options.channel.communication_layer_preference;
                let links = self.inner.options.links.connect(&identity, comm, false)?;

                if show_qr_code {
                    self.show_modal(self.inner.deps.modals.install_modal(&links.universal));
                } else {
                    info!(link = %links.universal, "opening connect link");
                    platform.open_deeplink(&links.universal, &links.deeplink);
                }
                *self.inner.universal_link.lock() = Some(links.universal);
            },
        }
        drop(channel);

        loop {
            tokio::select! {
                _ = replaced.changed() => return Err(ConnectionError::Terminated),
                event = events.recv() => match event {
                    Ok(ChannelEvent::ClientsReady) => return self.on_clients_ready().await,
                    Ok(_) => {},
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "connection lagged behind channel notifications"),
                    Err(RecvError::Closed) => return Err(ConnectionError::Terminated),
                },
            }
        }
    }

    async fn on_clients_ready(&self) -> Result<bool, ConnectionError> {
        if self.inner.sent_first_connect.swap(true, Ordering::SeqCst) {
            debug!("clients ready, first connect already sent");
            return Ok(true);
        }

        debug!("clients ready, requesting accounts");
        if let Err(error) = self.inner.deps.provider.request(request_accounts()).await {
            self.inner.sent_first_connect.store(false, Ordering::SeqCst);
            return Err(error.into());
        }

        self.close_modal();
        Ok(true)
    }

    /// Re-establish a persisted channel without letting another device
    /// hijack it.
    ///
    /// On a trusted device with `deeplink` set, the connect link for the
    /// persisted channel is opened, asking the wallet to bounce back if the
    /// provider is already connected. On an untrusted device a waiting modal
    /// is shown until the provider connects again; the wallet is expected to
    /// reconnect on its own once the user approves there.
    pub fn handle_secure_reconnection(
        &self,
        config: &ChannelConfig,
        deeplink: bool,
    ) -> Result<(), ConnectionError> {
        let platform = self.inner.deps.platform.as_ref();
        let trusted = is_trusted_device(platform);
        let provider_connected = self.inner.deps.provider.is_connected();

        debug!(trusted, deeplink, provider_connected, channel_id = %config.channel_id, "secure reconnection");

        if trusted && deeplink {
            let pub_key = self.channel().key_info().map(|k| k.public_key).unwrap_or_default();
            let identity = ChannelIdentity::new(config.channel_id.as_str(), pub_key);
            let comm = self.inner.options.channel.communication_layer_preference;
            let links = self.inner.options.links.connect(&identity, comm, provider_connected)?;
            platform.open_deeplink(&links.universal, &links.deeplink);
        } else if !trusted {
            let events = self.inner.deps.provider.subscribe();
            self.show_modal(self.inner.deps.modals.pending_modal());
            self.track(tokio::spawn(request_accounts_on_connect(events, self.downgrade())));
        }

        Ok(())
    }

    /// Leave the channel. A terminating disconnect recreates it right away.
    pub fn disconnect(&self, options: DisconnectOptions) {
        debug!(terminate = options.terminate, "disconnecting");
        self.channel().disconnect(options);

        if options.terminate {
            self.initialize_channel();
        }
    }

    /// Universal link of the last fresh connection attempt.
    pub fn universal_link(&self) -> Result<String, ConnectionError> {
        self.inner.universal_link.lock().clone().ok_or(ConnectionError::NotStarted)
    }

    /// Persisted record of the current channel.
    pub fn channel_config(&self) -> Option<ChannelConfig> {
        self.channel().channel_config()
    }

    /// Key material of the current channel.
    pub fn key_info(&self) -> Option<KeyInfo> {
        self.channel().key_info()
    }

    /// Current channel instance.
    pub fn channel(&self) -> Arc<dyn RemoteChannel> {
        Arc::clone(&self.inner.channel.read())
    }

    /// Whether the current channel is ready.
    pub fn is_connected(&self) -> bool {
        self.channel().is_ready()
    }

    /// Whether the wallet side is paused.
    pub fn is_paused(&self) -> bool {
        self.channel().is_paused()
    }

    /// Host platform.
    pub fn platform(&self) -> Arc<dyn Platform> {
        Arc::clone(&self.inner.deps.platform)
    }

    /// Whether a modal is currently displayed.
    pub fn has_displayed_modal(&self) -> bool {
        self.inner.displayed_modal.lock().is_some()
    }

    fn show_modal(&self, modal: Box<dyn ModalHandle>) {
        let previous = self.inner.displayed_modal.lock().replace(modal);
        if let Some(previous) = previous {
            previous.close();
        }
    }

    fn close_modal(&self) {
        let modal = self.inner.displayed_modal.lock().take();
        if let Some(modal) = modal {
            modal.close();
        }
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.inner.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

impl std::fmt::Debug for RemoteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConnection")
            .field("channel", &self.channel())
            .field("sent_first_connect", &self.inner.sent_first_connect.load(Ordering::SeqCst))
            .field("universal_link", &*self.inner.universal_link.lock())
            .finish_non_exhaustive()
    }
}

fn request_accounts() -> RequestArguments {
    RequestArguments::new(methods::ETH_REQUEST_ACCOUNTS, json!([]))
}

async fn reset_on_clients_disconnected(
    mut events: broadcast::Receiver<ChannelEvent>,
    inner: Weak<Inner>,
) {
    loop {
        match events.recv().await {
            Ok(ChannelEvent::ClientsDisconnected) => {
                let Some(inner) = inner.upgrade() else { return };
                inner.sent_first_connect.store(false, Ordering::SeqCst);
                debug!("remote clients disconnected, first connect reset");
            },
            Ok(_) => {},
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "lagged behind channel notifications"),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn request_accounts_on_connect(
    mut events: broadcast::Receiver<ProviderEvent>,
    connection: Weak<Inner>,
) {
    loop {
        match events.recv().await {
            Ok(ProviderEvent::Connect { chain_id }) => {
                debug!(%chain_id, "provider connected after secure reconnection");
                break;
            },
            Ok(_) | Err(RecvError::Lagged(_)) => {},
            Err(RecvError::Closed) => return,
        }
    }

    let Some(connection) = RemoteConnection::upgrade(&connection) else { return };
    if let Err(error) = connection.inner.deps.provider.request(request_accounts()).await {
        warn!(%error, "account request after secure reconnection failed");
    }
    connection.close_modal();
}
