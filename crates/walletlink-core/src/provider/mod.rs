//! Wallet provider over a duplex stream.
//!
//! [`SdkProvider`] implements the wallet request interface on top of any
//! [`DuplexStream`]. Requests are framed as JSON-RPC and correlated by id;
//! wallet notifications are applied to a [`ProviderState`] and re-emitted as
//! [`ProviderEvent`]s.
//!
//! Two upstream timing defects are repaired here:
//!
//! - State initialization can run again at any time. `initialized` is cleared
//!   before each attempt and stays cleared when the attempt fails.
//! - A chain change without a network version falls back to `"1"` instead of
//!   propagating a missing value.

mod state;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
pub use state::ProviderState;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, warn};
use walletlink_proto::{
    ChainChangedParams, Chunk, InboundChunk, InboundRpc, JsonRpcNotification, JsonRpcRequest,
    ProtocolError, ProviderMessage, ProviderStateSnapshot, RequestArguments, UnlockStateParams,
    methods,
};

use crate::{DuplexStream, ProviderError, config::ProviderOptions, rpc::PendingRequests};

const EVENT_CAPACITY: usize = 64;

/// Substituted when a chain change arrives without a network version.
pub const DEFAULT_NETWORK_VERSION: &str = "1";

/// Network version reported by a wallet that is still switching networks.
const LOADING_NETWORK_VERSION: &str = "loading";

/// Lifecycle event emitted to the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The provider can reach the wallet (`connect`).
    Connect {
        /// Chain id at connection time.
        chain_id: String,
    },
    /// The wallet became unreachable (`disconnect`).
    Disconnect,
    /// Active chain changed (`chainChanged`).
    ChainChanged(String),
    /// Legacy network id changed (`networkChanged`).
    NetworkChanged(String),
    /// Exposed accounts changed (`accountsChanged`).
    AccountsChanged(Vec<String>),
    /// The initial state snapshot was applied.
    Initialized,
}

/// Wallet request interface used by the orchestration layer.
#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Issue one request and wait for its result.
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderError>;

    /// Whether the wallet is reachable.
    fn is_connected(&self) -> bool;

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Wallet provider with repaired initialization and chain handling.
pub struct SdkProvider {
    stream: Arc<dyn DuplexStream>,
    options: ProviderOptions,
    pending: PendingRequests,
    state: RwLock<ProviderState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl SdkProvider {
    /// Create a provider writing to and reading from `stream`.
    ///
    /// Nothing is read until [`Self::spawn_reader`] runs.
    pub fn new(stream: Arc<dyn DuplexStream>, options: ProviderOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            stream,
            options,
            pending: PendingRequests::new(),
            state: RwLock::new(ProviderState::default()),
            events,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ProviderState {
        self.state.read().clone()
    }

    /// Start routing inbound stream chunks into this provider.
    ///
    /// The task ends when the stream closes or the provider is dropped.
    pub fn spawn_reader(self: &Arc<Self>) -> JoinHandle<()> {
        let stream = Arc::clone(&self.stream);
        let provider = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(chunk) = stream.read().await {
                let Some(provider) = provider.upgrade() else { break };
                provider.handle_inbound(chunk);
            }
            debug!("provider reader stopped");
        })
    }

    /// Route one inbound chunk: responses to their requests, notifications
    /// to the state handlers.
    pub fn handle_inbound(&self, chunk: InboundChunk) {
        let message = match chunk {
            InboundChunk::Message(message) => message,
            InboundChunk::Binary(bytes) => {
                debug!(len = bytes.len(), "ignoring binary provider chunk");
                return;
            },
        };

        match InboundRpc::from_value(message.data) {
            Ok(InboundRpc::Response(response)) => {
                self.pending.complete(response);
            },
            Ok(InboundRpc::Notification(notification)) => self.handle_notification(notification),
            Err(error) => debug!(%error, "discarding provider message"),
        }
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        let JsonRpcNotification { method, params } = notification;
        match method.as_str() {
            methods::METAMASK_CHAIN_CHANGED => match serde_json::from_value(params) {
                Ok(params) => self.handle_chain_changed(params),
                Err(error) => warn!(%error, "malformed chain change notification"),
            },
            methods::METAMASK_ACCOUNTS_CHANGED => match serde_json::from_value(params) {
                Ok(accounts) => self.handle_accounts_changed(accounts),
                Err(error) => warn!(%error, "malformed accounts change notification"),
            },
            methods::METAMASK_UNLOCK_STATE_CHANGED => match serde_json::from_value(params) {
                Ok(params) => self.handle_unlock_state_changed(params),
                Err(error) => warn!(%error, "malformed unlock state notification"),
            },
            _ => debug!(%method, "unhandled wallet notification"),
        }
    }

    /// Fetch and apply the wallet state, tolerating a concurrent
    /// initialization.
    ///
    /// Only [`ProviderError::AlreadyInitialized`] is swallowed; every other
    /// failure is returned.
    pub async fn force_initialize_state(&self) -> Result<(), ProviderError> {
        debug!("force initializing provider state");
        match self.initialize_state_async().await {
            Err(ProviderError::AlreadyInitialized) => {
                debug!("provider initialized concurrently");
                Ok(())
            },
            other => other,
        }
    }

    /// Clear `initialized`, fetch the canonical snapshot and apply it.
    ///
    /// The fetched snapshot wins over any initialization that finished while
    /// the fetch was in flight. On fetch failure the error is logged and
    /// `initialized` stays false. Nothing retries; the next call fetches
    /// again.
    pub async fn initialize_state_async(&self) -> Result<(), ProviderError> {
        self.state.write().initialized = false;

        let snapshot = match self.fetch_state().await {
            Ok(snapshot) => snapshot,
            Err(source) => {
                error!(error = %source, "failed to get initial provider state");
                return Err(ProviderError::StateFetch(Box::new(source)));
            },
        };

        self.reinitialize_state(Some(snapshot))
    }

    async fn fetch_state(&self) -> Result<ProviderStateSnapshot, ProviderError> {
        let value = self.request(RequestArguments::method(methods::METAMASK_GET_PROVIDER_STATE)).await?;
        serde_json::from_value(value)
            .map_err(|e| ProtocolError::MalformedPayload(e.to_string()).into())
    }

    /// Apply a snapshot to an uninitialized provider.
    ///
    /// Fails with [`ProviderError::AlreadyInitialized`] when the provider is
    /// already initialized.
    pub fn initialize_state(
        &self,
        snapshot: Option<ProviderStateSnapshot>,
    ) -> Result<(), ProviderError> {
        if self.state.read().initialized {
            return Err(ProviderError::AlreadyInitialized);
        }

        if let Some(ProviderStateSnapshot { accounts, chain_id, is_unlocked, network_version }) = snapshot {
            self.handle_connect(&chain_id);
            self.handle_chain_changed(ChainChangedParams { chain_id: Some(chain_id), network_version });
            self.handle_unlock_state_changed(UnlockStateParams { accounts: accounts.clone(), is_unlocked });
            self.handle_accounts_changed(accounts);
        }

        self.state.write().initialized = true;
        debug!("provider state initialized");
        self.emit(ProviderEvent::Initialized);
        Ok(())
    }

    /// Apply a snapshot regardless of the current `initialized` flag.
    pub fn reinitialize_state(&self, snapshot: Option<ProviderStateSnapshot>) -> Result<(), ProviderError> {
        self.state.write().initialized = false;
        self.initialize_state(snapshot)
    }

    /// Record that the channel went away.
    ///
    /// Both the soft and the terminating disconnect only clear
    /// `is_connected`; nothing else is reset.
    pub fn handle_disconnect(&self, terminate: bool) {
        debug!(terminate, "provider disconnected");
        self.state.write().is_connected = false;
    }

    /// Apply a chain change, substituting [`DEFAULT_NETWORK_VERSION`] when the
    /// network version is missing.
    pub fn handle_chain_changed(&self, params: ChainChangedParams) {
        let ChainChangedParams { chain_id, network_version } = params;
        debug!(?chain_id, ?network_version, "chain changed");

        let network_version = match network_version.filter(|v| !v.is_empty()) {
            Some(version) => version,
            None => {
                info!("forced network version to prevent provider error");
                DEFAULT_NETWORK_VERSION.to_owned()
            },
        };

        self.apply_chain_changed(chain_id, network_version);
    }

    fn apply_chain_changed(&self, chain_id: Option<String>, network_version: String) {
        let chain_id = match chain_id {
            Some(id) if id.starts_with("0x") => id,
            other => {
                error!(chain_id = ?other, %network_version, "invalid network parameters");
                return;
            },
        };

        if network_version == LOADING_NETWORK_VERSION {
            self.handle_recoverable_disconnect();
            return;
        }

        self.handle_connect(&chain_id);

        let (chain_changed, network_changed, initialized) = {
            let mut state = self.state.write();
            let chain_changed = state.chain_id.as_deref() != Some(chain_id.as_str());
            if chain_changed {
                state.chain_id = Some(chain_id.clone());
            }
            let network_changed = state.network_version.as_deref() != Some(network_version.as_str());
            if network_changed {
                state.network_version = Some(network_version.clone());
            }
            (chain_changed, network_changed, state.initialized)
        };

        if initialized {
            if chain_changed {
                self.emit(ProviderEvent::ChainChanged(chain_id));
            }
            if network_changed {
                self.emit(ProviderEvent::NetworkChanged(network_version));
            }
        }
    }

    fn handle_connect(&self, chain_id: &str) {
        {
            let mut state = self.state.write();
            if state.is_connected {
                return;
            }
            state.is_connected = true;
        }
        self.emit(ProviderEvent::Connect { chain_id: chain_id.to_owned() });
    }

    fn handle_recoverable_disconnect(&self) {
        {
            let mut state = self.state.write();
            if !state.is_connected {
                return;
            }
            state.is_connected = false;
        }
        warn!("wallet is switching networks, disconnected until it settles");
        self.emit(ProviderEvent::Disconnect);
    }

    /// Apply a lock state change. Accounts are replaced only when the lock
    /// state actually changed.
    pub fn handle_unlock_state_changed(&self, params: UnlockStateParams) {
        let UnlockStateParams { accounts, is_unlocked } = params;
        {
            let mut state = self.state.write();
            if state.is_unlocked == is_unlocked {
                return;
            }
            state.is_unlocked = is_unlocked;
        }
        self.handle_accounts_changed(accounts);
    }

    /// Replace the exposed accounts. Emits only once initialized.
    pub fn handle_accounts_changed(&self, accounts: Vec<String>) {
        let initialized = {
            let mut state = self.state.write();
            if state.accounts == accounts {
                return;
            }
            state.accounts.clone_from(&accounts);
            state.initialized
        };

        if initialized {
            self.emit(ProviderEvent::AccountsChanged(accounts));
        }
    }

    fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for SdkProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderError> {
        let method = args.method.clone();
        let (id, response) = self.pending.register(&method);
        let _guard = self.pending.guard(id);

        let data = serde_json::to_value(JsonRpcRequest::new(id, args))
            .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))?;

        let chunk = Chunk::Message(ProviderMessage::new(self.options.name.as_str(), data));
        self.stream.write(chunk).await?;

        let response = match self.options.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, response)
                .await
                .map_err(|_| ProviderError::Timeout { method: method.clone() })?,
            None => response.await,
        };

        let result = response
            .map_err(|_| ProviderError::ResponseDropped { method: method.clone() })?
            .into_result()?;

        if (method == methods::ETH_REQUEST_ACCOUNTS || method == methods::ETH_ACCOUNTS)
            && let Ok(accounts) = serde_json::from_value::<Vec<String>>(result.clone())
        {
            self.handle_accounts_changed(accounts);
        }

        Ok(result)
    }

    fn is_connected(&self) -> bool {
        self.state.read().is_connected
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for SdkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkProvider")
            .field("options", &self.options)
            .field("state", &*self.state.read())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
