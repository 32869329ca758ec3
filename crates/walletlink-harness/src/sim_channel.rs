//! Simulated remote channel.
//!
//! A [`SimChannel`] never touches the network. Status changes and wallet
//! notifications happen only when a test calls one of the wallet-side
//! controls ([`SimChannel::wallet_joins`], [`SimChannel::pause`], ...).
//! Outgoing messages are recorded and, when a [`SimWallet`] is attached,
//! answered immediately with a provider-tagged `message` notification.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use walletlink_core::{
    ChannelError, ChannelEvent, ChannelFactory, ChannelOptions, PlatformType, RemoteChannel,
};
use walletlink_proto::{
    ChannelConfig, ChannelIdentity, ConnectionStatus, DisconnectOptions, KeyInfo, PROVIDER_NAME,
};

use crate::SimWallet;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct ChannelState {
    status: ConnectionStatus,
    ready: bool,
    connected: bool,
    paused: bool,
    channel_id: Option<String>,
    config: Option<ChannelConfig>,
    disconnects: Vec<DisconnectOptions>,
}

/// Channel instance driven by the test.
pub struct SimChannel {
    platform: PlatformType,
    options: ChannelOptions,
    public_key: String,
    rng: Mutex<ChaCha8Rng>,
    state: Mutex<ChannelState>,
    persisted: Option<ChannelConfig>,
    fixed_identity: Option<ChannelIdentity>,
    fail_identity: bool,
    fail_send: AtomicBool,
    wallet: Option<Arc<SimWallet>>,
    sent: Mutex<Vec<Value>>,
    auto_connects: AtomicUsize,
    generated: AtomicUsize,
    events: broadcast::Sender<ChannelEvent>,
}

impl SimChannel {
    fn new(platform: PlatformType, options: ChannelOptions, seed: u64, factory: &SimChannelFactory) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let public_key = match &factory.fixed_identity {
            Some(identity) => identity.pub_key.clone(),
            None => format!("04{}", random_hex(&mut rng, 32)),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            platform,
            options,
            public_key,
            rng: Mutex::new(rng),
            state: Mutex::new(ChannelState::default()),
            persisted: factory.persisted.lock().clone(),
            fixed_identity: factory.fixed_identity.clone(),
            fail_identity: factory.fail_identity.load(Ordering::SeqCst),
            fail_send: AtomicBool::new(false),
            wallet: factory.wallet.clone(),
            sent: Mutex::new(Vec::new()),
            auto_connects: AtomicUsize::new(0),
            generated: AtomicUsize::new(0),
            events,
        }
    }

    /// Standalone channel for tests that skip the factory.
    pub fn standalone(platform: PlatformType, seed: u64) -> Arc<Self> {
        Arc::new(Self::new(platform, ChannelOptions::default(), seed, &SimChannelFactory::new(seed)))
    }

    /// Platform this channel was created for.
    pub fn platform(&self) -> PlatformType {
        self.platform
    }

    /// Options this channel was created with.
    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    /// Payloads sent through this channel, in order.
    pub fn sent_messages(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    /// Methods of the payloads sent through this channel, in order.
    pub fn sent_methods(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| m.get("method").and_then(Value::as_str).map(str::to_owned))
            .collect()
    }

    /// Disconnect calls received, in order.
    pub fn disconnects(&self) -> Vec<DisconnectOptions> {
        self.state.lock().disconnects.clone()
    }

    /// How many fresh identities were generated.
    pub fn generated_identities(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    /// How many times auto-connect ran.
    pub fn auto_connects(&self) -> usize {
        self.auto_connects.load(Ordering::SeqCst)
    }

    /// Number of live notification subscribers.
    pub fn receiver_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Make every following send fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Mark the channel ready without notifying anyone.
    pub fn set_ready(&self, ready: bool) {
        let mut state = self.state.lock();
        state.ready = ready;
        state.connected = ready;
        state.status = if ready { ConnectionStatus::Linked } else { ConnectionStatus::Disconnected };
    }

    /// The wallet joined: the channel links and every party is ready.
    pub fn wallet_joins(&self) {
        self.set_ready(true);
        self.emit(ChannelEvent::ConnectionStatus(ConnectionStatus::Linked));
        self.emit(ChannelEvent::ClientsReady);
    }

    /// Emit `clients_ready` again without a state change.
    pub fn clients_ready(&self) {
        self.emit(ChannelEvent::ClientsReady);
    }

    /// The wallet left the channel.
    pub fn wallet_leaves(&self) {
        {
            let mut state = self.state.lock();
            state.ready = false;
            state.paused = false;
        }
        self.emit(ChannelEvent::ClientsDisconnected);
    }

    /// The wallet app went to the background.
    pub fn pause(&self) {
        {
            let mut state = self.state.lock();
            state.paused = true;
            state.status = ConnectionStatus::Paused;
        }
        self.emit(ChannelEvent::ConnectionStatus(ConnectionStatus::Paused));
    }

    /// The wallet app came back to the foreground.
    pub fn resume(&self) {
        {
            let mut state = self.state.lock();
            state.paused = false;
            state.status = ConnectionStatus::Linked;
        }
        self.emit(ChannelEvent::ConnectionStatus(ConnectionStatus::Linked));
    }

    /// Change status and notify.
    pub fn set_status(&self, status: ConnectionStatus) {
        {
            let mut state = self.state.lock();
            state.status = status;
            if status.is_terminal() {
                state.ready = false;
                state.connected = false;
            }
        }
        self.emit(ChannelEvent::ConnectionStatus(status));
    }

    /// Deliver a raw `message` notification.
    pub fn push_message(&self, message: Value) {
        self.emit(ChannelEvent::Message(message));
    }

    /// Deliver a wallet JSON-RPC notification tagged for the provider.
    pub fn push_notification(&self, method: &str, params: Value) {
        self.push_message(json!({
            "name": PROVIDER_NAME,
            "data": { "jsonrpc": "2.0", "method": method, "params": params },
        }));
    }

    fn emit(&self, event: ChannelEvent) {
        trace!(event = event.name(), "sim channel notification");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn next_identity(&self) -> ChannelIdentity {
        if let Some(identity) = &self.fixed_identity {
            return identity.clone();
        }
        let channel_id = random_hex(&mut self.rng.lock(), 16);
        ChannelIdentity::new(channel_id, self.public_key.clone())
    }
}

#[async_trait]
impl RemoteChannel for SimChannel {
    fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn channel_id(&self) -> Option<String> {
        self.state.lock().channel_id.clone()
    }

    fn key_info(&self) -> Option<KeyInfo> {
        Some(KeyInfo { public_key: self.public_key.clone() })
    }

    fn channel_config(&self) -> Option<ChannelConfig> {
        self.state.lock().config.clone()
    }

    async fn start_auto_connect(&self) -> Option<ChannelConfig> {
        self.auto_connects.fetch_add(1, Ordering::SeqCst);
        let config = self.persisted.clone()?;

        let mut state = self.state.lock();
        if config.is_resumable() {
            state.channel_id = Some(config.channel_id.clone());
            state.config = Some(config.clone());
            state.status = ConnectionStatus::Connecting;
        }
        Some(config)
    }

    async fn generate_channel_id(&self) -> Result<ChannelIdentity, ChannelError> {
        if self.fail_identity {
            return Err(ChannelError::IdentityGeneration("relay unreachable".into()));
        }

        self.generated.fetch_add(1, Ordering::SeqCst);
        let identity = self.next_identity();
        let mut state = self.state.lock();
        state.channel_id = Some(identity.channel_id.clone());
        state.config = Some(ChannelConfig { channel_id: identity.channel_id.clone(), last_active: None });
        state.status = ConnectionStatus::Connecting;
        debug!(channel_id = %identity.channel_id, "sim channel identity generated");
        Ok(identity)
    }

    async fn send_message(&self, message: Value) -> Result<(), ChannelError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ChannelError::SendFailed("socket closed".into()));
        }
        if self.status().is_terminal() {
            return Err(ChannelError::Terminated);
        }

        self.sent.lock().push(message.clone());

        let response = self.wallet.as_ref().and_then(|wallet| wallet.respond(&message));
        if let Some(response) = response {
            match serde_json::to_value(response) {
                Ok(data) => self.push_message(json!({ "name": PROVIDER_NAME, "data": data })),
                Err(error) => debug!(%error, "sim wallet response not serializable"),
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    fn disconnect(&self, options: DisconnectOptions) {
        let status = {
            let mut state = self.state.lock();
            state.disconnects.push(options);
            state.ready = false;
            state.connected = false;
            state.paused = false;
            state.status =
                if options.terminate { ConnectionStatus::Terminated } else { ConnectionStatus::Disconnected };
            state.status
        };
        self.emit(ChannelEvent::ConnectionStatus(status));
    }
}

impl std::fmt::Debug for SimChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimChannel")
            .field("platform", &self.platform)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

fn random_hex(rng: &mut ChaCha8Rng, len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Factory recording every channel it builds.
///
/// Channels built after a configuration call inherit that configuration.
pub struct SimChannelFactory {
    seed: u64,
    persisted: Mutex<Option<ChannelConfig>>,
    fixed_identity: Option<ChannelIdentity>,
    fail_identity: AtomicBool,
    wallet: Option<Arc<SimWallet>>,
    created: Mutex<Vec<Arc<SimChannel>>>,
}

impl SimChannelFactory {
    /// Factory with seeded identities and no wallet attached.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            persisted: Mutex::new(None),
            fixed_identity: None,
            fail_identity: AtomicBool::new(false),
            wallet: None,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `wallet`.
    #[must_use]
    pub fn with_wallet(mut self, wallet: Arc<SimWallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Hand out `identity` instead of seeded ones.
    #[must_use]
    pub fn with_identity(mut self, identity: ChannelIdentity) -> Self {
        self.fixed_identity = Some(identity);
        self
    }

    /// Persisted record found by auto-connect on future channels.
    pub fn persist(&self, config: Option<ChannelConfig>) {
        *self.persisted.lock() = config;
    }

    /// Make identity generation fail on future channels.
    pub fn fail_identity(&self, fail: bool) {
        self.fail_identity.store(fail, Ordering::SeqCst);
    }

    /// Every channel built so far.
    pub fn channels(&self) -> Vec<Arc<SimChannel>> {
        self.created.lock().clone()
    }

    /// The most recently built channel.
    pub fn current(&self) -> Option<Arc<SimChannel>> {
        self.created.lock().last().cloned()
    }
}

impl ChannelFactory for SimChannelFactory {
    fn create(&self, platform: PlatformType, options: &ChannelOptions) -> Arc<dyn RemoteChannel> {
        let mut created = self.created.lock();
        let seed = self.seed.wrapping_add(created.len() as u64);
        let channel = Arc::new(SimChannel::new(platform, options.clone(), seed, self));
        debug!(index = created.len(), ?platform, "sim channel created");
        created.push(Arc::clone(&channel));
        channel
    }
}

impl std::fmt::Debug for SimChannelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimChannelFactory")
            .field("seed", &self.seed)
            .field("created", &self.created.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identities_are_reproducible() {
        let first = SimChannel::standalone(PlatformType::MobileWeb, 7);
        let second = SimChannel::standalone(PlatformType::MobileWeb, 7);

        let a = first.generate_channel_id().await.unwrap();
        let b = second.generate_channel_id().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.channel_id.len(), 32);
        assert!(a.pub_key.starts_with("04"));
        assert_eq!(first.channel_id(), Some(a.channel_id));
    }

    #[tokio::test]
    async fn terminated_channel_rejects_sends() {
        let channel = SimChannel::standalone(PlatformType::MobileWeb, 1);
        channel.wallet_joins();
        channel.disconnect(DisconnectOptions::terminate());

        assert_eq!(channel.status(), ConnectionStatus::Terminated);
        assert_eq!(channel.send_message(json!({})).await, Err(ChannelError::Terminated));
    }
}
