//! Session wiring.
//!
//! The bridge, the provider and the orchestrator depend on each other: the
//! bridge forwards to the provider, the provider writes through the bridge,
//! and the orchestrator owns the channel the bridge writes to. The cycle is
//! broken by the [`ChannelSlot`]: it is created empty, the bridge reads from
//! it, and the orchestrator fills it.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;
use walletlink_core::{
    BackgroundTimer, ChannelFactory, ChannelSlot, DuplexStream, ModalFactory, Platform,
    ProviderError, RemoteStream, SdkProvider, WalletProvider,
};
use walletlink_proto::RequestArguments;

use crate::{
    Collaborators, ConnectionError, RemoteConnection, SessionOptions,
    startup::{self, ExtensionConnector, PreferenceStore},
};

/// A provider connected to a remote wallet through an orchestrated channel.
///
/// Dropping the session stops its background tasks.
pub struct Session {
    options: SessionOptions,
    connection: RemoteConnection,
    provider: Arc<SdkProvider>,
    stream: Arc<RemoteStream>,
    extension: Option<Arc<dyn ExtensionConnector>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Start building a session.
    pub fn builder(options: SessionOptions) -> SessionBuilder {
        SessionBuilder { options, ..SessionBuilder::default() }
    }

    /// Orchestrator of this session.
    pub fn connection(&self) -> &RemoteConnection {
        &self.connection
    }

    /// Provider of this session.
    pub fn provider(&self) -> &Arc<SdkProvider> {
        &self.provider
    }

    /// Stream bridge of this session.
    pub fn stream(&self) -> &Arc<RemoteStream> {
        &self.stream
    }

    /// Make sure the wallet is connected. See
    /// [`RemoteConnection::start_connection`].
    pub async fn connect(&self) -> Result<bool, ConnectionError> {
        self.connection.start_connection().await
    }

    /// Issue a wallet request.
    pub async fn request(&self, args: RequestArguments) -> Result<Value, ProviderError> {
        self.provider.request(args).await
    }

    /// Run the startup connection policy.
    ///
    /// The extension is preferred when the stored provider type says so.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let prefer_extension =
            self.preferences.as_ref().is_some_and(|store| startup::prefers_extension(store.as_ref()));

        startup::handle_auto_and_extension_connections(
            &self.connection,
            self.extension.clone(),
            self.preferences.clone(),
            self.options.check_installation_immediately,
            prefer_extension,
        )
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("closing session");
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    options: SessionOptions,
    factory: Option<Arc<dyn ChannelFactory>>,
    platform: Option<Arc<dyn Platform>>,
    modals: Option<Arc<dyn ModalFactory>>,
    timer: Option<Arc<dyn BackgroundTimer>>,
    extension: Option<Arc<dyn ExtensionConnector>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
}

impl SessionBuilder {
    /// Channel factory. Required.
    #[must_use]
    pub fn channel_factory(mut self, factory: Arc<dyn ChannelFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Host platform. Required.
    #[must_use]
    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Modal display. Required.
    #[must_use]
    pub fn modals(mut self, modals: Arc<dyn ModalFactory>) -> Self {
        self.modals = Some(modals);
        self
    }

    /// Host background timer.
    #[must_use]
    pub fn timer(mut self, timer: Arc<dyn BackgroundTimer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Browser extension connector.
    #[must_use]
    pub fn extension(mut self, extension: Arc<dyn ExtensionConnector>) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Preference storage.
    #[must_use]
    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Wire the session and create its first channel.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Session, ConnectionError> {
        let factory = self.factory.ok_or(ConnectionError::MissingCollaborator("channel factory"))?;
        let platform = self.platform.ok_or(ConnectionError::MissingCollaborator("platform"))?;
        let modals = self.modals.ok_or(ConnectionError::MissingCollaborator("modals"))?;
        let options = self.options;

        let slot = ChannelSlot::new();
        let stream = Arc::new(RemoteStream::new(slot.clone(), Arc::clone(&platform), options.stream()));
        let provider = Arc::new(SdkProvider::new(
            Arc::clone(&stream) as Arc<dyn DuplexStream>,
            options.provider(),
        ));

        let reader = provider.spawn_reader();
        let connection = RemoteConnection::new(
            options.connection(),
            slot,
            Collaborators {
                factory,
                platform,
                provider: Arc::clone(&provider) as Arc<dyn WalletProvider>,
                modals,
                timer: self.timer,
            },
        );
        let listener = stream.listen(Arc::downgrade(&provider));
        let tasks = vec![reader, listener];

        debug!("session ready");
        Ok(Session {
            options,
            connection,
            provider,
            stream,
            extension: self.extension,
            preferences: self.preferences,
            tasks,
        })
    }
}
