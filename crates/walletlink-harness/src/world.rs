//! A complete session wired to simulated collaborators.

use std::sync::Arc;

use walletlink_app::{ConnectionError, RemoteConnection, Session, SessionOptions};
use walletlink_core::{PlatformType, SdkProvider};
use walletlink_proto::{ChannelConfig, ChannelIdentity};

use crate::{
    MemoryPreferences, RecordingModals, SimChannel, SimChannelFactory, SimExtension, SimPlatform,
    SimTimer, SimWallet,
};

/// How to set up a [`World`].
#[derive(Debug)]
pub struct WorldConfig {
    /// Host platform.
    pub platform: PlatformType,
    /// Session options.
    pub options: SessionOptions,
    /// Seed for channel identities.
    pub seed: u64,
    /// Persisted channel found by auto-connect.
    pub persisted: Option<ChannelConfig>,
    /// Fixed identity handed out instead of seeded ones.
    pub identity: Option<ChannelIdentity>,
    /// Make identity generation fail.
    pub fail_identity: bool,
    /// Wallet on the other end.
    pub wallet: Arc<SimWallet>,
    /// Extension connector.
    pub extension: Arc<SimExtension>,
}

impl WorldConfig {
    /// Defaults for `platform`, with auto-connect enabled.
    pub fn new(platform: PlatformType) -> Self {
        let mut options = SessionOptions::default();
        options.channel.auto_connect.enable = true;
        Self {
            platform,
            options,
            seed: 0,
            persisted: None,
            identity: None,
            fail_identity: false,
            wallet: Arc::new(SimWallet::default()),
            extension: Arc::new(SimExtension::working()),
        }
    }
}

/// Session plus handles on every simulated collaborator.
#[derive(Debug)]
pub struct World {
    /// The session under test.
    pub session: Session,
    /// Builds and records channels.
    pub factory: Arc<SimChannelFactory>,
    /// Records opened links.
    pub platform: Arc<SimPlatform>,
    /// Records shown modals.
    pub modals: Arc<RecordingModals>,
    /// Records timer calls.
    pub timer: Arc<SimTimer>,
    /// Answers requests.
    pub wallet: Arc<SimWallet>,
    /// Extension connector.
    pub extension: Arc<SimExtension>,
    /// Preference storage.
    pub preferences: Arc<MemoryPreferences>,
}

impl World {
    /// Default world on `platform`.
    pub fn new(platform: PlatformType) -> Result<Self, ConnectionError> {
        Self::build(WorldConfig::new(platform))
    }

    /// World from `config`. Must be called inside a tokio runtime.
    pub fn build(config: WorldConfig) -> Result<Self, ConnectionError> {
        Self::build_with(config, Arc::new(MemoryPreferences::new()))
    }

    /// World from `config` reading preferences from `preferences`.
    pub fn build_with(
        config: WorldConfig,
        preferences: Arc<MemoryPreferences>,
    ) -> Result<Self, ConnectionError> {
        let mut factory = SimChannelFactory::new(config.seed).with_wallet(Arc::clone(&config.wallet));
        if let Some(identity) = config.identity {
            factory = factory.with_identity(identity);
        }
        factory.persist(config.persisted);
        factory.fail_identity(config.fail_identity);

        let factory = Arc::new(factory);
        let platform = Arc::new(SimPlatform::new(config.platform));
        let modals = Arc::new(RecordingModals::new());
        let timer = Arc::new(SimTimer::new());

        let session = Session::builder(config.options)
            .channel_factory(Arc::clone(&factory) as _)
            .platform(Arc::clone(&platform) as _)
            .modals(Arc::clone(&modals) as _)
            .timer(Arc::clone(&timer) as _)
            .extension(Arc::clone(&config.extension) as _)
            .preferences(Arc::clone(&preferences) as _)
            .build()?;

        Ok(Self {
            session,
            factory,
            platform,
            modals,
            timer,
            wallet: config.wallet,
            extension: config.extension,
            preferences,
        })
    }

    /// The current channel.
    pub fn channel(&self) -> Option<Arc<SimChannel>> {
        self.factory.current()
    }

    /// The orchestrator.
    pub fn connection(&self) -> &RemoteConnection {
        self.session.connection()
    }

    /// The provider.
    pub fn provider(&self) -> &Arc<SdkProvider> {
        self.session.provider()
    }
}
