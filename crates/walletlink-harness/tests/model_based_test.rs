//! Model-based property tests of the bridge write path.
//!
//! Random operation sequences are applied both to a reference model of the
//! write policy and to a real bridge over a simulated channel; sent messages,
//! opened links and write results must match.
//!
//! ```text
//! proptest generates: (PlatformType, Vec<Operation>)
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!         Model       RemoteStream     Compare
//!      (reference)   + SimChannel      Results
//! ```

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use serde_json::json;
use walletlink_core::{
    ChannelSlot, DuplexStream, PlatformType, RemoteChannel, RemoteStream, StreamOptions,
    methods::METHODS_TO_REDIRECT,
};
use walletlink_harness::{SimChannel, SimPlatform};
use walletlink_proto::{Chunk, PROVIDER_NAME, ProviderMessage};

const PLAIN_METHODS: &[&str] = &["eth_chainId", "eth_accounts", "eth_getBalance", "net_version"];

#[derive(Debug, Clone)]
enum Operation {
    Write(String),
    WriteBinary,
    SetReady(bool),
    Pause,
    Resume,
    FailSends(bool),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => proptest::sample::select(METHODS_TO_REDIRECT).prop_map(|m| Operation::Write(m.to_owned())),
        4 => proptest::sample::select(PLAIN_METHODS).prop_map(|m| Operation::Write(m.to_owned())),
        1 => Just(Operation::WriteBinary),
        2 => any::<bool>().prop_map(Operation::SetReady),
        1 => Just(Operation::Pause),
        1 => Just(Operation::Resume),
        1 => any::<bool>().prop_map(Operation::FailSends),
    ]
}

fn platform() -> impl Strategy<Value = PlatformType> {
    proptest::sample::select(vec![
        PlatformType::DesktopWeb,
        PlatformType::MobileWeb,
        PlatformType::MetaMaskMobileWebview,
        PlatformType::NonBrowser,
        PlatformType::ReactNative,
    ])
}

/// Reference model of the write policy.
#[derive(Debug, Default, PartialEq)]
struct Outcome {
    results: Vec<bool>,
    sent: usize,
    links: Vec<String>,
}

struct Model {
    platform: PlatformType,
    ready: bool,
    paused: bool,
    failing: bool,
    outcome: Outcome,
}

impl Model {
    fn new(platform: PlatformType) -> Self {
        Self { platform, ready: false, paused: false, failing: false, outcome: Outcome::default() }
    }

    fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Write(method) => self.write(Some(method)),
            Operation::WriteBinary => self.write(None),
            Operation::SetReady(ready) => self.ready = *ready,
            Operation::Pause => self.paused = true,
            Operation::Resume => self.paused = false,
            Operation::FailSends(failing) => self.failing = *failing,
        }
    }

    fn write(&mut self, method: Option<&str>) {
        let embedded = self.platform == PlatformType::ReactNative;
        let desktop = self.platform == PlatformType::DesktopWeb;

        if !self.ready && !embedded {
            self.outcome.results.push(true);
            return;
        }
        if self.failing {
            self.outcome.results.push(false);
            return;
        }

        self.outcome.sent += 1;
        self.outcome.results.push(true);
        if desktop || self.platform == PlatformType::NonBrowser {
            return;
        }

        if method.is_some_and(|m| METHODS_TO_REDIRECT.contains(&m)) {
            self.outcome.links.push("otp".into());
        } else if self.paused {
            self.outcome.links.push("connect".into());
        }
    }
}

async fn run_real(platform: PlatformType, ops: &[Operation]) -> Outcome {
    let sim_platform = Arc::new(SimPlatform::new(platform));
    let channel = SimChannel::standalone(platform, 21);
    channel.generate_channel_id().await.unwrap();

    let slot = ChannelSlot::new();
    slot.replace(channel.clone());
    let stream = RemoteStream::new(slot, sim_platform.clone(), StreamOptions::default());

    let mut results = Vec::new();
    for op in ops {
        match op {
            Operation::Write(method) => {
                let chunk = Chunk::Message(ProviderMessage::new(
                    PROVIDER_NAME,
                    json!({ "jsonrpc": "2.0", "id": results.len(), "method": method }),
                ));
                results.push(stream.write(chunk).await.is_ok());
            },
            Operation::WriteBinary => {
                results.push(stream.write(Chunk::Binary(Bytes::from_static(&[0xca, 0xfe]))).await.is_ok());
            },
            Operation::SetReady(ready) => channel.set_ready(*ready),
            Operation::Pause => channel.pause(),
            Operation::Resume => channel.resume(),
            Operation::FailSends(failing) => channel.fail_sends(*failing),
        }
    }

    let links = sim_platform
        .opened()
        .iter()
        .map(|link| link.path().unwrap_or_default().to_owned())
        .collect();
    Outcome { results, sent: channel.sent_messages().len(), links }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn bridge_matches_write_policy_model(
        platform in platform(),
        ops in prop::collection::vec(operation(), 1..40),
    ) {
        let mut model = Model::new(platform);
        for op in &ops {
            model.apply(op);
        }

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let real = runtime.block_on(run_real(platform, &ops));

        prop_assert_eq!(real, model.outcome);
    }
}
