//! Recording modals and background timer.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use walletlink_core::{BackgroundTimer, ModalFactory, ModalHandle};

/// Kind of a displayed modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalKind {
    /// Scannable code holding a connect link.
    Install(String),
    /// Waiting for approval in the wallet.
    Pending,
}

#[derive(Debug)]
struct ModalRecord {
    kind: ModalKind,
    open: bool,
}

type Log = Arc<Mutex<Vec<ModalRecord>>>;

/// Modal factory keeping a log of every modal and whether it is still open.
#[derive(Debug, Default)]
pub struct RecordingModals {
    log: Log,
}

struct RecordedModal {
    log: Log,
    index: usize,
}

impl ModalHandle for RecordedModal {
    fn close(self: Box<Self>) {
        if let Some(record) = self.log.lock().get_mut(self.index) {
            record.open = false;
        }
    }
}

impl RecordingModals {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, kind: ModalKind) -> Box<dyn ModalHandle> {
        let mut log = self.log.lock();
        log.push(ModalRecord { kind, open: true });
        Box::new(RecordedModal { log: Arc::clone(&self.log), index: log.len() - 1 })
    }

    /// Every modal ever shown, in order.
    pub fn shown(&self) -> Vec<ModalKind> {
        self.log.lock().iter().map(|r| r.kind.clone()).collect()
    }

    /// Modals still open.
    pub fn open_modals(&self) -> Vec<ModalKind> {
        self.log.lock().iter().filter(|r| r.open).map(|r| r.kind.clone()).collect()
    }

    /// Links shown in install modals, in order.
    pub fn install_links(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|kind| match kind {
                ModalKind::Install(link) => Some(link),
                ModalKind::Pending => None,
            })
            .collect()
    }
}

impl ModalFactory for RecordingModals {
    fn install_modal(&self, link: &str) -> Box<dyn ModalHandle> {
        self.open(ModalKind::Install(link.to_owned()))
    }

    fn pending_modal(&self) -> Box<dyn ModalHandle> {
        self.open(ModalKind::Pending)
    }
}

/// Timer recording start and stop calls.
#[derive(Debug, Default)]
pub struct SimTimer {
    runs: Mutex<Vec<Duration>>,
    stops: AtomicUsize,
}

impl SimTimer {
    /// Fresh timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intervals passed to `run`, in order.
    pub fn runs(&self) -> Vec<Duration> {
        self.runs.lock().clone()
    }

    /// Number of `stop` calls.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl BackgroundTimer for SimTimer {
    fn run(&self, interval: Duration) {
        self.runs.lock().push(interval);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
