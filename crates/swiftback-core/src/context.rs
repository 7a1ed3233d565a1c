use crate::config::Config;
use crate::queue::WorkQueue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use swiftback_remote::Credentials;
use swiftback_source::Asset;

/// Per-run coordination state shared by every pipeline stage: the
/// configuration, the storage credentials, the four queues, and the abort
/// flag.
///
/// The abort flag is monotonic: once set it is never cleared, and every
/// worker checks it between units of work. Setting it also marks all four
/// queues done so blocked consumers wake, drain, and exit.
pub struct Context {
    pub config: Config,
    pub credentials: Credentials,
    pub local: WorkQueue<Arc<Asset>>,
    pub local_done: WorkQueue<Arc<Asset>>,
    pub remote: WorkQueue<Arc<Asset>>,
    pub remote_done: WorkQueue<Arc<Asset>>,
    pub counters: Counters,
    abort: AtomicBool,
}

impl Context {
    pub fn new(config: Config, credentials: Credentials) -> Arc<Self> {
        Arc::new(Self {
            config,
            credentials,
            local: WorkQueue::new(),
            local_done: WorkQueue::new(),
            remote: WorkQueue::new(),
            remote_done: WorkQueue::new(),
            counters: Counters::default(),
            abort: AtomicBool::new(false),
        })
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
        self.local.set_done();
        self.local_done.set_done();
        self.remote.set_done();
        self.remote_done.set_done();
    }

    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }
}

/// Per-action tallies, bumped by the synchronizer workers.
#[derive(Debug, Default)]
pub struct Counters {
    uploaded: AtomicUsize,
    replaced: AtomicUsize,
    skipped: AtomicUsize,
    folders: AtomicUsize,
}

impl Counters {
    pub fn note_uploaded(&self) {
        self.uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_replaced(&self) {
        self.replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_folder(&self) {
        self.folders.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncReport {
        SyncReport {
            uploaded: self.uploaded.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            folders: self.folders.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub folders: usize,
}

impl SyncReport {
    /// Total PUT-producing actions.
    pub fn transferred(&self) -> usize {
        self.uploaded + self.replaced
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} uploaded, {} replaced, {} skipped ({} folders)",
            self.uploaded, self.replaced, self.skipped, self.folders
        )
    }
}
