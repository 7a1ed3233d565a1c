use crate::context::{Context, SyncReport};
use crate::upload::Uploader;
use crate::CoreError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use swiftback_remote::{RemoteIndex, RemoteStore, SwiftClient};
use swiftback_source::{walk_source, Asset, Digest, RemoteObject, WalkSink};
use tracing::{debug, error, info, warn};

/// Pool sized for network concurrency, not CPU.
pub const REMOTE_DIGEST_WORKERS: usize = 6;
pub const UPLOAD_WORKERS: usize = 4;

/// Sleep between synchronizer scans that found nothing actionable, while
/// waiting for the remote-digest pool to fill destination digests.
const JOIN_POLL: Duration = Duration::from_millis(2);

fn local_digest_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Feeds every asset the walker discovers onto both digest queues.
struct QueueFeeder {
    ctx: Arc<Context>,
}

impl WalkSink for QueueFeeder {
    fn on_asset(&self, asset: &Arc<Asset>) {
        self.ctx.local.push(Arc::clone(asset));
        self.ctx.remote.push(Arc::clone(asset));
    }

    fn aborted(&self) -> bool {
        self.ctx.aborted()
    }
}

/// Run the whole pipeline to completion.
///
/// Stage wiring: the remote listing and the source parser start
/// immediately, along with the local-digest pool. The remote-digest pool
/// and the synchronizer start only once the listing is complete, since
/// both consult it. Each pool's output queue is marked done when the pool
/// has drained its input, which is what lets every downstream consumer
/// terminate.
pub fn run_backup(ctx: Arc<Context>) -> Result<SyncReport, CoreError> {
    let listing = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            let client = SwiftClient::new(&ctx.credentials.token);
            RemoteIndex::fetch(
                &client,
                &ctx.credentials.endpoint,
                &ctx.config.container,
                &ctx.config.dst_folder,
            )
        })
    };

    let parser = spawn_parser(Arc::clone(&ctx));
    let local_pool: Vec<JoinHandle<()>> = (0..local_digest_workers())
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || local_digest_worker(&ctx))
        })
        .collect();

    // The listing is the existence oracle for both remaining stages; it
    // must complete before either starts.
    let index = match listing.join().expect("listing thread panicked") {
        Ok(index) => Arc::new(index),
        Err(e) => {
            error!("remote listing failed: {e}");
            ctx.abort();
            let _ = parser.join();
            for handle in local_pool {
                let _ = handle.join();
            }
            return Err(e.into());
        }
    };

    let remote_pool: Vec<JoinHandle<()>> = (0..REMOTE_DIGEST_WORKERS)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let index = Arc::clone(&index);
            thread::spawn(move || remote_digest_worker(&ctx, &index))
        })
        .collect();

    let sync_pool: Vec<JoinHandle<()>> = (0..UPLOAD_WORKERS)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let index = Arc::clone(&index);
            thread::spawn(move || sync_worker(&ctx, &index))
        })
        .collect();

    parser.join().expect("parser thread panicked");
    for handle in local_pool {
        handle.join().expect("local digest worker panicked");
    }
    ctx.local_done.set_done();

    for handle in remote_pool {
        handle.join().expect("remote digest worker panicked");
    }
    ctx.remote_done.set_done();

    for handle in sync_pool {
        handle.join().expect("synchronizer worker panicked");
    }

    if ctx.aborted() {
        Err(CoreError::Aborted)
    } else {
        let report = ctx.counters.snapshot();
        info!("synchronization complete: {report}");
        Ok(report)
    }
}

fn spawn_parser(ctx: Arc<Context>) -> JoinHandle<()> {
    thread::spawn(move || {
        info!("building source tree");
        ctx.local.reset_done();
        ctx.remote.reset_done();

        let feeder = QueueFeeder {
            ctx: Arc::clone(&ctx),
        };
        match walk_source(&ctx.config.src_folder, &ctx.config.excludes, &feeder) {
            Ok(root) => debug!("source tree built, {} assets", root.descendant_count()),
            Err(e) => {
                error!("source walk failed: {e}");
                ctx.abort();
            }
        }

        ctx.local.set_done();
        ctx.remote.set_done();
    })
}

/// Local-digest worker: streams each file, writing MD5 and length into the
/// asset's source-digest record, then forwards to the local-done queue.
/// Unreadable files are forwarded with a failed digest; the synchronizer
/// classifies them as uploads.
fn local_digest_worker(ctx: &Context) {
    while let Some(asset) = ctx.local.pop_wait() {
        if ctx.aborted() {
            break;
        }
        if !asset.is_folder() {
            match swiftback_source::file_digest(asset.abs_path(), &|| ctx.aborted()) {
                Ok(Some(digest)) => asset.set_src_digest(digest),
                Ok(None) => asset.set_src_digest(Digest::failed()),
                Err(e) => {
                    warn!("cannot digest '{}': {e}", asset.abs_path().display());
                    asset.set_src_digest(Digest::failed());
                }
            }
        }
        ctx.local_done.push(asset);
    }
}

/// Remote-digest worker: for files the listing reports present, HEAD the
/// object and record the recovered plaintext digest. A failed probe is
/// recorded too, so the synchronizer sees the asset as probed and uploads
/// it rather than waiting forever.
fn remote_digest_worker(ctx: &Context, index: &RemoteIndex) {
    let store = RemoteStore::new(
        SwiftClient::new(&ctx.credentials.token),
        &ctx.credentials.endpoint,
        &ctx.config.container,
        &ctx.config.dst_folder,
    );

    while let Some(asset) = ctx.remote.pop_wait() {
        if ctx.aborted() {
            break;
        }
        if !asset.is_folder() {
            let rel = asset.rel_key();
            if index.exists(&rel) {
                match store.probe(&rel) {
                    Ok(remote) => asset.set_remote(remote),
                    Err(e) => {
                        warn!("remote digest failed for '{rel}': {e}");
                        asset.set_remote(RemoteObject::probe_failed());
                    }
                }
            }
        }
        ctx.remote_done.push(asset);
    }
}

/// What the synchronizer decided for one asset.
enum Action {
    Upload,
    Replace,
    Skip,
}

/// Synchronizer worker: joins local digests with the listing and the
/// remote probes, then drives the uploader.
///
/// The scan under the queue lock removes the first asset that is (1) a
/// folder, (2) a file absent on the remote, or (3) a file whose remote
/// probe has landed. A file that is present remotely but not yet probed
/// stays queued — this is the pipeline's join point. Upload failure aborts
/// the run.
fn sync_worker(ctx: &Arc<Context>, index: &RemoteIndex) {
    let uploader = Uploader::new(Arc::clone(ctx));

    loop {
        if ctx.aborted() {
            break;
        }
        if ctx.local_done.is_done() && ctx.local_done.is_empty() {
            break;
        }

        let next = ctx.local_done.take_if(|asset| {
            asset.is_folder() || !index.exists(&asset.rel_key()) || asset.remote().is_some()
        });
        let Some(asset) = next else {
            thread::sleep(JOIN_POLL);
            continue;
        };

        let rel = asset.rel_key();
        if asset.is_folder() {
            debug!("IGNORE FOLDER '{rel}'");
            ctx.counters.note_folder();
            continue;
        }

        let action = classify(&asset, index.exists(&rel));
        match action {
            Action::Skip => {
                debug!("SKIP '{rel}'");
                ctx.counters.note_skipped();
            }
            Action::Upload | Action::Replace => {
                match action {
                    Action::Upload => debug!("UPLOAD '{rel}'"),
                    _ => debug!("REPLACE '{rel}'"),
                }
                match uploader.upload(&asset) {
                    Ok(()) => match action {
                        Action::Upload => ctx.counters.note_uploaded(),
                        _ => ctx.counters.note_replaced(),
                    },
                    Err(e) => {
                        error!("upload failed for '{rel}': {e}");
                        ctx.abort();
                    }
                }
            }
        }
    }
}

/// The decision table: absent or unprobeable remote means upload, a
/// matching digest means skip, anything else means replace.
fn classify(asset: &Asset, remote_exists: bool) -> Action {
    if !remote_exists {
        return Action::Upload;
    }
    match asset.remote() {
        Some(remote) if remote.digest.computed => match asset.src_digest() {
            Some(src) if src.matches(&remote.digest) => Action::Skip,
            _ => Action::Replace,
        },
        // Probe failed: the destination digest is unknowable, upload.
        _ => Action::Upload,
    }
}
