use crate::asset::{Asset, AssetKind};
use crate::excludes::ExcludeSet;
use crate::SourceError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Receiver for assets discovered by [`walk_source`].
///
/// The pipeline implements this to feed its work queues; `aborted` lets it
/// stop the walk early.
pub trait WalkSink {
    fn on_asset(&self, asset: &Arc<Asset>);

    fn aborted(&self) -> bool {
        false
    }
}

/// Recursively enumerate the tree under `root`, emitting one asset per
/// file and folder to `sink`, depth-first.
///
/// Entries whose final path component matches `excludes` are skipped
/// entirely, subtree included. Unreadable directories are logged and
/// skipped; they do not fail the walk. Returns the root folder asset
/// (which is not itself emitted).
pub fn walk_source(
    root: &Path,
    excludes: &ExcludeSet,
    sink: &dyn WalkSink,
) -> Result<Arc<Asset>, SourceError> {
    let root_asset = Asset::new(root.to_path_buf(), PathBuf::new(), AssetKind::Folder);
    walk_dir(root, &PathBuf::new(), &root_asset, excludes, sink)?;
    Ok(root_asset)
}

fn walk_dir(
    dir: &Path,
    rel: &Path,
    parent: &Arc<Asset>,
    excludes: &ExcludeSet,
    sink: &dyn WalkSink,
) -> Result<(), SourceError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("skipping unreadable directory '{}': {e}", dir.display());
            return Ok(());
        }
    };

    for entry in entries {
        if sink.aborted() {
            return Ok(());
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry in '{}': {e}", dir.display());
                continue;
            }
        };

        let name = entry.file_name();
        if excludes.matches(&name) {
            continue;
        }

        let abs = entry.path();
        let child_rel = rel.join(&name);
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                warn!("skipping '{}': {e}", abs.display());
                continue;
            }
        };

        if file_type.is_dir() {
            let folder = Asset::new(abs.clone(), child_rel.clone(), AssetKind::Folder);
            parent.add_child(folder.clone());
            sink.on_asset(&folder);
            walk_dir(&abs, &child_rel, &folder, excludes, sink)?;
        } else if file_type.is_file() {
            let file = Asset::new(abs, child_rel, AssetKind::File);
            parent.add_child(file.clone());
            sink.on_asset(&file);
        }
        // Symlinks and special files are not backed up.
    }

    Ok(())
}
