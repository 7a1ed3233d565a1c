//! Local source tree model for swiftback.
//!
//! This crate provides the in-memory `Asset` tree built from the backup
//! source directory, streaming MD5 digests over file contents, the exclude
//! set loaded from a newline-delimited file, and the recursive walker that
//! emits assets to the synchronization pipeline.

pub mod asset;
pub mod digest;
pub mod excludes;
pub mod walk;

pub use asset::{Asset, AssetKind, Digest, RemoteObject};
pub use digest::{file_digest, md5_hex, parse_md5_hex};
pub use excludes::ExcludeSet;
pub use walk::{walk_source, WalkSink};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("exclude file '{path}': {reason}")]
    Excludes { path: String, reason: String },
}
