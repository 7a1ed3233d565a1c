//! Pipelined synchronization engine for swiftback.
//!
//! This crate owns the run: the four work queues, the run context with its
//! set-once abort flag, the parser/digest/probe worker pools, the
//! synchronizer that joins local and remote digests into skip/upload/replace
//! decisions, and the uploader that speaks the store's single-object and
//! segmented-manifest protocols. [`run_backup`] wires the stages together.

pub mod config;
pub mod context;
pub mod pipeline;
pub mod queue;
pub mod upload;

pub use config::{Config, DEFAULT_CONTAINER, DEFAULT_SEGMENT_SIZE};
pub use context::{Context, SyncReport};
pub use pipeline::run_backup;
pub use queue::WorkQueue;
pub use upload::Uploader;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Source(#[from] swiftback_source::SourceError),
    #[error(transparent)]
    Remote(#[from] swiftback_remote::RemoteError),
    #[error(transparent)]
    Crypto(#[from] swiftback_crypto::CryptoError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("run aborted")]
    Aborted,
}
