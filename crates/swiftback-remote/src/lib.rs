//! Swift-compatible remote store access for swiftback.
//!
//! This crate wraps the object store's HTTP surface: the bearer
//! authentication flow that yields a storage token and endpoint, a thin
//! synchronous GET/HEAD/PUT client with `X-Auth-Token` injection, the
//! paginated container listing used as the existence oracle, and the
//! object-level operations (digest probe, object/segment/manifest PUT).

pub mod auth;
pub mod client;
pub mod listing;
pub mod object;

pub use auth::authenticate;
pub use client::{escape_path, SwiftClient};
pub use listing::RemoteIndex;
pub use object::{CryptMeta, RemoteStore, UploadMeta};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("HTTP {code} for {url}")]
    Status { code: u16, url: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Storage access obtained from the identity provider: a bearer token sent
/// as `X-Auth-Token` on every request, and the account's storage endpoint.
/// Immutable for the run.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub endpoint: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testutil;
