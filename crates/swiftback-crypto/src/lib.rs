//! Payload encryption for swiftback uploads.
//!
//! Each file gets its own AES-256-GCM key derived from the user passphrase
//! with PBKDF2-HMAC-SHA256; the salt is derived from the file's relative
//! path and the per-segment nonce is the segment index. The same
//! (passphrase, path, content) therefore always produces the same
//! ciphertext, which keeps uploads reproducible across runs. The remote
//! store only ever sees the sealed bytes.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// Scheme identifier published in object metadata.
pub const CIPHER_NAME: &str = "aes256gcm-pbkdf2";

pub const SALT_LEN: usize = 16;

/// Key-stretching rounds. Derivation runs once per uploaded file, so this
/// is kept moderate rather than login-grade.
const PBKDF2_ROUNDS: u32 = 32_768;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed for segment {0}")]
    Seal(u32),
    #[error("decryption failed for segment {0}: bad key or tampered data")]
    Open(u32),
}

/// Per-file cipher sealing (and, for verification, opening) segment bodies.
pub struct SegmentCipher {
    cipher: Aes256Gcm,
    salt: [u8; SALT_LEN],
}

impl SegmentCipher {
    /// Derive the per-file key from the passphrase and the file's remote
    /// key suffix.
    pub fn new(passphrase: &str, relative_key: &str) -> Self {
        let salt = derive_salt(relative_key);
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &salt, PBKDF2_ROUNDS, &mut key);
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
            salt,
        }
    }

    pub fn salt_hex(&self) -> String {
        self.salt.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Encrypt one segment. The nonce is the segment index, so sealing is
    /// deterministic and segment bodies cannot be transposed undetected.
    pub fn seal(&self, segment_index: u32, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher
            .encrypt(Nonce::from_slice(&nonce(segment_index)), plaintext)
            .map_err(|_| CryptoError::Seal(segment_index))
    }

    /// Decrypt one segment, authenticating it against the tag.
    pub fn open(&self, segment_index: u32, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher
            .decrypt(Nonce::from_slice(&nonce(segment_index)), ciphertext)
            .map_err(|_| CryptoError::Open(segment_index))
    }
}

fn derive_salt(relative_key: &str) -> [u8; SALT_LEN] {
    let hash = Sha256::digest(relative_key.as_bytes());
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&hash[..SALT_LEN]);
    salt
}

fn nonce(segment_index: u32) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[NONCE_LEN - 4..].copy_from_slice(&segment_index.to_be_bytes());
    nonce
}
