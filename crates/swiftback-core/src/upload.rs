use crate::context::Context;
use crate::CoreError;
use std::fs::File;
use std::io::{BufReader, Read};
use std::sync::Arc;
use swiftback_crypto::{SegmentCipher, CIPHER_NAME};
use swiftback_remote::{CryptMeta, RemoteStore, SwiftClient, UploadMeta};
use swiftback_source::{Asset, Digest};
use tracing::debug;

/// Streams one file to the remote store, choosing between a single object
/// PUT and the segmented manifest protocol based on the plaintext size.
///
/// The plaintext MD5 and length are accumulated from the bytes actually
/// read, so the published metadata always describes the uploaded body even
/// when the digest stage failed on this file. One uploader per worker
/// thread; the HTTP client is not shared across threads.
pub struct Uploader {
    ctx: Arc<Context>,
    store: RemoteStore,
}

impl Uploader {
    pub fn new(ctx: Arc<Context>) -> Self {
        let store = RemoteStore::new(
            SwiftClient::new(&ctx.credentials.token),
            &ctx.credentials.endpoint,
            &ctx.config.container,
            &ctx.config.dst_folder,
        );
        Self { ctx, store }
    }

    pub fn upload(&self, asset: &Asset) -> Result<(), CoreError> {
        let rel = asset.rel_key();
        let segment_size = self.ctx.config.segment_size as usize;
        let cipher = self
            .ctx
            .config
            .crypt_password
            .as_deref()
            .map(|pass| SegmentCipher::new(pass, &rel));

        let file = File::open(asset.abs_path())?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        let mut hasher = md5::Context::new();
        let mut total: u64 = 0;

        let first = read_segment(&mut reader, segment_size)?;
        hasher.consume(&first);
        total += first.len() as u64;

        // Only a completely full first segment can hide more data behind it.
        let second = if first.len() == segment_size {
            read_segment(&mut reader, segment_size)?
        } else {
            Vec::new()
        };

        if second.is_empty() {
            let plain = Digest::new(hasher.compute().0, total);
            let body = match &cipher {
                Some(c) => c.seal(0, &first)?,
                None => first,
            };
            let meta = UploadMeta {
                plain,
                crypt: crypt_meta(&cipher),
            };
            debug!("single PUT '{rel}' ({total} bytes)");
            self.store.put_object(&rel, &body, &meta)?;
            return Ok(());
        }

        hasher.consume(&second);
        total += second.len() as u64;

        let mut index: u32 = 0;
        let mut current = first;
        let mut next = second;
        loop {
            if self.ctx.aborted() {
                return Err(CoreError::Aborted);
            }
            let body = match &cipher {
                Some(c) => c.seal(index, &current)?,
                None => current,
            };
            self.store.put_segment(&rel, index, &body)?;
            index += 1;

            if next.is_empty() {
                break;
            }
            current = next;
            next = read_segment(&mut reader, segment_size)?;
            hasher.consume(&next);
            total += next.len() as u64;
        }

        // The manifest goes up only after every segment landed.
        let plain = Digest::new(hasher.compute().0, total);
        let meta = UploadMeta {
            plain,
            crypt: crypt_meta(&cipher),
        };
        debug!("manifest PUT '{rel}' ({total} bytes in {index} segments)");
        self.store.put_manifest(&rel, &meta)?;
        Ok(())
    }
}

fn crypt_meta(cipher: &Option<SegmentCipher>) -> Option<CryptMeta> {
    cipher.as_ref().map(|c| CryptMeta {
        cipher: CIPHER_NAME.to_owned(),
        salt_hex: c.salt_hex(),
    })
}

/// Read up to `len` bytes; a short result means end of file.
fn read_segment(reader: &mut impl Read, len: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}
