use crate::client::{escape_path, SwiftClient};
use crate::RemoteError;
use swiftback_source::{md5_hex, parse_md5_hex, Digest, RemoteObject};
use tracing::debug;

pub const META_UNCRYPTED_MD5: &str = "X-Object-Meta-Uncrypted-Md5";
pub const META_UNCRYPTED_LEN: &str = "X-Object-Meta-Uncrypted-Len";
pub const META_CIPHER: &str = "X-Object-Meta-Cipher";
pub const META_KEY_SALT: &str = "X-Object-Meta-Key-Salt";
pub const MANIFEST: &str = "X-Object-Manifest";

/// Plaintext digest and encryption details attached to an upload. The MD5
/// and length always describe the plaintext, never the sealed bytes, so a
/// later run can compare without decrypting.
pub struct UploadMeta {
    pub plain: Digest,
    pub crypt: Option<CryptMeta>,
}

/// Self-description of an encrypted payload, published as object metadata.
pub struct CryptMeta {
    pub cipher: String,
    pub salt_hex: String,
}

/// Object-level operations against one `{container}/{dst_folder}` prefix.
#[derive(Clone)]
pub struct RemoteStore {
    client: SwiftClient,
    endpoint: String,
    container: String,
    dst_folder: String,
}

impl RemoteStore {
    pub fn new(client: SwiftClient, endpoint: &str, container: &str, dst_folder: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            container: container.to_owned(),
            dst_folder: dst_folder.to_owned(),
        }
    }

    fn object_url(&self, rel_key: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.endpoint,
            self.container,
            escape_path(&self.dst_folder),
            escape_path(rel_key)
        )
    }

    fn segment_url(&self, rel_key: &str, index: u32) -> String {
        format!("{}/{index:08}", self.object_url(rel_key))
    }

    /// HEAD the object and recover its plaintext digest.
    ///
    /// Encrypted objects carry the digest in the uncrypted-metadata pair;
    /// plain objects expose it as `ETag` and `Content-Length`. Any non-200
    /// status or unparseable digest is an error, which the pipeline
    /// degrades to "upload".
    pub fn probe(&self, rel_key: &str) -> Result<RemoteObject, RemoteError> {
        let url = self.object_url(rel_key);
        let head = self.client.head(&url)?;
        if head.status != 200 {
            return Err(RemoteError::Status {
                code: head.status,
                url,
            });
        }

        let (digest, encrypted) = match head.header(META_UNCRYPTED_MD5) {
            Some(meta_md5) => {
                let md5 = parse_md5_hex(meta_md5).ok_or_else(|| {
                    RemoteError::InvalidResponse(format!("bad {META_UNCRYPTED_MD5}: '{meta_md5}'"))
                })?;
                let len = head
                    .header(META_UNCRYPTED_LEN)
                    .and_then(|v| v.parse::<u64>().ok())
                    .ok_or_else(|| {
                        RemoteError::InvalidResponse(format!("missing {META_UNCRYPTED_LEN}"))
                    })?;
                (Digest::new(md5, len), true)
            }
            None => {
                let etag = head.header("ETag").ok_or_else(|| {
                    RemoteError::InvalidResponse("missing ETag".to_owned())
                })?;
                let md5 = parse_md5_hex(etag).ok_or_else(|| {
                    RemoteError::InvalidResponse(format!("bad ETag: '{etag}'"))
                })?;
                let len = head
                    .header("Content-Length")
                    .and_then(|v| v.parse::<u64>().ok())
                    .ok_or_else(|| {
                        RemoteError::InvalidResponse("missing Content-Length".to_owned())
                    })?;
                (Digest::new(md5, len), false)
            }
        };

        debug!("probed '{rel_key}': {} bytes, encrypted={encrypted}", digest.len);
        Ok(RemoteObject { digest, encrypted })
    }

    /// Single PUT for a small object.
    pub fn put_object(&self, rel_key: &str, body: &[u8], meta: &UploadMeta) -> Result<(), RemoteError> {
        self.client
            .put(&self.object_url(rel_key), &meta_headers(meta), body)
    }

    /// PUT one segment of a large object.
    pub fn put_segment(&self, rel_key: &str, index: u32, body: &[u8]) -> Result<(), RemoteError> {
        self.client.put(&self.segment_url(rel_key, index), &[], body)
    }

    /// PUT the zero-byte manifest that stitches the segments together.
    /// Issued only after every segment PUT has succeeded.
    pub fn put_manifest(&self, rel_key: &str, meta: &UploadMeta) -> Result<(), RemoteError> {
        let mut headers = meta_headers(meta);
        headers.push((
            MANIFEST,
            format!("{}/{}/{rel_key}/", self.container, self.dst_folder),
        ));
        self.client.put(&self.object_url(rel_key), &headers, &[])
    }
}

fn meta_headers(meta: &UploadMeta) -> Vec<(&'static str, String)> {
    let mut headers = Vec::new();
    if let Some(crypt) = &meta.crypt {
        headers.push((META_UNCRYPTED_MD5, md5_hex(&meta.plain.md5)));
        headers.push((META_UNCRYPTED_LEN, meta.plain.len.to_string()));
        headers.push((META_CIPHER, crypt.cipher.clone()));
        headers.push((META_KEY_SALT, crypt.salt_hex.clone()));
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{status_with_headers, MockServer};

    fn store(url: &str) -> RemoteStore {
        RemoteStore::new(SwiftClient::new("tok"), url, "default", "backup")
    }

    #[test]
    fn probe_plain_object_uses_etag() {
        let server = MockServer::start(vec![status_with_headers(
            200,
            "OK",
            &[
                ("ETag", "5eb63bbbe01eeed093cb22bb8f5acdc3"),
                ("Content-Length", "11"),
            ],
        )]);

        let remote = store(&server.url).probe("a.txt").unwrap();
        assert!(remote.digest.computed);
        assert!(!remote.encrypted);
        assert_eq!(remote.digest.len, 11);
        assert_eq!(md5_hex(&remote.digest.md5), "5eb63bbbe01eeed093cb22bb8f5acdc3");

        let reqs = server.requests();
        assert_eq!(reqs[0].method, "HEAD");
        assert_eq!(reqs[0].target, "/default/backup/a.txt");
    }

    #[test]
    fn probe_encrypted_object_prefers_uncrypted_meta() {
        let server = MockServer::start(vec![status_with_headers(
            200,
            "OK",
            &[
                ("ETag", "00000000000000000000000000000000"),
                ("Content-Length", "1064"),
                ("X-Object-Meta-Uncrypted-Md5", "5eb63bbbe01eeed093cb22bb8f5acdc3"),
                ("X-Object-Meta-Uncrypted-Len", "1024"),
            ],
        )]);

        let remote = store(&server.url).probe("big.bin").unwrap();
        assert!(remote.encrypted);
        assert_eq!(remote.digest.len, 1024);
        assert_eq!(md5_hex(&remote.digest.md5), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn probe_non_200_is_error() {
        let server = MockServer::start(vec![status_with_headers(
            503,
            "Service Unavailable",
            &[("Content-Length", "0")],
        )]);

        let err = store(&server.url).probe("a.txt").unwrap_err();
        assert!(matches!(err, RemoteError::Status { code: 503, .. }));
    }

    #[test]
    fn probe_bad_etag_is_error() {
        let server = MockServer::start(vec![status_with_headers(
            200,
            "OK",
            &[("ETag", "not-hex"), ("Content-Length", "11")],
        )]);

        let err = store(&server.url).probe("a.txt").unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse(_)));
    }

    #[test]
    fn put_object_plain_has_no_meta_headers() {
        let server = MockServer::start(vec![status_with_headers(
            201,
            "Created",
            &[("Content-Length", "0")],
        )]);

        let meta = UploadMeta {
            plain: Digest::new([0xAB; 16], 5),
            crypt: None,
        };
        store(&server.url).put_object("a.txt", b"hello", &meta).unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].target, "/default/backup/a.txt");
        assert_eq!(reqs[0].body, b"hello");
        assert!(!reqs[0].headers.contains_key("x-object-meta-uncrypted-md5"));
    }

    #[test]
    fn put_object_encrypted_carries_plaintext_digest() {
        let server = MockServer::start(vec![status_with_headers(
            201,
            "Created",
            &[("Content-Length", "0")],
        )]);

        let plain = Digest::new(
            parse_md5_hex("5eb63bbbe01eeed093cb22bb8f5acdc3").unwrap(),
            11,
        );
        let meta = UploadMeta {
            plain,
            crypt: Some(CryptMeta {
                cipher: "aes256gcm-pbkdf2".to_owned(),
                salt_hex: "00112233445566778899aabbccddeeff".to_owned(),
            }),
        };
        store(&server.url).put_object("a.txt", b"<sealed>", &meta).unwrap();

        let reqs = server.requests();
        assert_eq!(
            reqs[0].headers.get("x-object-meta-uncrypted-md5").unwrap(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        assert_eq!(reqs[0].headers.get("x-object-meta-uncrypted-len").unwrap(), "11");
        assert_eq!(
            reqs[0].headers.get("x-object-meta-cipher").unwrap(),
            "aes256gcm-pbkdf2"
        );
        assert_eq!(
            reqs[0].headers.get("x-object-meta-key-salt").unwrap(),
            "00112233445566778899aabbccddeeff"
        );
    }

    #[test]
    fn segment_paths_are_zero_padded() {
        let server = MockServer::start(vec![
            status_with_headers(201, "Created", &[("Content-Length", "0")]),
            status_with_headers(201, "Created", &[("Content-Length", "0")]),
        ]);

        let s = store(&server.url);
        s.put_segment("big.bin", 0, b"seg0").unwrap();
        s.put_segment("big.bin", 42, b"seg42").unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].target, "/default/backup/big.bin/00000000");
        assert_eq!(reqs[1].target, "/default/backup/big.bin/00000042");
    }

    #[test]
    fn manifest_points_at_segment_prefix() {
        let server = MockServer::start(vec![status_with_headers(
            201,
            "Created",
            &[("Content-Length", "0")],
        )]);

        let meta = UploadMeta {
            plain: Digest::new([1; 16], 100),
            crypt: None,
        };
        store(&server.url).put_manifest("big.bin", &meta).unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].target, "/default/backup/big.bin");
        assert!(reqs[0].body.is_empty());
        assert_eq!(
            reqs[0].headers.get("x-object-manifest").unwrap(),
            "default/backup/big.bin/"
        );
    }

    #[test]
    fn object_url_escapes_path_segments() {
        let server = MockServer::start(vec![status_with_headers(
            200,
            "OK",
            &[
                ("ETag", "d41d8cd98f00b204e9800998ecf8427e"),
                ("Content-Length", "0"),
            ],
        )]);

        store(&server.url).probe("dir with space/f#1.txt").unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].target, "/default/backup/dir%20with%20space/f%231.txt");
    }
}
