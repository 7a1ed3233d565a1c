use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// A content digest: MD5 plus byte length.
///
/// `computed` distinguishes a real digest from the record of a failed or
/// never-attempted computation. Two digests only compare equal through
/// [`Digest::matches`] when both are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Digest {
    pub md5: [u8; 16],
    pub len: u64,
    pub computed: bool,
}

impl Digest {
    pub fn new(md5: [u8; 16], len: u64) -> Self {
        Self {
            md5,
            len,
            computed: true,
        }
    }

    /// Record of a digest attempt that failed.
    pub fn failed() -> Self {
        Self::default()
    }

    /// True when both digests are computed and agree on MD5 and length.
    pub fn matches(&self, other: &Digest) -> bool {
        self.computed && other.computed && self.md5 == other.md5 && self.len == other.len
    }
}

/// What a HEAD probe learned about the object at an asset's remote key.
///
/// For an encrypted object the digest describes the plaintext, recovered
/// from the uncrypted-metadata headers; for a plain object it is the
/// stored ETag and Content-Length. A probe that failed leaves
/// `digest.computed == false`, which the synchronizer reads as "upload".
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteObject {
    pub digest: Digest,
    pub encrypted: bool,
}

impl RemoteObject {
    pub fn probe_failed() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    File,
    Folder,
}

/// A node in the source tree: one local file or folder targeted for backup.
///
/// Topology (parent/child links) is written only by the walker and is
/// frozen once parsing completes. The two digest cells are each written at
/// most once, by exactly one pipeline stage: `src` by a local-digest
/// worker, `remote` by a remote-digest worker.
pub struct Asset {
    abs_path: PathBuf,
    rel_path: PathBuf,
    kind: AssetKind,
    children: Mutex<Vec<Arc<Asset>>>,
    src: OnceLock<Digest>,
    remote: OnceLock<RemoteObject>,
}

impl Asset {
    pub fn new(abs_path: PathBuf, rel_path: PathBuf, kind: AssetKind) -> Arc<Self> {
        Arc::new(Self {
            abs_path,
            rel_path,
            kind,
            children: Mutex::new(Vec::new()),
            src: OnceLock::new(),
            remote: OnceLock::new(),
        })
    }

    pub fn abs_path(&self) -> &Path {
        &self.abs_path
    }

    pub fn rel_path(&self) -> &Path {
        &self.rel_path
    }

    /// The remote key suffix: the relative path with `/` separators.
    pub fn rel_key(&self) -> String {
        self.rel_path.to_string_lossy().into_owned()
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn is_folder(&self) -> bool {
        self.kind == AssetKind::Folder
    }

    pub fn add_child(&self, child: Arc<Asset>) {
        self.children.lock().unwrap().push(child);
    }

    /// Number of descendants, not counting `self`.
    pub fn descendant_count(&self) -> usize {
        let children = self.children.lock().unwrap();
        children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum::<usize>()
    }

    /// Set by the local-digest worker, once.
    pub fn set_src_digest(&self, digest: Digest) {
        let _ = self.src.set(digest);
    }

    pub fn src_digest(&self) -> Option<&Digest> {
        self.src.get()
    }

    /// Set by the remote-digest worker, once.
    pub fn set_remote(&self, remote: RemoteObject) {
        let _ = self.remote.set(remote);
    }

    /// `Some` once the remote-digest stage has probed (or failed to probe)
    /// this asset's key; `None` while the probe is still pending.
    pub fn remote(&self) -> Option<&RemoteObject> {
        self.remote.get()
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("rel_path", &self.rel_path)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_asset(rel: &str) -> Arc<Asset> {
        Asset::new(
            PathBuf::from("/src").join(rel),
            PathBuf::from(rel),
            AssetKind::File,
        )
    }

    #[test]
    fn digest_matches_requires_computed() {
        let a = Digest::new([1; 16], 10);
        let mut b = a;
        assert!(a.matches(&b));

        b.computed = false;
        assert!(!a.matches(&b));
        assert!(!b.matches(&a));
    }

    #[test]
    fn digest_matches_requires_same_length() {
        let a = Digest::new([1; 16], 10);
        let b = Digest::new([1; 16], 11);
        assert!(!a.matches(&b));
    }

    #[test]
    fn failed_digest_is_not_computed() {
        assert!(!Digest::failed().computed);
    }

    #[test]
    fn src_digest_set_once() {
        let asset = file_asset("a.txt");
        assert!(asset.src_digest().is_none());

        asset.set_src_digest(Digest::new([7; 16], 3));
        asset.set_src_digest(Digest::new([9; 16], 99));

        let d = asset.src_digest().unwrap();
        assert_eq!(d.md5, [7; 16]);
        assert_eq!(d.len, 3);
    }

    #[test]
    fn remote_cell_distinguishes_pending_from_failed() {
        let asset = file_asset("a.txt");
        assert!(asset.remote().is_none());

        asset.set_remote(RemoteObject::probe_failed());
        let r = asset.remote().unwrap();
        assert!(!r.digest.computed);
        assert!(!r.encrypted);
    }

    #[test]
    fn descendant_count_recurses() {
        let root = Asset::new("/src".into(), "".into(), AssetKind::Folder);
        let sub = Asset::new("/src/sub".into(), "sub".into(), AssetKind::Folder);
        sub.add_child(file_asset("sub/a.txt"));
        sub.add_child(file_asset("sub/b.txt"));
        root.add_child(sub);
        root.add_child(file_asset("c.txt"));

        assert_eq!(root.descendant_count(), 4);
    }

    #[test]
    fn rel_key_uses_forward_slashes() {
        let asset = file_asset("sub/a.txt");
        assert_eq!(asset.rel_key(), "sub/a.txt");
    }
}
