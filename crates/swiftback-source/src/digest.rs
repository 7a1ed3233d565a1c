use crate::asset::Digest;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const READ_BUF_LEN: usize = 1024 * 1024;

/// Stream a file and return its MD5 and byte length.
///
/// `should_abort` is consulted between read blocks; `Ok(None)` means the
/// read was cut short by an abort, not that the file failed.
pub fn file_digest(path: &Path, should_abort: &dyn Fn() -> bool) -> io::Result<Option<Digest>> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(READ_BUF_LEN, file);
    let mut hasher = md5::Context::new();
    let mut buf = vec![0u8; READ_BUF_LEN];
    let mut len: u64 = 0;

    loop {
        if should_abort() {
            return Ok(None);
        }
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.consume(&buf[..n]);
        len += n as u64;
    }

    Ok(Some(Digest::new(hasher.compute().0, len)))
}

/// Lowercase hex rendering of an MD5, the form carried by Swift `ETag`
/// headers and the uncrypted-metadata headers.
pub fn md5_hex(md5: &[u8; 16]) -> String {
    format!("{:x}", md5::Digest(*md5))
}

/// Parse a hex MD5, tolerating the double quotes some stores wrap around
/// `ETag` values.
pub fn parse_md5_hex(s: &str) -> Option<[u8; 16]> {
    let s = s.trim().trim_matches('"');
    if s.len() != 32 {
        return None;
    }
    let mut out = [0u8; 16];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).ok()?;
    }
    Some(out)
}
