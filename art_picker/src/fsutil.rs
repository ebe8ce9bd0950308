//! Filesystem helpers: atomic writes and filename sanitising

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

lazy_static! {
    static ref INVALID_FILENAME_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

const MAX_FILENAME_CHARS: usize = 180;

/// Write `data` to `path` so readers see either the old file or the complete
/// new one, never a partial write.
///
/// The bytes go to a temporary file in the same directory which is then
/// renamed over `path`.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Replace characters that are invalid in file names and collapse whitespace
pub fn safe_filename(s: &str) -> String {
    let replaced = INVALID_FILENAME_CHARS.replace_all(s, "_");
    let collapsed = WHITESPACE_RUN.replace_all(&replaced, " ");
    collapsed.trim().chars().take(MAX_FILENAME_CHARS).collect()
}

/// Stable, filesystem-safe key for a string: readable prefix plus a short
/// SHA-256 so distinct inputs never share a key after sanitising
pub fn cache_key(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    let hash: String = digest.iter().take(5).map(|b| format!("{:02x}", b)).collect();
    let readable: String = safe_filename(s).replace(' ', "_").chars().take(80).collect();
    format!("{}_{}", readable, hash)
}
