//! Content hashing of a container's source directory.

use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::{DirEntry, WalkDir};

/// Directories never considered part of the source.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// SHA-256 over every file's relative path and contents, in sorted order.
///
/// The digest changes when any file is added, removed, renamed, or edited.
pub fn hash_directory(root: &Path) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(entry.path())?);
        hasher.update([0u8]);
    }

    Ok(hex::encode(hasher.finalize()))
}
