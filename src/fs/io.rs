//! Raw read/write/delete helpers.
//!
//! Writes take an exclusive `fs2` advisory lock before truncating so a
//! concurrent reader never observes a half-written payload; reads take a
//! shared lock. Anything that cannot be read is reported as absent.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Read a file's content, or `None` if it is missing or unreadable.
pub fn read(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    file.lock_shared().ok()?;
    let mut content = String::new();
    BufReader::new(&file).read_to_string(&mut content).ok()?;
    Some(content)
}

/// Overwrite a file, creating it and its parent directories as needed.
pub fn write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    #[allow(clippy::suspicious_open_options)]
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open file for writing: {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to acquire exclusive lock: {}", path.display()))?;
    // Truncate only once the lock is held.
    file.set_len(0)
        .with_context(|| format!("Failed to truncate file: {}", path.display()))?;
    let mut writer = BufWriter::new(&file);
    writer
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush file: {}", path.display()))?;
    Ok(())
}

/// Create an empty file (used for presence markers).
pub fn create(path: &Path) -> Result<()> {
    write(path, "")
}

/// `rm -rf`. Cleanup is best effort, so every error is ignored.
pub fn remove_recursive(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(e) = result {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("Failed to remove {}: {e}", path.display());
        }
    }
}

/// Remove everything inside a directory but keep the directory itself.
pub fn empty_dir(path: &Path) {
    for entry in list_dir(path) {
        remove_recursive(&entry);
    }
}

/// Entries directly inside a directory, sorted by name. Empty on any error.
pub fn list_dir(path: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(path) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    paths
}
