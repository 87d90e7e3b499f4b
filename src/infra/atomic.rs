// ============================================================
// Layer 6 — Atomic File Replacement
// ============================================================
// Every artefact the pipeline persists (weights, metadata,
// vocabulary, corpus) is replaced the same way:
//
//   1. write to a hidden temp file in the same directory
//   2. sync_all() the temp file
//   3. rename it over the final path
//   4. fsync the parent directory (Unix only)
//
// A reader therefore sees either the old file or the new one,
// never a half-written one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temp path next to `path`, e.g. `dir/.best_weights.mpk.partial`.
pub fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::other(format!("'{}' has no file name", path.display())))?;
    Ok(path.with_file_name(format!(".{name}.partial")))
}

/// Write `data` to the temp sibling of `path` without touching `path`.
/// The caller moves it into place later with `commit`.
pub fn stage(path: &Path, data: &[u8]) -> io::Result<PathBuf> {
    let temp = temp_path(path)?;
    let written = File::create(&temp).and_then(|mut file| file.write_all(data));
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(temp)
}

/// Move a fully written temp file over `path`.
pub fn commit(temp: &Path, path: &Path) -> io::Result<()> {
    File::open(temp)?.sync_all()?;
    fs::rename(temp, path)?;
    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }
    Ok(())
}

/// Atomically replace `path` with `data`, creating parent directories.
pub fn atomic_write(path: impl AsRef<Path>, data: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = stage(path, data)?;
    let result = commit(&temp, path);
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> io::Result<()> {
    // An empty parent means the current directory.
    let dir = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
