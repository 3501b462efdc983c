//! Repository snapshot builder.
//!
//! Walks a local directory depth-first and collects a [`Snapshot`] of its
//! text files. Hidden entries (any name starting with `.`) are pruned
//! during the walk, so nothing beneath a hidden directory is visited.
//! Files with an ignored extension are skipped, and every kept file is
//! decoded lossily and cut to `max_chars_per_file` characters.
//!
//! Per-file failures (permissions, dangling symlinks, FIFOs, device nodes)
//! never abort the scan: the file is left out and the walk continues.
//!
//! Symlinks are not read unless `follow_symlinks` is set, and even then
//! only when their target resolves inside the scan root.
//!
//! The serialized form handed to the generator is the pretty-printed JSON
//! object of the snapshot, cut as a whole to `max_snapshot_chars`
//! characters (see [`to_budgeted_json`]).

use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::models::Snapshot;

/// Scan `root` and return its snapshot.
///
/// # Errors
///
/// Returns [`Error::InvalidRoot`] if `root` does not exist, is not a
/// directory, or cannot be listed. Nothing else is fatal.
pub fn scan(root: &Path, config: &ScanConfig) -> Result<Snapshot> {
    let invalid_root = || Error::InvalidRoot {
        path: root.to_path_buf(),
    };

    let is_dir = std::fs::metadata(root)
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir || std::fs::read_dir(root).is_err() {
        return Err(invalid_root());
    }
    // Followed links must still resolve inside the copy.
    let canonical_root = std::fs::canonicalize(root).map_err(|_| invalid_root())?;

    let mut snapshot = Snapshot::new();
    let mut skipped = 0usize;

    // The root itself may live under a dot-directory (temp dirs often do),
    // so only entries below it are checked.
    let mut walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable entry: {}", err);
                skipped += 1;
                continue;
            }
        };

        if entry.path_is_symlink() {
            if !config.follow_symlinks {
                trace!("not following symlink: {}", entry.path().display());
                continue;
            }
            if !resolves_within(&canonical_root, entry.path()) {
                debug!("symlink leaves scan root: {}", entry.path().display());
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                skipped += 1;
                continue;
            }
        }

        if entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if config.is_ignored_extension(&name) {
            trace!("ignored by extension: {}", entry.path().display());
            continue;
        }

        let Some(rel_path) = relative_path(root, entry.path()) else {
            continue;
        };

        match read_truncated(entry.path(), config.max_chars_per_file) {
            Ok(content) => snapshot.insert(rel_path, content),
            Err(err) => {
                debug!("skipping {}: {}", entry.path().display(), err);
                skipped += 1;
            }
        }
    }

    debug!(
        "scanned {}: {} files kept, {} skipped",
        root.display(),
        snapshot.len(),
        skipped
    );

    Ok(snapshot)
}

/// Serialize `snapshot` as pretty JSON and cut the text to `max_chars`
/// characters.
///
/// The cut applies to the serialized whole, so the final entry may end
/// mid-string and the result may not be valid JSON. Entries are emitted in
/// sorted path order, so the cut is deterministic.
pub fn to_budgeted_json(snapshot: &Snapshot, max_chars: usize) -> String {
    let json = serde_json::to_string_pretty(snapshot).unwrap_or_default();
    truncate_chars(json, max_chars)
}

fn resolves_within(canonical_root: &Path, path: &Path) -> bool {
    std::fs::canonicalize(path)
        .map(|target| target.starts_with(canonical_root))
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Path of `path` relative to `root`, joined with `/`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Read at most `max_chars` characters of `path`, replacing invalid UTF-8.
fn read_truncated(path: &Path, max_chars: usize) -> std::io::Result<String> {
    // Opening a FIFO or device node can block or stream forever.
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }

    // Every decoded char takes at most 4 bytes, so one spare char of slack
    // keeps a sequence split at the byte limit from reaching the output.
    let byte_limit = (max_chars as u64).saturating_add(1).saturating_mul(4);
    let mut bytes = Vec::new();
    File::open(path)?.take(byte_limit).read_to_end(&mut bytes)?;

    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok(truncate_chars(text, max_chars))
}

pub(crate) fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}
