use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::age::AgeFilter;
use crate::error::{Result, SubfetchError};

/// Resolve the user-supplied paths into a flat, ordered, deduplicated list
/// of candidate video files.
///
/// Files named explicitly are always candidates, whatever their extension.
/// Directories are walked recursively and filtered against the extension
/// allowlist. The age filter is applied exactly once per candidate.
pub fn scan(
    paths: &[PathBuf],
    extensions: &[String],
    filter: Option<&AgeFilter>,
) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for path in paths {
        if path.is_dir() {
            collect_directory(path, extensions, &mut candidates, &mut seen)?;
        } else if path.exists() || path.is_symlink() {
            if seen.insert(path.clone()) {
                candidates.push(path.clone());
            }
        } else {
            return Err(SubfetchError::Scan(format!(
                "{} is not a file or directory",
                path.display()
            )));
        }
    }

    if let Some(filter) = filter {
        candidates.retain(|candidate| keep_by_age(candidate, filter));
    }

    debug!("Scan produced {} candidate video file(s)", candidates.len());
    Ok(candidates)
}

fn collect_directory(
    dir: &Path,
    extensions: &[String],
    candidates: &mut Vec<PathBuf>,
    seen: &mut HashSet<PathBuf>,
) -> Result<()> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SubfetchError::Scan(e.to_string()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        if !has_video_extension(entry.path(), extensions) {
            continue;
        }
        let path = entry.path().to_path_buf();
        if seen.insert(path.clone()) {
            candidates.push(path);
        }
    }
    Ok(())
}

fn has_video_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|allowed| allowed == &ext)
        })
        .unwrap_or(false)
}

/// Evaluate the age filter for one candidate. Files whose modification time
/// cannot be read are dropped with a warning rather than failing the scan.
fn keep_by_age(path: &Path, filter: &AgeFilter) -> bool {
    let mtime = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => DateTime::<Utc>::from(mtime),
        Err(e) => {
            warn!("Cannot read modification time of {}: {}", path.display(), e);
            return false;
        }
    };
    filter.matches(mtime)
}
