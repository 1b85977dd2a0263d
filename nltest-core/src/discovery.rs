//! Source file enumeration for toolbox staging.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use walkdir::WalkDir;

/// A shell-style file name pattern (`*` and `?` wildcards).
///
/// As with shell globs, a leading `.` in a file name is only matched by a
/// pattern that itself starts with `.`.
#[derive(Debug, Clone)]
pub struct FileGlob {
    raw: String,
    re: Regex,
}

impl FileGlob {
    pub fn new(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(anyhow!("empty file pattern"));
        }
        if raw.contains('/') || raw.contains('\\') {
            return Err(anyhow!("file pattern must not contain a path separator: {raw}"));
        }

        let mut expr = String::with_capacity(raw.len() + 8);
        expr.push('^');
        for ch in raw.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');

        let re = Regex::new(&expr).with_context(|| format!("invalid file pattern: {raw}"))?;
        Ok(Self {
            raw: raw.to_string(),
            re,
        })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        if file_name.starts_with('.') && !self.raw.starts_with('.') {
            return false;
        }
        self.re.is_match(file_name)
    }
}

/// Regular files directly inside `dir` whose name matches `glob`, sorted.
///
/// Symlinks are followed, so a linked file counts as the file it points at.
/// A missing directory yields no matches, like an unmatched shell glob.
pub fn matching_files(dir: &Path, glob: &FileGlob) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "source directory absent, nothing to match");
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        // Non-UTF-8 names are matched on their lossy form rather than skipped.
        if glob.matches(&entry.file_name().to_string_lossy()) {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

/// Every regular file below `root`, relative to it, sorted. Symlinks are followed.
pub fn tree_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?;
            found.push(rel.to_path_buf());
        }
    }
    Ok(found)
}
