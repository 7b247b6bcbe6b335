//! General helpers for the command-line tooling

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};

/// Format a byte count in the decimal units the cache budget uses
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1_000;
    const MB: u64 = KB * 1_000;
    const GB: u64 = MB * 1_000;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}

/// Create a glob matcher from a pattern string
///
/// - `*.ext` becomes `**/*.ext` (match in any directory)
/// - Plain text without wildcards becomes `**/*text*` (substring search)
pub fn create_glob_matcher(pattern: &str) -> Result<GlobMatcher> {
    let pattern = if pattern.starts_with("*.") {
        format!("**/{}", pattern)
    } else if !pattern.contains('*') && !pattern.contains('?') {
        format!("**/*{}*", pattern)
    } else {
        pattern.to_string()
    };

    let glob = Glob::new(&pattern).with_context(|| format!("Invalid pattern: {}", pattern))?;
    Ok(glob.compile_matcher())
}

/// Check a path relative to `root` against the optional filter
pub fn matches_filter(path: &Path, root: &Path, matcher: Option<&GlobMatcher>) -> bool {
    match matcher {
        Some(m) => m.is_match(path.strip_prefix(root).unwrap_or(path)),
        None => true,
    }
}

/// Recursively collect all files under a directory, sorted by path
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files_recursive(dir, &mut files)
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    files.sort();
    Ok(files)
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                collect_files_recursive(&path, files)?;
            } else {
                files.push(path);
            }
        }
    }
    Ok(())
}

/// Mirror `input` (found under `input_root`) into `output_root` with a new extension
pub fn output_path_for(
    input: &Path,
    input_root: &Path,
    output_root: &Path,
    extension: &str,
) -> PathBuf {
    let relative = input.strip_prefix(input_root).unwrap_or(input);
    output_root.join(relative).with_extension(extension)
}
