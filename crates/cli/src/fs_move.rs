use anyhow::{anyhow, Context, Result};
use dirscout_core::config::MoveConfig;
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    #[default]
    Rename,
    Skip,
    Overwrite,
}

impl From<&str> for ConflictPolicy {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "skip" => ConflictPolicy::Skip,
            "overwrite" => ConflictPolicy::Overwrite,
            _ => ConflictPolicy::Rename,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    pub conflict: ConflictPolicy,
    pub copy_then_delete: bool,
}

impl From<&MoveConfig> for MoveOptions {
    fn from(cfg: &MoveConfig) -> Self {
        Self {
            conflict: ConflictPolicy::from(cfg.conflict.as_str()),
            copy_then_delete: cfg.copy_then_delete,
        }
    }
}

#[derive(Debug, Default)]
pub struct MoveReport {
    pub moved: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl MoveReport {
    pub fn summary(&self, src: &Path, dest: &Path) -> String {
        let mut out = format!(
            "Moved {} files from '{}' to '{}'.",
            self.moved.len(),
            src.display(),
            dest.display()
        );
        if !self.skipped.is_empty() {
            out.push_str(&format!(
                "\nSkipped {} files already present in '{}'.",
                self.skipped.len(),
                dest.display()
            ));
        }
        for (file, err) in &self.failed {
            out.push_str(&format!("\nFailed to move '{}': {}", file.display(), err));
        }
        out
    }
}

/// Builds a file-name matcher for `*{extension}`. A pattern that already starts
/// with `*` is used as is.
pub fn extension_matcher(extension: &str) -> Result<GlobMatcher> {
    let pattern = if extension.starts_with('*') {
        extension.to_string()
    } else {
        format!("*{}", extension)
    };
    Ok(Glob::new(&pattern)?.compile_matcher())
}

/// Regular, non-hidden files in `src` whose names match. When `dest` lives under
/// `src` it is never collected from.
pub fn collect_files(src: &Path, dest: &Path, recursive: bool, matcher: &GlobMatcher) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let nested_dest = (dest != src && dest.starts_with(src)).then_some(dest);
    WalkDir::new(src)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !is_hidden(e.path()) && nested_dest.map_or(true, |d| !e.path().starts_with(d))
        })
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && matcher.is_match(e.file_name()))
        .map(|e| e.into_path())
        .collect()
}

pub fn move_all(files: &[PathBuf], dest_dir: &Path, opts: &MoveOptions) -> MoveReport {
    let mut report = MoveReport::default();
    for file in files {
        match move_into(file, dest_dir, opts) {
            Ok(Some(target)) => {
                debug!(from = %file.display(), to = %target.display(), "moved");
                report.moved.push(target);
            }
            Ok(None) => report.skipped.push(file.clone()),
            Err(err) => {
                warn!(file = %file.display(), error = %err, "move failed");
                report.failed.push((file.clone(), format!("{:#}", err)));
            }
        }
    }
    report
}

/// Moves `file` into `dest_dir`, returning the final path, or `None` when the
/// conflict policy skipped it.
pub fn move_into(file: &Path, dest_dir: &Path, opts: &MoveOptions) -> Result<Option<PathBuf>> {
    let name = file
        .file_name()
        .ok_or_else(|| anyhow!("{} has no file name", file.display()))?;
    let target = dest_dir.join(name);
    let target = if target.exists() {
        match opts.conflict {
            ConflictPolicy::Skip => return Ok(None),
            ConflictPolicy::Overwrite => target,
            ConflictPolicy::Rename => resolve_conflict(&target),
        }
    } else {
        target
    };
    apply_move(file, &target, opts.copy_then_delete)?;
    Ok(Some(target))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn resolve_conflict(dest: &Path) -> PathBuf {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let stem = dest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string();
    let ext = dest
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    let mut counter = 1;
    loop {
        let name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn apply_move(from: &Path, to: &Path, copy_then_delete: bool) -> Result<()> {
    if !copy_then_delete {
        match fs::rename(from, to) {
            Ok(()) => return Ok(()),
            // e.g. crossing filesystems
            Err(err) => debug!(from = %from.display(), error = %err, "rename failed, copying instead"),
        }
    }
    fs::copy(from, to).with_context(|| format!("copy to {}", to.display()))?;
    fs::remove_file(from).with_context(|| format!("remove {}", from.display()))?;
    Ok(())
}
