//! Resolves a directory name such as `images` or `Desktop/images` to a single
//! absolute path inside the allow-listed roots.

use crate::allowlist::{AllowList, AllowListSource};
use crate::error::ResolveError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Default)]
pub struct SearchSpec {
    pub directory_name: String,
    /// Replaces the allow-list entries as the set of search roots. Containment is
    /// still checked against the allow-list.
    pub base_dir: Option<PathBuf>,
    /// Directory names never descended into.
    pub ignore_dirs: Vec<String>,
}

impl SearchSpec {
    pub fn new(directory_name: impl Into<String>) -> Self {
        Self {
            directory_name: directory_name.into(),
            ..Self::default()
        }
    }

    pub fn with_base_dir(mut self, base_dir: Option<PathBuf>) -> Self {
        self.base_dir = base_dir;
        self
    }

    pub fn with_ignore_dirs(mut self, ignore_dirs: Vec<String>) -> Self {
        self.ignore_dirs = ignore_dirs;
        self
    }

    fn target(&self) -> Result<Target, ResolveError> {
        let segments: Vec<&str> = self
            .directory_name
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            [] => Err(ResolveError::EmptyName),
            [dir] => Ok(Target::Single(dir.to_string())),
            [parent, child] => Ok(Target::Nested {
                parent: parent.to_string(),
                child: child.to_string(),
            }),
            _ => Err(ResolveError::TooDeep {
                name: self.directory_name.clone(),
                segments: segments.len(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// Matches only children that are themselves allow-list entries.
    Single(String),
    Nested { parent: String, child: String },
}

impl Target {
    fn matches(&self, entry: &DirEntry, allow: &AllowList) -> bool {
        let name = entry.file_name().to_string_lossy();
        if is_hidden_name(&name) {
            return false;
        }
        match self {
            Target::Single(dir) => {
                entry.depth() > 0 && name == dir.as_str() && allow.is_root(entry.path())
            }
            Target::Nested { parent, child } => {
                name == child.as_str()
                    && entry.path().to_string_lossy().contains(parent.as_str())
                    && allow.contains(entry.path())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    NotFound,
}

impl Resolution {
    pub fn found(self) -> Option<PathBuf> {
        match self {
            Resolution::Found(path) => Some(path),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Decides which subdirectories a walk may descend into.
struct Pruner<'a> {
    allow: &'a AllowList,
    ignore: &'a [String],
}

impl Pruner<'_> {
    fn eligible(&self, path: &Path, name: &str) -> bool {
        !is_hidden_name(name) && !self.ignore.iter().any(|d| d == name) && self.allow.contains(path)
    }

    fn keep(&self, entry: &DirEntry, target: &Target) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if !self.eligible(entry.path(), &name) {
            debug!(path = %entry.path().display(), "pruned");
            return false;
        }
        // Once the parent segment shows up among the children, its siblings are skipped.
        if let Target::Nested { parent, .. } = target {
            if name != parent.as_str() {
                if let Some(dir) = entry.path().parent() {
                    if self.has_eligible_child(dir, parent) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn has_eligible_child(&self, dir: &Path, name: &str) -> bool {
        let candidate = dir.join(name);
        // Follows symlinks: a linked directory still restricts descent, though it
        // is never entered itself.
        fs::metadata(&candidate)
            .map(|m| m.is_dir())
            .unwrap_or(false)
            && self.eligible(&candidate, name)
    }
}

fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Walks every search root and returns the deduplicated set of matching
/// directories.
pub fn collect_matches(
    spec: &SearchSpec,
    allow: &AllowList,
) -> Result<BTreeSet<PathBuf>, ResolveError> {
    let target = spec.target()?;
    let roots: Vec<PathBuf> = match &spec.base_dir {
        Some(base) => {
            if !allow.contains(base) {
                debug!(base_dir = %base.display(), "base directory is outside the allow-list, only allowed descendants are searched");
            }
            vec![base.clone()]
        }
        None => allow.entries().to_vec(),
    };

    let pruner = Pruner {
        allow,
        ignore: &spec.ignore_dirs,
    };
    let mut matches = BTreeSet::new();
    for root in roots {
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || pruner.keep(e, &target));
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() && target.matches(&entry, allow) {
                debug!(path = %entry.path().display(), "match");
                matches.insert(entry.into_path());
            }
        }
    }
    Ok(matches)
}

/// Resolves `spec` against `allow`. The shortest match (by character count)
/// wins; ties go to the lexicographically smaller path.
pub fn resolve(spec: &SearchSpec, allow: &AllowList) -> Result<Resolution, ResolveError> {
    let matches = collect_matches(spec, allow)?;
    Ok(matches
        .into_iter()
        .min_by_key(|p| p.to_string_lossy().chars().count())
        .map(Resolution::Found)
        .unwrap_or(Resolution::NotFound))
}

/// Resolver that loads a fresh allow-list from its source on every call.
#[derive(Debug, Clone)]
pub struct Resolver<S> {
    source: S,
}

impl<S: AllowListSource> Resolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn resolve(&self, spec: &SearchSpec) -> Result<Resolution, ResolveError> {
        let allow = self.source.load()?;
        let resolution = resolve(spec, &allow)?;
        match &resolution {
            Resolution::Found(path) => {
                info!(name = %spec.directory_name, path = %path.display(), "resolved directory")
            }
            Resolution::NotFound => info!(name = %spec.directory_name, "directory not found"),
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::AllowListFile;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for d in dirs {
            fs::create_dir_all(root.join(d)).unwrap();
        }
    }

    #[test]
    fn two_level_name_resolves_below_root() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["Desktop/images", "images"]);
        let allow = AllowList::new([&docs]);

        let found = resolve(&SearchSpec::new("Desktop/images"), &allow).unwrap();
        assert_eq!(found, Resolution::Found(docs.join("Desktop/images")));
    }

    #[test]
    fn single_level_name_only_matches_allow_listed_roots() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["Desktop/images", "images"]);

        let allow = AllowList::new([&docs]);
        let res = resolve(&SearchSpec::new("images"), &allow).unwrap();
        assert_eq!(res, Resolution::NotFound);

        let allow = AllowList::new([docs.clone(), docs.join("Desktop")]);
        let res = resolve(&SearchSpec::new("/Desktop/"), &allow).unwrap();
        assert_eq!(res, Resolution::Found(docs.join("Desktop")));
    }

    #[test]
    fn unknown_directory_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["Desktop/images"]);
        let allow = AllowList::new([&docs]);

        let res = resolve(&SearchSpec::new("Desktop/videos"), &allow).unwrap();
        assert_eq!(res, Resolution::NotFound);
    }

    #[test]
    fn hidden_directories_are_never_entered_or_returned() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &[".cache/Desktop/images", "Desktop/.images", ".config/images"]);
        let allow = AllowList::new([&docs]);

        for name in ["Desktop/images", "Desktop/.images", ".config/images"] {
            let res = resolve(&SearchSpec::new(name), &allow).unwrap();
            assert_eq!(res, Resolution::NotFound, "{name}");
        }
    }

    #[test]
    fn base_dir_outside_allow_list_finds_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        let outside = temp.path().join("outside");
        mkdirs(&docs, &["Desktop"]);
        mkdirs(&outside, &["Desktop/images"]);
        let allow = AllowList::new([&docs]);

        let spec = SearchSpec::new("Desktop/images").with_base_dir(Some(outside.join("Desktop/images")));
        assert_eq!(resolve(&spec, &allow).unwrap(), Resolution::NotFound);

        let spec = SearchSpec::new("Desktop/images").with_base_dir(Some(outside));
        assert_eq!(resolve(&spec, &allow).unwrap(), Resolution::NotFound);
    }

    #[test]
    fn base_dir_above_allow_list_searches_allowed_descendants() {
        let temp = tempfile::tempdir().unwrap();
        let home = temp.path().join("home");
        let docs = home.join("Documents");
        mkdirs(&home, &["Documents/Desktop/images", "secret/Desktop/images"]);
        let allow = AllowList::new([&docs]);

        let spec = SearchSpec::new("Desktop/images").with_base_dir(Some(home.clone()));
        assert_eq!(
            resolve(&spec, &allow).unwrap(),
            Resolution::Found(docs.join("Desktop/images"))
        );

        let spec = SearchSpec::new("Documents").with_base_dir(Some(home));
        assert_eq!(resolve(&spec, &allow).unwrap(), Resolution::Found(docs));
    }

    #[test]
    fn parent_segment_restricts_descent_to_itself() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["Desktop", "x/Desktop/images"]);
        let allow = AllowList::new([&docs]);

        let res = resolve(&SearchSpec::new("Desktop/images"), &allow).unwrap();
        assert_eq!(res, Resolution::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_parent_segment_still_restricts_descent() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["x/Desktop/images"]);
        std::os::unix::fs::symlink(docs.join("x/Desktop"), docs.join("Desktop")).unwrap();
        let allow = AllowList::new([&docs]);

        let res = resolve(&SearchSpec::new("Desktop/images"), &allow).unwrap();
        assert_eq!(res, Resolution::NotFound);
    }

    #[test]
    fn base_dir_narrows_search_roots() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["work/Desktop/images", "play/Desktop/images"]);
        let allow = AllowList::new([&docs]);

        let spec = SearchSpec::new("Desktop/images").with_base_dir(Some(docs.join("play")));
        assert_eq!(
            resolve(&spec, &allow).unwrap(),
            Resolution::Found(docs.join("play/Desktop/images"))
        );
    }

    #[test]
    fn shortest_match_wins_and_duplicates_collapse() {
        let temp = tempfile::tempdir().unwrap();
        let long_root = temp.path().join("a_rather_long_root");
        let short_root = temp.path().join("s");
        mkdirs(&long_root, &["Desktop/images"]);
        mkdirs(&short_root, &["Desktop/images/Desktop/images"]);
        let allow = AllowList::new([long_root.clone(), short_root.clone(), short_root.join("Desktop")]);
        let spec = SearchSpec::new("Desktop/images");

        let matches = collect_matches(&spec, &allow).unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(
            resolve(&spec, &allow).unwrap(),
            Resolution::Found(short_root.join("Desktop/images"))
        );
    }

    #[test]
    fn ignored_directories_are_not_descended() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["archive/Desktop/images"]);
        let allow = AllowList::new([&docs]);

        let spec = SearchSpec::new("Desktop/images").with_ignore_dirs(vec!["archive".into()]);
        assert_eq!(resolve(&spec, &allow).unwrap(), Resolution::NotFound);
        let spec = SearchSpec::new("Desktop/images");
        assert!(resolve(&spec, &allow).unwrap().is_found());
    }

    #[test]
    fn rejects_empty_and_deep_names() {
        let allow = AllowList::new(["/nonexistent"]);
        assert!(matches!(
            resolve(&SearchSpec::new("//"), &allow),
            Err(ResolveError::EmptyName)
        ));
        assert!(matches!(
            resolve(&SearchSpec::new("a/b/c"), &allow),
            Err(ResolveError::TooDeep { segments: 3, .. })
        ));
    }

    #[test]
    fn missing_allow_list_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = Resolver::new(AllowListFile::new(temp.path().join(".allowed_dirs")));
        let err = resolver.resolve(&SearchSpec::new("Desktop/images")).unwrap_err();
        assert!(matches!(err, ResolveError::ConfigMissing { .. }));
    }

    #[test]
    fn resolver_reads_allow_list_file() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("Documents");
        mkdirs(&docs, &["Desktop/images"]);
        let list = temp.path().join(".allowed_dirs");
        fs::write(&list, format!("{}\n", docs.display())).unwrap();

        let resolver = Resolver::new(AllowListFile::new(&list));
        let res = resolver.resolve(&SearchSpec::new("Desktop/images")).unwrap();
        assert_eq!(res.found(), Some(docs.join("Desktop/images")));
    }
}
