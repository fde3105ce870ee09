//! Allow-list of search roots. Every path the resolver visits or returns must sit
//! at or below one of these entries.

use crate::error::ResolveError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_ALLOW_LIST_FILE: &str = ".allowed_dirs";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<PathBuf>,
}

impl AllowList {
    pub fn new<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// One path per line. Line terminators are trimmed and blank lines skipped;
    /// nothing else is validated.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.trim().is_empty()),
        )
    }

    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ResolveError::ConfigMissing {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(ResolveError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// True when `path` is an entry or a descendant of one. Comparison is by
    /// path component, so `/data/photos2` is not under `/data/photos`.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|allowed| path.starts_with(allowed))
    }

    /// True when `path` is itself one of the entries.
    pub fn is_root(&self, path: &Path) -> bool {
        self.entries.iter().any(|allowed| allowed.as_path() == path)
    }
}

/// Where the resolver gets its allow-list from. Loaded once per resolution call.
pub trait AllowListSource {
    fn load(&self) -> Result<AllowList, ResolveError>;
}

impl AllowListSource for AllowList {
    fn load(&self) -> Result<AllowList, ResolveError> {
        Ok(self.clone())
    }
}

/// Allow-list backed by a file that is re-read on every call.
#[derive(Debug, Clone)]
pub struct AllowListFile {
    path: PathBuf,
}

impl AllowListFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for AllowListFile {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOW_LIST_FILE)
    }
}

impl AllowListSource for AllowListFile {
    fn load(&self) -> Result<AllowList, ResolveError> {
        AllowList::load(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_terminators_and_skips_blank_lines() {
        let list = AllowList::parse("/home/me/Documents\r\n\n/home/me/Desktop\n");
        assert_eq!(
            list.entries(),
            &[
                PathBuf::from("/home/me/Documents"),
                PathBuf::from("/home/me/Desktop")
            ]
        );
    }

    #[test]
    fn containment_respects_component_boundaries() {
        let list = AllowList::new(["/data/photos"]);
        assert!(list.contains(Path::new("/data/photos")));
        assert!(list.contains(Path::new("/data/photos/2023/summer")));
        assert!(!list.contains(Path::new("/data/photos2")));
        assert!(!list.contains(Path::new("/data")));
        assert!(!list.contains(Path::new("photos/2023")));
    }

    #[test]
    fn is_root_only_matches_entries() {
        let list = AllowList::new(["/data/photos/"]);
        assert!(list.is_root(Path::new("/data/photos")));
        assert!(!list.is_root(Path::new("/data/photos/2023")));
    }

    #[test]
    fn missing_file_is_config_missing() {
        let temp = tempfile::tempdir().unwrap();
        let err = AllowList::load(&temp.path().join(".allowed_dirs")).unwrap_err();
        assert!(matches!(err, ResolveError::ConfigMissing { .. }));
    }

    #[test]
    fn file_source_rereads_on_every_load() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join(".allowed_dirs");
        fs::write(&file, "/a\n").unwrap();
        let source = AllowListFile::new(&file);
        assert_eq!(source.load().unwrap().entries().len(), 1);

        fs::write(&file, "/a\n/b\n").unwrap();
        assert_eq!(source.load().unwrap().entries().len(), 2);
    }
}
