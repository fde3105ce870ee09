use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("allow-list file not found: {}", path.display())]
    ConfigMissing { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("directory name is empty")]
    EmptyName,
    #[error("'{name}' has {segments} segments; only 'dir' or 'parent/dir' are supported")]
    TooDeep { name: String, segments: usize },
}

impl ResolveError {
    /// Errors caused by the request itself rather than the environment.
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, ResolveError::EmptyName | ResolveError::TooDeep { .. })
    }
}
