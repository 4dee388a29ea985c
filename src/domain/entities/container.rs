use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::value_objects::{ArchiveVersion, ContainerRole};

/// One physical archive container (a zip file or a folder) and its role.
///
/// Clones share the lazily detected version, so a reader that detects the
/// version of the main container makes it visible to every holder.
#[derive(Debug, Clone)]
pub struct ArchiveContainer {
    path: PathBuf,
    role: ContainerRole,
    version: Arc<OnceCell<ArchiveVersion>>,
}

impl ArchiveContainer {
    pub fn new(path: impl Into<PathBuf>, role: ContainerRole) -> Self {
        Self {
            path: path.into(),
            role,
            version: Arc::new(OnceCell::new()),
        }
    }

    pub fn main(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ContainerRole::Main)
    }

    pub fn auxiliary(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ContainerRole::Auxiliary)
    }

    pub fn with_version(self, version: ArchiveVersion) -> Self {
        let _ = self.version.set(version);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> ContainerRole {
        self.role
    }

    /// Version if already known
    pub fn version(&self) -> Option<ArchiveVersion> {
        self.version.get().copied()
    }

    /// Version, falling back to the default when none was detected
    pub fn version_or_default(&self) -> ArchiveVersion {
        self.version().unwrap_or_default()
    }

    /// Sets the version once; later calls keep the first value.
    pub fn set_version(&self, version: ArchiveVersion) {
        let _ = self.version.set(version);
    }

    /// Key used by strategies that keep per-container state
    pub(crate) fn key(&self) -> PathBuf {
        self.path.clone()
    }
}

impl std::fmt::Display for ArchiveContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} container at {}", self.role, self.path.display())
    }
}
