use parking_lot::RwLock;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::application::ports::{EntryWriter, WriteStrategy};
use crate::domain::entities::ArchiveContainer;
use crate::domain::errors::{ModuleError, ResultExt};

/// Directories already known to exist, so repeated LOB writes into the same
/// column folder skip `create_dir_all`
#[derive(Default)]
pub(crate) struct DirectoryCache {
    created: RwLock<HashSet<PathBuf>>,
}

impl DirectoryCache {
    pub fn ensure(&self, dir: &Path) -> Result<(), ModuleError> {
        if self.created.read().contains(dir) {
            return Ok(());
        }
        fs::create_dir_all(dir).with_path(&dir.display().to_string())?;
        self.created.write().insert(dir.to_path_buf());
        Ok(())
    }

    /// Create the file at `target`, creating missing parent directories
    pub fn create_file(&self, target: &Path) -> Result<BufWriter<File>, ModuleError> {
        if let Some(parent) = target.parent() {
            self.ensure(parent)?;
        }
        let file = File::create(target).with_path(&target.display().to_string())?;
        Ok(BufWriter::new(file))
    }
}

/// Resolve a relative entry path below the container root.
///
/// `..` segments are rejected so an entry can never escape its container.
pub(crate) fn resolve_entry(root: &Path, path: &str) -> Result<PathBuf, ModuleError> {
    let mut resolved = root.to_path_buf();
    for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." {
            return Err(ModuleError::message(format!(
                "Entry path leaves its container: {}",
                path
            )));
        }
        resolved.push(segment);
    }
    Ok(resolved)
}

/// Writes every entry as a file below the container folder
#[derive(Default)]
pub struct FolderWriteStrategy {
    dirs: DirectoryCache,
}

impl FolderWriteStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WriteStrategy for FolderWriteStrategy {
    fn create_output_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryWriter, ModuleError> {
        let target = resolve_entry(container.path(), path)?;
        if path.ends_with('/') {
            // Folder entry, nothing to write into
            self.dirs.ensure(&target)?;
            return Ok(Box::new(std::io::sink()));
        }
        debug!("Creating file {:?}", target);
        Ok(Box::new(self.dirs.create_file(&target)?))
    }

    fn is_simultaneous_writing_supported(&self) -> bool {
        true
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.dirs.ensure(container.path())?;
        info!("Writing folder archive at {}", container.path().display());
        Ok(())
    }

    fn finish(&self, _container: &ArchiveContainer) -> Result<(), ModuleError> {
        Ok(())
    }
}
