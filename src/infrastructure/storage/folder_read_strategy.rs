use std::fs::{self, File, ReadDir};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

use super::folder_write_strategy::resolve_entry;
use crate::application::ports::{EntryReader, FilepathStream, ReadStrategy};
use crate::domain::entities::ArchiveContainer;
use crate::domain::errors::{ModuleError, ResultExt};
use crate::domain::value_objects::ArchiveVersion;

/// Reads entries stored as plain files below the container folder
#[derive(Default)]
pub struct FolderReadStrategy;

impl FolderReadStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ReadStrategy for FolderReadStrategy {
    fn create_input_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryReader, ModuleError> {
        let target = resolve_entry(container.path(), path)?;
        let file = File::open(&target).map_err(|e| {
            ModuleError::with_cause(
                format!("Could not open file at {} for reading.", target.display()),
                e,
            )
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn entry_size(&self, container: &ArchiveContainer, path: &str) -> Result<u64, ModuleError> {
        let target = resolve_entry(container.path(), path)?;
        let metadata = fs::metadata(&target).with_path(&target.display().to_string())?;
        Ok(metadata.len())
    }

    fn entry_exists(&self, container: &ArchiveContainer, path: &str) -> bool {
        resolve_entry(container.path(), path)
            .map(|target| target.is_file())
            .unwrap_or(false)
    }

    fn is_simultaneous_reading_supported(&self) -> bool {
        true
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        if !container.path().is_dir() {
            return Err(ModuleError::message(format!(
                "Archive folder does not exist: {}",
                container.path().display()
            )));
        }
        if container.version().is_none() {
            let marker = container.path().join("header").join("siardversion");
            if let Ok(entries) = fs::read_dir(marker) {
                let version = entries
                    .filter_map(Result::ok)
                    .filter_map(|entry| entry.file_name().to_str()?.parse::<ArchiveVersion>().ok())
                    .next();
                if let Some(version) = version {
                    container.set_version(version);
                }
            }
        }
        info!("Reading folder archive at {}", container.path().display());
        Ok(())
    }

    fn finish(&self, _container: &ArchiveContainer) -> Result<(), ModuleError> {
        Ok(())
    }

    fn get_filepath_stream(
        &self,
        container: &ArchiveContainer,
    ) -> Result<FilepathStream, ModuleError> {
        let walker = FolderWalker::new(container.path())?;
        Ok(FilepathStream::new(walker))
    }
}

/// Depth-first walk over every file below a root, yielding `/`-separated
/// paths relative to it. Directories are opened only when reached.
pub(crate) struct FolderWalker {
    root: PathBuf,
    stack: Vec<ReadDir>,
}

impl FolderWalker {
    pub fn new(root: &Path) -> Result<Self, ModuleError> {
        let entries = fs::read_dir(root).with_path(&root.display().to_string())?;
        Ok(Self {
            root: root.to_path_buf(),
            stack: vec![entries],
        })
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Iterator for FolderWalker {
    type Item = Result<String, ModuleError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self.stack.last_mut()?;
            let entry = match current.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => return Some(Err(ModuleError::from(e))),
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            let path = entry.path();
            if path.is_dir() {
                match fs::read_dir(&path) {
                    Ok(entries) => self.stack.push(entries),
                    Err(e) => return Some(Err(ModuleError::io(path.display().to_string(), e))),
                }
            } else {
                return Some(Ok(self.relative(&path)));
            }
        }
    }
}
