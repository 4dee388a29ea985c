use std::io::Read;

use crate::domain::entities::ArchiveContainer;
use crate::domain::errors::ModuleError;

/// Type alias for a stream over one archive entry
pub type EntryReader = Box<dyn Read + Send>;

/// Lazy, finite, single-pass sequence of entry paths.
///
/// Dropping the stream releases whatever handle backs it.
pub struct FilepathStream {
    inner: Box<dyn Iterator<Item = Result<String, ModuleError>> + Send>,
}

impl FilepathStream {
    pub fn new(inner: impl Iterator<Item = Result<String, ModuleError>> + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn from_paths(paths: Vec<String>) -> Self {
        Self::new(paths.into_iter().map(Ok))
    }
}

impl Iterator for FilepathStream {
    type Item = Result<String, ModuleError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Port for obtaining the bytes stored at a logical path of a container
pub trait ReadStrategy: Send + Sync {
    /// Open the entry at `path`, relative to the container root
    fn create_input_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryReader, ModuleError>;

    /// Byte length of the entry at `path`
    fn entry_size(&self, container: &ArchiveContainer, path: &str) -> Result<u64, ModuleError> {
        let mut stream = self.create_input_stream(container, path)?;
        std::io::copy(&mut stream, &mut std::io::sink()).map_err(|e| ModuleError::io(path, e))
    }

    fn entry_exists(&self, container: &ArchiveContainer, path: &str) -> bool {
        self.create_input_stream(container, path).is_ok()
    }

    fn is_simultaneous_reading_supported(&self) -> bool;

    /// Prepare the container for reading. Repeated calls are a no-op.
    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError>;

    /// Release every handle held for the container
    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError>;

    fn get_filepath_stream(&self, container: &ArchiveContainer)
        -> Result<FilepathStream, ModuleError>;
}
