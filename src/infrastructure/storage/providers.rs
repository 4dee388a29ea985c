use parking_lot::Mutex;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::application::ports::ReadStrategy;
use crate::domain::entities::{ArchiveContainer, CellReader, InputStreamProvider};
use crate::domain::errors::ModuleError;

/// Payload held in memory (inline hex values, small CLOBs)
pub struct InMemoryProvider {
    data: Arc<Vec<u8>>,
}

impl InMemoryProvider {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }
}

/// Shares the buffer with each stream without copying it
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl InputStreamProvider for InMemoryProvider {
    fn create_input_stream(&self) -> Result<CellReader, ModuleError> {
        Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(&self.data)))))
    }

    fn size(&self) -> Result<u64, ModuleError> {
        Ok(self.data.len() as u64)
    }
}

/// Payload spooled to a temporary file.
///
/// The file is deleted when the provider is dropped or cleaned up.
pub struct TemporaryFileProvider {
    file: Mutex<Option<NamedTempFile>>,
    size: u64,
}

impl TemporaryFileProvider {
    /// Drain `reader` into a new temporary file
    pub fn spool(mut reader: impl Read) -> Result<Self, ModuleError> {
        let mut file = NamedTempFile::new()
            .map_err(|e| ModuleError::with_cause("Could not create temporary file", e))?;
        let path = file.path().display().to_string();
        let size = std::io::copy(&mut reader, &mut file).map_err(|e| ModuleError::io(&path, e))?;
        file.flush().map_err(|e| ModuleError::io(&path, e))?;
        debug!("Spooled {} bytes to {}", size, path);

        Ok(Self {
            file: Mutex::new(Some(file)),
            size,
        })
    }
}

impl InputStreamProvider for TemporaryFileProvider {
    fn create_input_stream(&self) -> Result<CellReader, ModuleError> {
        let guard = self.file.lock();
        let temp = guard
            .as_ref()
            .ok_or_else(|| ModuleError::message("Temporary file was already cleaned up"))?;
        let path = temp.path().display().to_string();
        let mut file: File = temp.reopen().map_err(|e| ModuleError::io(&path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| ModuleError::io(&path, e))?;
        Ok(Box::new(file))
    }

    fn size(&self) -> Result<u64, ModuleError> {
        Ok(self.size)
    }

    fn spooled_path(&self) -> Option<PathBuf> {
        self.file.lock().as_ref().map(|temp| temp.path().to_path_buf())
    }

    fn cleanup_resources(&self) {
        if let Some(temp) = self.file.lock().take() {
            let path = temp.path().to_path_buf();
            // Best effort cleanup - failures are only logged
            if let Err(e) = temp.close() {
                debug!("Could not delete temporary file {:?}: {}", path, e);
            }
        }
    }
}

/// Payload stored as an entry of an archive container, opened on demand
pub struct ArchiveEntryProvider {
    read_strategy: Arc<dyn ReadStrategy>,
    container: ArchiveContainer,
    path: String,
    size: Mutex<Option<u64>>,
}

impl ArchiveEntryProvider {
    pub fn new(
        read_strategy: Arc<dyn ReadStrategy>,
        container: ArchiveContainer,
        path: impl Into<String>,
    ) -> Self {
        Self {
            read_strategy,
            container,
            path: path.into(),
            size: Mutex::new(None),
        }
    }

    /// Use a length recorded in the table XML instead of measuring the entry
    pub fn with_known_size(self, size: u64) -> Self {
        *self.size.lock() = Some(size);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl InputStreamProvider for ArchiveEntryProvider {
    fn create_input_stream(&self) -> Result<CellReader, ModuleError> {
        self.read_strategy
            .create_input_stream(&self.container, &self.path)
    }

    fn size(&self) -> Result<u64, ModuleError> {
        let mut cached = self.size.lock();
        if let Some(size) = *cached {
            return Ok(size);
        }
        let size = self.read_strategy.entry_size(&self.container, &self.path)?;
        *cached = Some(size);
        Ok(size)
    }
}
