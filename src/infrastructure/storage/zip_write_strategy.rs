use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::application::ports::{EntryWriter, WriteStrategy};
use crate::domain::entities::ArchiveContainer;
use crate::domain::errors::{ModuleError, ResultExt};
use crate::domain::value_objects::CompressionMethod;

pub(crate) type ArchiveZipWriter = ZipWriter<BufWriter<File>>;

/// Zip writer shared between the strategy and the entry stream it handed out.
///
/// `None` once the archive was finished.
pub(crate) type SharedZipWriter = Arc<Mutex<Option<ArchiveZipWriter>>>;

/// Per-container zip writers
#[derive(Default)]
pub(crate) struct ZipWriterRegistry {
    writers: Mutex<HashMap<PathBuf, SharedZipWriter>>,
}

impl ZipWriterRegistry {
    /// Create the zip file (and its parent directories) unless already open
    pub fn open(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        let mut writers = self.writers.lock();
        if writers.contains_key(&container.key()) {
            return Ok(());
        }

        let path = container.path();
        let path_display = path.display().to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_path(&path_display)?;
        }
        let file = File::create(path).with_path(&path_display)?;
        info!("Opened zip archive for writing: {}", path_display);

        writers.insert(
            container.key(),
            Arc::new(Mutex::new(Some(ZipWriter::new(BufWriter::new(file))))),
        );
        Ok(())
    }

    pub fn get(&self, container: &ArchiveContainer) -> Result<SharedZipWriter, ModuleError> {
        self.writers
            .lock()
            .get(&container.key())
            .cloned()
            .ok_or_else(|| ModuleError::message(format!("Zip archive not set up: {}", container)))
    }

    /// Write the central directory and close the file
    pub fn close(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        let Some(shared) = self.writers.lock().remove(&container.key()) else {
            return Ok(());
        };
        let writer = shared.lock().take();
        if let Some(writer) = writer {
            let path_display = container.path().display().to_string();
            let mut file = writer.finish().with_path(&path_display)?;
            file.flush().with_path(&path_display)?;
            info!("Closed zip archive: {}", path_display);
        }
        Ok(())
    }
}

/// Stream into the entry most recently started on a shared zip writer
pub(crate) struct ZipEntryWriter {
    writer: SharedZipWriter,
}

impl ZipEntryWriter {
    /// Start `path` as a new entry; the previous entry is completed first.
    pub fn start(
        writer: SharedZipWriter,
        path: &str,
        compression: CompressionMethod,
    ) -> Result<Self, ModuleError> {
        {
            let mut guard = writer.lock();
            let zip = guard
                .as_mut()
                .ok_or_else(|| ModuleError::message("Zip archive already finished"))?;
            let options = SimpleFileOptions::default()
                .compression_method(compression.to_zip())
                .large_file(true);
            if path.ends_with('/') {
                zip.add_directory(path, options).with_path(path)?;
            } else {
                zip.start_file(path, options).with_path(path)?;
            }
        }
        debug!("Started zip entry {}", path);
        Ok(Self { writer })
    }
}

impl Write for ZipEntryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.lock().as_mut() {
            Some(zip) => zip.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "zip archive already finished",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.lock().as_mut() {
            Some(zip) => zip.flush(),
            None => Ok(()),
        }
    }
}

/// Writes a single zip archive, one entry at a time
pub struct ZipWriteStrategy {
    compression: CompressionMethod,
    zips: ZipWriterRegistry,
}

impl ZipWriteStrategy {
    pub fn new(compression: CompressionMethod) -> Self {
        Self {
            compression,
            zips: ZipWriterRegistry::default(),
        }
    }
}

impl Default for ZipWriteStrategy {
    fn default() -> Self {
        Self::new(CompressionMethod::default())
    }
}

impl WriteStrategy for ZipWriteStrategy {
    fn create_output_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryWriter, ModuleError> {
        let writer = self.zips.get(container)?;
        Ok(Box::new(ZipEntryWriter::start(writer, path, self.compression)?))
    }

    fn is_simultaneous_writing_supported(&self) -> bool {
        false
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.zips.open(container)
    }

    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.zips.close(container)
    }
}
