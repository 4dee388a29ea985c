use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::batch_processor::{BatchConfig, BatchProcessor};
use super::zip_write_strategy::{ArchiveZipWriter, ZipEntryWriter, ZipWriterRegistry};
use crate::application::ports::{EntryWriter, WriteStrategy};
use crate::domain::entities::{ArchiveContainer, InputStreamProvider};
use crate::domain::errors::{ModuleError, ResultExt};
use crate::domain::value_objects::CompressionMethod;

type PendingEntry = (String, Box<dyn InputStreamProvider>);

/// Zip writer that compresses LOB entries concurrently.
///
/// Table XML and XSD entries are written straight into the archive. LOBs
/// handed to `write_to` are queued; `finish` compresses each one into its
/// own single-entry zip in a temporary file on the worker pool, then copies
/// the compressed entries into the archive in queue order without
/// recompressing them.
pub struct ParallelZipWriteStrategy {
    compression: CompressionMethod,
    batch: BatchConfig,
    zips: ZipWriterRegistry,
    pending: Mutex<HashMap<PathBuf, Vec<PendingEntry>>>,
}

impl ParallelZipWriteStrategy {
    pub fn new(compression: CompressionMethod, batch: BatchConfig) -> Self {
        Self {
            compression,
            batch,
            zips: ZipWriterRegistry::default(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn pending_entries(&self, container: &ArchiveContainer) -> usize {
        self.pending
            .lock()
            .get(&container.key())
            .map_or(0, |entries| entries.len())
    }

    fn compress_all(&self, entries: Vec<PendingEntry>) -> Result<Vec<TempPath>, ModuleError> {
        let total = entries.len();
        let compression = self.compression;
        let batch = self.batch.clone();

        // Run on a dedicated thread so a caller already inside a runtime
        // does not nest `block_on`
        let worker = std::thread::spawn(move || -> Result<_, ModuleError> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| ModuleError::with_cause("Could not start worker pool", e))?;
            Ok(runtime.block_on(BatchProcessor::process_blocking(
                entries,
                &batch,
                move |(path, provider): PendingEntry| {
                    let result = compress_entry(&path, provider.as_ref(), compression);
                    provider.cleanup_resources();
                    result
                },
            )))
        });
        let results = worker
            .join()
            .map_err(|_| ModuleError::message("LOB compression worker panicked"))??;

        if results.len() != total {
            return Err(ModuleError::message(format!(
                "Only {} of {} LOB entries were compressed",
                results.len(),
                total
            )));
        }

        let mut ordered: Vec<Option<TempPath>> = (0..total).map(|_| None).collect();
        for item in results {
            ordered[item.position] = Some(item.result?);
        }
        ordered
            .into_iter()
            .map(|part| part.ok_or_else(|| ModuleError::message("Missing compressed LOB entry")))
            .collect()
    }
}

impl Default for ParallelZipWriteStrategy {
    fn default() -> Self {
        Self::new(CompressionMethod::default(), BatchConfig::default())
    }
}

/// Compress one payload into a single-entry zip spooled to a temporary file.
///
/// Only the path is kept so that queued parts do not hold file handles.
fn compress_entry(
    path: &str,
    provider: &dyn InputStreamProvider,
    compression: CompressionMethod,
) -> Result<TempPath, ModuleError> {
    let part = NamedTempFile::new()
        .map_err(|e| ModuleError::with_cause("Could not create temporary file", e))?;
    let (file, part) = part.into_parts();

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(compression.to_zip())
        .large_file(true);
    zip.start_file(path, options).with_path(path)?;
    let mut input = provider.create_input_stream()?;
    std::io::copy(&mut input, &mut zip).with_path(path)?;
    zip.finish().with_path(path)?;
    Ok(part)
}

/// Stream the compressed entry of one part into the archive
fn merge_part(zip: &mut ArchiveZipWriter, part: &TempPath) -> Result<(), ModuleError> {
    let display = part.display().to_string();
    let file = File::open(part).with_path(&display)?;
    let mut single = ZipArchive::new(BufReader::new(file))?;
    let entry = single.by_index_raw(0)?;
    zip.raw_copy_file(entry)?;
    Ok(())
}

impl WriteStrategy for ParallelZipWriteStrategy {
    fn create_output_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryWriter, ModuleError> {
        let writer = self.zips.get(container)?;
        Ok(Box::new(ZipEntryWriter::start(writer, path, self.compression)?))
    }

    fn write_to(
        &self,
        container: &ArchiveContainer,
        provider: Box<dyn InputStreamProvider>,
        path: &str,
    ) -> Result<(), ModuleError> {
        match provider.spooled_path() {
            Some(file) => debug!("Deferring LOB entry {} spooled at {:?}", path, file),
            None => debug!("Deferring in-memory LOB entry {}", path),
        }
        self.pending
            .lock()
            .entry(container.key())
            .or_default()
            .push((path.to_string(), provider));
        Ok(())
    }

    fn is_simultaneous_writing_supported(&self) -> bool {
        true
    }

    fn defers_writes(&self) -> bool {
        true
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.zips.open(container)
    }

    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        let entries = self
            .pending
            .lock()
            .remove(&container.key())
            .unwrap_or_default();

        if !entries.is_empty() {
            info!(
                "Compressing {} LOB entries with batch size {}",
                entries.len(),
                self.batch.concurrent_batch_size
            );
            let compressed = self.compress_all(entries)?;

            let shared = self.zips.get(container)?;
            let mut guard = shared.lock();
            let zip = guard
                .as_mut()
                .ok_or_else(|| ModuleError::message("Zip archive already finished"))?;
            for part in compressed {
                merge_part(zip, &part)?;
            }
        }

        self.zips.close(container)
    }
}
