use std::collections::HashMap;

use super::digest_stream::{DigestRegistry, DigestWriter};
use super::folder_write_strategy::FolderWriteStrategy;
use super::zip_write_strategy::ZipWriteStrategy;
use crate::application::ports::{EntryWriter, WriteStrategy};
use crate::domain::entities::ArchiveContainer;
use crate::domain::errors::ModuleError;
use crate::domain::value_objects::{CompressionMethod, ContainerRole, DigestAlgorithm};

/// Main container written as a zip, LOBs written as loose files next to it.
///
/// Every file written into an auxiliary container is digested on the fly;
/// the digests can be queried per path once the stream has been dropped.
pub struct ZipWithExternalLobsWriteStrategy {
    zip: ZipWriteStrategy,
    folder: FolderWriteStrategy,
    algorithm: DigestAlgorithm,
    digests: DigestRegistry,
}

impl ZipWithExternalLobsWriteStrategy {
    pub fn new(compression: CompressionMethod, algorithm: DigestAlgorithm) -> Self {
        Self {
            zip: ZipWriteStrategy::new(compression),
            folder: FolderWriteStrategy::new(),
            algorithm,
            digests: DigestRegistry::default(),
        }
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Digest of a completed auxiliary entry
    pub fn digest(&self, path: &str) -> Option<Vec<u8>> {
        self.digests.lock().get(path).cloned()
    }

    pub fn digests(&self) -> HashMap<String, Vec<u8>> {
        self.digests.lock().clone()
    }

    fn route(&self, container: &ArchiveContainer) -> &dyn WriteStrategy {
        match container.role() {
            ContainerRole::Main => &self.zip,
            ContainerRole::Auxiliary => &self.folder,
        }
    }
}

impl WriteStrategy for ZipWithExternalLobsWriteStrategy {
    fn create_output_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryWriter, ModuleError> {
        let strategy = self.route(container);
        let stream = strategy.create_output_stream(container, path)?;
        match container.role() {
            ContainerRole::Auxiliary => Ok(Box::new(DigestWriter::new(
                stream,
                self.algorithm,
                path,
                self.digests.clone(),
            ))),
            ContainerRole::Main => Ok(stream),
        }
    }

    /// Simultaneous writing is only possible for the auxiliary folder;
    /// callers interleave LOB streams with the main zip stream, which is
    /// safe because they never target the same container.
    fn is_simultaneous_writing_supported(&self) -> bool {
        true
    }

    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.route(container).setup(container)
    }

    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError> {
        self.route(container).finish(container)
    }
}
