use std::io::Write;

#[cfg(test)]
use mockall::automock;

use crate::domain::entities::{ArchiveContainer, InputStreamProvider};
use crate::domain::errors::ModuleError;

/// Type alias for a stream into one archive entry
pub type EntryWriter = Box<dyn Write + Send>;

/// Port for storing bytes at a logical path of a container
#[cfg_attr(test, automock)]
pub trait WriteStrategy: Send + Sync {
    /// Start a new entry at `path`, relative to the container root.
    ///
    /// When `is_simultaneous_writing_supported` is false the previous
    /// stream must be flushed and dropped before the next call.
    fn create_output_stream(
        &self,
        container: &ArchiveContainer,
        path: &str,
    ) -> Result<EntryWriter, ModuleError>;

    /// Store the provider's payload at `path` and release the provider
    fn write_to(
        &self,
        container: &ArchiveContainer,
        provider: Box<dyn InputStreamProvider>,
        path: &str,
    ) -> Result<(), ModuleError> {
        copy_provider(self, container, provider.as_ref(), path)?;
        provider.cleanup_resources();
        Ok(())
    }

    fn is_simultaneous_writing_supported(&self) -> bool;

    /// Whether `write_to` keeps the provider alive until `finish`.
    ///
    /// Callers should then hand over disk-backed providers only.
    fn defers_writes(&self) -> bool {
        false
    }

    /// Prepare the container for writing. Repeated calls are a no-op.
    fn setup(&self, container: &ArchiveContainer) -> Result<(), ModuleError>;

    /// Flush and close everything written to the container
    fn finish(&self, container: &ArchiveContainer) -> Result<(), ModuleError>;
}

/// Copy a provider stream into a freshly created entry
pub fn copy_provider<W: WriteStrategy + ?Sized>(
    strategy: &W,
    container: &ArchiveContainer,
    provider: &dyn InputStreamProvider,
    path: &str,
) -> Result<u64, ModuleError> {
    let mut input = provider.create_input_stream()?;
    let mut output = strategy.create_output_stream(container, path)?;
    let copied = std::io::copy(&mut input, &mut output).map_err(|e| ModuleError::io(path, e))?;
    output.flush().map_err(|e| ModuleError::io(path, e))?;
    Ok(copied)
}
