mod content_path;
mod content_strategy;
mod database_handler;
mod read_strategy;
mod write_strategy;

pub use content_path::{ContentPathExportStrategy, ContentPathImportStrategy};
pub use content_strategy::{ContentExportStrategy, ContentImportStrategy};
pub use database_handler::DatabaseHandler;
pub use read_strategy::{EntryReader, FilepathStream, ReadStrategy};
pub use write_strategy::{copy_provider, EntryWriter, WriteStrategy};

#[cfg(test)]
pub use write_strategy::MockWriteStrategy;
