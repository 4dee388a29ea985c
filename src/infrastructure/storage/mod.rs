mod batch_processor;
mod content_hasher;
mod digest_stream;
mod folder_read_strategy;
mod folder_write_strategy;
mod parallel_zip_write_strategy;
mod providers;
mod segmented_read_strategy;
mod zip_read_strategy;
mod zip_with_external_lobs_write_strategy;
mod zip_write_strategy;

pub use batch_processor::{BatchConfig, BatchItemResult, BatchProcessor};
pub use content_hasher::{ContentHasher, MessageDigest, BUFFER_SIZE};
pub use digest_stream::{DigestRegistry, DigestWriter};
pub use folder_read_strategy::FolderReadStrategy;
pub use folder_write_strategy::FolderWriteStrategy;
pub use parallel_zip_write_strategy::ParallelZipWriteStrategy;
pub use providers::{ArchiveEntryProvider, InMemoryProvider, TemporaryFileProvider};
pub use segmented_read_strategy::{
    SegmentedReadStrategy, ZipAndFolderSegmentedReadStrategy, ZipSegmentedReadStrategy,
};
pub use zip_read_strategy::{ZipAndFolderReadStrategy, ZipReadStrategy};
pub use zip_with_external_lobs_write_strategy::ZipWithExternalLobsWriteStrategy;
pub use zip_write_strategy::ZipWriteStrategy;
