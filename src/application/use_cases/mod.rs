mod archive_export;
mod archive_import;

pub use archive_export::ArchiveExportModule;
pub use archive_import::ArchiveImportModule;
