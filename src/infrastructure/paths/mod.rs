mod content_path_export;
mod content_path_import;

pub use content_path_export::IndexedContentPathStrategy;
pub use content_path_import::{join_entry_path, RegisteredContentPathStrategy};
