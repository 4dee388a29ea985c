//! # siard_archive - Archive codec for preserved relational databases
//!
//! Serializes a stream of database rows into a self-describing archive
//! (one XML file plus XSD per table, large values as separate LOB files)
//! and reads such archives back into the same row stream.
//!
//! ## Architecture Layers
//!
//! - **Domain**: cells, rows, database structure, containers, error taxonomy
//! - **Application**: ports (read/write strategies, content paths, the
//!   handler call sequence), the filter pipeline and the archive use cases
//! - **Infrastructure**: zip/folder/segmented storage adapters, path
//!   strategies, the XML table codec and the Merkle tree filter
//!
//! ## Example Usage
//!
//! ```no_run
//! use siard_archive::application::filters::DiscardSink;
//! use siard_archive::application::use_cases::ArchiveImportModule;
//! use siard_archive::entities::{ArchiveContainer, DatabaseStructure};
//! use siard_archive::infrastructure::paths::RegisteredContentPathStrategy;
//! use siard_archive::infrastructure::storage::ZipReadStrategy;
//! use siard_archive::infrastructure::xml::XmlContentImportStrategy;
//! use std::sync::Arc;
//!
//! # fn example(structure: DatabaseStructure) -> Result<(), siard_archive::ModuleError> {
//! let read = Arc::new(ZipReadStrategy::new());
//! let mut paths = RegisteredContentPathStrategy::new();
//! paths.register_structure(&structure);
//! let content = XmlContentImportStrategy::new(read.clone(), paths);
//! let mut import = ArchiveImportModule::new(
//!     read,
//!     ArchiveContainer::main("db.siard"),
//!     Arc::new(structure),
//!     Box::new(content),
//! );
//! import.migrate_to(&mut DiscardSink)?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export key types explicitly to avoid ambiguity
pub use application::{filters, ports, use_cases};
pub use config::Config;
pub use domain::errors::ModuleError;
pub use domain::{entities, value_objects};
