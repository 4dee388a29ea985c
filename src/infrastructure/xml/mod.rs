pub mod codec;
mod content_export;
mod content_import;
mod error_collector;
mod sql2008_xsd;
mod table_xsd;
mod xml_writer;

pub use content_export::{ExportSettings, XmlContentExportStrategy};
pub use content_import::XmlContentImportStrategy;
pub use error_collector::ParseErrorCollector;
pub use sql2008_xsd::{XsdTypeMapper, BLOB_TYPE, CLOB_TYPE, XS_STRING};
pub use table_xsd::write_table_xsd;
pub use xml_writer::XmlWriter;
