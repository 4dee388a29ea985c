use std::collections::HashSet;

use super::database_handler::DatabaseHandler;
use crate::domain::entities::{ArchiveContainer, DatabaseStructure, Row, SchemaStructure, TableStructure};
use crate::domain::errors::ModuleError;

/// Serializes the row stream of one archive, table by table
pub trait ContentExportStrategy: Send {
    fn open_schema(&mut self, schema: &SchemaStructure) -> Result<(), ModuleError>;

    fn close_schema(&mut self, schema: &SchemaStructure) -> Result<(), ModuleError>;

    fn open_table(&mut self, table: &TableStructure) -> Result<(), ModuleError>;

    fn table_row(&mut self, row: Row) -> Result<(), ModuleError>;

    /// Finish the table file, write pending LOBs and the table schema
    fn close_table(&mut self, table: &TableStructure) -> Result<(), ModuleError>;
}

/// Replays the table files of an archive as the pipeline call sequence
pub trait ContentImportStrategy: Send {
    /// Drive `handler` through the open/row/close calls of every schema
    /// not listed in `ignored_schemas`.
    fn import_content(
        &mut self,
        handler: &mut dyn DatabaseHandler,
        container: &ArchiveContainer,
        structure: &DatabaseStructure,
        ignored_schemas: &HashSet<String>,
    ) -> Result<(), ModuleError>;
}
