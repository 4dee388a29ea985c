use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{DatabaseStructure, Row};
use crate::domain::errors::ModuleError;

/// Consumer side of the pipeline call sequence.
///
/// Producers call, in order: `init_database`, `set_ignored_schemas`,
/// `handle_structure`, then per schema `handle_data_open_schema`, per table
/// `handle_data_open_table`, `handle_data_row`*, `handle_data_close_table`,
/// then `handle_data_close_schema`, and finally `finish_database`.
pub trait DatabaseHandler: Send {
    fn init_database(&mut self) -> Result<(), ModuleError>;

    fn set_ignored_schemas(&mut self, ignored_schemas: HashSet<String>);

    fn handle_structure(&mut self, structure: Arc<DatabaseStructure>) -> Result<(), ModuleError>;

    fn handle_data_open_schema(&mut self, schema_name: &str) -> Result<(), ModuleError>;

    fn handle_data_open_table(&mut self, table_id: &str) -> Result<(), ModuleError>;

    /// The row is owned by the callee; cells it does not forward are dropped,
    /// which releases any spooled resource they hold.
    fn handle_data_row(&mut self, row: Row) -> Result<(), ModuleError>;

    fn handle_data_close_table(&mut self, table_id: &str) -> Result<(), ModuleError>;

    fn handle_data_close_schema(&mut self, schema_name: &str) -> Result<(), ModuleError>;

    fn finish_database(&mut self) -> Result<(), ModuleError>;
}
