use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::application::ports::DatabaseHandler;
use crate::domain::entities::{Cell, DatabaseStructure, Row};
use crate::domain::errors::ModuleError;

/// Terminal stage that drops every row.
///
/// Binary cells are cleaned explicitly so spooled payloads are released
/// as soon as the row reaches the end of the pipeline.
#[derive(Debug, Default)]
pub struct DiscardSink;

fn clean(cell: &Cell) {
    match cell {
        Cell::Binary(binary) => binary.clean_resources(),
        Cell::Composed(composed) => composed.cells().iter().for_each(clean),
        Cell::Array(array) => array.elements().for_each(|(_, element)| clean(element)),
        Cell::Null(_) | Cell::Simple(_) => {}
    }
}

impl DatabaseHandler for DiscardSink {
    fn init_database(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn set_ignored_schemas(&mut self, _ignored_schemas: HashSet<String>) {}

    fn handle_structure(&mut self, _structure: Arc<DatabaseStructure>) -> Result<(), ModuleError> {
        Ok(())
    }

    fn handle_data_open_schema(&mut self, _schema_name: &str) -> Result<(), ModuleError> {
        Ok(())
    }

    fn handle_data_open_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        debug!("Discarding rows of {}", table_id);
        Ok(())
    }

    fn handle_data_row(&mut self, row: Row) -> Result<(), ModuleError> {
        row.cells.iter().for_each(clean);
        Ok(())
    }

    fn handle_data_close_table(&mut self, _table_id: &str) -> Result<(), ModuleError> {
        Ok(())
    }

    fn handle_data_close_schema(&mut self, _schema_name: &str) -> Result<(), ModuleError> {
        Ok(())
    }

    fn finish_database(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}
