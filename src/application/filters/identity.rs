use std::collections::HashSet;
use std::sync::Arc;

use crate::application::ports::DatabaseHandler;
use crate::domain::entities::{DatabaseStructure, Row};
use crate::domain::errors::ModuleError;

/// Filter stage that forwards every call unchanged
pub struct IdentityFilter {
    next: Box<dyn DatabaseHandler>,
}

impl IdentityFilter {
    pub fn new(next: Box<dyn DatabaseHandler>) -> Self {
        Self { next }
    }

    pub fn into_next(self) -> Box<dyn DatabaseHandler> {
        self.next
    }
}

impl DatabaseHandler for IdentityFilter {
    fn init_database(&mut self) -> Result<(), ModuleError> {
        self.next.init_database()
    }

    fn set_ignored_schemas(&mut self, ignored_schemas: HashSet<String>) {
        self.next.set_ignored_schemas(ignored_schemas)
    }

    fn handle_structure(&mut self, structure: Arc<DatabaseStructure>) -> Result<(), ModuleError> {
        self.next.handle_structure(structure)
    }

    fn handle_data_open_schema(&mut self, schema_name: &str) -> Result<(), ModuleError> {
        self.next.handle_data_open_schema(schema_name)
    }

    fn handle_data_open_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        self.next.handle_data_open_table(table_id)
    }

    fn handle_data_row(&mut self, row: Row) -> Result<(), ModuleError> {
        self.next.handle_data_row(row)
    }

    fn handle_data_close_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        self.next.handle_data_close_table(table_id)
    }

    fn handle_data_close_schema(&mut self, schema_name: &str) -> Result<(), ModuleError> {
        self.next.handle_data_close_schema(schema_name)
    }

    fn finish_database(&mut self) -> Result<(), ModuleError> {
        self.next.finish_database()
    }
}
