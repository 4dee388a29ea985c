use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::ports::{ContentExportStrategy, DatabaseHandler, WriteStrategy};
use crate::domain::entities::{ArchiveContainer, DatabaseStructure, Row};
use crate::domain::errors::{ModuleError, ResultExt};

/// Consumer that writes the pipeline call sequence into an archive.
///
/// Container lifecycle (setup, version marker, finish) is handled here;
/// the table files themselves are produced by the content strategy.
pub struct ArchiveExportModule {
    write_strategy: Arc<dyn WriteStrategy>,
    container: ArchiveContainer,
    lob_container: Option<ArchiveContainer>,
    content: Box<dyn ContentExportStrategy>,
    structure: Option<Arc<DatabaseStructure>>,
    ignored_schemas: HashSet<String>,
    /// Position of the open schema, None while skipping an ignored one
    schema: Option<usize>,
    /// Position of the open table inside the open schema
    table: Option<usize>,
}

impl ArchiveExportModule {
    pub fn new(
        write_strategy: Arc<dyn WriteStrategy>,
        container: ArchiveContainer,
        content: Box<dyn ContentExportStrategy>,
    ) -> Self {
        Self {
            write_strategy,
            container,
            lob_container: None,
            content,
            structure: None,
            ignored_schemas: HashSet::new(),
            schema: None,
            table: None,
        }
    }

    /// Auxiliary container that receives the LOB files
    pub fn with_lob_container(mut self, lob_container: ArchiveContainer) -> Self {
        self.lob_container = Some(lob_container);
        self
    }

    fn structure(&self) -> Result<Arc<DatabaseStructure>, ModuleError> {
        self.structure
            .clone()
            .ok_or_else(|| ModuleError::message("Data received before the database structure"))
    }
}

impl DatabaseHandler for ArchiveExportModule {
    fn init_database(&mut self) -> Result<(), ModuleError> {
        self.write_strategy.setup(&self.container)?;
        if let Some(lob_container) = &self.lob_container {
            self.write_strategy.setup(lob_container)?;
        }

        let version = self.container.version_or_default();
        let marker = version.marker_path();
        drop(
            self.write_strategy
                .create_output_stream(&self.container, &marker)
                .with_message(|| format!("Could not write version marker {}", marker))?,
        );
        info!("Writing archive {} (version {})", self.container, version);
        Ok(())
    }

    fn set_ignored_schemas(&mut self, ignored_schemas: HashSet<String>) {
        self.ignored_schemas = ignored_schemas;
    }

    fn handle_structure(&mut self, structure: Arc<DatabaseStructure>) -> Result<(), ModuleError> {
        debug!(
            "Exporting {} schema(s) of database {}",
            structure.schemas.len(),
            structure.name
        );
        self.structure = Some(structure);
        Ok(())
    }

    fn handle_data_open_schema(&mut self, schema_name: &str) -> Result<(), ModuleError> {
        if self.ignored_schemas.contains(schema_name) {
            self.schema = None;
            return Ok(());
        }
        let structure = self.structure()?;
        let position = structure
            .schemas
            .iter()
            .position(|s| s.name == schema_name)
            .ok_or_else(|| ModuleError::message(format!("Unknown schema {}", schema_name)))?;
        self.content.open_schema(&structure.schemas[position])?;
        self.schema = Some(position);
        Ok(())
    }

    fn handle_data_open_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        let Some(schema) = self.schema else {
            return Ok(());
        };
        let structure = self.structure()?;
        let tables = &structure.schemas[schema].tables;
        let position = tables
            .iter()
            .position(|t| t.id == table_id)
            .ok_or_else(|| ModuleError::message(format!("Unknown table {}", table_id)))?;
        self.content.open_table(&tables[position])?;
        self.table = Some(position);
        Ok(())
    }

    fn handle_data_row(&mut self, row: Row) -> Result<(), ModuleError> {
        if self.table.is_none() {
            return Ok(());
        }
        self.content.table_row(row)
    }

    fn handle_data_close_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        let (Some(schema), Some(table)) = (self.schema, self.table.take()) else {
            return Ok(());
        };
        let structure = self.structure()?;
        self.content
            .close_table(&structure.schemas[schema].tables[table])
            .with_message(|| format!("Could not close table {}", table_id))
    }

    fn handle_data_close_schema(&mut self, _schema_name: &str) -> Result<(), ModuleError> {
        let Some(schema) = self.schema.take() else {
            return Ok(());
        };
        let structure = self.structure()?;
        self.content.close_schema(&structure.schemas[schema])
    }

    fn finish_database(&mut self) -> Result<(), ModuleError> {
        if let Some(lob_container) = &self.lob_container {
            self.write_strategy.finish(lob_container)?;
        }
        self.write_strategy.finish(&self.container)?;
        info!("Finished archive {}", self.container);
        Ok(())
    }
}
