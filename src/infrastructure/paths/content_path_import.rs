use std::collections::HashMap;

use super::content_path_export::IndexedContentPathStrategy;
use crate::application::ports::{ContentPathExportStrategy, ContentPathImportStrategy};
use crate::domain::entities::DatabaseStructure;
use crate::domain::errors::ModuleError;

const CONTENT_FOLDER: &str = "content";
const CURRENT_FOLDER: &str = ".";

/// Name based path lookup for archives being read.
///
/// Folder names are registered from the archive metadata before any table
/// is read, then only looked up.
#[derive(Debug, Default, Clone)]
pub struct RegisteredContentPathStrategy {
    schema_folders: HashMap<String, String>,
    table_folders: HashMap<String, String>,
    column_folders: HashMap<String, String>,
}

impl RegisteredContentPathStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate every schema, table and column with its folder, falling back
    /// to the positional names an exporter would have used
    pub fn register_structure(&mut self, structure: &DatabaseStructure) {
        let defaults = IndexedContentPathStrategy::new();
        for schema in &structure.schemas {
            let folder = schema
                .folder
                .clone()
                .unwrap_or_else(|| defaults.schema_folder_name(schema.index));
            self.associate_schema_with_folder(&schema.name, &folder);

            for table in &schema.tables {
                let folder = table
                    .folder
                    .clone()
                    .unwrap_or_else(|| defaults.table_folder_name(table.index));
                self.associate_table_with_folder(&table.id, &folder);

                for (i, column) in table.columns.iter().enumerate() {
                    let folder = column
                        .folder
                        .clone()
                        .unwrap_or_else(|| defaults.column_folder_name(i + 1));
                    self.associate_column_with_folder(&column.id, &folder);
                }
            }
        }
    }

    fn table_file_path(
        &self,
        schema_name: &str,
        table_id: &str,
        extension: &str,
    ) -> Result<String, ModuleError> {
        if schema_name.trim().is_empty() {
            return Err(ModuleError::message("schema name can not be null"));
        }
        if table_id.trim().is_empty() {
            return Err(ModuleError::message("table id can not be null"));
        }

        let schema_folder = non_blank(self.schema_folders.get(schema_name)).ok_or_else(|| {
            ModuleError::message(format!("No folder name for schema name \"{}\"", schema_name))
        })?;
        let table_folder = non_blank(self.table_folders.get(table_id)).ok_or_else(|| {
            ModuleError::message(format!("No folder name for table id \"{}\"", table_id))
        })?;

        Ok(format!(
            "{}/{}/{}/{}.{}",
            CONTENT_FOLDER, schema_folder, table_folder, table_folder, extension
        ))
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Join path parts with `/`, dropping empty and `.` segments
pub fn join_entry_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != CURRENT_FOLDER)
        .collect::<Vec<_>>()
        .join("/")
}

impl ContentPathImportStrategy for RegisteredContentPathStrategy {
    fn associate_schema_with_folder(&mut self, schema_name: &str, schema_folder: &str) {
        self.schema_folders
            .insert(schema_name.to_string(), schema_folder.to_string());
    }

    fn associate_table_with_folder(&mut self, table_id: &str, table_folder: &str) {
        self.table_folders
            .insert(table_id.to_string(), table_folder.to_string());
    }

    fn associate_column_with_folder(&mut self, column_id: &str, column_folder: &str) {
        self.column_folders
            .insert(column_id.to_string(), column_folder.to_string());
    }

    fn table_xml_file_path(&self, schema_name: &str, table_id: &str) -> Result<String, ModuleError> {
        self.table_file_path(schema_name, table_id, "xml")
    }

    fn table_xsd_file_path(&self, schema_name: &str, table_id: &str) -> Result<String, ModuleError> {
        self.table_file_path(schema_name, table_id, "xsd")
    }

    fn lob_path(
        &self,
        base_path: Option<&str>,
        schema_name: &str,
        table_id: &str,
        column_id: &str,
        file_name: &str,
    ) -> String {
        let base = base_path
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(CONTENT_FOLDER);
        // Unregistered segments default to the current folder
        let schema = self.schema_folders.get(schema_name).map_or(CURRENT_FOLDER, String::as_str);
        let table = self.table_folders.get(table_id).map_or(CURRENT_FOLDER, String::as_str);
        let column = self.column_folders.get(column_id).map_or(CURRENT_FOLDER, String::as_str);

        join_entry_path([base, schema, table, column, file_name])
    }
}
