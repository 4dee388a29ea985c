use serde::{Deserialize, Serialize};
use std::io::Read;

use super::types::Type;
use crate::domain::errors::ModuleError;

/// Read-only description of the database being archived
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStructure {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<SchemaStructure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaStructure {
    pub name: String,
    /// 1-based position inside the database
    #[serde(default)]
    pub index: usize,
    /// Folder name recorded in the archive metadata, if any
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableStructure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStructure {
    /// `schema.table`
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub schema: String,
    /// 1-based position inside the schema
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub folder: Option<String>,
    /// Expected row count, used for progress reporting only
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub from_custom_view: bool,
    #[serde(default)]
    pub columns: Vec<ColumnStructure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStructure {
    /// `schema.table.column`
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: Type,
    #[serde(default = "default_nillable")]
    pub nillable: bool,
    /// LOB folder recorded in the archive metadata, if any
    #[serde(default)]
    pub folder: Option<String>,
}

fn default_nillable() -> bool {
    true
}

impl DatabaseStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: Vec::new(),
        }
    }

    /// Appends a schema, assigning its index and the ids of its tables.
    pub fn with_schema(mut self, mut schema: SchemaStructure) -> Self {
        schema.index = self.schemas.len() + 1;
        schema.assign_ids();
        self.schemas.push(schema);
        self
    }

    /// Load from JSON, filling in ids and indexes left out of the document
    pub fn from_json(reader: impl Read) -> Result<Self, ModuleError> {
        let mut structure: DatabaseStructure = serde_json::from_reader(reader)?;
        structure.assign_ids();
        Ok(structure)
    }

    pub fn assign_ids(&mut self) {
        for (i, schema) in self.schemas.iter_mut().enumerate() {
            if schema.index == 0 {
                schema.index = i + 1;
            }
            schema.assign_ids();
        }
    }

    pub fn schema_by_name(&self, name: &str) -> Option<&SchemaStructure> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn table_by_id(&self, table_id: &str) -> Option<&TableStructure> {
        self.schemas
            .iter()
            .flat_map(|s| s.tables.iter())
            .find(|t| t.id == table_id)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableStructure> {
        self.schemas.iter().flat_map(|s| s.tables.iter())
    }
}

impl SchemaStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_table(mut self, mut table: TableStructure) -> Self {
        table.index = self.tables.len() + 1;
        table.schema = self.name.clone();
        self.tables.push(table);
        self.assign_ids();
        self
    }

    fn assign_ids(&mut self) {
        for (i, table) in self.tables.iter_mut().enumerate() {
            if table.index == 0 {
                table.index = i + 1;
            }
            if table.schema.is_empty() {
                table.schema = self.name.clone();
            }
            table.assign_ids();
        }
    }
}

impl TableStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, column_type: Type, nillable: bool) -> Self {
        self.columns.push(ColumnStructure {
            id: String::new(),
            name: name.into(),
            column_type,
            nillable,
            folder: None,
        });
        self.assign_ids();
        self
    }

    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows = rows;
        self
    }

    fn assign_ids(&mut self) {
        if self.id.is_empty() || self.id.starts_with('.') {
            self.id = format!("{}.{}", self.schema, self.name);
        }
        let prefix = format!("{}.", self.id);
        for column in self.columns.iter_mut() {
            if !column.id.starts_with(&prefix) {
                column.id = format!("{}{}", prefix, column.name);
            }
        }
    }

    pub fn column_index_by_id(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DatabaseStructure {
        DatabaseStructure::new("db").with_schema(
            SchemaStructure::new("public").with_table(
                TableStructure::new("person")
                    .with_column("id", Type::integer(), false)
                    .with_column("photo", Type::blob(), true),
            ),
        )
    }

    #[test]
    fn test_builders_assign_ids_and_indexes() {
        let db = sample();
        let schema = &db.schemas[0];
        assert_eq!(schema.index, 1);
        let table = &schema.tables[0];
        assert_eq!(table.id, "public.person");
        assert_eq!(table.index, 1);
        assert_eq!(table.columns[1].id, "public.person.photo");
    }

    #[test]
    fn test_table_by_id() {
        let db = sample();
        assert!(db.table_by_id("public.person").is_some());
        assert!(db.table_by_id("public.missing").is_none());
    }

    #[test]
    fn test_from_json_fills_missing_ids() {
        let json = r#"{
            "name": "db",
            "schemas": [{
                "name": "s",
                "tables": [{
                    "name": "t",
                    "columns": [
                        {"name": "c", "type": {"kind": "boolean", "sql2008_type_name": "BOOLEAN"}}
                    ]
                }]
            }]
        }"#;
        let db = DatabaseStructure::from_json(json.as_bytes()).unwrap();
        let table = db.table_by_id("s.t").unwrap();
        assert_eq!(table.index, 1);
        assert_eq!(table.columns[0].id, "s.t.c");
        assert!(table.columns[0].nillable);
    }
}
