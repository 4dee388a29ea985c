//! Shared test fixtures and utilities
//!
//! Builders for database structures and rows, a handler that records the
//! call sequence it receives, and helpers to drive a handler by hand.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use siard_archive::{
    entities::{Cell, DatabaseStructure, Row, SchemaStructure, TableStructure, Type},
    infrastructure::storage::InMemoryProvider,
    ports::DatabaseHandler,
    ModuleError,
};

/// Cell content with providers and ids stripped, comparable across a round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<(Vec<usize>, Value)>),
    Composed(Vec<Value>),
}

impl Value {
    pub fn of(cell: &Cell) -> Self {
        match cell {
            Cell::Null(_) => Value::Null,
            Cell::Simple(simple) => match simple.data() {
                Some(data) => Value::Text(data.to_string()),
                None => Value::Null,
            },
            Cell::Binary(binary) => Value::Bytes(binary.read_all().expect("readable binary cell")),
            Cell::Array(array) => Value::Array(
                array
                    .elements()
                    .map(|(position, cell)| (position.clone(), Value::of(cell)))
                    .collect(),
            ),
            Cell::Composed(composed) => {
                Value::Composed(composed.cells().iter().map(Value::of).collect())
            }
        }
    }

    pub fn row(row: &Row) -> Vec<Value> {
        row.cells.iter().map(Value::of).collect()
    }
}

/// Handler that keeps every event and row it receives
#[derive(Default)]
pub struct CollectingHandler {
    pub events: Vec<String>,
    pub rows: Vec<(String, Vec<Value>)>,
    pub ignored: HashSet<String>,
    table: Option<String>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_of(&self, table_id: &str) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .filter(|(table, _)| table == table_id)
            .map(|(_, values)| values.clone())
            .collect()
    }
}

impl DatabaseHandler for CollectingHandler {
    fn init_database(&mut self) -> Result<(), ModuleError> {
        self.events.push("init".to_string());
        Ok(())
    }

    fn set_ignored_schemas(&mut self, ignored_schemas: HashSet<String>) {
        self.ignored = ignored_schemas;
    }

    fn handle_structure(&mut self, structure: Arc<DatabaseStructure>) -> Result<(), ModuleError> {
        self.events.push(format!("structure {}", structure.name));
        Ok(())
    }

    fn handle_data_open_schema(&mut self, schema_name: &str) -> Result<(), ModuleError> {
        self.events.push(format!("open schema {}", schema_name));
        Ok(())
    }

    fn handle_data_open_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        self.events.push(format!("open table {}", table_id));
        self.table = Some(table_id.to_string());
        Ok(())
    }

    fn handle_data_row(&mut self, row: Row) -> Result<(), ModuleError> {
        let table = self.table.clone().unwrap_or_default();
        self.rows.push((table, Value::row(&row)));
        Ok(())
    }

    fn handle_data_close_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        self.events.push(format!("close table {}", table_id));
        self.table = None;
        Ok(())
    }

    fn handle_data_close_schema(&mut self, schema_name: &str) -> Result<(), ModuleError> {
        self.events.push(format!("close schema {}", schema_name));
        Ok(())
    }

    fn finish_database(&mut self) -> Result<(), ModuleError> {
        self.events.push("finish".to_string());
        Ok(())
    }
}

/// One schema `public` with a table `person` of scalar and LOB columns
pub fn person_structure() -> DatabaseStructure {
    DatabaseStructure::new("sample").with_schema(
        SchemaStructure::new("public").with_table(
            TableStructure::new("person")
                .with_column("id", Type::integer(), false)
                .with_column("name", Type::varchar(100), true)
                .with_column("note", Type::clob(), true)
                .with_column("photo", Type::blob(), true)
                .with_rows(3),
        ),
    )
}

/// Two schemas, the second one with an array column
pub fn two_schema_structure() -> DatabaseStructure {
    person_structure().with_schema(
        SchemaStructure::new("audit").with_table(
            TableStructure::new("event")
                .with_column("id", Type::integer(), false)
                .with_column("tags", Type::array(Type::varchar(10)), true),
        ),
    )
}

pub fn person_row(index: u64, name: Option<&str>, note: Option<String>, photo: Option<Vec<u8>>) -> Row {
    let id = |column: &str| format!("public.person.{}.{}", column, index);
    let text = |column: &str, value: Option<String>| match value {
        Some(value) => Cell::simple(id(column), value),
        None => Cell::null(id(column)),
    };
    let photo = match photo {
        Some(bytes) => Cell::binary(id("photo"), Box::new(InMemoryProvider::new(bytes))),
        None => Cell::null(id("photo")),
    };
    Row::new(
        index,
        vec![
            Cell::simple(id("id"), index.to_string()),
            text("name", name.map(str::to_string)),
            text("note", note),
            photo,
        ],
    )
}

/// Rows mixing inline values, LOB-sized values and nulls
pub fn person_rows() -> Vec<Row> {
    vec![
        person_row(1, Some("Ada  Lovelace & <co>"), Some("short note".to_string()), Some(vec![0xca, 0xfe])),
        person_row(2, None, Some("x".repeat(5000)), Some(patterned_bytes(3000))),
        person_row(3, Some("tab\there\\back"), None, None),
    ]
}

pub fn event_rows() -> Vec<Row> {
    let mut tags = siard_archive::entities::ArrayCell::new("audit.event.tags.1");
    tags.put(vec![1], Cell::simple("audit.event.tags.1.1", "red"));
    tags.put(vec![3], Cell::simple("audit.event.tags.1.3", "blue"));
    vec![
        Row::new(1, vec![Cell::simple("audit.event.id.1", "1"), Cell::Array(tags)]),
        Row::new(2, vec![Cell::simple("audit.event.id.2", "2"), Cell::null("audit.event.tags.2")]),
    ]
}

pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Drive `handler` through the full call sequence for `structure`.
///
/// `tables` pairs table ids with their rows; tables not listed get no rows.
pub fn feed(
    handler: &mut dyn DatabaseHandler,
    structure: &DatabaseStructure,
    mut tables: Vec<(&str, Vec<Row>)>,
) -> Result<(), ModuleError> {
    handler.init_database()?;
    handler.set_ignored_schemas(HashSet::new());
    handler.handle_structure(Arc::new(structure.clone()))?;
    for schema in &structure.schemas {
        handler.handle_data_open_schema(&schema.name)?;
        for table in &schema.tables {
            handler.handle_data_open_table(&table.id)?;
            let rows = tables
                .iter()
                .position(|(id, _)| *id == table.id)
                .map(|i| tables.remove(i).1)
                .unwrap_or_default();
            for row in rows {
                handler.handle_data_row(row)?;
            }
            handler.handle_data_close_table(&table.id)?;
        }
        handler.handle_data_close_schema(&schema.name)?;
    }
    handler.finish_database()
}

/// Values of `rows` as the import side reports them
pub fn expected(rows: &[Row]) -> Vec<Vec<Value>> {
    rows.iter().map(Value::row).collect()
}
