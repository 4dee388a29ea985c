use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::codec;
use super::error_collector::ParseErrorCollector;
use crate::application::ports::{
    ContentImportStrategy, ContentPathImportStrategy, DatabaseHandler, ReadStrategy,
};
use crate::domain::entities::{
    ArchiveContainer, ArrayCell, Cell, ColumnStructure, ComposedCell, DatabaseStructure, Row,
    SchemaStructure, SimpleCell, StoredDigest, TableStructure, TypeKind,
};
use crate::domain::errors::{ModuleError, ResultExt};
use crate::infrastructure::paths::{join_entry_path, RegisteredContentPathStrategy};
use crate::infrastructure::storage::{ArchiveEntryProvider, InMemoryProvider};

const TABLE_ELEMENT: &str = "table";
const ROW_ELEMENT: &str = "row";
const CELL_PREFIX: char = 'c';
const ARRAY_PREFIX: char = 'a';
const UDT_PREFIX: char = 'u';
const BLOB_EXTENSION: &str = ".bin";
const CLOB_EXTENSION: &str = ".txt";
const PROGRESS_INTERVAL: u64 = 1000;

/// Reads table files back into rows and replays them to a handler.
///
/// Folder names must be registered on the path strategy (usually through
/// `register_structure`) before `import_content` is called.
pub struct XmlContentImportStrategy {
    read_strategy: Arc<dyn ReadStrategy>,
    paths: RegisteredContentPathStrategy,
    lob_container: Option<ArchiveContainer>,
}

impl XmlContentImportStrategy {
    pub fn new(read_strategy: Arc<dyn ReadStrategy>, paths: RegisteredContentPathStrategy) -> Self {
        Self {
            read_strategy,
            paths,
            lob_container: None,
        }
    }

    /// Container that `../`-prefixed LOB references are read from
    pub fn with_lob_container(mut self, lob_container: ArchiveContainer) -> Self {
        self.lob_container = Some(lob_container);
        self
    }

    /// Stream one table file into `handler`.
    ///
    /// Validation is structural only: the table's XSD must be present and
    /// every row must fit the known table structure (`c{N}` within the
    /// column count, well-formed hex and LOB references). The XSD itself is
    /// never evaluated against the document.
    fn import_table(
        &self,
        handler: &mut dyn DatabaseHandler,
        container: &ArchiveContainer,
        schema: &SchemaStructure,
        table: &TableStructure,
    ) -> Result<TableSummary, ModuleError> {
        let xsd_path = self.paths.table_xsd_file_path(&schema.name, &table.id)?;
        if !self.read_strategy.entry_exists(container, &xsd_path) {
            return Err(ModuleError::message(format!(
                "Table schema {} of table {} is missing",
                xsd_path, table.id
            )));
        }

        let xml_path = self.paths.table_xml_file_path(&schema.name, &table.id)?;
        let stream = self.read_strategy.create_input_stream(container, &xml_path)?;
        info!("Importing table {} from {}", table.id, xml_path);

        let parser = TableParser {
            import: self,
            container,
            schema,
            table,
            errors: ParseErrorCollector::new(xml_path.clone()),
            stack: Vec::new(),
            row_index: 1,
            row: None,
            column: None,
            text: String::new(),
        };
        let summary = parser.run(BufReader::new(stream), handler)?;
        if summary.warnings > 0 {
            warn!(
                "Table {} imported with {} warning(s)",
                table.id, summary.warnings
            );
        }
        debug!("Total of {} row(s) processed for table {}", summary.rows, table.id);
        Ok(summary)
    }
}

impl ContentImportStrategy for XmlContentImportStrategy {
    fn import_content(
        &mut self,
        handler: &mut dyn DatabaseHandler,
        container: &ArchiveContainer,
        structure: &DatabaseStructure,
        ignored_schemas: &HashSet<String>,
    ) -> Result<(), ModuleError> {
        for schema in &structure.schemas {
            if ignored_schemas.contains(&schema.name) {
                debug!("Skipping ignored schema {}", schema.name);
                continue;
            }

            handler.handle_data_open_schema(&schema.name)?;
            for table in &schema.tables {
                handler.handle_data_open_table(&table.id)?;
                self.import_table(handler, container, schema, table)
                    .with_message(|| format!("Could not import table {}", table.id))?;
                handler.handle_data_close_table(&table.id)?;
            }
            handler.handle_data_close_schema(&schema.name)?;
        }
        Ok(())
    }
}

/// Outcome of a table file that imported successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableSummary {
    rows: u64,
    warnings: usize,
}

/// Value being assembled for the `c{N}` element currently open
struct ColumnState {
    /// 0-based column position
    ordinal: usize,
    id: String,
    lob: Option<Cell>,
    array: Option<ArrayCell>,
    /// Open `a{i}` positions, outermost first
    positions: Vec<usize>,
    /// True until a nested `a{i}` opens below the innermost one
    leaf: bool,
    composed: Vec<Option<Cell>>,
}

/// Parse state for one table file
struct TableParser<'a> {
    import: &'a XmlContentImportStrategy,
    container: &'a ArchiveContainer,
    schema: &'a SchemaStructure,
    table: &'a TableStructure,
    errors: ParseErrorCollector,
    stack: Vec<String>,
    /// Index of the row being read, 1-based
    row_index: u64,
    row: Option<Vec<Option<Cell>>>,
    column: Option<ColumnState>,
    text: String,
}

/// `c12` -> 12 for the given prefix
fn ordinal(name: &str, prefix: char) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl TableParser<'_> {
    /// Consume the whole file, forwarding each completed row.
    ///
    /// Returns the rows read and warnings raised. Recorded errors fail the table only
    /// after the file was drained; malformed XML fails immediately.
    fn run<R: BufRead>(
        mut self,
        input: R,
        handler: &mut dyn DatabaseHandler,
    ) -> Result<TableSummary, ModuleError> {
        let mut reader = Reader::from_reader(input);
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position() as u64;
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => return Err(self.errors.fatal(position, e)),
            };

            match event {
                Event::Start(e) => self.start_element(&e, position)?,
                Event::Empty(e) => {
                    self.start_element(&e, position)?;
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.end_element(&name, position, handler)?;
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.end_element(&name, position, handler)?;
                }
                Event::Text(e) => match e.unescape() {
                    Ok(text) => self.text.push_str(&text),
                    Err(err) => self.errors.error(position, format!("Invalid character data: {}", err)),
                },
                Event::CData(e) => self.text.push_str(&String::from_utf8_lossy(&e)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let rows = self.row_index - 1;
        let warnings = self.errors.into_result()?;
        Ok(TableSummary { rows, warnings })
    }

    fn start_element(&mut self, element: &BytesStart, position: u64) -> Result<(), ModuleError> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let parent = self.stack.last().map(String::as_str);
        self.text.clear();

        match parent {
            None => {
                if name != TABLE_ELEMENT {
                    self.errors
                        .error(position, format!("Unexpected root element {}", name));
                }
            }
            Some(TABLE_ELEMENT) if self.stack.len() == 1 => {
                if name == ROW_ELEMENT {
                    let columns = self.table.columns.len();
                    self.row = Some(std::iter::repeat_with(|| None).take(columns).collect());
                } else {
                    self.errors
                        .error(position, format!("Unexpected element {} in table", name));
                }
            }
            Some(ROW_ELEMENT) if self.stack.len() == 2 => self.start_column(&name, element, position)?,
            Some(_) => self.start_nested(&name, position),
        }

        self.stack.push(name);
        Ok(())
    }

    fn start_column(
        &mut self,
        name: &str,
        element: &BytesStart,
        position: u64,
    ) -> Result<(), ModuleError> {
        let table = self.table;
        let (ordinal, column) = match ordinal(name, CELL_PREFIX) {
            Some(n) if n >= 1 && n <= table.columns.len() => (n - 1, &table.columns[n - 1]),
            _ => {
                self.errors.error(
                    position,
                    format!("Unexpected element {} in row {}", name, self.row_index),
                );
                self.column = None;
                return Ok(());
            }
        };

        let mut file = None;
        let mut length = None;
        let mut digest = None;
        let mut digest_type = None;
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|e| self.errors.fatal(position, e))?;
            let value = attribute
                .unescape_value()
                .map_err(|e| self.errors.fatal(position, e))?
                .into_owned();
            match attribute.key.local_name().as_ref() {
                b"file" => file = Some(value),
                b"length" => length = Some(value),
                b"digest" => digest = Some(value),
                b"digestType" => digest_type = Some(value),
                _ => {}
            }
        }

        let id = format!("{}.{}", column.id, self.row_index);
        let lob = match file {
            Some(file) => {
                let stored = self.stored_digest(digest, digest_type, position);
                match self.open_lob(column, &id, &file, length.as_deref()) {
                    Ok(cell) => Some(match stored {
                        Some(stored) => cell.with_digest(stored),
                        None => cell,
                    }),
                    Err(e) => {
                        self.errors
                            .error(position, format!("Failed to open lob at {}: {}", file, e));
                        None
                    }
                }
            }
            None => None,
        };

        self.column = Some(ColumnState {
            ordinal,
            array: column.column_type.is_array().then(|| ArrayCell::new(id.clone())),
            id,
            lob,
            positions: Vec::new(),
            leaf: false,
            composed: Vec::new(),
        });
        Ok(())
    }

    fn start_nested(&mut self, name: &str, position: u64) {
        let Some(column) = self.column.as_mut() else {
            // Content of an element already reported as unexpected
            return;
        };

        if column.array.is_some() {
            if let Some(index) = ordinal(name, ARRAY_PREFIX) {
                column.positions.push(index);
                column.leaf = true;
                return;
            }
        } else if self.table.columns[column.ordinal].column_type.is_structure()
            && column.positions.is_empty()
            && ordinal(name, UDT_PREFIX).is_some()
        {
            return;
        }

        self.errors.error(
            position,
            format!("Unexpected element {} in column {}", name, column.id),
        );
    }

    fn end_element(
        &mut self,
        name: &str,
        position: u64,
        handler: &mut dyn DatabaseHandler,
    ) -> Result<(), ModuleError> {
        self.stack.pop();
        let depth = self.stack.len();
        let text = std::mem::take(&mut self.text);

        match depth {
            1 if name == ROW_ELEMENT => self.finish_row(handler)?,
            2 => self.finish_column(text, position),
            d if d > 2 => self.finish_nested(name, text, position),
            _ => {}
        }
        Ok(())
    }

    fn finish_nested(&mut self, name: &str, text: String, position: u64) {
        let Some(column) = self.column.as_mut() else {
            return;
        };
        let column_type = &self.table.columns[column.ordinal].column_type;

        if let Some(array) = column.array.as_mut() {
            if ordinal(name, ARRAY_PREFIX).is_none() {
                return;
            }
            if column.leaf {
                let element_type = column_type.leaf_type();
                let positions = column.positions.clone();
                let id = format!(
                    "{}.{}",
                    column.id,
                    positions
                        .iter()
                        .map(usize::to_string)
                        .collect::<Vec<_>>()
                        .join(".")
                );
                let element = match element_type.kind {
                    TypeKind::String { .. } => Some(Cell::simple(id, codec::decode(&text))),
                    TypeKind::Binary if !text.trim().is_empty() => match hex::decode(text.trim()) {
                        Ok(bytes) => Some(Cell::binary(id, Box::new(InMemoryProvider::new(bytes)))),
                        Err(e) => {
                            self.errors.error(
                                position,
                                format!("Illegal characters in hexadecimal string \"{}\": {}", text, e),
                            );
                            None
                        }
                    },
                    TypeKind::Binary => Some(Cell::null(id)),
                    _ if !text.trim().is_empty() => Some(Cell::simple(id, text)),
                    _ => None,
                };
                if let Some(element) = element {
                    array.put(positions, element);
                }
            }
            column.leaf = false;
            column.positions.pop();
            return;
        }

        if let Some(index) = ordinal(name, UDT_PREFIX).filter(|i| *i >= 1) {
            let is_string = match &column_type.kind {
                TypeKind::ComposedStructure { elements } => {
                    elements.get(index - 1).is_some_and(|t| t.is_string())
                }
                _ => false,
            };
            let data = if is_string { codec::decode(&text) } else { text };
            if column.composed.len() < index {
                column.composed.resize_with(index, || None);
            }
            column.composed[index - 1] = Some(Cell::simple(format!("{}.{}", column.id, index), data));
        }
    }

    fn finish_column(&mut self, text: String, position: u64) {
        let Some(column) = self.column.take() else {
            return;
        };
        let column_type = &self.table.columns[column.ordinal].column_type;

        let cell = if let Some(lob) = column.lob {
            Some(lob)
        } else if let Some(array) = column.array {
            if array.is_empty() {
                Some(Cell::null(column.id))
            } else {
                Some(Cell::Array(array))
            }
        } else if column_type.is_structure() {
            if column.composed.is_empty() {
                Some(Cell::null(column.id))
            } else {
                let cells = column
                    .composed
                    .into_iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        cell.unwrap_or_else(|| Cell::null(format!("{}.{}", column.id, i + 1)))
                    })
                    .collect();
                Some(Cell::Composed(ComposedCell::new(column.id, cells)))
            }
        } else {
            match column_type.kind {
                TypeKind::String { .. } => Some(Cell::simple(column.id, codec::decode(&text))),
                TypeKind::Binary if !text.trim().is_empty() => match hex::decode(text.trim()) {
                    Ok(bytes) => Some(Cell::binary(column.id, Box::new(InMemoryProvider::new(bytes)))),
                    Err(e) => {
                        self.errors.error(
                            position,
                            format!("Illegal characters in hexadecimal string \"{}\": {}", text, e),
                        );
                        None
                    }
                },
                _ => Some(Cell::Simple(SimpleCell::new(column.id, Some(text)))),
            }
        };

        if let (Some(row), Some(cell)) = (self.row.as_mut(), cell) {
            row[column.ordinal] = Some(cell);
        }
    }

    fn finish_row(&mut self, handler: &mut dyn DatabaseHandler) -> Result<(), ModuleError> {
        let Some(slots) = self.row.take() else {
            return Ok(());
        };

        // Columns without an element are null
        let row_index = self.row_index;
        let cells = slots
            .into_iter()
            .zip(&self.table.columns)
            .map(|(cell, column)| {
                cell.unwrap_or_else(|| Cell::null(format!("{}.{}", column.id, row_index)))
            })
            .collect();

        handler.handle_data_row(Row::new(row_index, cells))?;
        self.row_index += 1;

        if row_index % PROGRESS_INTERVAL == 0 {
            if self.table.rows > 0 {
                info!(
                    "Imported {} of {} rows of table {}",
                    row_index, self.table.rows, self.table.id
                );
            } else {
                info!("Imported {} rows of table {}", row_index, self.table.id);
            }
        }
        Ok(())
    }

    fn stored_digest(
        &mut self,
        digest: Option<String>,
        digest_type: Option<String>,
        position: u64,
    ) -> Option<StoredDigest> {
        let (digest, digest_type) = (digest?, digest_type?);
        let algorithm = match digest_type.parse() {
            Ok(algorithm) => algorithm,
            Err(e) => {
                self.errors.warning(position, e);
                return None;
            }
        };
        match hex::decode(digest.trim()) {
            Ok(value) => Some(StoredDigest { algorithm, value }),
            Err(e) => {
                self.errors
                    .warning(position, format!("Invalid digest \"{}\": {}", digest, e));
                None
            }
        }
    }

    /// Cell for a LOB stored in its own file
    fn open_lob(
        &self,
        column: &ColumnStructure,
        id: &str,
        file: &str,
        length: Option<&str>,
    ) -> Result<Cell, ModuleError> {
        let paths = &self.import.paths;
        let (container, path) = if let Some(relative) = file.strip_prefix("../") {
            let container = self.import.lob_container.as_ref().ok_or_else(|| {
                ModuleError::message(format!(
                    "LOB {} refers to an external container, but none was configured",
                    file
                ))
            })?;
            (container, join_entry_path([relative]))
        } else {
            let prefix = paths.lob_path(None, &self.schema.name, &self.table.id, &column.id, "");
            let path = if file.contains(&prefix) {
                file.to_string()
            } else {
                paths.lob_path(None, &self.schema.name, &self.table.id, &column.id, file)
            };
            (self.container, path)
        };

        let read_strategy = &self.import.read_strategy;
        if !read_strategy.entry_exists(container, &path) {
            return Err(ModuleError::message(format!(
                "File \"{}\" is missing in {}",
                path, container
            )));
        }

        if path.ends_with(BLOB_EXTENSION) {
            let mut provider =
                ArchiveEntryProvider::new(Arc::clone(read_strategy), container.clone(), path.as_str());
            if let Some(size) = length.and_then(|l| l.trim().parse::<u64>().ok()) {
                provider = provider.with_known_size(size);
            }
            debug!("BLOB cell {} with lob file {}", id, path);
            Ok(Cell::binary(id, Box::new(provider)))
        } else if path.ends_with(CLOB_EXTENSION) {
            let mut data = String::new();
            read_strategy
                .create_input_stream(container, &path)?
                .read_to_string(&mut data)
                .with_path(&path)?;
            debug!("CLOB cell {} with lob file {}", id, path);
            Ok(Cell::simple(id, data))
        } else {
            Err(ModuleError::message(format!(
                "LOB file {} has neither a {} nor a {} extension",
                path, BLOB_EXTENSION, CLOB_EXTENSION
            )))
        }
    }
}
