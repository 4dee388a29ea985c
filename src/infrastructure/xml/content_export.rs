use std::sync::Arc;
use tracing::{debug, info, warn};

use super::codec;
use super::sql2008_xsd::{XsdTypeMapper, CLOB_TYPE};
use super::table_xsd::write_table_xsd;
use super::xml_writer::XmlWriter;
use crate::application::ports::{
    ContentExportStrategy, ContentPathExportStrategy, EntryWriter, WriteStrategy,
};
use crate::domain::entities::{
    ArchiveContainer, ArrayCell, BinaryCell, Cell, ColumnStructure, ComposedCell,
    InputStreamProvider, Row, SchemaStructure, SimpleCell, TableStructure,
};
use crate::domain::errors::{ModuleError, ResultExt};
use crate::domain::value_objects::DigestAlgorithm;
use crate::infrastructure::paths::IndexedContentPathStrategy;
use crate::infrastructure::storage::{ContentHasher, InMemoryProvider, TemporaryFileProvider};

const CELL_PREFIX: &str = "c";
const ARRAY_PREFIX: &str = "a";
const UDT_PREFIX: &str = "u";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Inline/external decisions and output options of the table writer
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Longest string, in characters, kept inside a CLOB column element
    pub string_threshold: usize,
    /// Largest binary, in bytes, kept inline as hex in a BLOB column element
    pub binary_threshold: u64,
    /// Digest written next to every externalized LOB
    pub digest_algorithm: DigestAlgorithm,
    pub pretty: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            string_threshold: 4000,
            binary_threshold: 2000,
            digest_algorithm: DigestAlgorithm::Md5,
            pretty: true,
        }
    }
}

/// LOB waiting for the table file to be closed
struct PendingLob {
    provider: Box<dyn InputStreamProvider>,
    path: String,
}

struct OpenTable {
    schema_index: usize,
    table: TableStructure,
    writer: XmlWriter<EntryWriter>,
    /// Rows written so far
    rows: u64,
    pending: Vec<PendingLob>,
}

/// Writes table data as `content/schema{S}/table{T}/table{T}.xml` plus the
/// matching XSD, externalizing large values as LOB files.
///
/// LOBs are written while the table file is open when the write strategy
/// allows simultaneous streams, and queued until `close_table` otherwise.
pub struct XmlContentExportStrategy {
    write_strategy: Arc<dyn WriteStrategy>,
    container: ArchiveContainer,
    lob_container: Option<ArchiveContainer>,
    paths: IndexedContentPathStrategy,
    types: XsdTypeMapper,
    settings: ExportSettings,
    schema_index: Option<usize>,
    current: Option<OpenTable>,
}

impl XmlContentExportStrategy {
    pub fn new(
        write_strategy: Arc<dyn WriteStrategy>,
        container: ArchiveContainer,
        settings: ExportSettings,
    ) -> Result<Self, ModuleError> {
        Ok(Self {
            write_strategy,
            container,
            lob_container: None,
            paths: IndexedContentPathStrategy::new(),
            types: XsdTypeMapper::new()?,
            settings,
            schema_index: None,
            current: None,
        })
    }

    /// Store LOBs in an auxiliary container, referenced as `../<path>`
    pub fn with_lob_container(mut self, lob_container: ArchiveContainer) -> Self {
        self.lob_container = Some(lob_container);
        self
    }

    fn table_namespace(&self, schema_index: usize, table_index: usize) -> String {
        let base = self.container.version_or_default().namespace_base();
        self.paths
            .table_xsd_namespace(&base, schema_index, table_index)
    }

    fn write_pending_lobs(&self, pending: Vec<PendingLob>) -> Result<(), ModuleError> {
        let target = self.lob_container.as_ref().unwrap_or(&self.container);
        for lob in pending {
            debug!("Writing lob to {}", lob.path);
            self.write_strategy.write_to(target, lob.provider, &lob.path)?;
        }
        Ok(())
    }

    fn write_xsd(&self, schema_index: usize, table: &TableStructure) -> Result<(), ModuleError> {
        let path = self.paths.table_xsd_file_path(schema_index, table.index);
        let namespace = self.table_namespace(schema_index, table.index);
        let out = self.write_strategy.create_output_stream(&self.container, &path)?;
        write_table_xsd(out, table, &namespace, &self.types, self.settings.pretty, &path)?;
        Ok(())
    }
}

/// Keep I/O failures recognizable while naming what was being written
fn io_context(e: ModuleError, message: impl FnOnce() -> String) -> ModuleError {
    match e {
        ModuleError::Io { .. } | ModuleError::Module { .. } => ModuleError::with_cause(message(), e),
        other => other,
    }
}

impl ContentExportStrategy for XmlContentExportStrategy {
    fn open_schema(&mut self, schema: &SchemaStructure) -> Result<(), ModuleError> {
        self.schema_index = Some(schema.index);
        Ok(())
    }

    fn close_schema(&mut self, _schema: &SchemaStructure) -> Result<(), ModuleError> {
        self.schema_index = None;
        Ok(())
    }

    fn open_table(&mut self, table: &TableStructure) -> Result<(), ModuleError> {
        let schema_index = self.schema_index.ok_or_else(|| {
            ModuleError::message(format!("No schema is open for table {}", table.id))
        })?;
        let path = self.paths.table_xml_file_path(schema_index, table.index);
        let namespace = self.table_namespace(schema_index, table.index);
        let schema_location = format!(
            "{} {}",
            namespace,
            self.paths.table_xsd_file_name(table.index)
        );

        let open = || -> Result<XmlWriter<EntryWriter>, ModuleError> {
            let stream = self.write_strategy.create_output_stream(&self.container, &path)?;
            let mut writer = XmlWriter::new(stream, self.settings.pretty, path.as_str());
            writer.declaration(None)?;
            writer.start(
                "table",
                &[
                    ("xsi:schemaLocation", schema_location.as_str()),
                    ("xmlns", namespace.as_str()),
                    ("xmlns:xsi", XSI_NAMESPACE),
                ],
            )?;
            Ok(writer)
        };
        let writer = open().with_message(|| format!("Error handling open table {}", table.id))?;

        debug!("Writing table {} to {}", table.id, path);
        self.current = Some(OpenTable {
            schema_index,
            table: table.clone(),
            writer,
            rows: 0,
            pending: Vec::new(),
        });
        Ok(())
    }

    fn table_row(&mut self, row: Row) -> Result<(), ModuleError> {
        let open = self
            .current
            .as_mut()
            .ok_or_else(|| ModuleError::message("No table is open for writing rows"))?;

        if row.len() > open.table.columns.len() {
            return Err(ModuleError::InvalidData(format!(
                "Row {} of table {} has {} cells but the table has {} columns",
                row.index,
                open.table.id,
                row.len(),
                open.table.columns.len()
            )));
        }

        let row_number = open.rows + 1;
        let OpenTable {
            schema_index,
            table,
            writer,
            pending,
            ..
        } = &mut *open;
        let mut cells = CellWriter {
            writer,
            pending,
            write_strategy: self.write_strategy.as_ref(),
            lob_target: self.lob_container.as_ref().unwrap_or(&self.container),
            external_lobs: self.lob_container.is_some(),
            paths: &self.paths,
            types: &self.types,
            settings: &self.settings,
            schema_index: *schema_index,
            table_index: table.index,
            row_number,
        };

        let written = (|| -> Result<(), ModuleError> {
            cells.writer.start("row", &[])?;
            for (i, cell) in row.cells.into_iter().enumerate() {
                let column = &table.columns[i];
                let tag = format!("{}{}", CELL_PREFIX, i + 1);
                cells.write_cell(&tag, column, i + 1, cell)?;
            }
            cells.writer.end("row")
        })();
        written.map_err(|e| io_context(e, || format!("Could not write row {}", row.index)))?;

        open.rows = row_number;
        Ok(())
    }

    fn close_table(&mut self, table: &TableStructure) -> Result<(), ModuleError> {
        let Some(open) = self.current.take() else {
            return Err(ModuleError::message(format!(
                "Table {} was not opened",
                table.id
            )));
        };

        let OpenTable {
            schema_index,
            table: open_table,
            mut writer,
            rows,
            pending,
        } = open;

        // The table stream must be gone before queued LOBs start new entries
        let closed = writer.end("table").and_then(|_| writer.finish().map(drop));
        closed.with_message(|| format!("Error handling close table {}", open_table.id))?;

        self.write_pending_lobs(pending)
            .with_message(|| "Error writing LOBs".to_string())?;

        self.write_xsd(schema_index, &open_table)
            .map_err(|e| io_context(e, || "Error writing table XSD".to_string()))?;

        info!("Wrote {} rows of table {}", rows, open_table.id);
        Ok(())
    }
}

/// Borrowed state needed to serialize the cells of one row
struct CellWriter<'a> {
    writer: &'a mut XmlWriter<EntryWriter>,
    pending: &'a mut Vec<PendingLob>,
    write_strategy: &'a dyn WriteStrategy,
    lob_target: &'a ArchiveContainer,
    external_lobs: bool,
    paths: &'a IndexedContentPathStrategy,
    types: &'a XsdTypeMapper,
    settings: &'a ExportSettings,
    schema_index: usize,
    table_index: usize,
    row_number: u64,
}

impl CellWriter<'_> {
    fn write_cell(
        &mut self,
        tag: &str,
        column: &ColumnStructure,
        column_index: usize,
        cell: Cell,
    ) -> Result<(), ModuleError> {
        match cell {
            Cell::Null(_) => Ok(()),
            Cell::Simple(simple) => self.write_simple(tag, column, column_index, simple),
            Cell::Binary(binary) => self.write_binary(tag, column, column_index, binary),
            Cell::Array(array) => self.write_array(tag, column, column_index, array),
            Cell::Composed(composed) => self.write_composed(tag, &composed),
        }
    }

    fn write_simple(
        &mut self,
        tag: &str,
        column: &ColumnStructure,
        column_index: usize,
        cell: SimpleCell,
    ) -> Result<(), ModuleError> {
        let Some(data) = cell.data() else {
            return Ok(());
        };

        let is_clob = matches!(self.types.convert(&column.column_type), Ok(Some(CLOB_TYPE)));
        if is_clob && data.chars().count() > self.settings.string_threshold {
            let bytes = data.as_bytes();
            let size = bytes.len() as u64;
            // Written straight away only when the strategy neither defers nor queues
            let writes_now = self.write_strategy.is_simultaneous_writing_supported()
                && !self.write_strategy.defers_writes();
            let provider: Box<dyn InputStreamProvider> = if writes_now {
                Box::new(InMemoryProvider::new(bytes.to_vec()))
            } else {
                Box::new(TemporaryFileProvider::spool(bytes)?)
            };
            let path = self.paths.clob_file_path(
                self.schema_index,
                self.table_index,
                column_index,
                self.row_number,
            );
            return self.write_lob(tag, provider, size, path);
        }

        self.writer.text_element(tag, &codec::encode(data))
    }

    fn write_binary(
        &mut self,
        tag: &str,
        column: &ColumnStructure,
        column_index: usize,
        cell: BinaryCell,
    ) -> Result<(), ModuleError> {
        let size = cell.size()?;
        if size == 0 {
            cell.clean_resources();
            return Ok(());
        }

        if self.types.is_large_type(&column.column_type) && size > self.settings.binary_threshold {
            let path = self.paths.blob_file_path(
                self.schema_index,
                self.table_index,
                column_index,
                self.row_number,
            );
            return self.write_lob(tag, cell.into_provider(), size, path);
        }

        let bytes = cell.read_all()?;
        cell.clean_resources();
        self.writer.text_element(tag, &hex::encode(bytes))
    }

    fn write_lob(
        &mut self,
        tag: &str,
        provider: Box<dyn InputStreamProvider>,
        size: u64,
        path: String,
    ) -> Result<(), ModuleError> {
        let file = if self.external_lobs {
            format!("../{}", path)
        } else {
            path.clone()
        };
        let mut attributes = vec![("file", file), ("length", size.to_string())];

        let algorithm = self.settings.digest_algorithm;
        if algorithm != DigestAlgorithm::None {
            let (digest, _) = ContentHasher::digest_stream(algorithm, provider.create_input_stream()?)
                .with_path(&path)?;
            attributes.push(("digest", hex::encode_upper(digest)));
            attributes.push(("digestType", algorithm.to_string()));
        }

        if self.write_strategy.is_simultaneous_writing_supported() {
            debug!("Writing lob to {}", path);
            self.write_strategy
                .write_to(self.lob_target, provider, &path)
                .with_message(|| "Could not write lob".to_string())?;
        } else {
            debug!("Deferring lob {} until the table is closed", path);
            self.pending.push(PendingLob { provider, path });
        }

        let attributes: Vec<(&str, &str)> = attributes
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect();
        self.writer.empty(tag, &attributes)
    }

    /// Nested `a{i}` elements; consecutive elements share their common
    /// leading positions, so only the differing tags are closed and opened.
    fn write_array(
        &mut self,
        tag: &str,
        column: &ColumnStructure,
        column_index: usize,
        array: ArrayCell,
    ) -> Result<(), ModuleError> {
        self.writer.start(tag, &[])?;
        let mut open_tags: Vec<usize> = Vec::new();

        for (position, element) in array.into_elements() {
            let Some((&last, parents)) = position.split_last() else {
                continue;
            };
            let common = open_tags
                .iter()
                .zip(parents)
                .take_while(|(open, wanted)| open == wanted)
                .count();
            while open_tags.len() > common {
                if let Some(index) = open_tags.pop() {
                    self.writer.end(&format!("{}{}", ARRAY_PREFIX, index))?;
                }
            }
            for &index in &parents[common..] {
                self.writer.start(&format!("{}{}", ARRAY_PREFIX, index), &[])?;
                open_tags.push(index);
            }

            let element_tag = format!("{}{}", ARRAY_PREFIX, last);
            self.write_cell(&element_tag, column, column_index, element)?;
        }

        while let Some(index) = open_tags.pop() {
            self.writer.end(&format!("{}{}", ARRAY_PREFIX, index))?;
        }
        self.writer.end(tag)
    }

    fn write_composed(&mut self, tag: &str, cell: &ComposedCell) -> Result<(), ModuleError> {
        self.writer.start(tag, &[])?;
        for (i, sub_cell) in cell.cells().iter().enumerate() {
            match sub_cell {
                Cell::Null(_) => {}
                Cell::Simple(simple) => {
                    if let Some(data) = simple.data() {
                        let sub_tag = format!("{}{}", UDT_PREFIX, i + 1);
                        self.writer.text_element(&sub_tag, &codec::encode(data))?;
                    }
                }
                Cell::Composed(_) => warn!("UDT inside UDT not yet supported. Saving as null."),
                Cell::Binary(binary) => {
                    warn!("LOBs inside UDT not yet supported. Saving as null.");
                    binary.clean_resources();
                }
                Cell::Array(_) => warn!("Arrays inside UDT not yet supported. Saving as null."),
            }
        }
        self.writer.end(tag)
    }
}
