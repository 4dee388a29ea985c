use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::json_stream::JsonStreamWriter;
use crate::application::ports::DatabaseHandler;
use crate::domain::entities::{Cell, DatabaseStructure, Row, TableStructure};
use crate::domain::errors::ModuleError;
use crate::domain::value_objects::{DigestAlgorithm, HexCase};
use crate::infrastructure::storage::{ContentHasher, MessageDigest};

/// Settings of the Merkle tree filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerkleConfig {
    pub algorithm: DigestAlgorithm,
    pub hex_case: HexCase,
    /// Emit every cell, row, table and schema hash, not only the top hash
    pub explain: bool,
    /// `schema.table` to the names of the columns that take part in the
    /// hash; tables not listed use every column
    pub columns: HashMap<String, Vec<String>>,
}

impl Default for MerkleConfig {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            hex_case: HexCase::Lowercase,
            explain: false,
            columns: HashMap::new(),
        }
    }
}

impl MerkleConfig {
    fn is_merkle_column(&self, table: &TableStructure, column: &str) -> bool {
        if table.from_custom_view {
            return true;
        }
        match self.columns.get(&format!("{}.{}", table.schema, table.name)) {
            Some(selected) => selected.iter().any(|c| c == column),
            None => true,
        }
    }
}

/// Where the Merkle JSON document goes
pub enum MerkleOutput {
    /// Created when the database is initialised
    File(PathBuf),
    Writer(Box<dyn Write + Send>),
}

type JsonOut = JsonStreamWriter<Box<dyn Write + Send>>;

/// Filter that hashes the row stream into a Merkle tree.
///
/// Only the digests of the current row, table and schema are held while
/// the stream passes through; the JSON document is written as it goes.
/// Every call is forwarded to the next stage after the filter did its work.
pub struct MerkleTreeFilter {
    next: Box<dyn DatabaseHandler>,
    config: MerkleConfig,
    output: Option<MerkleOutput>,
    json: Option<JsonOut>,
    structure: Option<Arc<DatabaseStructure>>,
    database_digest: MessageDigest,
    schema_digest: MessageDigest,
    table_digest: MessageDigest,
    /// Positions of the hashed columns of the open table
    merkle_columns: Vec<usize>,
    top_hash: Option<String>,
}

impl MerkleTreeFilter {
    pub fn new(
        config: MerkleConfig,
        output: MerkleOutput,
        next: Box<dyn DatabaseHandler>,
    ) -> Result<Self, ModuleError> {
        if config.algorithm == DigestAlgorithm::None {
            return Err(ModuleError::message(
                "A digest algorithm is required for Merkle tree calculation",
            ));
        }
        let algorithm = config.algorithm;
        Ok(Self {
            next,
            config,
            output: Some(output),
            json: None,
            structure: None,
            database_digest: MessageDigest::new(algorithm),
            schema_digest: MessageDigest::new(algorithm),
            table_digest: MessageDigest::new(algorithm),
            merkle_columns: Vec::new(),
            top_hash: None,
        })
    }

    /// Top hash of the last completed database, in the configured hex case
    pub fn top_hash(&self) -> Option<&str> {
        self.top_hash.as_deref()
    }

    pub fn into_next(self) -> Box<dyn DatabaseHandler> {
        self.next
    }

    fn json(&mut self) -> Result<&mut JsonOut, ModuleError> {
        self.json
            .as_mut()
            .ok_or_else(|| ModuleError::message("Merkle output used before init_database"))
    }

    fn hex(&self, digest: &[u8]) -> String {
        self.config.hex_case.encode(digest)
    }

    fn cell_hash(&self, cell: &Cell) -> Result<Vec<u8>, ModuleError> {
        let algorithm = self.config.algorithm;
        if let Some(stored) = cell.digest() {
            if stored.algorithm == algorithm {
                return Ok(stored.value.clone());
            }
        }

        match cell {
            Cell::Binary(binary) => {
                if binary.size()? == 0 {
                    return Ok(ContentHasher::digest(algorithm, &[]));
                }
                let (digest, _) =
                    ContentHasher::digest_stream(algorithm, binary.create_input_stream()?)?;
                Ok(digest)
            }
            Cell::Simple(simple) => Ok(ContentHasher::digest(
                algorithm,
                simple.data().unwrap_or_default().as_bytes(),
            )),
            Cell::Null(_) => Ok(ContentHasher::digest(algorithm, &[])),
            other => Err(ModuleError::message(format!(
                "{} is not supported type for Merkle tree calculation",
                other.kind()
            ))),
        }
    }
}

impl DatabaseHandler for MerkleTreeFilter {
    fn init_database(&mut self) -> Result<(), ModuleError> {
        let writer: Box<dyn Write + Send> = match self.output.take() {
            Some(MerkleOutput::File(path)) => {
                let file = File::create(&path).map_err(|e| {
                    ModuleError::with_cause(
                        format!("Could not create an output stream for file '{}'", path.display()),
                        e,
                    )
                })?;
                info!("Writing Merkle tree to {}", path.display());
                Box::new(file)
            }
            Some(MerkleOutput::Writer(writer)) => writer,
            None => return Err(ModuleError::message("Merkle output was already consumed")),
        };

        let algorithm = self.config.algorithm;
        self.database_digest = MessageDigest::new(algorithm);
        self.top_hash = None;

        let mut json = JsonStreamWriter::new(writer);
        json.begin_object()?;
        json.name("merkle")?;
        json.begin_object()?;
        json.field("algorithm", &algorithm.to_string())?;
        json.name("schemas")?;
        json.begin_array()?;
        self.json = Some(json);

        self.next.init_database()
    }

    fn set_ignored_schemas(&mut self, ignored_schemas: HashSet<String>) {
        self.next.set_ignored_schemas(ignored_schemas);
    }

    fn handle_structure(&mut self, structure: Arc<DatabaseStructure>) -> Result<(), ModuleError> {
        self.structure = Some(Arc::clone(&structure));
        self.next.handle_structure(structure)
    }

    fn handle_data_open_schema(&mut self, schema_name: &str) -> Result<(), ModuleError> {
        self.schema_digest = MessageDigest::new(self.config.algorithm);

        let json = self.json()?;
        json.begin_object()?;
        json.name(schema_name)?;
        json.begin_object()?;
        json.name("tables")?;
        json.begin_array()?;

        self.next.handle_data_open_schema(schema_name)
    }

    fn handle_data_open_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        self.table_digest = MessageDigest::new(self.config.algorithm);

        let structure = self
            .structure
            .clone()
            .ok_or_else(|| ModuleError::message("Table opened before the structure was handled"))?;
        let table = structure
            .table_by_id(table_id)
            .ok_or_else(|| ModuleError::message(format!("Unknown table {}", table_id)))?;

        self.merkle_columns.clear();
        let mut names = Vec::new();
        for (i, column) in table.columns.iter().enumerate() {
            if self.config.is_merkle_column(table, &column.name) {
                self.merkle_columns.push(i);
                names.push(column.name.as_str());
            }
        }
        debug!("Merkle columns of {}: {:?}", table_id, names);

        let explain = self.config.explain;
        let json = self.json()?;
        json.begin_object()?;
        json.name(&table.name)?;
        json.begin_object()?;
        json.field("columns", &names)?;
        if explain {
            json.name("rows")?;
            json.begin_array()?;
        }

        self.next.handle_data_open_table(table_id)
    }

    fn handle_data_row(&mut self, row: Row) -> Result<(), ModuleError> {
        let explain = self.config.explain;
        let mut row_digest = MessageDigest::new(self.config.algorithm);

        if explain {
            let json = self.json()?;
            json.begin_object()?;
            json.field("index", &row.index)?;
            json.name("cells")?;
            json.begin_array()?;
        }

        for i in 0..self.merkle_columns.len() {
            let position = self.merkle_columns[i];
            let cell = row.cell(position).ok_or_else(|| {
                ModuleError::InvalidData(format!(
                    "Row {} has no cell at position {}",
                    row.index,
                    position + 1
                ))
            })?;
            let cell_hex = self.hex(&self.cell_hash(cell)?);
            row_digest.update(cell_hex.as_bytes());

            if explain {
                let json = self.json()?;
                json.begin_object()?;
                json.field("index", cell.id())?;
                json.field("cellHash", &cell_hex)?;
                json.end_object()?;
            }
        }

        let row_hex = self.hex(&row_digest.finalize());
        self.table_digest.update(row_hex.as_bytes());

        if explain {
            let json = self.json()?;
            json.end_array()?;
            json.field("rowHash", &row_hex)?;
            json.end_object()?;
        }

        self.next.handle_data_row(row)
    }

    fn handle_data_close_table(&mut self, table_id: &str) -> Result<(), ModuleError> {
        let table_digest = self.table_digest.finalize_reset();
        let table_hex = self.hex(&table_digest);
        self.schema_digest.update(table_hex.as_bytes());
        self.merkle_columns.clear();
        debug!("Table {} hash {}", table_id, table_hex);

        let explain = self.config.explain;
        let json = self.json()?;
        if explain {
            json.end_array()?;
            json.field("tableHash", &table_hex)?;
        }
        json.end_object()?;
        json.end_object()?;

        self.next.handle_data_close_table(table_id)
    }

    fn handle_data_close_schema(&mut self, schema_name: &str) -> Result<(), ModuleError> {
        let schema_digest = self.schema_digest.finalize_reset();
        let schema_hex = self.hex(&schema_digest);
        self.database_digest.update(schema_hex.as_bytes());

        let explain = self.config.explain;
        let json = self.json()?;
        json.end_array()?;
        if explain {
            json.field("schemaHash", &schema_hex)?;
        }
        json.end_object()?;
        json.end_object()?;

        self.next.handle_data_close_schema(schema_name)
    }

    fn finish_database(&mut self) -> Result<(), ModuleError> {
        let top_digest = self.database_digest.finalize_reset();
        let top_hex = self.hex(&top_digest);

        let mut json = self
            .json
            .take()
            .ok_or_else(|| ModuleError::message("Merkle output used before init_database"))?;
        json.end_array()?;
        json.field("topHash", &top_hex)?;
        json.end_object()?;
        json.end_object()?;
        let mut out = json.finish()?;
        out.flush()
            .map_err(|e| ModuleError::with_cause("Could not close the Merkle JSON output", e))?;

        info!("Merkle top hash {}", top_hex);
        self.top_hash = Some(top_hex);
        self.next.finish_database()
    }
}
