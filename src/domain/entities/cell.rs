use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use crate::domain::errors::ModuleError;
use crate::domain::value_objects::DigestAlgorithm;

/// Type alias for a fresh byte stream over a cell payload
pub type CellReader = Box<dyn Read + Send>;

/// Resource handle behind a binary cell.
///
/// Every call to `create_input_stream` opens a new stream from the start
/// of the payload. Spooled resources are released when the provider is
/// dropped or when `cleanup_resources` is called, whichever comes first.
pub trait InputStreamProvider: Send + Sync {
    fn create_input_stream(&self) -> Result<CellReader, ModuleError>;

    /// Payload length in bytes
    fn size(&self) -> Result<u64, ModuleError>;

    /// Local file holding the payload, when it was spooled to disk
    fn spooled_path(&self) -> Option<PathBuf> {
        None
    }

    fn cleanup_resources(&self) {}
}

/// Digest already computed for a cell payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDigest {
    pub algorithm: DigestAlgorithm,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullCell {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCell {
    id: String,
    data: Option<String>,
    digest: Option<StoredDigest>,
}

pub struct BinaryCell {
    id: String,
    provider: Box<dyn InputStreamProvider>,
    digest: Option<StoredDigest>,
}

#[derive(Debug)]
pub struct ComposedCell {
    id: String,
    cells: Vec<Cell>,
}

/// Array elements keyed by their 1-based position path
#[derive(Debug)]
pub struct ArrayCell {
    id: String,
    elements: BTreeMap<Vec<usize>, Cell>,
}

/// One value of a row, identified by `columnId.rowIndex`
#[derive(Debug)]
pub enum Cell {
    Null(NullCell),
    Simple(SimpleCell),
    Binary(BinaryCell),
    Composed(ComposedCell),
    Array(ArrayCell),
}

impl NullCell {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl SimpleCell {
    pub fn new(id: impl Into<String>, data: Option<String>) -> Self {
        Self {
            id: id.into(),
            data,
            digest: None,
        }
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// UTF-8 length of the payload, `None` for null content
    pub fn bytes_size(&self) -> Option<usize> {
        self.data.as_ref().map(|d| d.len())
    }
}

impl BinaryCell {
    pub fn new(id: impl Into<String>, provider: Box<dyn InputStreamProvider>) -> Self {
        Self {
            id: id.into(),
            provider,
            digest: None,
        }
    }

    pub fn size(&self) -> Result<u64, ModuleError> {
        self.provider.size()
    }

    pub fn create_input_stream(&self) -> Result<CellReader, ModuleError> {
        self.provider.create_input_stream()
    }

    pub fn provider(&self) -> &dyn InputStreamProvider {
        self.provider.as_ref()
    }

    /// Hands the resource over to a new owner (e.g. a deferred LOB write)
    pub fn into_provider(self) -> Box<dyn InputStreamProvider> {
        self.provider
    }

    /// Reads the whole payload into memory
    pub fn read_all(&self) -> Result<Vec<u8>, ModuleError> {
        let mut buffer = Vec::new();
        self.create_input_stream()?
            .read_to_end(&mut buffer)
            .map_err(|e| ModuleError::io(self.id.clone(), e))?;
        Ok(buffer)
    }

    pub fn clean_resources(&self) {
        self.provider.cleanup_resources();
    }
}

impl std::fmt::Debug for BinaryCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryCell")
            .field("id", &self.id)
            .field("size", &self.provider.size().ok())
            .field("digest", &self.digest)
            .finish()
    }
}

impl ComposedCell {
    pub fn new(id: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

impl ArrayCell {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            elements: BTreeMap::new(),
        }
    }

    pub fn put(&mut self, position: Vec<usize>, cell: Cell) {
        self.elements.insert(position, cell);
    }

    /// Elements in position order
    pub fn elements(&self) -> impl Iterator<Item = (&Vec<usize>, &Cell)> {
        self.elements.iter()
    }

    pub fn into_elements(self) -> BTreeMap<Vec<usize>, Cell> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Cell {
    pub fn null(id: impl Into<String>) -> Self {
        Cell::Null(NullCell::new(id))
    }

    pub fn simple(id: impl Into<String>, data: impl Into<String>) -> Self {
        Cell::Simple(SimpleCell::new(id, Some(data.into())))
    }

    pub fn binary(id: impl Into<String>, provider: Box<dyn InputStreamProvider>) -> Self {
        Cell::Binary(BinaryCell::new(id, provider))
    }

    pub fn id(&self) -> &str {
        match self {
            Cell::Null(c) => &c.id,
            Cell::Simple(c) => &c.id,
            Cell::Binary(c) => &c.id,
            Cell::Composed(c) => &c.id,
            Cell::Array(c) => &c.id,
        }
    }

    pub fn digest(&self) -> Option<&StoredDigest> {
        match self {
            Cell::Simple(c) => c.digest.as_ref(),
            Cell::Binary(c) => c.digest.as_ref(),
            _ => None,
        }
    }

    /// Attaches a computed digest; ignored for cells without a payload.
    pub fn set_digest(&mut self, digest: StoredDigest) {
        match self {
            Cell::Simple(c) => c.digest = Some(digest),
            Cell::Binary(c) => c.digest = Some(digest),
            _ => {}
        }
    }

    pub fn with_digest(mut self, digest: StoredDigest) -> Self {
        self.set_digest(digest);
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Cell::Null(_) => "NullCell",
            Cell::Simple(_) => "SimpleCell",
            Cell::Binary(_) => "BinaryCell",
            Cell::Composed(_) => "ComposedCell",
            Cell::Array(_) => "ArrayCell",
        }
    }
}
