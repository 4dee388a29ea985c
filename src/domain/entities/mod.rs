mod cell;
mod container;
mod row;
mod structure;
mod types;

pub use cell::{
    ArrayCell, BinaryCell, Cell, CellReader, ComposedCell, InputStreamProvider, NullCell,
    SimpleCell, StoredDigest,
};
pub use container::ArchiveContainer;
pub use row::Row;
pub use structure::{ColumnStructure, DatabaseStructure, SchemaStructure, TableStructure};
pub use types::{Type, TypeKind};
