use super::cell::Cell;

/// One data row: cells in column order plus the 1-based row index
#[derive(Debug)]
pub struct Row {
    pub index: u64,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(index: u64, cells: Vec<Cell>) -> Self {
        Self { index, cells }
    }

    pub fn cell(&self, position: usize) -> Option<&Cell> {
        self.cells.get(position)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
