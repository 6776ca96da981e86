use std::cell::Cell;
use std::fmt;

/// Named, non-owning window over a variable buffer.
///
/// Element access goes through `Cell`, so several views of one buffer may be
/// alive at once (an instruction may list the same variable as input and
/// output). Views are tied to the runner borrow and cannot outlive it.
#[derive(Clone, Copy)]
pub struct TensorView<'a> {
    name: &'a str,
    cells: &'a [Cell<f32>],
}

impl<'a> TensorView<'a> {
    pub fn new(name: &'a str, cells: &'a [Cell<f32>]) -> Self {
        Self { name, cells }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read element `index`. Panics when out of range, like slice indexing.
    pub fn get(&self, index: usize) -> f32 {
        self.cells[index].get()
    }

    /// Write element `index`. Panics when out of range, like slice indexing.
    pub fn set(&self, index: usize, value: f32) {
        self.cells[index].set(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.cells.iter().map(Cell::get)
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }

    /// Copy `src` into the view. Panics if the lengths differ.
    pub fn copy_from_slice(&self, src: &[f32]) {
        assert_eq!(
            self.cells.len(),
            src.len(),
            "view {} has {} elements, source has {}",
            self.name,
            self.cells.len(),
            src.len()
        );
        for (cell, value) in self.cells.iter().zip(src) {
            cell.set(*value);
        }
    }

    pub fn fill(&self, value: f32) {
        for cell in self.cells {
            cell.set(value);
        }
    }

    /// True when both views cover the same memory.
    pub fn aliases(&self, other: &TensorView<'_>) -> bool {
        std::ptr::eq(self.cells.as_ptr(), other.cells.as_ptr()) && self.len() == other.len()
    }
}

impl fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("name", &self.name)
            .field("len", &self.cells.len())
            .finish()
    }
}
