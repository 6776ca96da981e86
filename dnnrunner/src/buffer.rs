use std::cell::Cell;
use std::collections::HashMap;
use std::ops::Range;

use anyhow::Result;

use crate::error::RunnerError;
use crate::layout::LayoutTable;

mod view;

pub use view::TensorView;

/// Small integer standing in for a view name after compilation.
pub type Handle = usize;

/// Single backing buffer for all weights, carved into named windows.
///
/// Views alias the backing storage, so filling the arena once populates
/// every named weight.
#[derive(Debug, Clone)]
pub struct WeightArena {
    data: Vec<f32>,
    names: Vec<String>,
    regions: Vec<Range<usize>>,
    index: HashMap<String, Handle>,
}

impl WeightArena {
    pub fn allocate(layout: &LayoutTable) -> Result<Self> {
        layout.validate("weight")?;
        let mut names = Vec::with_capacity(layout.len());
        let mut regions = Vec::with_capacity(layout.len());
        let mut index = HashMap::with_capacity(layout.len());
        for (name, alloc) in &layout.allocation {
            index.insert(name.clone(), names.len());
            names.push(name.clone());
            regions.push(alloc.range());
        }
        Ok(Self {
            data: vec![0.0; layout.total_size],
            names,
            regions,
            index,
        })
    }

    pub fn total_size(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn handle(&self, name: &str) -> Option<Handle> {
        self.index.get(name).copied()
    }

    pub fn name(&self, handle: Handle) -> &str {
        &self.names[handle]
    }

    /// Whole backing buffer.
    pub fn raw(&self) -> &[f32] {
        &self.data
    }

    pub fn view(&self, handle: Handle) -> &[f32] {
        &self.data[self.regions[handle].clone()]
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.handle(name).map(|handle| self.view(handle))
    }

    /// All views, indexed by handle.
    pub fn views(&self) -> Vec<&[f32]> {
        self.regions
            .iter()
            .map(|range| &self.data[range.clone()])
            .collect()
    }

    /// Copy a decoded flat sequence into the backing buffer.
    pub fn fill(&mut self, decoded: &[f32]) -> Result<()> {
        if decoded.len() != self.data.len() {
            return Err(RunnerError::Decode(format!(
                "decoded {} values, weight total_size is {}",
                decoded.len(),
                self.data.len()
            ))
            .into());
        }
        self.data.copy_from_slice(decoded);
        Ok(())
    }
}

/// One independently allocated, zero-initialized buffer per variable.
///
/// Offsets in the variable table only have to fit `total_size`; regions
/// may overlap because no two variables share storage.
#[derive(Debug, Clone)]
pub struct VariableArena {
    buffers: Vec<Vec<f32>>,
    names: Vec<String>,
    index: HashMap<String, Handle>,
}

impl VariableArena {
    pub fn allocate(layout: &LayoutTable) -> Result<Self> {
        layout.validate_bounds("variable")?;
        let mut buffers = Vec::with_capacity(layout.len());
        let mut names = Vec::with_capacity(layout.len());
        let mut index = HashMap::with_capacity(layout.len());
        for (name, alloc) in &layout.allocation {
            index.insert(name.clone(), names.len());
            names.push(name.clone());
            buffers.push(vec![0.0; alloc.size]);
        }
        Ok(Self {
            buffers,
            names,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn handle(&self, name: &str) -> Option<Handle> {
        self.index.get(name).copied()
    }

    pub fn name(&self, handle: Handle) -> &str {
        &self.names[handle]
    }

    pub fn buffer(&self, handle: Handle) -> &[f32] {
        &self.buffers[handle]
    }

    pub fn buffer_mut(&mut self, handle: Handle) -> &mut [f32] {
        &mut self.buffers[handle]
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.handle(name).map(|handle| self.buffer(handle))
    }

    /// Shared, writable views over every variable, indexed by handle.
    ///
    /// The same handle may be picked any number of times; all copies observe
    /// each other's writes.
    pub fn views(&mut self) -> Vec<TensorView<'_>> {
        self.buffers
            .iter_mut()
            .zip(&self.names)
            .map(|(buffer, name)| {
                TensorView::new(name, Cell::from_mut(buffer.as_mut_slice()).as_slice_of_cells())
            })
            .collect()
    }
}
