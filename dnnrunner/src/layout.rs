use std::collections::BTreeMap;
use std::ops::Range;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

/// One named region of a flat buffer, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub offset: usize,
    pub size: usize,
}

impl Allocation {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// Named partition of a flat buffer into offset/size regions.
///
/// Entries are kept in a sorted map so that handle assignment during
/// compilation is deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTable {
    pub total_size: usize,
    #[serde(default)]
    pub allocation: BTreeMap<String, Allocation>,
}

impl LayoutTable {
    pub fn new(total_size: usize) -> Self {
        Self {
            total_size,
            allocation: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, offset: usize, size: usize) -> Self {
        self.insert(name, offset, size);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, offset: usize, size: usize) {
        self.allocation
            .insert(name.into(), Allocation { offset, size });
    }

    pub fn get(&self, name: &str) -> Option<&Allocation> {
        self.allocation.get(name)
    }

    pub fn len(&self) -> usize {
        self.allocation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocation.is_empty()
    }

    /// Check that every region lies inside `[0, total_size)`.
    pub fn validate_bounds(&self, table: &str) -> Result<()> {
        self.regions(table).map(|_| ())
    }

    /// Bounds check plus disjointness: no two regions share an element.
    /// Zero-sized regions never overlap.
    pub fn validate(&self, table: &str) -> Result<()> {
        let mut ranges = self.regions(table)?;
        ranges.retain(|(start, end, _)| start < end);
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            let (_, prev_end, prev_name) = pair[0];
            let (start, _, name) = pair[1];
            if start < prev_end {
                return Err(
                    RunnerError::layout(table, format!("{prev_name} overlaps {name}")).into(),
                );
            }
        }
        Ok(())
    }

    fn regions(&self, table: &str) -> Result<Vec<(usize, usize, &str)>> {
        let mut ranges = Vec::with_capacity(self.allocation.len());
        for (name, alloc) in &self.allocation {
            let end = alloc.offset.checked_add(alloc.size).ok_or_else(|| {
                RunnerError::layout(table, format!("{name}: offset + size overflows"))
            })?;
            if end > self.total_size {
                return Err(RunnerError::layout(
                    table,
                    format!(
                        "{name}: region {}..{} exceeds total_size {}",
                        alloc.offset, end, self.total_size
                    ),
                )
                .into());
            }
            ranges.push((alloc.offset, end, name.as_str()));
        }
        Ok(ranges)
    }
}
