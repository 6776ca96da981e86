use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::Mmap;

use crate::descriptor::Descriptor;
use crate::kernel::KernelLoader;
use crate::runtime::Runner;

/// A model directory holding `graph_{backend}.json` and, optionally,
/// `weight_{backend}.bin`.
///
/// The weight file is memory-mapped and handed to the runner as is.
#[derive(Debug)]
pub struct ModelLoader {
    dir: PathBuf,
    backend: String,
    descriptor: Descriptor,
    weights: Option<Mmap>,
}

impl ModelLoader {
    pub fn open(dir: impl AsRef<Path>, backend: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let descriptor = Descriptor::from_path(dir.join(graph_file_name(backend)))?;
        let weight_path = dir.join(weight_file_name(backend));
        let weights = if weight_path.exists() {
            map_weights(&weight_path)?
        } else {
            crate::warning!("no weight file at {}", weight_path.display());
            None
        };
        Ok(Self {
            dir,
            backend: backend.to_string(),
            descriptor,
            weights,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Raw encoded weight bytes; empty when the model has no weight file.
    pub fn weight_bytes(&self) -> &[u8] {
        self.weights.as_deref().unwrap_or(&[])
    }

    /// Build a runner for this model's descriptor.
    pub fn runner(&self, loader: impl KernelLoader + 'static) -> Runner {
        Runner::new(self.descriptor.clone(), loader)
    }
}

pub fn graph_file_name(backend: &str) -> String {
    format!("graph_{backend}.json")
}

pub fn weight_file_name(backend: &str) -> String {
    format!("weight_{backend}.bin")
}

fn map_weights(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path).with_context(|| format!("open weight file {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("stat weight file {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(None);
    }
    // The mapping is read-only and lives as long as the loader.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("mmap weight file {}", path.display()))?;
    Ok(Some(mmap))
}
