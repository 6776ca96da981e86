use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::buffer::TensorView;
use crate::descriptor::CallOption;
use crate::error::RunnerError;

/// Views and configuration handed to a kernel for one instruction.
pub struct KernelArgs<'a> {
    pub inputs: &'a [TensorView<'a>],
    pub outputs: &'a [TensorView<'a>],
    pub weights: &'a [&'a [f32]],
    pub option: &'a CallOption,
}

impl<'a> KernelArgs<'a> {
    pub fn input(&self, index: usize) -> Result<TensorView<'a>> {
        self.inputs
            .get(index)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("kernel expects input {}", index))
    }

    pub fn output(&self, index: usize) -> Result<TensorView<'a>> {
        self.outputs
            .get(index)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("kernel expects output {}", index))
    }

    pub fn weight(&self, index: usize) -> Result<&'a [f32]> {
        self.weights
            .get(index)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("kernel expects weight {}", index))
    }
}

/// Callable entry point for one instruction.
pub type KernelFn = Arc<dyn Fn(&KernelArgs<'_>) -> Result<()> + Send + Sync>;

/// Wrap a closure as a [`KernelFn`].
pub fn kernel<F>(func: F) -> KernelFn
where
    F: Fn(&KernelArgs<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(func)
}

/// Materialized entry points, addressable by name or by handle.
#[derive(Clone, Default)]
pub struct KernelRegistry {
    entries: Vec<KernelFn>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, func: KernelFn) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&slot) => self.entries[slot] = func,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(func);
                self.names.push(name);
            }
        }
    }

    pub fn handle(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&KernelFn> {
        self.handle(name).map(|slot| &self.entries[slot])
    }

    pub fn entry(&self, handle: usize) -> &KernelFn {
        &self.entries[handle]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("entries", &self.names)
            .finish()
    }
}

/// Produces entry points from a descriptor's kernel source.
///
/// The runner only depends on this interface; how the source turns into
/// callables (static linking, an interpreter, a shared library) is up to the
/// implementation.
pub trait KernelLoader: Send + Sync {
    fn materialize(&self, kernel_source: &str) -> Result<KernelRegistry>;
}

/// Kernels linked into the binary at build time.
///
/// The kernel source is a link manifest. An empty source exposes every
/// linked symbol under its own name; otherwise it must be a JSON object
/// mapping entry point names to linked symbols.
#[derive(Clone, Default)]
pub struct StaticKernelLoader {
    symbols: HashMap<String, KernelFn>,
}

impl StaticKernelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, symbol: impl Into<String>, func: KernelFn) {
        self.symbols.insert(symbol.into(), func);
    }

    pub fn with<F>(mut self, symbol: impl Into<String>, func: F) -> Self
    where
        F: Fn(&KernelArgs<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.link(symbol, kernel(func));
        self
    }

    fn resolve(&self, symbol: &str) -> Result<KernelFn> {
        self.symbols.get(symbol).cloned().ok_or_else(|| {
            RunnerError::KernelCompilation(format!("undefined kernel symbol {}", symbol)).into()
        })
    }
}

impl KernelLoader for StaticKernelLoader {
    fn materialize(&self, kernel_source: &str) -> Result<KernelRegistry> {
        let mut registry = KernelRegistry::new();
        if kernel_source.trim().is_empty() {
            let mut symbols = self.symbols.keys().collect::<Vec<_>>();
            symbols.sort_unstable();
            for symbol in symbols {
                registry.insert(symbol.clone(), self.resolve(symbol)?);
            }
            return Ok(registry);
        }
        let manifest: BTreeMap<String, String> = serde_json::from_str(kernel_source)
            .map_err(|err| {
                RunnerError::KernelCompilation(format!("invalid kernel manifest: {}", err))
            })?;
        for (entry, symbol) in manifest {
            registry.insert(entry, self.resolve(&symbol)?);
        }
        Ok(registry)
    }
}

impl fmt::Debug for StaticKernelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symbols = self.symbols.keys().collect::<Vec<_>>();
        symbols.sort_unstable();
        f.debug_struct("StaticKernelLoader")
            .field("symbols", &symbols)
            .finish()
    }
}
