use anyhow::Result;

use crate::buffer::{Handle, VariableArena, WeightArena};
use crate::descriptor::ExecInfo;
use crate::error::RunnerError;
use crate::kernel::KernelRegistry;

/// A view reference after name resolution.
///
/// Unknown names are kept rather than rejected so that the failure surfaces
/// when the instruction is reached, after every earlier instruction ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot {
    Bound(Handle),
    Unresolved(String),
}

impl Slot {
    fn bind(name: &str, handle: Option<Handle>) -> Self {
        match handle {
            Some(handle) => Slot::Bound(handle),
            None => Slot::Unresolved(name.to_string()),
        }
    }

    pub(crate) fn handle(&self, role: &'static str, index: usize) -> Result<Handle> {
        match self {
            Slot::Bound(handle) => Ok(*handle),
            Slot::Unresolved(name) => Err(RunnerError::UnresolvedReference {
                role,
                name: name.clone(),
                index: Some(index),
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub kernel: Option<usize>,
    pub inputs: Vec<Slot>,
    pub outputs: Vec<Slot>,
    pub weights: Vec<Slot>,
}

/// Instruction list with every name replaced by an arena or registry handle.
#[derive(Debug, Clone, Default)]
pub(crate) struct Program {
    steps: Vec<Step>,
}

impl Program {
    pub(crate) fn link(
        exec_infos: &[ExecInfo],
        weights: &WeightArena,
        variables: &VariableArena,
        kernels: &KernelRegistry,
    ) -> Self {
        let steps = exec_infos
            .iter()
            .enumerate()
            .map(|(index, info)| {
                let kernel = kernels.handle(&info.entry_func_name);
                if kernel.is_none() {
                    crate::warning!(
                        "instruction {} calls unknown entry point {}",
                        index,
                        info.entry_func_name
                    );
                }
                Step {
                    kernel,
                    inputs: link_names(index, "input", &info.inputs, |name| variables.handle(name)),
                    outputs: link_names(index, "output", &info.outputs, |name| {
                        variables.handle(name)
                    }),
                    weights: link_names(index, "weight", &info.weights, |name| weights.handle(name)),
                }
            })
            .collect();
        Self { steps }
    }

    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn step(&self, index: usize) -> &Step {
        &self.steps[index]
    }
}

fn link_names<F>(index: usize, role: &str, names: &[String], lookup: F) -> Vec<Slot>
where
    F: Fn(&str) -> Option<Handle>,
{
    names
        .iter()
        .map(|name| {
            let slot = Slot::bind(name, lookup(name));
            if let Slot::Unresolved(name) = &slot {
                crate::warning!("instruction {} references unknown {} {}", index, role, name);
            }
            slot
        })
        .collect()
}

/// Resolve declared input/output names; these must all exist at compile time.
pub(crate) fn resolve_declared(
    role: &'static str,
    names: &[String],
    variables: &VariableArena,
) -> Result<Vec<Handle>> {
    names
        .iter()
        .map(|name| {
            variables.handle(name).ok_or_else(|| {
                RunnerError::UnresolvedReference {
                    role,
                    name: name.clone(),
                    index: None,
                }
                .into()
            })
        })
        .collect()
}
