use std::time::Duration;

use serde::ser::{SerializeStruct, Serializer};
use uuid::Uuid;

/// Execution record for a single dispatched instruction.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub run_id: Uuid,
    pub index: usize,
    pub entry_func_name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub weights: Vec<String>,
    pub micros: String,
    pub micros_parts: [u64; 3],
}

impl serde::Serialize for TraceEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("TraceEvent", 7)?;
        state.serialize_field("run_id", &self.run_id)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("entry_func_name", &self.entry_func_name)?;
        state.serialize_field("inputs", &self.inputs)?;
        state.serialize_field("outputs", &self.outputs)?;
        state.serialize_field("weights", &self.weights)?;
        state.serialize_field("micros", &self.micros_parts)?;
        state.end()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TraceTiming {
    pub micros: String,
    pub micros_parts: [u64; 3],
}

pub(crate) fn format_trace_timing(duration: Duration) -> TraceTiming {
    let total_ns = duration.as_nanos();
    let ms = (total_ns / 1_000_000) as u64;
    let us = ((total_ns / 1_000) % 1_000) as u64;
    let ns = (total_ns % 1_000) as u64;
    TraceTiming {
        micros: format!("{ms}ms {us}us {ns}ns"),
        micros_parts: [ms, us, ns],
    }
}
