use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::LayoutTable;

/// Kernel-specific configuration carried by an instruction.
///
/// The runner never interprets it; kernels read it back in whatever shape
/// they were generated with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallOption(Value);

impl CallOption {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.0.clone()).with_context(|| "decode call option")
    }
}

impl From<Value> for CallOption {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One step of the instruction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecInfo {
    pub entry_func_name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub weights: Vec<String>,
    #[serde(default)]
    pub call_option: CallOption,
}

impl ExecInfo {
    pub fn new(entry_func_name: impl Into<String>) -> Self {
        Self {
            entry_func_name: entry_func_name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            weights: Vec::new(),
            call_option: CallOption::default(),
        }
    }

    pub fn inputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn outputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn weights<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.weights = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn call_option(mut self, option: impl Into<CallOption>) -> Self {
        self.call_option = option.into();
        self
    }
}

/// Immutable description of a compiled inference graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub kernel_source: String,
    #[serde(default)]
    pub exec_infos: Vec<ExecInfo>,
    #[serde(default)]
    pub weight_allocation: LayoutTable,
    #[serde(default)]
    pub variable_allocation: LayoutTable,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default = "default_weight_encoding")]
    pub weight_encoding: String,
}

fn default_weight_encoding() -> String {
    "raw".to_string()
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            kernel_source: String::new(),
            exec_infos: Vec::new(),
            weight_allocation: LayoutTable::default(),
            variable_allocation: LayoutTable::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            weight_encoding: default_weight_encoding(),
        }
    }
}

impl Descriptor {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).with_context(|| "parse descriptor json")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read descriptor {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("load descriptor {}", path.display()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "serialize descriptor")
    }
}
