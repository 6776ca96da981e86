use thiserror::Error;

/// Failure kinds raised by the runner.
///
/// Functions return `anyhow::Result`; match on a kind with
/// `err.downcast_ref::<RunnerError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// A layout table region does not fit its buffer or overlaps another.
    #[error("layout error in {table} allocation: {reason}")]
    Layout { table: String, reason: String },
    /// The decoder produced data that does not match the weight layout.
    #[error("weight decode error: {0}")]
    Decode(String),
    /// No decoder is registered for the descriptor's weight encoding.
    #[error("unsupported weight encoding: {0}")]
    UnsupportedEncoding(String),
    /// Kernel source could not be materialized into entry points.
    #[error("kernel compilation failed: {0}")]
    KernelCompilation(String),
    /// An instruction names an entry point the registry does not provide.
    #[error("missing kernel entry point {name} (instruction {index})")]
    MissingEntryPoint { name: String, index: usize },
    /// An instruction or declared tensor names a view that was never allocated.
    #[error("unresolved {role} reference {name}{}", location(.index))]
    UnresolvedReference {
        role: &'static str,
        name: String,
        index: Option<usize>,
    },
    #[error("runner is already compiled")]
    AlreadyCompiled,
    #[error("runner is not compiled")]
    NotCompiled,
    #[error("weights are already loaded")]
    AlreadyLoaded,
}

fn location(index: &Option<usize>) -> String {
    index
        .map(|index| format!(" (instruction {index})"))
        .unwrap_or_default()
}

impl RunnerError {
    pub(crate) fn layout(table: &str, reason: impl Into<String>) -> Self {
        RunnerError::Layout {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}
