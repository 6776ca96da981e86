#[doc(hidden)]
pub mod logging;

mod buffer;
mod decoder;
mod descriptor;
mod error;
mod kernel;
mod layout;
mod macros;
mod model_loader;
mod options;
mod runtime;

#[doc(hidden)]
pub use anyhow;

pub use buffer::{Handle, TensorView, VariableArena, WeightArena};
pub use decoder::{decoder_for, DecoderRegistry, RawF32Decoder, WeightDecoder};
pub use descriptor::{CallOption, Descriptor, ExecInfo};
pub use error::RunnerError;
pub use kernel::{kernel, KernelArgs, KernelFn, KernelLoader, KernelRegistry, StaticKernelLoader};
pub use layout::{Allocation, LayoutTable};
pub use model_loader::{graph_file_name, weight_file_name, ModelLoader};
pub use options::RunnerOptions;
pub use runtime::{Execution, LogProgress, Progress, ProgressSink, Runner, StepOutcome, TraceEvent};
