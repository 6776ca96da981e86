mod engine;
mod program;
mod progress;
mod runner;
mod trace;

pub use engine::{Execution, StepOutcome};
pub use progress::{LogProgress, Progress, ProgressSink};
pub use runner::Runner;
pub use trace::TraceEvent;
