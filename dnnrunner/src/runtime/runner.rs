use std::fmt;
use std::thread;

use anyhow::{anyhow, Result};

use crate::buffer::{Handle, TensorView, VariableArena, WeightArena};
use crate::decoder::{decoder_for, DecoderRegistry, WeightDecoder};
use crate::descriptor::Descriptor;
use crate::error::RunnerError;
use crate::kernel::{KernelLoader, KernelRegistry};
use crate::model_loader::ModelLoader;
use crate::options::RunnerOptions;

use super::engine::{Execution, StepOutcome};
use super::program::{resolve_declared, Program};
use super::progress::{LogProgress, ProgressSink};
use super::trace::TraceEvent;

struct Compiled {
    weights: WeightArena,
    variables: VariableArena,
    kernels: KernelRegistry,
    program: Program,
    inputs: Vec<Handle>,
    outputs: Vec<Handle>,
}

/// Owns the buffers and kernels for one descriptor and executes it.
///
/// Lifecycle: [`Runner::compile`] once, [`Runner::load_weights`] at most
/// once, then [`Runner::run`] any number of times. After an error the
/// runner should be discarded.
pub struct Runner {
    descriptor: Descriptor,
    loader: Box<dyn KernelLoader>,
    decoders: Option<DecoderRegistry>,
    options: RunnerOptions,
    progress: Box<dyn ProgressSink>,
    compiled: Option<Compiled>,
    weights_loaded: bool,
    trace_events: Vec<TraceEvent>,
}

impl Runner {
    pub fn new(descriptor: Descriptor, loader: impl KernelLoader + 'static) -> Self {
        Self {
            descriptor,
            loader: Box::new(loader),
            decoders: None,
            options: RunnerOptions::default(),
            progress: Box::new(LogProgress),
            compiled: None,
            weights_loaded: false,
            trace_events: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_trace(mut self) -> Self {
        self.options.trace_events = true;
        self
    }

    pub fn with_timer(mut self) -> Self {
        self.options.timer = true;
        self
    }

    pub fn with_progress_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    /// Use `decoders` instead of the builtin registry for weight loading.
    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = Some(decoders);
        self
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn weights_loaded(&self) -> bool {
        self.weights_loaded
    }

    /// Materialize kernels, allocate buffers and link the instruction list.
    pub fn compile(&mut self) -> Result<()> {
        if self.compiled.is_some() {
            return Err(RunnerError::AlreadyCompiled.into());
        }
        let descriptor = &self.descriptor;
        let kernels = self.loader.materialize(&descriptor.kernel_source)?;
        let weights = WeightArena::allocate(&descriptor.weight_allocation)?;
        let variables = VariableArena::allocate(&descriptor.variable_allocation)?;
        let inputs = resolve_declared("input", &descriptor.inputs, &variables)?;
        let outputs = resolve_declared("output", &descriptor.outputs, &variables)?;
        let program = Program::link(&descriptor.exec_infos, &weights, &variables, &kernels);
        crate::trace!(
            "compiled {} instructions, {} kernels, {} weights ({} values), {} variables",
            program.len(),
            kernels.len(),
            weights.len(),
            weights.total_size(),
            variables.len()
        );
        self.compiled = Some(Compiled {
            weights,
            variables,
            kernels,
            program,
            inputs,
            outputs,
        });
        Ok(())
    }

    /// Decode `bytes` with the descriptor's weight encoding into the weight
    /// arena.
    pub fn load_weights(&mut self, bytes: &[u8]) -> Result<()> {
        let compiled = self.compiled.as_mut().ok_or(RunnerError::NotCompiled)?;
        if self.weights_loaded {
            return Err(RunnerError::AlreadyLoaded.into());
        }
        let encoding = self.descriptor.weight_encoding.as_str();
        let decoder: &dyn WeightDecoder = match &self.decoders {
            Some(registry) => registry.decoder_for(encoding)?,
            None => decoder_for(encoding)?,
        };
        crate::trace!(
            "decoding {} weight bytes with {} decoder",
            bytes.len(),
            encoding
        );
        let decoded = decoder.decode(bytes, &self.descriptor.weight_allocation)?;
        compiled.weights.fill(&decoded)?;
        self.weights_loaded = true;
        Ok(())
    }

    pub fn load_weights_from(&mut self, model: &ModelLoader) -> Result<()> {
        self.load_weights(model.weight_bytes())
    }

    /// Begin a step-wise pass over the instruction list.
    ///
    /// Progress notifications are returned as [`StepOutcome`]s instead of
    /// being delivered to the progress sink.
    pub fn start(&mut self) -> Result<Execution<'_>> {
        self.begin().map(|(execution, _)| execution)
    }

    fn begin(&mut self) -> Result<(Execution<'_>, &mut (dyn ProgressSink + 'static))> {
        let Runner {
            descriptor,
            options,
            progress,
            compiled,
            weights_loaded,
            trace_events,
            ..
        } = self;
        let compiled = compiled.as_mut().ok_or(RunnerError::NotCompiled)?;
        if !*weights_loaded && compiled.weights.total_size() > 0 {
            crate::warning!("running before weights were loaded; weights read as zero");
        }
        trace_events.clear();
        let trace = if options.trace_events {
            Some(trace_events)
        } else {
            None
        };
        let execution = Execution::new(
            &compiled.program,
            &descriptor.exec_infos,
            &compiled.kernels,
            compiled.weights.views(),
            compiled.variables.views(),
            options.progress_interval(),
            trace,
            options.timer,
        );
        Ok((execution, &mut **progress))
    }

    /// Execute every instruction in order, pausing the calling thread for
    /// `yield_interval_ms` after each progress notification.
    pub fn run(&mut self) -> Result<()> {
        let pause = self.options.yield_interval();
        let (mut execution, sink) = self.begin()?;
        loop {
            match execution.step()? {
                StepOutcome::Executed => {}
                StepOutcome::Yield(progress) => {
                    sink.report(&progress);
                    if !pause.is_zero() {
                        thread::sleep(pause);
                    }
                }
                StepOutcome::Finished(progress) => {
                    sink.report(&progress);
                    return Ok(());
                }
            }
        }
    }

    /// Like [`Runner::run`], but suspends the task instead of the thread so
    /// other tasks on a cooperative scheduler keep running.
    ///
    /// The future borrows `Cell`-backed tensor views and is therefore not
    /// `Send`: await it in place, or on a `LocalSet` / current-thread
    /// runtime, rather than passing it to `tokio::spawn`.
    #[cfg(feature = "async")]
    pub async fn run_async(&mut self) -> Result<()> {
        let pause = self.options.yield_interval();
        let (mut execution, sink) = self.begin()?;
        loop {
            match execution.step()? {
                StepOutcome::Executed => {}
                StepOutcome::Yield(progress) => {
                    sink.report(&progress);
                    if pause.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(pause).await;
                    }
                }
                StepOutcome::Finished(progress) => {
                    sink.report(&progress);
                    return Ok(());
                }
            }
        }
    }

    /// Views of the declared input tensors, in declared order.
    pub fn input_views(&mut self) -> Result<Vec<TensorView<'_>>> {
        let compiled = self.compiled.as_mut().ok_or(RunnerError::NotCompiled)?;
        let views = compiled.variables.views();
        Ok(compiled.inputs.iter().map(|&handle| views[handle]).collect())
    }

    /// Views of the declared output tensors, in declared order.
    pub fn output_views(&mut self) -> Result<Vec<TensorView<'_>>> {
        let compiled = self.compiled.as_mut().ok_or(RunnerError::NotCompiled)?;
        let views = compiled.variables.views();
        Ok(compiled.outputs.iter().map(|&handle| views[handle]).collect())
    }

    /// Read-only access to a variable buffer by name.
    pub fn variable(&self, name: &str) -> Result<&[f32]> {
        let compiled = self.compiled.as_ref().ok_or(RunnerError::NotCompiled)?;
        compiled.variables.get(name).ok_or_else(|| {
            RunnerError::UnresolvedReference {
                role: "variable",
                name: name.to_string(),
                index: None,
            }
            .into()
        })
    }

    /// Read-only access to a weight view by name.
    pub fn weight(&self, name: &str) -> Result<&[f32]> {
        let compiled = self.compiled.as_ref().ok_or(RunnerError::NotCompiled)?;
        compiled.weights.get(name).ok_or_else(|| {
            RunnerError::UnresolvedReference {
                role: "weight",
                name: name.to_string(),
                index: None,
            }
            .into()
        })
    }

    /// Copy `data` into the variable `name`.
    pub fn set_input(&mut self, name: &str, data: &[f32]) -> Result<()> {
        let compiled = self.compiled.as_mut().ok_or(RunnerError::NotCompiled)?;
        let handle = compiled
            .variables
            .handle(name)
            .ok_or_else(|| RunnerError::UnresolvedReference {
                role: "variable",
                name: name.to_string(),
                index: None,
            })?;
        let buffer = compiled.variables.buffer_mut(handle);
        if buffer.len() != data.len() {
            return Err(anyhow!(
                "variable {} holds {} values, got {}",
                name,
                buffer.len(),
                data.len()
            ));
        }
        buffer.copy_from_slice(data);
        Ok(())
    }

    /// Trace events recorded by the most recent run.
    pub fn trace_events(&self) -> &[TraceEvent] {
        &self.trace_events
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("instructions", &self.descriptor.exec_infos.len())
            .field("weight_encoding", &self.descriptor.weight_encoding)
            .field("compiled", &self.compiled.is_some())
            .field("weights_loaded", &self.weights_loaded)
            .field("options", &self.options)
            .finish()
    }
}
