use std::time::{Duration, Instant};

use anyhow::Result;
use uuid::Uuid;

use crate::buffer::TensorView;
use crate::descriptor::ExecInfo;
use crate::error::RunnerError;
use crate::kernel::{KernelArgs, KernelRegistry};
use crate::logging::{self, RunScope};

use super::program::Program;
use super::progress::{Progress, ProgressClock};
use super::trace::{format_trace_timing, TraceEvent, TraceTiming};

/// Result of advancing an [`Execution`] by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction ran to completion.
    Executed,
    /// A progress interval elapsed; the host should pause before the next
    /// step. No instruction ran.
    Yield(Progress),
    /// Every instruction has run. Returned once.
    Finished(Progress),
}

/// One pass over the instruction list.
///
/// Instructions run strictly in descriptor order, each to completion before
/// the next one is dispatched.
pub struct Execution<'r> {
    program: &'r Program,
    exec_infos: &'r [ExecInfo],
    kernels: &'r KernelRegistry,
    weights: Vec<&'r [f32]>,
    variables: Vec<TensorView<'r>>,
    clock: ProgressClock,
    pos: usize,
    reported_at: Option<usize>,
    finished: bool,
    trace: Option<&'r mut Vec<TraceEvent>>,
    timer_enabled: bool,
    run_id: Uuid,
    _log_scope: RunScope,
}

impl<'r> Execution<'r> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        program: &'r Program,
        exec_infos: &'r [ExecInfo],
        kernels: &'r KernelRegistry,
        weights: Vec<&'r [f32]>,
        variables: Vec<TensorView<'r>>,
        progress_interval: Duration,
        trace: Option<&'r mut Vec<TraceEvent>>,
        timer_enabled: bool,
    ) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            program,
            exec_infos,
            kernels,
            weights,
            variables,
            clock: ProgressClock::start(progress_interval),
            pos: 0,
            reported_at: None,
            finished: false,
            trace,
            timer_enabled,
            run_id,
            _log_scope: logging::enter_run(&run_id),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Index of the next instruction to dispatch.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn total(&self) -> usize {
        self.program.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.finished {
            return Err(anyhow::anyhow!("execution has finished running"));
        }
        let total = self.program.len();
        if self.pos == total {
            self.finished = true;
            return Ok(StepOutcome::Finished(self.clock.finish(total)));
        }
        if self.reported_at != Some(self.pos) {
            if let Some(progress) = self.clock.poll(self.pos, total) {
                self.reported_at = Some(self.pos);
                return Ok(StepOutcome::Yield(progress));
            }
        }
        let index = self.pos;
        logging::set_instruction(Some(index));
        let dispatched = self.dispatch(index).map_err(|err| {
            crate::error!("instruction {} failed: {:#}", index, err);
            err
        });
        logging::set_instruction(None);
        dispatched?;
        self.pos += 1;
        Ok(StepOutcome::Executed)
    }

    fn dispatch(&mut self, index: usize) -> Result<()> {
        let step = self.program.step(index);
        let info = &self.exec_infos[index];

        let inputs = step
            .inputs
            .iter()
            .map(|slot| slot.handle("input", index).map(|handle| self.variables[handle]))
            .collect::<Result<Vec<_>>>()?;
        let outputs = step
            .outputs
            .iter()
            .map(|slot| slot.handle("output", index).map(|handle| self.variables[handle]))
            .collect::<Result<Vec<_>>>()?;
        let weights = step
            .weights
            .iter()
            .map(|slot| slot.handle("weight", index).map(|handle| self.weights[handle]))
            .collect::<Result<Vec<_>>>()?;
        let kernel = step
            .kernel
            .map(|handle| self.kernels.entry(handle))
            .ok_or_else(|| RunnerError::MissingEntryPoint {
                name: info.entry_func_name.clone(),
                index,
            })?;

        crate::trace!(
            "dispatch {} {}({}) >> {}",
            index,
            info.entry_func_name,
            info.inputs.join(","),
            info.outputs.join(",")
        );
        let args = KernelArgs {
            inputs: &inputs,
            outputs: &outputs,
            weights: &weights,
            option: &info.call_option,
        };
        let timing = if self.timer_enabled {
            let start = Instant::now();
            (**kernel)(&args)?;
            format_trace_timing(start.elapsed())
        } else {
            (**kernel)(&args)?;
            TraceTiming::default()
        };

        if let Some(events) = self.trace.as_deref_mut() {
            events.push(TraceEvent {
                run_id: self.run_id,
                index,
                entry_func_name: info.entry_func_name.clone(),
                inputs: info.inputs.clone(),
                outputs: info.outputs.clone(),
                weights: info.weights.clone(),
                micros: timing.micros,
                micros_parts: timing.micros_parts,
            });
        }
        Ok(())
    }
}
