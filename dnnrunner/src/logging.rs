use std::cell::Cell;
use std::env;
use std::fmt::Arguments;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

#[derive(Clone, Copy)]
enum TraceLevel {
    Off,
    Basic,
    Full,
}

const COLOR_WARNING: &str = "33";
const COLOR_ERROR: &str = "91";
const COLOR_TRACE: &str = "34";

static TRACE_LEVEL: OnceLock<TraceLevel> = OnceLock::new();

#[derive(Clone, Copy)]
struct RunContext {
    run: u32,
    instruction: Option<usize>,
}

thread_local! {
    static RUN_CONTEXT: Cell<Option<RunContext>> = const { Cell::new(None) };
}

/// Tags log lines emitted on this thread with a run id until dropped.
pub(crate) struct RunScope {
    previous: Option<RunContext>,
}

pub(crate) fn enter_run(run_id: &Uuid) -> RunScope {
    let context = RunContext {
        run: run_id.as_fields().0,
        instruction: None,
    };
    RunScope {
        previous: RUN_CONTEXT.with(|cell| cell.replace(Some(context))),
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        RUN_CONTEXT.with(|cell| cell.set(self.previous));
    }
}

/// Record the instruction being dispatched in the current run context.
pub(crate) fn set_instruction(index: Option<usize>) {
    RUN_CONTEXT.with(|cell| {
        if let Some(mut context) = cell.get() {
            context.instruction = index;
            cell.set(Some(context));
        }
    });
}

/// `run 1a2b3c4d #12` while a run is active on this thread.
pub fn context_label() -> Option<String> {
    RUN_CONTEXT.with(Cell::get).map(|context| match context.instruction {
        Some(index) => format!("run {:08x} #{}", context.run, index),
        None => format!("run {:08x}", context.run),
    })
}

fn parse_trace_level(value: &str) -> TraceLevel {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" => TraceLevel::Basic,
        "full" => TraceLevel::Full,
        _ => TraceLevel::Off,
    }
}

fn trace_level() -> TraceLevel {
    *TRACE_LEVEL.get_or_init(|| {
        env::var("DNNRUNNER_TRACE")
            .ok()
            .as_deref()
            .map(parse_trace_level)
            .unwrap_or(TraceLevel::Off)
    })
}

fn trace_full_enabled() -> bool {
    matches!(trace_level(), TraceLevel::Full)
}

fn trace_basic_enabled() -> bool {
    matches!(trace_level(), TraceLevel::Full | TraceLevel::Basic)
}

fn timestamp_hms() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3_600,
        (secs % 3_600) / 60,
        secs % 60
    )
}

fn emit(kind: &str, color: &str, args: Arguments) {
    let ts = timestamp_hms();
    match context_label() {
        Some(label) => println!("{ts} [\u{001b}[{color}m{kind}\u{001b}[0m] {label} -- {args}"),
        None => println!("{ts} [\u{001b}[{color}m{kind}\u{001b}[0m] -- {args}"),
    }
}

/// Emit a warning message when trace level is `full`.
pub fn emit_warning(args: Arguments) {
    if trace_full_enabled() {
        emit("WARNING", COLOR_WARNING, args);
    }
}

/// Emit an error message when tracing is enabled.
pub fn emit_error(args: Arguments) {
    if trace_basic_enabled() {
        emit("ERROR", COLOR_ERROR, args);
    }
}

/// Emit a trace message when tracing is enabled.
pub fn emit_trace(args: Arguments) {
    if trace_basic_enabled() {
        emit("TRACE", COLOR_TRACE, args);
    }
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {
        $crate::logging::emit_warning(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::emit_error(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::logging::emit_trace(format_args!($($arg)*))
    };
}

/// Emit a raw log line using `println!`.
#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        println!($($arg)*)
    };
}
