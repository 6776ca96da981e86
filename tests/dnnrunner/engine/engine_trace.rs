use std::sync::{Arc, Mutex};

use anyhow::Result;
use dnnrunner::{logging, Descriptor, ExecInfo, KernelArgs, Runner, StepOutcome};

use crate::common;

fn loaded_runner(configure: impl FnOnce(Runner) -> Runner) -> Result<Runner> {
    let runner = Runner::new(common::bias_scale_descriptor(), common::linked_kernels())
        .with_options(common::quiet_options());
    let mut runner = configure(runner);
    runner.compile()?;
    runner.load_weights(&common::raw_bytes(&[0.0; 8]))?;
    Ok(runner)
}

#[test]
fn trace_is_off_by_default() -> Result<()> {
    let mut runner = loaded_runner(|runner| runner)?;
    runner.run()?;
    assert!(runner.trace_events().is_empty());
    Ok(())
}

#[test]
fn trace_records_one_event_per_instruction() -> Result<()> {
    let mut runner = loaded_runner(|runner| runner.with_trace().with_timer())?;
    runner.run()?;
    let events = runner.trace_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].index, 0);
    assert_eq!(events[0].entry_func_name, "add_bias");
    assert_eq!(events[0].weights, vec!["b".to_string()]);
    assert_eq!(events[1].entry_func_name, "scale");
    assert_eq!(events[1].inputs, vec!["h".to_string()]);
    assert_eq!(events[1].outputs, vec!["y".to_string()]);
    assert_eq!(events[0].run_id, events[1].run_id);
    assert!(events[0].micros.ends_with("ns"), "{}", events[0].micros);
    Ok(())
}

#[test]
fn each_run_replaces_the_trace() -> Result<()> {
    let mut runner = loaded_runner(Runner::with_trace)?;
    runner.run()?;
    let first = runner.trace_events()[0].run_id;
    runner.run()?;
    assert_eq!(runner.trace_events().len(), 2);
    assert_ne!(runner.trace_events()[0].run_id, first);
    Ok(())
}

#[test]
fn trace_events_serialize_to_json() -> Result<()> {
    let mut runner = loaded_runner(Runner::with_trace)?;
    runner.run()?;
    let value = serde_json::to_value(runner.trace_events())?;
    let first = &value[0];
    assert_eq!(first["entry_func_name"], "add_bias");
    assert_eq!(first["index"], 0);
    assert_eq!(first["inputs"], serde_json::json!(["x"]));
    assert_eq!(first["micros"], serde_json::json!([0, 0, 0]));
    assert!(first["run_id"].is_string());
    Ok(())
}

#[test]
fn execution_run_id_matches_trace_events() -> Result<()> {
    let mut runner = loaded_runner(Runner::with_trace)?;
    let mut execution = runner.start()?;
    let run_id = execution.run_id();
    while !matches!(execution.step()?, StepOutcome::Finished(_)) {}
    drop(execution);
    assert_eq!(runner.trace_events().len(), 2);
    assert!(runner.trace_events().iter().all(|event| event.run_id == run_id));
    Ok(())
}

#[test]
fn log_context_names_run_and_instruction() -> Result<()> {
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let loader = common::linked_kernels().with("noop", move |_args: &KernelArgs<'_>| {
        record
            .lock()
            .expect("label log poisoned")
            .push(logging::context_label());
        Ok(())
    });
    let descriptor = Descriptor {
        exec_infos: vec![ExecInfo::new("noop"), ExecInfo::new("noop")],
        ..Descriptor::default()
    };
    let mut runner = Runner::new(descriptor, loader)
        .with_options(common::quiet_options())
        .with_trace();
    runner.compile()?;
    assert!(logging::context_label().is_none());
    runner.run()?;
    assert!(logging::context_label().is_none());

    let run = runner.trace_events()[0].run_id.as_fields().0;
    let seen = seen.lock().expect("label log poisoned").clone();
    assert_eq!(
        seen,
        vec![
            Some(format!("run {run:08x} #0")),
            Some(format!("run {run:08x} #1")),
        ]
    );
    Ok(())
}
