use anyhow::Result;
use dnnrunner::{
    fetch_outputs, insert_inputs, try_fetch_output, try_insert_inputs, Descriptor, ExecInfo,
    LayoutTable, Runner,
};

use crate::common;

fn compiled_bias_scale() -> Result<Runner> {
    let mut runner = Runner::new(common::bias_scale_descriptor(), common::linked_kernels())
        .with_options(common::quiet_options());
    runner.compile()?;
    runner.load_weights(&common::raw_bytes(&[
        0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.5, 2.0,
    ]))?;
    Ok(runner)
}

#[test]
fn later_instruction_reads_earlier_output() -> Result<()> {
    let mut runner = compiled_bias_scale()?;
    runner.set_input("x", &[1.0, 2.0, 3.0, 4.0])?;
    runner.run()?;
    assert_eq!(runner.variable("h")?, &[1.5, 3.0, 4.5, 6.0]);
    assert_eq!(runner.variable("y")?, &[3.0, 6.0, 9.0, 12.0]);
    Ok(())
}

#[test]
fn input_views_write_through_to_execution() -> Result<()> {
    let mut runner = compiled_bias_scale()?;
    {
        let inputs = runner.input_views()?;
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name(), "x");
        inputs[0].copy_from_slice(&[-1.0, 0.0, 1.0, 2.0]);
    }
    runner.run()?;
    let outputs = runner.output_views()?;
    assert_eq!(outputs[0].name(), "y");
    assert_eq!(outputs[0].to_vec(), vec![-1.0, 2.0, 5.0, 8.0]);
    Ok(())
}

#[test]
fn output_views_are_stable_between_runs() -> Result<()> {
    let mut runner = compiled_bias_scale()?;
    runner.set_input("x", &[1.0, 1.0, 1.0, 1.0])?;
    runner.run()?;
    let first = runner.output_views()?[0].to_vec();
    let second = runner.output_views()?[0].to_vec();
    assert_eq!(first, second);
    assert_eq!(runner.variable("y")?, first.as_slice());
    Ok(())
}

#[test]
fn rerun_reuses_the_same_buffers() -> Result<()> {
    let descriptor = Descriptor {
        exec_infos: vec![ExecInfo::new("increment").outputs(["counter"])],
        variable_allocation: LayoutTable::new(2).with("counter", 0, 2),
        outputs: vec!["counter".to_string()],
        ..Descriptor::default()
    };
    let mut runner =
        Runner::new(descriptor, common::linked_kernels()).with_options(common::quiet_options());
    runner.compile()?;
    for _ in 0..3 {
        runner.run()?;
    }
    assert_eq!(runner.variable("counter")?, &[3.0, 3.0]);
    Ok(())
}

#[test]
fn same_variable_as_input_and_output() -> Result<()> {
    let descriptor = Descriptor {
        exec_infos: vec![ExecInfo::new("scale")
            .inputs(["v"])
            .outputs(["v"])
            .call_option(serde_json::json!({ "scale": 3.0 }))],
        variable_allocation: LayoutTable::new(3).with("v", 0, 3),
        inputs: vec!["v".to_string()],
        outputs: vec!["v".to_string()],
        ..Descriptor::default()
    };
    let mut runner =
        Runner::new(descriptor, common::linked_kernels()).with_options(common::quiet_options());
    runner.compile()?;
    runner.set_input("v", &[1.0, 2.0, 3.0])?;
    runner.run()?;
    assert_eq!(runner.variable("v")?, &[3.0, 6.0, 9.0]);

    let input = runner.input_views()?[0].to_vec();
    let output = runner.output_views()?[0].to_vec();
    assert_eq!(input, output);
    Ok(())
}

#[test]
fn macros_move_data_in_and_out() -> Result<()> {
    let mut runner = compiled_bias_scale()?;
    let x = vec![0.0, 0.5, 1.0, 1.5];
    insert_inputs!(runner, { x: x });
    runner.run()?;
    fetch_outputs!(runner, { y, h });
    assert_eq!(h, vec![0.5, 1.5, 2.5, 3.5]);
    assert_eq!(y, vec![1.0, 3.0, 5.0, 7.0]);
    Ok(())
}

#[test]
fn fallible_macros_report_unknown_names() -> Result<()> {
    let mut runner = compiled_bias_scale()?;
    let x = vec![0.5, 1.0, 1.5, 2.0];
    try_insert_inputs!(runner, { x: x })?;
    runner.run()?;
    assert_eq!(try_fetch_output!(runner, y)?, vec![2.0, 4.0, 6.0, 8.0]);

    let ghost = vec![1.0];
    assert!(try_insert_inputs!(runner, { x: x, ghost: ghost }).is_err());
    assert!(try_insert_inputs!(runner, { x: ghost }).is_err());
    assert!(try_fetch_output!(runner, logits).is_err());
    Ok(())
}

#[test]
fn kernels_run_in_descriptor_order() -> Result<()> {
    // copy a -> b, then overwrite a; b must hold the value before the overwrite.
    let descriptor = Descriptor {
        exec_infos: vec![
            ExecInfo::new("copy").inputs(["a"]).outputs(["b"]),
            ExecInfo::new("mark").outputs(["a"]),
        ],
        variable_allocation: LayoutTable::new(4).with("a", 0, 2).with("b", 2, 2),
        ..Descriptor::default()
    };
    let mut runner =
        Runner::new(descriptor, common::linked_kernels()).with_options(common::quiet_options());
    runner.compile()?;
    runner.set_input("a", &[4.0, 5.0])?;
    runner.run()?;
    assert_eq!(runner.variable("b")?, &[4.0, 5.0]);
    assert_eq!(runner.variable("a")?, &[1.0, 1.0]);
    Ok(())
}
