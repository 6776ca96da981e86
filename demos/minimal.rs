use std::env;

use anyhow::Result;
use dnnrunner::{
    fetch_outputs, insert_inputs, Descriptor, ExecInfo, KernelArgs, LayoutTable, ModelLoader,
    Runner, RunnerOptions, StaticKernelLoader,
};

fn relu(args: &KernelArgs<'_>) -> Result<()> {
    let x = args.input(0)?;
    let y = args.output(0)?;
    for i in 0..y.len() {
        y.set(i, x.get(i).max(0.0));
    }
    Ok(())
}

/// `y[j] = sum_i x[i] * w[i * n + j] + b[j]`
fn dense(args: &KernelArgs<'_>) -> Result<()> {
    let x = args.input(0)?;
    let w = args.weight(0)?;
    let b = args.weight(1)?;
    let y = args.output(0)?;
    let n = y.len();
    for j in 0..n {
        let acc = (0..x.len()).map(|i| x.get(i) * w[i * n + j]).sum::<f32>();
        y.set(j, acc + b[j]);
    }
    Ok(())
}

fn kernels() -> StaticKernelLoader {
    StaticKernelLoader::new()
        .with("relu", relu)
        .with("dense", dense)
}

fn builtin_descriptor() -> Descriptor {
    Descriptor {
        exec_infos: vec![
            ExecInfo::new("relu").inputs(["x"]).outputs(["h"]),
            ExecInfo::new("dense")
                .inputs(["h"])
                .outputs(["y"])
                .weights(["fc_w", "fc_b"]),
        ],
        weight_allocation: LayoutTable::new(8).with("fc_w", 0, 6).with("fc_b", 6, 2),
        variable_allocation: LayoutTable::new(8)
            .with("x", 0, 3)
            .with("h", 3, 3)
            .with("y", 6, 2),
        inputs: vec!["x".to_string()],
        outputs: vec!["y".to_string()],
        ..Descriptor::default()
    }
}

fn main() -> Result<()> {
    let options = RunnerOptions::from_env()?;
    if let Some(dir) = env::args().nth(1) {
        let model = ModelLoader::open(&dir, "fallback")?;
        let mut runner = model.runner(kernels()).with_options(options);
        runner.compile()?;
        runner.load_weights_from(&model)?;
        runner.run()?;
        for view in runner.output_views()? {
            dnnrunner::log!("{} = {:?}", view.name(), view.to_vec());
        }
        return Ok(());
    }

    let weights: Vec<u8> = [0.5f32, -1.0, 1.0, 1.0, 2.0, 0.0, 0.1, 0.2]
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect();
    let mut runner = Runner::new(builtin_descriptor(), kernels()).with_options(options);
    runner.compile()?;
    runner.load_weights(&weights)?;
    insert_inputs!(runner, { x: [1.0f32, -2.0, 3.0] });
    runner.run()?;
    fetch_outputs!(runner, { y });
    dnnrunner::log!("y = {:?}", y);
    Ok(())
}
