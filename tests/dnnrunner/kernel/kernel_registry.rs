use anyhow::Result;
use dnnrunner::{kernel, KernelLoader, KernelRegistry, RunnerError};

use crate::common;

#[test]
fn empty_source_exposes_every_linked_symbol() -> Result<()> {
    let registry = common::linked_kernels().materialize("  \n")?;
    let mut names = registry.names().collect::<Vec<_>>();
    names.sort_unstable();
    assert_eq!(
        names,
        ["add_bias", "copy", "fail", "increment", "mark", "noop", "scale"]
    );
    assert!(registry.contains("copy"));
    Ok(())
}

#[test]
fn manifest_maps_entry_points_to_symbols() -> Result<()> {
    let source = r#"{ "copy_3f1a": "copy", "relu_9be2": "noop" }"#;
    let registry = common::linked_kernels().materialize(source)?;
    assert_eq!(registry.len(), 2);
    assert!(registry.get("copy_3f1a").is_some());
    assert!(registry.get("relu_9be2").is_some());
    assert!(registry.get("copy").is_none());
    Ok(())
}

#[test]
fn unknown_symbol_fails_materialization() -> Result<()> {
    let err = common::linked_kernels()
        .materialize(r#"{ "elu_00": "elu" }"#)
        .unwrap_err();
    match common::runner_error(&err) {
        RunnerError::KernelCompilation(reason) => assert!(reason.contains("elu"), "{reason}"),
        other => panic!("unexpected error {other:?}"),
    }
    Ok(())
}

#[test]
fn malformed_manifest_fails_materialization() -> Result<()> {
    let err = common::linked_kernels()
        .materialize("var dnn_fallback_kernel = {};")
        .unwrap_err();
    assert!(matches!(
        common::runner_error(&err),
        RunnerError::KernelCompilation(_)
    ));
    Ok(())
}

#[test]
fn insert_replaces_existing_entry() -> Result<()> {
    let mut registry = KernelRegistry::new();
    registry.insert("k", kernel(common::noop));
    let handle = registry.handle("k");
    registry.insert("k", kernel(common::fail));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.handle("k"), handle);
    Ok(())
}
