use anyhow::Result;
use dnnrunner::{LayoutTable, RunnerError, VariableArena, WeightArena};

use crate::common;

#[test]
fn disjoint_regions_validate() -> Result<()> {
    let layout = LayoutTable::new(10)
        .with("a", 0, 3)
        .with("b", 3, 5)
        .with("c", 8, 2)
        .with("empty", 10, 0);
    layout.validate("weight")?;
    Ok(())
}

#[test]
fn region_past_total_size_is_rejected() -> Result<()> {
    let layout = LayoutTable::new(4).with("w", 2, 3);
    let err = layout.validate("weight").unwrap_err();
    match common::runner_error(&err) {
        RunnerError::Layout { table, reason } => {
            assert_eq!(table, "weight");
            assert!(reason.contains("exceeds total_size 4"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    Ok(())
}

#[test]
fn overlapping_weight_regions_are_rejected() -> Result<()> {
    let layout = LayoutTable::new(8).with("a", 0, 4).with("b", 3, 4);
    let err = WeightArena::allocate(&layout).unwrap_err();
    assert!(matches!(
        common::runner_error(&err),
        RunnerError::Layout { table, reason } if table == "weight" && reason == "a overlaps b"
    ));
    assert!(layout.validate_bounds("weight").is_ok());
    Ok(())
}

#[test]
fn overlapping_variable_offsets_get_separate_buffers() -> Result<()> {
    let layout = LayoutTable::new(4).with("a", 0, 4).with("b", 0, 4);
    let mut arena = VariableArena::allocate(&layout)?;
    let a = arena.handle("a").expect("a handle");
    let b = arena.handle("b").expect("b handle");
    arena.buffer_mut(a).fill(2.0);
    assert_eq!(arena.buffer(b), &[0.0; 4]);

    let err = VariableArena::allocate(&LayoutTable::new(4).with("a", 2, 4)).unwrap_err();
    assert!(matches!(
        common::runner_error(&err),
        RunnerError::Layout { table, .. } if table == "variable"
    ));
    Ok(())
}

#[test]
fn overflowing_region_is_rejected() -> Result<()> {
    let layout = LayoutTable::new(4).with("w", usize::MAX, 2);
    let err = layout.validate("weight").unwrap_err();
    assert!(matches!(common::runner_error(&err), RunnerError::Layout { .. }));
    Ok(())
}

#[test]
fn layout_ignores_redundant_name_field() -> Result<()> {
    let layout: LayoutTable = serde_json::from_str(
        r#"{
            "total_size": 6,
            "allocation": {
                "conv_w": { "name": "conv_w", "offset": 0, "size": 4 },
                "conv_b": { "name": "conv_b", "offset": 4, "size": 2 }
            }
        }"#,
    )?;
    assert_eq!(layout.total_size, 6);
    assert_eq!(layout.len(), 2);
    assert_eq!(layout.get("conv_b").map(|a| a.range()), Some(4..6));
    Ok(())
}
