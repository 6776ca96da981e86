/// Copy named vectors into runner variables, panicking on failure.
///
/// ```ignore
/// insert_inputs!(runner, { x: input, mask: mask_values });
/// ```
#[macro_export]
macro_rules! insert_inputs {
    ($runner:expr, { $($name:ident : $value:expr),* $(,)? }) => {
        $( $runner
            .set_input(stringify!($name), &$value)
            .unwrap_or_else(|err| {
                panic!("insert_inputs failed for {}: {}", stringify!($name), err)
            }); )*
    };
}

/// Bind each named variable to a local `Vec<f32>`, panicking on failure.
#[macro_export]
macro_rules! fetch_outputs {
    ($runner:expr, { $($name:ident),* $(,)? }) => {
        $( let $name: Vec<f32> = $runner
            .variable(stringify!($name))
            .map(<[f32]>::to_vec)
            .unwrap_or_else(|err| {
                panic!("fetch_outputs failed for {}: {}", stringify!($name), err)
            }); )*
    };
}

/// Like [`insert_inputs!`], but evaluates to an `anyhow::Result<()>` holding
/// the first failure.
#[macro_export]
macro_rules! try_insert_inputs {
    ($runner:expr, { $($name:ident : $value:expr),* $(,)? }) => {
        (|| -> $crate::anyhow::Result<()> {
            $( $runner.set_input(stringify!($name), &$value)?; )*
            Ok(())
        })()
    };
}

/// Copy one variable out as an `anyhow::Result<Vec<f32>>`.
#[macro_export]
macro_rules! try_fetch_output {
    ($runner:expr, $name:ident) => {
        $runner.variable(stringify!($name)).map(<[f32]>::to_vec)
    };
}
