/// Asserts that two floats agree to within an absolute tolerance.
#[macro_export]
macro_rules! assert_close {
    ($actual:expr, $expected:expr, $tol:expr) => {
        let (actual, expected): (f64, f64) = ($actual, $expected);
        assert!(
            (actual - expected).abs() <= $tol,
            "{} = {} differs from {} by more than {}",
            stringify!($actual),
            actual,
            expected,
            $tol
        );
    };
}

/// Asserts the number of live agents.
#[macro_export]
macro_rules! assert_population {
    ($world:expr, $count:expr) => {
        assert_eq!($world.agent_count(), $count, "Population count mismatch");
    };
}

/// Asserts that every live agent sits in exactly the bucket its position maps to.
#[macro_export]
macro_rules! assert_container_consistent {
    ($world:expr) => {
        assert!(
            $world.container.is_consistent(),
            "Agent container membership out of sync with positions"
        );
    };
}
