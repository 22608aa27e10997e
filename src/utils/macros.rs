//////////////////
// Shape checks //
//////////////////

/// Early return with a `ShapeMismatch` if two dimensions differ.
#[macro_export]
macro_rules! ensure_dim {
    ($what:expr, $expected:expr, $found:expr) => {{
        let expected: usize = $expected;
        let found: usize = $found;
        if expected != found {
            return Err($crate::error::HotspotError::ShapeMismatch {
                what: $what,
                expected,
                found,
            });
        }
    }};
}

/// Early return with a `ShapeMismatch` if the slices have different lengths.
///
/// The first slice defines the expected length.
#[macro_export]
macro_rules! ensure_same_len {
    ($what:expr, $first:expr, $($vec:expr),+ $(,)?) => {{
        let expected = $first.len();
        $(
            $crate::ensure_dim!($what, expected, $vec.len());
        )+
    }};
}
