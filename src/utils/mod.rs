//! Crate-internal helpers

pub mod macros;
