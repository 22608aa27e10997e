//! Data structures (labelled dense matrices, sparse matrices) and synthetic
//! data generation

pub mod labelled;
pub mod sparse_structures;
pub mod synthetic_data;
