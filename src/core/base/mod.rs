//! Summary statistics and the normal-based significance of Z-scores

pub mod stats;
