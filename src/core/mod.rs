//! Building blocks: summary statistics, data containers and graph construction

pub mod base;
pub mod data;
pub mod graph;
