//! Anything and everything related to the weighted kNN graph

pub mod kernel;
pub mod knn;
pub mod neighbours;
