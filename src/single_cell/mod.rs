//! Hotspot statistics of variables (genes) over the sample (cell) graph

pub mod getis_ord;
pub mod hotspot;
