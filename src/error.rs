//! Error types for the hotspot computations

use thiserror::Error;

/// Main error type of the crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HotspotError {
    /// Two inputs disagree in one of their dimensions
    #[error("Shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Labels of two tables could not be aligned
    #[error("Label mismatch: {0}")]
    LabelMismatch(String),

    /// A parameter is outside of its valid range
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A statrs distribution could not be constructed
    #[error("Distribution error: {0}")]
    Distribution(String),
}

impl HotspotError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, HotspotError>;
