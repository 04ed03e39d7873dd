//! Error types for the population runtime

use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur in the population runtime
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Invalid model or simulation configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Status entry written with a value of the wrong kind
    #[error("Status entry {name} has the wrong type (expected {expected})")]
    TypeMismatch {
        /// Status entry name
        name: String,
        /// Expected kind of value
        expected: &'static str,
    },

    /// Update requested before calibration
    #[error("Population model is not calibrated")]
    NotCalibrated,

    /// Step range passed to update is empty or reversed
    #[error("Invalid step range [{from}, {to})")]
    InvalidStepRange {
        /// First step offset
        from: usize,
        /// One past the last step offset
        to: usize,
    },

    /// Update does not continue where the previous one stopped
    #[error("Steps must be processed in order: expected step {expected}, got {found}")]
    StepOutOfOrder {
        /// Next step the model expects
        expected: u64,
        /// Step that was requested
        found: u64,
    },

    /// Input deposited outside of the ring buffer window
    #[error("Delivery step {step} outside buffer window [{origin}, {origin} + {horizon})")]
    BufferHorizon {
        /// Requested delivery step
        step: u64,
        /// First step still held by the buffer
        origin: u64,
        /// Number of steps the buffer holds
        horizon: usize,
    },

    /// Node not found in the simulation engine
    #[error("Node {node_id} not found")]
    NodeNotFound {
        /// Node ID that was not found
        node_id: u32,
    },
}

impl RuntimeError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(name: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected,
        }
    }
}
