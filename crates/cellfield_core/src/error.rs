//! Error types for the cellfield engine.
//!
//! Setup and indexing failures are reported through [`FieldError`]. Boundary
//! excursions never surface here; they are resolved by the configured policy.

use cellfield_data::AgentId;
use thiserror::Error;

/// Main error type for field and agent operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Voxel spacing along {axis} must be positive, got {value}")]
    NonPositiveSpacing { axis: char, value: f64 },

    #[error("Domain bounds along {axis} are inverted: [{min}, {max}]")]
    InvertedBounds { axis: char, min: f64, max: f64 },

    #[error("Substrate index {0} is already defined")]
    DuplicateSubstrate(usize),

    #[error("Substrate index {index} is not contiguous (next index is {expected})")]
    NonContiguousSubstrate { index: usize, expected: usize },

    /// The solver has run; the column count of the density table is frozen.
    #[error("Substrate count is locked at {0} after the first solve")]
    SubstrateCountLocked(usize),

    #[error("Voxel index {index} out of range (len {len})")]
    VoxelOutOfRange { index: usize, len: usize },

    #[error("Substrate index {index} out of range (len {len})")]
    SubstrateOutOfRange { index: usize, len: usize },

    #[error("Agent handle {0} is stale or was never issued")]
    StaleAgent(AgentId),

    #[error("Unknown substrate: {0}")]
    UnknownSubstrate(String),

    #[error("Buffer holds {got} values but {expected} substrates are defined")]
    BufferLength { expected: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<FieldError>,
    },
}

/// Result type alias for cellfield operations.
pub type Result<T> = std::result::Result<T, FieldError>;

impl FieldError {
    #[must_use]
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    #[must_use]
    pub fn unknown_substrate<S: Into<String>>(name: S) -> Self {
        Self::UnknownSubstrate(name.into())
    }

    #[must_use]
    pub fn voxel_out_of_range(index: usize, len: usize) -> Self {
        Self::VoxelOutOfRange { index, len }
    }

    #[must_use]
    pub fn substrate_out_of_range(index: usize, len: usize) -> Self {
        Self::SubstrateOutOfRange { index, len }
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True for failures that can only arise while setting up a run.
    #[must_use]
    pub fn is_setup_error(&self) -> bool {
        match self {
            Self::NonPositiveSpacing { .. }
            | Self::InvertedBounds { .. }
            | Self::DuplicateSubstrate(_)
            | Self::NonContiguousSubstrate { .. }
            | Self::SubstrateCountLocked(_)
            | Self::InvalidConfig(_) => true,
            Self::Context { source, .. } => source.is_setup_error(),
            _ => false,
        }
    }
}
