//! Error handling for pcbmill
//!
//! Provides the error types shared by every layer of the toolpath engine:
//! - Generation failures (the domain taxonomy surfaced to the operator)
//! - The unified [`Error`] used at crate boundaries
//!
//! All error types use `thiserror` for ergonomic error handling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generation failure kind
///
/// Expected domain failures of toolpath generation. A failure aborts the
/// generation of the affected tool and, with it, the whole job: no partial
/// job or geometry object is ever committed.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailKind {
    /// A tool uses a custom offset but has no (or a zero) offset value
    #[error("Tool {tool_id}: custom offset selected but no offset value is set")]
    MissingOffsetValue {
        /// The tool whose offset could not be resolved.
        tool_id: u32,
    },

    /// The milling tool does not fit into a hole or slot
    #[error("Milling tool {mill_diameter} is larger than hole {hole_diameter} (tool {tool_id})")]
    ToolLargerThanHole {
        /// The drill tool owning the hole.
        tool_id: u32,
        /// Diameter of the hole or slot.
        hole_diameter: f64,
        /// Diameter of the milling tool.
        mill_diameter: f64,
    },

    /// The clearing strategy could not cover the requested area
    #[error("Area could not be fully cleared: {reason}")]
    AreaNotFullyCleared {
        /// Why the clearing strategy gave up.
        reason: String,
    },

    /// There is nothing to cut
    #[error("Empty geometry: {context}")]
    EmptyGeometry {
        /// What was empty.
        context: String,
    },

    /// A referenced tool does not exist
    #[error("Tool {tool_id} not found")]
    ToolNotFound {
        /// The missing tool id.
        tool_id: u32,
    },

    /// A tool id is already present in a tool table
    #[error("Tool {tool_id} already exists")]
    DuplicateToolId {
        /// The duplicated tool id.
        tool_id: u32,
    },

    /// The tools database has more than one record for a diameter
    #[error("{count} tools database records match diameter {diameter}")]
    MultipleDbMatches {
        /// The diameter that was looked up.
        diameter: f64,
        /// Number of matching records.
        count: usize,
    },

    /// Tool parameters are invalid
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The geometry kernel failed unexpectedly
    #[error("Internal geometry error: {0}")]
    InternalGeometryError(String),

    /// Generation was cancelled by the caller
    #[error("Generation cancelled")]
    Cancelled,

    /// Another generation is already producing an object under this name
    #[error("Output name '{0}' is reserved by a generation in progress")]
    NameReserved(String),
}

impl FailKind {
    /// Create an internal geometry error from a message
    pub fn internal(msg: impl Into<String>) -> Self {
        FailKind::InternalGeometryError(msg.into())
    }

    /// Create an empty geometry error from a context description
    pub fn empty(context: impl Into<String>) -> Self {
        FailKind::EmptyGeometry {
            context: context.into(),
        }
    }

    /// Check if this failure is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FailKind::Cancelled)
    }
}

/// Result type for generation steps
pub type FailResult<T> = std::result::Result<T, FailKind>;

/// Main error type for pcbmill
///
/// A unified error type used at I/O and crate boundaries.
#[derive(Error, Debug)]
pub enum Error {
    /// Generation failure
    #[error(transparent)]
    Fail(#[from] FailKind),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a generation failure
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Error::Fail(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
