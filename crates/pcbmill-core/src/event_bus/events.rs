//! Generation event definitions.
//!
//! Events are cloneable and serializable for logging and replay.

use serde::{Deserialize, Serialize};

use crate::data::{GeneratedObject, ToolId};
use crate::error::FailKind;

/// Events published while generating toolpaths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GenerationEvent {
    /// A generation run started.
    Started {
        /// Output object name.
        name: String,
        /// Number of tools to process.
        tool_count: usize,
    },
    /// A tool finished.
    Progress {
        /// Output object name.
        name: String,
        /// Tool that just finished.
        tool_id: ToolId,
        /// Overall progress, 0-100.
        percent: u8,
    },
    /// The run failed; nothing was registered.
    Failed {
        /// Output object name.
        name: String,
        /// Failure reason.
        reason: FailKind,
    },
    /// The run was cancelled; nothing was registered.
    Cancelled {
        /// Output object name.
        name: String,
    },
    /// The run succeeded and its output was registered.
    Completed {
        /// Output object name.
        name: String,
        /// The produced object.
        output: Box<GeneratedObject>,
    },
}

impl GenerationEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            GenerationEvent::Started { .. } | GenerationEvent::Progress { .. } => {
                EventCategory::Progress
            }
            GenerationEvent::Failed { .. } | GenerationEvent::Cancelled { .. } => {
                EventCategory::Failure
            }
            GenerationEvent::Completed { .. } => EventCategory::Completion,
        }
    }

    /// Name of the output object the event refers to
    pub fn name(&self) -> &str {
        match self {
            GenerationEvent::Started { name, .. }
            | GenerationEvent::Progress { name, .. }
            | GenerationEvent::Failed { name, .. }
            | GenerationEvent::Cancelled { name }
            | GenerationEvent::Completed { name, .. } => name,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            GenerationEvent::Started { name, tool_count } => {
                format!("Generating {} ({} tools)", name, tool_count)
            }
            GenerationEvent::Progress {
                name,
                tool_id,
                percent,
            } => format!("{}: tool {} done ({}%)", name, tool_id, percent),
            GenerationEvent::Failed { name, reason } => format!("{} failed: {}", name, reason),
            GenerationEvent::Cancelled { name } => format!("{} cancelled", name),
            GenerationEvent::Completed { name, .. } => format!("{} completed", name),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Start and per-tool progress.
    Progress,
    /// Failure and cancellation.
    Failure,
    /// Successful completion.
    Completion,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Progress => write!(f, "Progress"),
            EventCategory::Failure => write!(f, "Failure"),
            EventCategory::Completion => write!(f, "Completion"),
        }
    }
}
