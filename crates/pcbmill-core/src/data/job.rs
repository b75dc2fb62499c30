//! Job output data: the per-tool G-code, parsed motion and geometry.

use serde::{Deserialize, Serialize};

use super::tools::{JobType, ToolId};
use crate::geometry::{BoundingBox, Path};
use crate::units::Units;

/// Kind of a parsed machine move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    /// G0
    Rapid,
    /// G1
    Linear,
    /// G38.2
    Probe,
}

/// One parsed machine move with the absolute target position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub kind: MoveKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub feed: Option<f64>,
}

/// Generated output of one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_id: ToolId,
    pub diameter: f64,
    pub job_type: JobType,
    /// G-code body of the tool (without the job preamble)
    pub gcode: String,
    pub parsed_moves: Vec<Move>,
    /// Paths the tool followed, before depth slicing
    pub geometry: Vec<Path>,
    /// Effective cut depth (derived for V-bits)
    pub cut_z: f64,
}

/// A complete machining job
///
/// Created once per generation run and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    /// Tool outputs in emission order
    pub tools: Vec<ToolOutput>,
    /// Preamble owned by the first tool
    pub start_gcode: String,
    /// Complete program text
    pub source_text: String,
    pub multitool: bool,
    pub multigeo: bool,
    pub seg_x: f64,
    pub seg_y: f64,
    pub probe_z: f64,
    pub probe_feedrate: f64,
    pub bounds: Option<BoundingBox>,
    pub units: Units,
}

impl Job {
    pub fn tool(&self, id: ToolId) -> Option<&ToolOutput> {
        self.tools.iter().find(|t| t.tool_id == id)
    }

    pub fn tool_ids(&self) -> Vec<ToolId> {
        self.tools.iter().map(|t| t.tool_id).collect()
    }

    /// Total number of parsed moves across all tools
    pub fn move_count(&self) -> usize {
        self.tools.iter().map(|t| t.parsed_moves.len()).sum()
    }
}
