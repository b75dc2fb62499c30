//! Tool table module - per-tool machining parameters
//!
//! This module provides:
//! - Tool parameter enums (offset type, job type, tool shape, ...)
//! - The full per-tool parameter set
//! - Tool records and the ordered tool table

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FailKind, FailResult};
use crate::geometry::{Path, Point, Polygon};

/// Tool identifier (unique within a tool table, greater than zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(pub u32);

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ToolId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Where the tool runs relative to the geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OffsetType {
    /// On the geometry line
    #[default]
    Path,
    /// Inside the geometry by the tool radius
    In,
    /// Outside the geometry by the tool radius
    Out,
    /// User supplied offset value
    Custom,
}

/// Purpose of the tool in the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    #[default]
    Roughing,
    Finishing,
    Isolation,
    /// Surface polishing; clears the whole object area
    Polish,
}

/// Cutter shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ToolShape {
    #[default]
    C1,
    C2,
    C3,
    C4,
    #[serde(rename = "B")]
    Ball,
    /// V-bit; the cut depth is derived from the tip geometry
    V,
}

impl ToolShape {
    pub fn is_vbit(&self) -> bool {
        matches!(self, ToolShape::V)
    }
}

/// Area clearing strategy used by polish passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolishMethod {
    /// Inward offset rings
    #[default]
    Standard,
    /// Fill outward from an interior seed
    Seed,
    /// Parallel raster lines
    Lines,
}

/// How travel moves deal with an exclusion area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionStrategy {
    /// Detour around the area in XY
    #[default]
    Around,
    /// Rise above the area and cross it
    Over,
}

/// Shape used to represent an exclusion area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionShape {
    /// Bounding rectangle of the area
    #[default]
    Square,
    /// The area polygon itself
    Polygon,
}

fn default_cut_z() -> f64 {
    -0.1
}
fn default_travel_z() -> f64 {
    2.0
}
fn default_depth_per_pass() -> f64 {
    0.1
}
fn default_feedrate_xy() -> f64 {
    120.0
}
fn default_feedrate_z() -> f64 {
    60.0
}
fn default_feedrate_rapid() -> f64 {
    1500.0
}
fn default_feedrate_probe() -> f64 {
    75.0
}
fn default_toolchange_z() -> f64 {
    15.0
}
fn default_extracut_length() -> f64 {
    0.1
}
fn default_dwell_time() -> f64 {
    1.0
}
fn default_polish_overlap() -> f64 {
    0.15
}
fn default_over_z() -> f64 {
    1.0
}
fn default_preprocessor() -> String {
    "default".to_string()
}
fn default_end_z() -> f64 {
    15.0
}
fn default_probe_z() -> f64 {
    -1.0
}
fn default_v_tip_dia() -> f64 {
    0.1
}
fn default_v_tip_angle() -> f64 {
    30.0
}

/// Complete machining parameter set of one tool
///
/// Every field has a default so partial records (tools database entries,
/// project files) deserialize into a usable set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamSet {
    // Offset
    pub offset_type: OffsetType,
    /// Only meaningful for `OffsetType::Custom`
    pub offset_value: Option<f64>,

    pub job_type: JobType,
    pub tool_shape: ToolShape,
    /// V-bit tip diameter
    pub v_tip_dia: f64,
    /// V-bit included angle in degrees
    pub v_tip_angle: f64,

    // Depth
    pub cut_z: f64,
    pub travel_z: f64,
    pub multidepth: bool,
    pub depth_per_pass: f64,

    // Feeds
    pub feedrate_xy: f64,
    pub feedrate_z: f64,
    pub feedrate_rapid: f64,
    pub feedrate_probe: f64,

    // Toolchange
    pub toolchange: bool,
    pub toolchange_z: f64,
    pub toolchange_xy: Option<Point>,

    pub extracut: bool,
    pub extracut_length: f64,

    // Spindle
    pub spindle_speed: Option<u32>,
    pub dwell: bool,
    /// Seconds
    pub dwell_time: f64,

    // Polish
    pub polish_margin: f64,
    pub polish_overlap: f64,
    pub polish_method: PolishMethod,

    // Exclusion
    pub exclusion: bool,
    pub exclusion_shape: ExclusionShape,
    pub exclusion_strategy: ExclusionStrategy,
    pub exclusion_over_z: f64,

    pub preprocessor: String,
    pub end_z: f64,
    pub end_xy: Option<Point>,
    /// Probe target depth used by probing preprocessors
    pub probe_z: f64,
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            offset_type: OffsetType::default(),
            offset_value: None,
            job_type: JobType::default(),
            tool_shape: ToolShape::default(),
            v_tip_dia: default_v_tip_dia(),
            v_tip_angle: default_v_tip_angle(),
            cut_z: default_cut_z(),
            travel_z: default_travel_z(),
            multidepth: false,
            depth_per_pass: default_depth_per_pass(),
            feedrate_xy: default_feedrate_xy(),
            feedrate_z: default_feedrate_z(),
            feedrate_rapid: default_feedrate_rapid(),
            feedrate_probe: default_feedrate_probe(),
            toolchange: false,
            toolchange_z: default_toolchange_z(),
            toolchange_xy: None,
            extracut: false,
            extracut_length: default_extracut_length(),
            spindle_speed: None,
            dwell: false,
            dwell_time: default_dwell_time(),
            polish_margin: 0.0,
            polish_overlap: default_polish_overlap(),
            polish_method: PolishMethod::default(),
            exclusion: false,
            exclusion_shape: ExclusionShape::default(),
            exclusion_strategy: ExclusionStrategy::default(),
            exclusion_over_z: default_over_z(),
            preprocessor: default_preprocessor(),
            end_z: default_end_z(),
            end_xy: None,
            probe_z: default_probe_z(),
        }
    }
}

/// One tool of a tool table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub tool_id: ToolId,
    pub diameter: f64,
    #[serde(default)]
    pub params: ParamSet,
    /// Geometry owned by the tool in multi-geo objects
    #[serde(default)]
    pub owned_geometry: Vec<Polygon>,
    /// Paths produced by the last polish run of this tool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleared_paths: Vec<Path>,
}

impl ToolRecord {
    pub fn new(tool_id: u32, diameter: f64, params: ParamSet) -> Self {
        Self {
            tool_id: ToolId(tool_id),
            diameter,
            params,
            owned_geometry: Vec::new(),
            cleared_paths: Vec::new(),
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }
}

/// Ordered tool collection
///
/// Insertion order is the G-code emission order; the first tool owns the
/// job header. Deserialized tables go through [`ToolTable::insert`], so
/// ids are non-zero and unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ToolRecord>", into = "Vec<ToolRecord>")]
pub struct ToolTable {
    tools: Vec<ToolRecord>,
}

impl ToolTable {
    /// Create a new empty tool table
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Append a tool; fails when the id is already present or zero
    pub fn insert(&mut self, record: ToolRecord) -> FailResult<()> {
        if record.tool_id.0 == 0 {
            return Err(FailKind::InvalidParameters(
                "tool id must be greater than zero".to_string(),
            ));
        }
        if self.contains(record.tool_id) {
            return Err(FailKind::DuplicateToolId {
                tool_id: record.tool_id.0,
            });
        }
        self.tools.push(record);
        Ok(())
    }

    pub fn contains(&self, id: ToolId) -> bool {
        self.tools.iter().any(|t| t.tool_id == id)
    }

    pub fn get(&self, id: ToolId) -> Option<&ToolRecord> {
        self.tools.iter().find(|t| t.tool_id == id)
    }

    pub fn get_mut(&mut self, id: ToolId) -> Option<&mut ToolRecord> {
        self.tools.iter_mut().find(|t| t.tool_id == id)
    }

    /// Like [`ToolTable::get`] but reports a missing tool as a failure
    pub fn require(&self, id: ToolId) -> FailResult<&ToolRecord> {
        self.get(id).ok_or(FailKind::ToolNotFound { tool_id: id.0 })
    }

    /// Remove a tool, keeping the order of the remaining ones
    pub fn remove(&mut self, id: ToolId) -> Option<ToolRecord> {
        let idx = self.tools.iter().position(|t| t.tool_id == id)?;
        Some(self.tools.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolRecord> {
        self.tools.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ToolRecord> {
        self.tools.iter_mut()
    }

    /// Tool ids in table order
    pub fn ids(&self) -> Vec<ToolId> {
        self.tools.iter().map(|t| t.tool_id).collect()
    }

    pub fn first(&self) -> Option<&ToolRecord> {
        self.tools.first()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Smallest unused id after the current maximum
    pub fn next_id(&self) -> ToolId {
        ToolId(self.tools.iter().map(|t| t.tool_id.0).max().unwrap_or(0) + 1)
    }

    /// Copy of the selected tools, in table order
    ///
    /// Fails with `ToolNotFound` for the first requested id not in the table.
    pub fn subset(&self, ids: &[ToolId]) -> FailResult<ToolTable> {
        if let Some(missing) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(FailKind::ToolNotFound { tool_id: missing.0 });
        }
        Ok(ToolTable {
            tools: self
                .tools
                .iter()
                .filter(|t| ids.contains(&t.tool_id))
                .cloned()
                .collect(),
        })
    }
}

impl TryFrom<Vec<ToolRecord>> for ToolTable {
    type Error = FailKind;

    fn try_from(records: Vec<ToolRecord>) -> FailResult<Self> {
        let mut table = ToolTable::new();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }
}

impl From<ToolTable> for Vec<ToolRecord> {
    fn from(table: ToolTable) -> Self {
        table.tools
    }
}

impl<'a> IntoIterator for &'a ToolTable {
    type Item = &'a ToolRecord;
    type IntoIter = std::slice::Iter<'a, ToolRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.iter()
    }
}
