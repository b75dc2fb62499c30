//! Source and output objects
//!
//! - [`GeometryObject`]: tool-annotated 2D geometry (single-geo or multi-geo)
//! - [`ExcellonObject`]: drilled holes and slots grouped by drill tool
//! - [`GeneratedObject`]: what a generation run registers under its name

use serde::{Deserialize, Serialize};

use super::job::Job;
use super::tools::{JobType, ToolId, ToolTable};
use crate::geometry::{polygons_bounds, BoundingBox, Point, Polygon};

/// Tool-annotated geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryObject {
    pub name: String,
    pub tools: ToolTable,
    /// Geometry shared by all tools in single-geo objects
    #[serde(default)]
    pub solid_geometry: Vec<Polygon>,
    /// When set every tool cuts its own `owned_geometry`
    #[serde(default)]
    pub multigeo: bool,
}

impl GeometryObject {
    pub fn new(name: impl Into<String>, solid_geometry: Vec<Polygon>) -> Self {
        Self {
            name: name.into(),
            tools: ToolTable::new(),
            solid_geometry,
            multigeo: false,
        }
    }

    /// Bounds of all geometry held by the object
    pub fn bounds(&self) -> Option<BoundingBox> {
        let shared = polygons_bounds(&self.solid_geometry);
        let owned = self
            .tools
            .iter()
            .filter_map(|t| polygons_bounds(&t.owned_geometry))
            .reduce(|a, b| a.union(&b));
        match (shared, owned) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        }
    }

    /// Geometry a tool cuts: its own in multi-geo objects, otherwise the shared one
    pub fn geometry_for(&self, tool_id: ToolId) -> &[Polygon] {
        if self.multigeo {
            self.tools
                .get(tool_id)
                .map(|t| t.owned_geometry.as_slice())
                .unwrap_or(&[])
        } else {
            &self.solid_geometry
        }
    }

    /// Write per-tool results of a finished job back into the tool table
    ///
    /// V-bit tools receive the derived cut depth; polish tools keep the
    /// cleared paths, which turns the object multi-geo.
    pub fn apply_job_feedback(&mut self, job: &Job) {
        for output in &job.tools {
            let Some(record) = self.tools.get_mut(output.tool_id) else {
                continue;
            };
            if record.params.tool_shape.is_vbit() {
                record.params.cut_z = output.cut_z;
            }
            if output.job_type == JobType::Polish {
                record.cleared_paths = output.geometry.clone();
            }
        }
        if job.multigeo && !self.multigeo {
            // Keep non-polish tools cutting what they cut before.
            for record in self.tools.iter_mut() {
                if record.owned_geometry.is_empty() && record.params.job_type != JobType::Polish {
                    record.owned_geometry = self.solid_geometry.clone();
                }
            }
            self.multigeo = true;
        }
    }
}

/// A slot: a drilled segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub start: Point,
    pub stop: Point,
}

/// One drill tool of an Excellon object with its holes and slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillTool {
    pub tool_id: ToolId,
    pub diameter: f64,
    #[serde(default)]
    pub drills: Vec<Point>,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

/// Drilled holes and slots grouped by drill tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcellonObject {
    pub name: String,
    pub tools: Vec<DrillTool>,
}

impl ExcellonObject {
    pub fn tool(&self, id: ToolId) -> Option<&DrillTool> {
        self.tools.iter().find(|t| t.tool_id == id)
    }

    pub fn tool_ids(&self) -> Vec<ToolId> {
        self.tools.iter().map(|t| t.tool_id).collect()
    }
}

/// An object produced by a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeneratedObject {
    Job(Box<Job>),
    Geometry(Box<GeometryObject>),
}

impl GeneratedObject {
    pub fn name(&self) -> &str {
        match self {
            GeneratedObject::Job(job) => &job.name,
            GeneratedObject::Geometry(geo) => &geo.name,
        }
    }

    pub fn as_job(&self) -> Option<&Job> {
        match self {
            GeneratedObject::Job(job) => Some(job),
            GeneratedObject::Geometry(_) => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometryObject> {
        match self {
            GeneratedObject::Geometry(geo) => Some(geo),
            GeneratedObject::Job(_) => None,
        }
    }
}
