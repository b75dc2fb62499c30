//! Data models for tools, source objects and generated jobs
//!
//! This module provides:
//! - Tool parameter sets, tool records and the ordered tool table
//! - The tools database mapping diameters to default parameters
//! - Exclusion areas
//! - Geometry and Excellon source objects
//! - Jobs with per-tool G-code output

pub mod exclusion;
pub mod job;
pub mod objects;
pub mod tools;
pub mod tools_db;

pub use exclusion::ExclusionArea;
pub use job::{Job, Move, MoveKind, ToolOutput};
pub use objects::{DrillTool, ExcellonObject, GeneratedObject, GeometryObject, Slot};
pub use tools::{
    ExclusionShape, ExclusionStrategy, JobType, OffsetType, ParamSet, PolishMethod, ToolId,
    ToolRecord, ToolShape, ToolTable,
};
pub use tools_db::{ToolDbRecord, ToolTarget, ToolsDatabase};
