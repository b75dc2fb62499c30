//! # pcbmill core
//!
//! Core types for the pcbmill toolpath engine: geometry primitives, tool
//! tables, source and output objects, the failure taxonomy, cancellation
//! and generation events.

pub mod cancel;
pub mod data;
pub mod error;
pub mod event_bus;
pub mod geometry;
pub mod units;

pub use cancel::CancellationToken;

pub use data::{
    DrillTool, ExcellonObject, ExclusionArea, ExclusionShape, ExclusionStrategy, GeneratedObject,
    GeometryObject, Job, JobType, Move, MoveKind, OffsetType, ParamSet, PolishMethod, Slot,
    ToolDbRecord, ToolId, ToolOutput, ToolRecord, ToolShape, ToolTable, ToolTarget,
    ToolsDatabase,
};

pub use error::{Error, FailKind, FailResult, Result};

// Re-export event bus for convenience
pub use event_bus::{
    EventBus, EventBusConfig, EventCategory, EventFilter, GenerationEvent, SubscriptionId,
};

pub use geometry::{BoundingBox, Path, Point, Polygon};
pub use units::{format_number, Units};
