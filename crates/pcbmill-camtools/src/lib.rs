//! # pcbmill CAM tools
//!
//! Toolpath and G-code synthesis for PCB milling jobs.
//!
//! ## Building blocks
//!
//! - **Offset resolution**: tool parameters to a signed path offset
//! - **Depth planning**: V-bit cut depth and multi-pass Z levels
//! - **Drill and slot milling**: holes and slots to millable rings
//! - **Area clearing**: standard, seed and line strategies for polish passes
//! - **Exclusion routing**: travel moves around or over forbidden areas
//! - **G-code emission**: one tool's motion as text and parsed moves
//!
//! ## Running generations
//!
//! [`JobOrchestrator`] assembles multi-tool jobs; [`CamEngine`] is the
//! caller API that reserves output names, runs work synchronously or on its
//! worker pool and registers results.

pub mod context;
pub mod depth;
pub mod drill_mill;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod kernel;
pub mod offset;
pub mod orchestrator;
pub mod polish;
pub mod preprocessor;
pub mod registry;
pub mod validation;
pub mod worker;

pub use context::GenerationContext;
pub use depth::{plan_depths, vbit_cut_z, MAX_DEPTH_PASSES};
pub use drill_mill::{DrillToMillConverter, DEGENERATE_RADIUS, SLOT_CLEARANCE};
pub use emitter::{parse_moves, preamble, EmitterState, GCodeEmitter, GeometrySource, GENERATOR};
pub use engine::{CamEngine, JobOptions, Launch, LaunchMode, MillOptions};
pub use error::{CamToolError, CamToolResult, ParameterError, ParameterResult};
pub use exclusion::{ExclusionRouter, RoutedPath, TravelStep};
pub use kernel::{CavcKernel, GeometryKernel};
pub use offset::resolve_offset;
pub use orchestrator::{JobOrchestrator, JobRequest};
pub use polish::PolygonClearer;
pub use preprocessor::Preprocessor;
pub use registry::{ObjectRegistry, Promise, RegisteredObject};
pub use validation::{validate_table, validate_tool};
pub use worker::{JobHandle, WorkerPool};
