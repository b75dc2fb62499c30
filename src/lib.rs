//! # pcbmill
//!
//! Toolpath and G-code generation for PCB milling.
//!
//! ## Architecture
//!
//! pcbmill is organized as a workspace with multiple crates:
//!
//! 1. **pcbmill-core** - Geometry, tool tables, objects, failures, events
//! 2. **pcbmill-camtools** - Offsets, depth planning, clearing, routing, G-code
//! 3. **pcbmill-settings** - Configuration files
//! 4. **pcbmill** - Command line binary that integrates all crates

pub mod cli;
pub mod commands;
pub mod project;

pub use pcbmill_camtools::{CamEngine, GenerationContext, JobOptions, LaunchMode, MillOptions};
pub use pcbmill_core::{
    ExcellonObject, FailKind, GeneratedObject, GeometryObject, Job, ToolId, Units,
};
pub use pcbmill_settings::Config;
pub use project::Project;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Log lines go to stderr so G-code written to stdout stays clean. The
/// level comes from RUST_LOG, defaulting to `info` (`debug` when
/// `verbose`).
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
