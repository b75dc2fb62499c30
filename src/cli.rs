//! Command line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// PCB milling toolpath and G-code generator
#[derive(Debug, Parser)]
#[command(name = "pcbmill", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (.toml or .json); the platform default when omitted
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a G-code job from a JSON project file
    Generate(GenerateArgs),

    /// Turn drilled holes into milling rings
    DrillMill(MillArgs),

    /// Turn slots into milling rings
    SlotMill(MillArgs),

    /// Write the default configuration
    InitConfig {
        /// Destination; the platform default when omitted
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Project file
    pub project: PathBuf,

    /// Output file; stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Job name; derived from the object name when omitted
    #[arg(long)]
    pub name: Option<String>,

    /// Tool ids to use, in table order
    #[arg(long, value_delimiter = ',')]
    pub tools: Vec<u32>,

    /// Add a tool of this diameter before generating
    #[arg(long = "add-tool")]
    pub add_tools: Vec<f64>,

    /// Emit the toolchange block for every tool
    #[arg(long, default_value_t = false)]
    pub retrigger_toolchange: bool,

    #[arg(long, default_value_t = 0.0)]
    pub seg_x: f64,

    #[arg(long, default_value_t = 0.0)]
    pub seg_y: f64,

    /// Run on the worker pool
    #[arg(long, default_value_t = false)]
    pub background: bool,

    /// Write the project back with derived depths and polish paths
    #[arg(long, default_value_t = false)]
    pub update_project: bool,
}

#[derive(Debug, Args)]
pub struct MillArgs {
    /// Drill file (JSON)
    pub drills: PathBuf,

    /// Mill diameter
    #[arg(long, short = 'd')]
    pub diameter: f64,

    /// Drill tool ids to mill
    #[arg(long, value_delimiter = ',', required = true)]
    pub tools: Vec<u32>,

    /// Output geometry file; stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Output object name
    #[arg(long)]
    pub name: Option<String>,
}
