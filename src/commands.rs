//! Command implementations shared by the binary and its tests.

use std::path::Path;

use anyhow::{anyhow, Context};
use pcbmill_camtools::{CamEngine, GenerationContext, JobOptions, LaunchMode, MillOptions};
use pcbmill_core::{
    EventCategory, EventFilter, GenerationEvent, GeometryObject, Job, ToolId,
};
use pcbmill_settings::Config;
use tracing::{debug, info};

use crate::cli::{GenerateArgs, MillArgs};
use crate::project::{load_excellon, Project};

/// Which features of a drill file are milled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MillKind {
    Drills,
    Slots,
}

/// Engine configured from `config`, logging tool progress
pub fn build_engine(config: &Config, ctx: GenerationContext) -> anyhow::Result<CamEngine> {
    let mut engine =
        CamEngine::new(ctx, config.generation.workers)?.with_defaults(config.defaults.clone());
    if let Some(db) = config.load_tools_db()? {
        engine = engine.with_tools_db(db);
    }
    engine.events().subscribe(
        EventFilter::Categories(vec![EventCategory::Progress]),
        |event| match event {
            GenerationEvent::Started { name, tool_count } => {
                debug!("{}: {} tools queued", name, tool_count)
            }
            GenerationEvent::Progress {
                name,
                tool_id,
                percent,
            } => info!("{}: tool {} done ({}%)", name, tool_id, percent),
            _ => {}
        },
    );
    Ok(engine)
}

fn tool_ids(ids: &[u32]) -> Vec<ToolId> {
    ids.iter().copied().map(ToolId).collect()
}

/// Generate a job from a project file
///
/// The program is written to `args.output` when given; the job is returned
/// either way.
pub fn generate(config: &Config, args: &GenerateArgs) -> anyhow::Result<Job> {
    let mut project = Project::load(&args.project)?;
    let ctx = config
        .generation_context()
        .with_exclusions(project.exclusion_areas());
    let engine = build_engine(config, ctx)?;

    for &diameter in &args.add_tools {
        let id = engine.add_tool(&mut project.object, diameter)?;
        info!("Added tool {} with diameter {}", id, diameter);
    }

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| format!("{}_cnc", project.object.name));
    let options = JobOptions {
        tools: (!args.tools.is_empty()).then(|| tool_ids(&args.tools)),
        seg_x: args.seg_x,
        seg_y: args.seg_y,
        retrigger_toolchange: args.retrigger_toolchange,
        plot: false,
        mode: if args.background {
            LaunchMode::Background
        } else {
            LaunchMode::Sync
        },
        ..JobOptions::default()
    };
    let output = engine.generate_job(&project.object, &name, options)?.wait()?;
    let job = output
        .as_job()
        .cloned()
        .ok_or_else(|| anyhow!("'{}' did not produce a job", name))?;

    if let Some(path) = &args.output {
        engine.export_gcode(&name, path)?;
    }
    if args.update_project {
        project.object.apply_job_feedback(&job);
        project.save(&args.project)?;
    }
    Ok(job)
}

/// Mill the holes or slots of a drill file into a geometry object
///
/// The object is written as JSON to `args.output` when given.
pub fn mill(config: &Config, args: &MillArgs, kind: MillKind) -> anyhow::Result<GeometryObject> {
    let excellon = load_excellon(&args.drills)?;
    let engine = build_engine(config, config.generation_context())?;
    let suffix = match kind {
        MillKind::Drills => "drill_mill",
        MillKind::Slots => "slot_mill",
    };
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| format!("{}_{}", excellon.name, suffix));

    let mut options = MillOptions::new(tool_ids(&args.tools), args.diameter);
    options.plot = false;
    let launch = match kind {
        MillKind::Drills => engine.generate_drill_mill(&excellon, &name, options)?,
        MillKind::Slots => engine.generate_slot_mill(&excellon, &name, options)?,
    };
    let output = launch.wait()?;
    let geometry = output
        .as_geometry()
        .cloned()
        .ok_or_else(|| anyhow!("'{}' did not produce geometry", name))?;

    if let Some(path) = &args.output {
        engine
            .export_geometry(&name, path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(geometry)
}

/// Write the default configuration to `path`
pub fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        return Err(anyhow!("{} already exists", path.display()));
    }
    Config::default().save_to_file(path)?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}
