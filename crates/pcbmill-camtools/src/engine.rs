//! Caller-facing engine: tool creation and generation entry points.
//!
//! Every generation reserves its output name first, works on an owned
//! snapshot of the source, and only registers the result when the whole
//! run succeeded.

use std::path::Path as FsPath;
use std::sync::Arc;

use pcbmill_core::{
    CancellationToken, EventBus, ExcellonObject, FailKind, FailResult, GeneratedObject,
    GenerationEvent, GeometryObject, OffsetType, ParamSet, ToolId, ToolRecord, ToolTarget,
    ToolsDatabase,
};
use tracing::{debug, info, warn};

use crate::context::GenerationContext;
use crate::drill_mill::DrillToMillConverter;
use crate::error::{CamToolError, CamToolResult};
use crate::orchestrator::{JobOrchestrator, JobRequest};
use crate::registry::{ObjectRegistry, Promise};
use crate::worker::{JobHandle, WorkerPool};

/// Where a generation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchMode {
    /// On the calling thread
    #[default]
    Sync,
    /// On the engine's worker pool
    Background,
}

/// Outcome of starting a generation
pub enum Launch {
    Done(GeneratedObject),
    Pending(JobHandle<GeneratedObject>),
}

impl Launch {
    /// The produced object, waiting for a background run if needed
    pub fn wait(self) -> FailResult<GeneratedObject> {
        match self {
            Launch::Done(object) => Ok(object),
            Launch::Pending(handle) => handle.wait(),
        }
    }
}

/// Options for drill and slot milling
#[derive(Debug, Clone)]
pub struct MillOptions {
    /// Drill tools whose holes or slots are milled
    pub tools: Vec<ToolId>,
    pub mill_diameter: f64,
    pub plot: bool,
    pub mode: LaunchMode,
    pub cancel: CancellationToken,
}

impl MillOptions {
    pub fn new(tools: Vec<ToolId>, mill_diameter: f64) -> Self {
        Self {
            tools,
            mill_diameter,
            plot: true,
            mode: LaunchMode::Sync,
            cancel: CancellationToken::new(),
        }
    }
}

/// Options for job generation
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Tools to use, in table order; all tools when `None`
    pub tools: Option<Vec<ToolId>>,
    pub seg_x: f64,
    pub seg_y: f64,
    /// Emit the toolchange block for every tool
    pub retrigger_toolchange: bool,
    pub plot: bool,
    pub mode: LaunchMode,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy)]
enum MillKind {
    Drills,
    Slots,
}

/// Register or discard a finished run and publish the outcome
fn settle(
    promise: Promise,
    plot: bool,
    events: &EventBus,
    result: FailResult<GeneratedObject>,
) -> FailResult<GeneratedObject> {
    let name = promise.name().to_string();
    let event = match &result {
        Ok(object) => {
            promise.fulfill(object.clone(), plot);
            info!("Registered '{}'", name);
            GenerationEvent::Completed {
                name,
                output: Box::new(object.clone()),
            }
        }
        Err(FailKind::Cancelled) => {
            drop(promise);
            info!("Generation of '{}' cancelled", name);
            GenerationEvent::Cancelled { name }
        }
        Err(err) => {
            drop(promise);
            warn!("Generation of '{}' failed: {}", name, err);
            GenerationEvent::Failed {
                name,
                reason: err.clone(),
            }
        }
    };
    if let Err(err) = events.publish(event) {
        debug!("Generation event not delivered: {}", err);
    }
    result
}

/// Toolpath generation engine
pub struct CamEngine {
    ctx: Arc<GenerationContext>,
    registry: Arc<ObjectRegistry>,
    pool: WorkerPool,
    tools_db: Option<ToolsDatabase>,
    defaults: ParamSet,
}

impl CamEngine {
    /// Create an engine running background work on `workers` threads
    pub fn new(ctx: GenerationContext, workers: usize) -> CamToolResult<Self> {
        Ok(Self {
            ctx: Arc::new(ctx),
            registry: Arc::new(ObjectRegistry::new()),
            pool: WorkerPool::new(workers)?,
            tools_db: None,
            defaults: ParamSet::default(),
        })
    }

    pub fn with_tools_db(mut self, db: ToolsDatabase) -> Self {
        self.tools_db = Some(db);
        self
    }

    /// Parameters for new tools when the tools database has no match
    pub fn with_defaults(mut self, defaults: ParamSet) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn context(&self) -> &GenerationContext {
        &self.ctx
    }

    pub fn registry(&self) -> &Arc<ObjectRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.ctx.events
    }

    /// Parameters for a new tool: a tools database match or the defaults
    fn params_for(&self, diameter: f64, target: ToolTarget) -> FailResult<ParamSet> {
        let Some(db) = &self.tools_db else {
            return Ok(self.defaults.clone());
        };
        match db.lookup(diameter, target)? {
            Some(params) => {
                debug!("Tools database match for diameter {}", diameter);
                Ok(params)
            }
            None => {
                warn!(
                    "No tools database entry for diameter {} ({:?}), using defaults",
                    diameter, target
                );
                Ok(self.defaults.clone())
            }
        }
    }

    /// Append a tool of `diameter` to `object`
    pub fn add_tool(&self, object: &mut GeometryObject, diameter: f64) -> FailResult<ToolId> {
        if diameter <= 0.0 || !diameter.is_finite() {
            return Err(FailKind::InvalidParameters(format!(
                "tool diameter must be positive, got {}",
                diameter
            )));
        }
        let params = self.params_for(diameter, ToolTarget::Milling)?;
        let id = object.tools.next_id();
        object.tools.insert(ToolRecord::new(id.0, diameter, params))?;
        debug!("Added tool {} ({}) to '{}'", id, diameter, object.name);
        Ok(id)
    }

    /// Mill the drilled holes of the selected tools
    pub fn generate_drill_mill(
        &self,
        source: &ExcellonObject,
        out_name: &str,
        options: MillOptions,
    ) -> FailResult<Launch> {
        self.generate_mill(source, out_name, options, MillKind::Drills)
    }

    /// Mill the slots of the selected tools
    pub fn generate_slot_mill(
        &self,
        source: &ExcellonObject,
        out_name: &str,
        options: MillOptions,
    ) -> FailResult<Launch> {
        self.generate_mill(source, out_name, options, MillKind::Slots)
    }

    fn generate_mill(
        &self,
        source: &ExcellonObject,
        out_name: &str,
        options: MillOptions,
        kind: MillKind,
    ) -> FailResult<Launch> {
        let promise = self.registry.reserve(out_name)?;
        let params = match self.params_for(options.mill_diameter, ToolTarget::Milling) {
            Ok(params) => ParamSet {
                offset_type: OffsetType::Path,
                ..params
            },
            Err(err) => {
                return settle(promise, options.plot, &self.ctx.events, Err(err)).map(Launch::Done)
            }
        };

        let source = source.clone();
        let ctx = Arc::clone(&self.ctx);
        let cancel = options.cancel.clone();
        let name = out_name.to_string();
        let mill_diameter = options.mill_diameter;
        let tools = options.tools;
        let work = move || -> FailResult<GeneratedObject> {
            cancel.check()?;
            info!(
                "Generating {:?} milling '{}' from '{}' with a {} mill",
                kind, name, source.name, mill_diameter
            );
            let converter = DrillToMillConverter::new(ctx.kernel.as_ref(), mill_diameter)?;
            let rings = match kind {
                MillKind::Drills => converter.drills_to_mill(&source, &tools)?,
                MillKind::Slots => converter.slots_to_mill(&source, &tools)?,
            };
            cancel.check()?;
            let mut geometry = GeometryObject::new(name, rings);
            geometry
                .tools
                .insert(ToolRecord::new(1, mill_diameter, params))?;
            Ok(GeneratedObject::Geometry(Box::new(geometry)))
        };
        self.launch(promise, options.plot, options.mode, options.cancel, work)
    }

    /// Generate a job from `object`.
    ///
    /// The source object is not modified; apply the finished job with
    /// [`GeometryObject::apply_job_feedback`] to keep V-bit depths and
    /// polish paths.
    pub fn generate_job(
        &self,
        object: &GeometryObject,
        out_name: &str,
        options: JobOptions,
    ) -> FailResult<Launch> {
        let promise = self.registry.reserve(out_name)?;
        let request = match JobRequest::snapshot(
            object,
            out_name,
            options.tools.as_deref(),
            options.seg_x,
            options.seg_y,
            options.retrigger_toolchange,
        ) {
            Ok(request) => request,
            Err(err) => {
                return settle(promise, options.plot, &self.ctx.events, Err(err)).map(Launch::Done)
            }
        };

        let ctx = Arc::clone(&self.ctx);
        let cancel = options.cancel.clone();
        let work = move || -> FailResult<GeneratedObject> {
            let job = JobOrchestrator::new(&ctx, &cancel).run(&request)?;
            Ok(GeneratedObject::Job(Box::new(job)))
        };
        self.launch(promise, options.plot, options.mode, options.cancel, work)
    }

    fn launch<F>(
        &self,
        promise: Promise,
        plot: bool,
        mode: LaunchMode,
        cancel: CancellationToken,
        work: F,
    ) -> FailResult<Launch>
    where
        F: FnOnce() -> FailResult<GeneratedObject> + Send + 'static,
    {
        let events = Arc::clone(&self.ctx.events);
        let name = promise.name().to_string();
        let task = move || settle(promise, plot, &events, work());
        match mode {
            LaunchMode::Sync => task().map(Launch::Done),
            LaunchMode::Background => Ok(Launch::Pending(self.pool.spawn(name, cancel, task))),
        }
    }

    /// Write the program text of a registered job to `path`
    pub fn export_gcode(&self, name: &str, path: &FsPath) -> CamToolResult<()> {
        let registered = self
            .registry
            .get(name)
            .ok_or_else(|| CamToolError::ObjectNotFound(name.to_string()))?;
        let job = registered
            .object
            .as_job()
            .ok_or_else(|| CamToolError::ObjectNotFound(format!("{} is not a job", name)))?;
        std::fs::write(path, &job.source_text)?;
        info!("Exported '{}' to {}", name, path.display());
        Ok(())
    }

    /// Write a registered geometry object to `path` as JSON
    pub fn export_geometry(&self, name: &str, path: &FsPath) -> CamToolResult<()> {
        let registered = self
            .registry
            .get(name)
            .ok_or_else(|| CamToolError::ObjectNotFound(name.to_string()))?;
        let geometry = registered.object.as_geometry().ok_or_else(|| {
            CamToolError::ObjectNotFound(format!("{} is not a geometry object", name))
        })?;
        let content = serde_json::to_string_pretty(geometry)?;
        std::fs::write(path, content)?;
        info!("Exported '{}' to {}", name, path.display());
        Ok(())
    }
}
