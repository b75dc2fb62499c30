//! Multi-tool job assembly.
//!
//! The orchestrator walks a tool table in order, runs a [`GCodeEmitter`]
//! per tool and stitches the results into one [`Job`]. A job either
//! completes for every tool or fails as a whole.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use pcbmill_core::{
    BoundingBox, CancellationToken, FailKind, FailResult, GenerationEvent, GeometryObject, Job,
    JobType, ToolId, ToolOutput, ToolRecord,
};
use tracing::{debug, error, info};

use crate::context::GenerationContext;
use crate::emitter::{preamble, GCodeEmitter, GeometrySource};
use crate::polish::PolygonClearer;
use crate::validation::validate_table;

/// Owned snapshot of everything a job run reads
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub name: String,
    pub object: GeometryObject,
    pub seg_x: f64,
    pub seg_y: f64,
    /// Emit the toolchange block for every tool, not only the first
    pub retrigger_toolchange: bool,
}

impl JobRequest {
    /// Deep-copy `object`, keeping only `tools` (in table order) when given
    pub fn snapshot(
        object: &GeometryObject,
        name: impl Into<String>,
        tools: Option<&[ToolId]>,
        seg_x: f64,
        seg_y: f64,
        retrigger_toolchange: bool,
    ) -> FailResult<Self> {
        let mut snapshot = object.clone();
        if let Some(ids) = tools {
            snapshot.tools = object.tools.subset(ids)?;
        }
        Ok(Self {
            name: name.into(),
            object: snapshot,
            seg_x,
            seg_y,
            retrigger_toolchange,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Drives the per-tool steps of one job
pub struct JobOrchestrator<'a> {
    ctx: &'a GenerationContext,
    cancel: &'a CancellationToken,
}

impl<'a> JobOrchestrator<'a> {
    pub fn new(ctx: &'a GenerationContext, cancel: &'a CancellationToken) -> Self {
        Self { ctx, cancel }
    }

    fn publish(&self, event: GenerationEvent) {
        if let Err(err) = self.ctx.events.publish(event) {
            debug!("Generation event not delivered: {}", err);
        }
    }

    pub fn run(&self, request: &JobRequest) -> FailResult<Job> {
        let object = &request.object;
        validate_table(&object.tools)?;
        self.cancel.check()?;

        let total = object.tools.len();
        info!(
            "Generating job '{}' from '{}' with {} tools",
            request.name, object.name, total
        );
        self.publish(GenerationEvent::Started {
            name: request.name.clone(),
            tool_count: total,
        });

        let bounds = object.bounds();
        let mut outputs: Vec<ToolOutput> = Vec::with_capacity(total);
        let mut start_gcode = String::new();

        for (index, record) in object.tools.iter().enumerate() {
            self.cancel.check()?;
            let first = index == 0;

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_tool(object, record, bounds.as_ref(), first, request.retrigger_toolchange)
            }));
            let output = match result {
                Ok(output) => output?,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        "Tool {} of '{}' panicked during generation: {}",
                        record.tool_id, object.name, message
                    );
                    return Err(FailKind::internal(format!(
                        "tool {} panicked: {}",
                        record.tool_id, message
                    )));
                }
            };

            if first {
                start_gcode = preamble(self.ctx, record);
            }
            outputs.push(output);
            self.publish(GenerationEvent::Progress {
                name: request.name.clone(),
                tool_id: record.tool_id,
                percent: ((index + 1) * 100 / total) as u8,
            });
        }

        let mut source_text = start_gcode.clone();
        for output in &outputs {
            source_text.push_str(&output.gcode);
        }
        source_text.push_str("M2 ; End of program\n");

        // Validated tables are never empty
        let first = object
            .tools
            .first()
            .ok_or_else(|| FailKind::empty("tool table"))?;
        let multigeo = object.multigeo || outputs.iter().any(|o| o.job_type == JobType::Polish);

        let job = Job {
            name: request.name.clone(),
            multitool: outputs.len() > 1,
            multigeo,
            seg_x: request.seg_x,
            seg_y: request.seg_y,
            probe_z: first.params.probe_z,
            probe_feedrate: first.params.feedrate_probe,
            bounds,
            units: self.ctx.units,
            start_gcode,
            source_text,
            tools: outputs,
        };
        info!(
            "Job '{}' finished: {} tools, {} moves",
            job.name,
            job.tools.len(),
            job.move_count()
        );
        Ok(job)
    }

    fn run_tool(
        &self,
        object: &GeometryObject,
        record: &ToolRecord,
        bounds: Option<&BoundingBox>,
        first: bool,
        retrigger: bool,
    ) -> FailResult<ToolOutput> {
        debug!(
            "Tool {} ({:?}, diameter {})",
            record.tool_id, record.params.job_type, record.diameter
        );
        let emitter = GCodeEmitter::new(self.ctx, record);

        if record.params.job_type == JobType::Polish {
            let bounds = bounds
                .ok_or_else(|| FailKind::empty(format!("object {} has no geometry", object.name)))?;
            let clearer = PolygonClearer::new(
                self.ctx.kernel.as_ref(),
                record.diameter,
                record.params.polish_overlap,
                self.cancel,
            )?;
            let paths = clearer.clear_bounds(
                bounds,
                record.params.polish_margin,
                record.params.polish_method,
            )?;
            return emitter.run(GeometrySource::Prepared(paths), first, retrigger);
        }

        emitter.run(
            GeometrySource::Outline(object.geometry_for(record.tool_id)),
            first,
            retrigger,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbmill_core::{ParamSet, PolishMethod, Polygon, ToolShape};

    fn object() -> GeometryObject {
        let mut object =
            GeometryObject::new("board", vec![Polygon::rectangle(0.0, 0.0, 10.0, 10.0)]);
        for (id, dia) in [(1, 0.2), (2, 0.4)] {
            object
                .tools
                .insert(ToolRecord::new(id, dia, ParamSet::default()))
                .unwrap();
        }
        object
    }

    #[test]
    fn test_job_aggregates_tools() {
        let ctx = GenerationContext::default();
        let cancel = CancellationToken::new();
        let request = JobRequest::snapshot(&object(), "board_cnc", None, 1.0, 2.0, false).unwrap();
        let job = JobOrchestrator::new(&ctx, &cancel).run(&request).unwrap();

        assert_eq!(job.tool_ids(), vec![ToolId(1), ToolId(2)]);
        assert!(job.multitool);
        assert!(!job.multigeo);
        assert_eq!((job.seg_x, job.seg_y), (1.0, 2.0));
        assert!(job.source_text.starts_with(&job.start_gcode));
        assert!(job.source_text.ends_with("M2 ; End of program\n"));
        assert_eq!(job.bounds.unwrap().width(), 10.0);
    }

    #[test]
    fn test_tool_subset() {
        let ctx = GenerationContext::default();
        let cancel = CancellationToken::new();
        let request =
            JobRequest::snapshot(&object(), "board_cnc", Some(&[ToolId(2)]), 0.0, 0.0, false)
                .unwrap();
        let job = JobOrchestrator::new(&ctx, &cancel).run(&request).unwrap();
        assert_eq!(job.tool_ids(), vec![ToolId(2)]);
        assert!(!job.multitool);

        assert_eq!(
            JobRequest::snapshot(&object(), "x", Some(&[ToolId(9)]), 0.0, 0.0, false).unwrap_err(),
            FailKind::ToolNotFound { tool_id: 9 }
        );
    }

    #[test]
    fn test_polish_tool_makes_job_multigeo() {
        let ctx = GenerationContext::default();
        let cancel = CancellationToken::new();
        let mut source = object();
        source
            .tools
            .insert(ToolRecord::new(
                3,
                2.0,
                ParamSet {
                    job_type: JobType::Polish,
                    polish_method: PolishMethod::Lines,
                    polish_overlap: 0.2,
                    ..ParamSet::default()
                },
            ))
            .unwrap();
        let request = JobRequest::snapshot(&source, "polish", None, 0.0, 0.0, false).unwrap();
        let job = JobOrchestrator::new(&ctx, &cancel).run(&request).unwrap();
        assert!(job.multigeo);
        assert!(!job.tool(ToolId(3)).unwrap().geometry.is_empty());

        source.apply_job_feedback(&job);
        assert!(source.multigeo);
        assert!(!source.tools.get(ToolId(3)).unwrap().cleared_paths.is_empty());
        assert_eq!(
            source.tools.get(ToolId(1)).unwrap().owned_geometry,
            source.solid_geometry
        );
    }

    #[test]
    fn test_vbit_cut_z_written_to_output() {
        let ctx = GenerationContext::default();
        let cancel = CancellationToken::new();
        let mut source = GeometryObject::new("v", vec![Polygon::rectangle(0.0, 0.0, 5.0, 5.0)]);
        source
            .tools
            .insert(ToolRecord::new(
                1,
                1.0,
                ParamSet {
                    tool_shape: ToolShape::V,
                    v_tip_dia: 0.2,
                    v_tip_angle: 90.0,
                    ..ParamSet::default()
                },
            ))
            .unwrap();
        let request = JobRequest::snapshot(&source, "v_cnc", None, 0.0, 0.0, false).unwrap();
        let job = JobOrchestrator::new(&ctx, &cancel).run(&request).unwrap();
        assert!((job.tools[0].cut_z + 0.4).abs() < 1e-12);

        source.apply_job_feedback(&job);
        assert!((source.tools.get(ToolId(1)).unwrap().params.cut_z + 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_table_rejected_before_work() {
        let ctx = GenerationContext::default();
        let cancel = CancellationToken::new();
        let empty = GeometryObject::new("empty", Vec::new());
        let request = JobRequest::snapshot(&empty, "none", None, 0.0, 0.0, false).unwrap();
        assert!(matches!(
            JobOrchestrator::new(&ctx, &cancel).run(&request),
            Err(FailKind::InvalidParameters(_))
        ));
    }
}
