//! Tool parameter validation run before any geometry is built.

use std::collections::HashSet;

use pcbmill_core::{FailKind, FailResult, JobType, ToolRecord, ToolShape, ToolTable};

use crate::error::{ParameterError, ParameterResult};

fn positive(name: &str, value: f64) -> ParameterResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be positive, got {}", value),
        })
    }
}

fn in_range(name: &str, value: f64, min: f64, max: f64) -> ParameterResult<()> {
    if value >= min && value < max {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Check one tool's parameter set
pub fn validate_tool(record: &ToolRecord) -> ParameterResult<()> {
    let p = &record.params;
    positive("diameter", record.diameter)?;
    positive("feedrate_xy", p.feedrate_xy)?;
    positive("feedrate_z", p.feedrate_z)?;

    if p.multidepth {
        positive("depth_per_pass", p.depth_per_pass)?;
    }
    if p.extracut {
        positive("extracut_length", p.extracut_length)?;
    }
    if p.dwell {
        positive("dwell_time", p.dwell_time)?;
    }
    if p.job_type == JobType::Polish {
        in_range("polish_overlap", p.polish_overlap, 0.0, 1.0)?;
    }
    if p.tool_shape == ToolShape::V {
        if !(p.v_tip_angle > 0.0 && p.v_tip_angle < 180.0) {
            return Err(ParameterError::OutOfRange {
                name: "v_tip_angle".to_string(),
                value: p.v_tip_angle,
                min: 0.0,
                max: 180.0,
            });
        }
        if p.v_tip_dia < 0.0 {
            return Err(ParameterError::InvalidValue {
                name: "v_tip_dia".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
    }
    Ok(())
}

/// Check every tool of a table; an empty table is rejected
///
/// Ids are checked again here since records are reachable mutably.
pub fn validate_table(table: &ToolTable) -> FailResult<()> {
    if table.is_empty() {
        return Err(ParameterError::Missing("tools".to_string()).into());
    }
    let mut seen = HashSet::new();
    for record in table {
        if record.tool_id.0 == 0 {
            return Err(FailKind::InvalidParameters(
                "tool id must be greater than zero".to_string(),
            ));
        }
        if !seen.insert(record.tool_id) {
            return Err(FailKind::DuplicateToolId {
                tool_id: record.tool_id.0,
            });
        }
        validate_tool(record).map_err(|err| {
            ParameterError::InvalidValue {
                name: format!("tool {}", record.tool_id),
                reason: err.to_string(),
            }
        })?;
    }
    Ok(())
}
