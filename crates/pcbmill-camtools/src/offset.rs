//! Tool offset resolution.

use pcbmill_core::{FailKind, FailResult, OffsetType, ToolId};

/// Signed path offset for a tool.
///
/// Positive values move the path away from the material outline (outward),
/// negative ones into it.
pub fn resolve_offset(
    offset_type: OffsetType,
    diameter: f64,
    offset_value: Option<f64>,
    tool_id: ToolId,
) -> FailResult<f64> {
    match offset_type {
        OffsetType::Path => Ok(0.0),
        OffsetType::In => Ok(-diameter / 2.0),
        OffsetType::Out => Ok(diameter / 2.0),
        OffsetType::Custom => match offset_value {
            Some(value) if value != 0.0 && value.is_finite() => Ok(value),
            _ => Err(FailKind::MissingOffsetValue { tool_id: tool_id.0 }),
        },
    }
}
