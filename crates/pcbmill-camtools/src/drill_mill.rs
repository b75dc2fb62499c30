//! Drill and slot milling.
//!
//! Converts drilled holes and slots into rings a smaller end mill can
//! follow. The ring is the hole outline shrunk by the mill radius, so the
//! mill cuts the hole to its drilled size.

use pcbmill_core::{DrillTool, ExcellonObject, FailKind, FailResult, Polygon, ToolId};
use tracing::debug;

use crate::kernel::GeometryKernel;

/// Extra radius given to slot rings
pub const SLOT_CLEARANCE: f64 = 0.0001;

/// Radius used when the mill exactly matches the hole
pub const DEGENERATE_RADIUS: f64 = 1e-7;

const FIT_EPSILON: f64 = 1e-9;

/// Converts Excellon holes and slots into milling rings
pub struct DrillToMillConverter<'a> {
    kernel: &'a dyn GeometryKernel,
    mill_diameter: f64,
}

impl<'a> DrillToMillConverter<'a> {
    pub fn new(kernel: &'a dyn GeometryKernel, mill_diameter: f64) -> FailResult<Self> {
        if mill_diameter <= 0.0 || !mill_diameter.is_finite() {
            return Err(FailKind::InvalidParameters(format!(
                "milling tool diameter must be positive, got {}",
                mill_diameter
            )));
        }
        Ok(Self {
            kernel,
            mill_diameter,
        })
    }

    /// Resolve the selection and reject tools the mill does not fit into.
    ///
    /// Every tool is checked before any geometry is built.
    fn selected_tools<'s>(
        &self,
        source: &'s ExcellonObject,
        tools: &[ToolId],
        has_work: impl Fn(&DrillTool) -> bool,
    ) -> FailResult<Vec<&'s DrillTool>> {
        if tools.is_empty() {
            return Err(FailKind::empty(format!(
                "no drill tools selected in {}",
                source.name
            )));
        }
        let mut selected = Vec::with_capacity(tools.len());
        for id in tools {
            let tool = source
                .tool(*id)
                .ok_or(FailKind::ToolNotFound { tool_id: id.0 })?;
            if !has_work(tool) {
                continue;
            }
            if self.mill_diameter > tool.diameter + FIT_EPSILON {
                return Err(FailKind::ToolLargerThanHole {
                    tool_id: tool.tool_id.0,
                    hole_diameter: tool.diameter,
                    mill_diameter: self.mill_diameter,
                });
            }
            selected.push(tool);
        }
        Ok(selected)
    }

    /// One ring per drilled hole of the selected tools
    pub fn drills_to_mill(
        &self,
        source: &ExcellonObject,
        tools: &[ToolId],
    ) -> FailResult<Vec<Polygon>> {
        let selected = self.selected_tools(source, tools, |t| !t.drills.is_empty())?;

        let mut rings = Vec::new();
        for tool in selected {
            let mut radius = tool.diameter / 2.0 - self.mill_diameter / 2.0;
            if radius.abs() <= FIT_EPSILON {
                radius = DEGENERATE_RADIUS;
            }
            debug!(
                "Milling {} holes of tool {} with ring radius {}",
                tool.drills.len(),
                tool.tool_id,
                radius
            );
            for center in &tool.drills {
                rings.push(Polygon::new(self.kernel.buffer_point(*center, radius)?));
            }
        }

        if rings.is_empty() {
            return Err(FailKind::empty(format!(
                "selected tools of {} have no drill holes",
                source.name
            )));
        }
        Ok(rings)
    }

    /// One capsule ring per slot of the selected tools
    pub fn slots_to_mill(
        &self,
        source: &ExcellonObject,
        tools: &[ToolId],
    ) -> FailResult<Vec<Polygon>> {
        let selected = self.selected_tools(source, tools, |t| !t.slots.is_empty())?;

        let mut rings = Vec::new();
        for tool in selected {
            let radius = tool.diameter / 2.0 - self.mill_diameter / 2.0 + SLOT_CLEARANCE;
            debug!(
                "Milling {} slots of tool {} with ring radius {}",
                tool.slots.len(),
                tool.tool_id,
                radius
            );
            for slot in &tool.slots {
                rings.push(Polygon::new(
                    self.kernel.buffer_segment(slot.start, slot.stop, radius)?,
                ));
            }
        }

        if rings.is_empty() {
            return Err(FailKind::empty(format!(
                "selected tools of {} have no slots",
                source.name
            )));
        }
        Ok(rings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CavcKernel;
    use pcbmill_core::{Point, Slot};

    fn excellon() -> ExcellonObject {
        ExcellonObject {
            name: "drills".to_string(),
            tools: vec![
                DrillTool {
                    tool_id: ToolId(1),
                    diameter: 0.8,
                    drills: vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)],
                    slots: Vec::new(),
                },
                DrillTool {
                    tool_id: ToolId(2),
                    diameter: 1.0,
                    drills: vec![Point::new(10.0, 10.0)],
                    slots: vec![Slot {
                        start: Point::new(0.0, 5.0),
                        stop: Point::new(3.0, 5.0),
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_larger_mill_fails_before_building() {
        let kernel = CavcKernel::default();
        let conv = DrillToMillConverter::new(&kernel, 0.9).unwrap();
        let err = conv
            .drills_to_mill(&excellon(), &[ToolId(2), ToolId(1)])
            .unwrap_err();
        assert_eq!(
            err,
            FailKind::ToolLargerThanHole {
                tool_id: 1,
                hole_diameter: 0.8,
                mill_diameter: 0.9
            }
        );
    }

    #[test]
    fn test_equal_diameter_gives_degenerate_ring() {
        let kernel = CavcKernel::default();
        let conv = DrillToMillConverter::new(&kernel, 0.8).unwrap();
        let rings = conv.drills_to_mill(&excellon(), &[ToolId(1)]).unwrap();
        assert_eq!(rings.len(), 2);
        assert!(rings[0].exterior.len() >= 3);
        let bb = rings[0].bounds().unwrap();
        assert!(bb.width() <= 2.0 * DEGENERATE_RADIUS + 1e-12);
    }

    #[test]
    fn test_unknown_tool() {
        let kernel = CavcKernel::default();
        let conv = DrillToMillConverter::new(&kernel, 0.5).unwrap();
        assert_eq!(
            conv.drills_to_mill(&excellon(), &[ToolId(7)]).unwrap_err(),
            FailKind::ToolNotFound { tool_id: 7 }
        );
    }

    #[test]
    fn test_slots() {
        let kernel = CavcKernel::default();
        let conv = DrillToMillConverter::new(&kernel, 0.5).unwrap();
        let rings = conv
            .slots_to_mill(&excellon(), &[ToolId(1), ToolId(2)])
            .unwrap();
        assert_eq!(rings.len(), 1);
        let bb = rings[0].bounds().unwrap();
        let r = 0.5 - 0.25 + SLOT_CLEARANCE;
        assert!((bb.width() - (3.0 + 2.0 * r)).abs() < 1e-9);

        assert!(matches!(
            conv.slots_to_mill(&excellon(), &[ToolId(1)]),
            Err(FailKind::EmptyGeometry { .. })
        ));
    }
}
