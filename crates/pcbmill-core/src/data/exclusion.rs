//! Exclusion areas: regions travel moves must not cross at working height.

use serde::{Deserialize, Serialize};

use super::tools::{ExclusionShape, ExclusionStrategy, ParamSet};
use crate::geometry::Polygon;

/// A forbidden region for travel moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionArea {
    pub id: u32,
    /// Kind of object that defined the area (clamp, fixture, ...)
    pub source_kind: String,
    pub strategy: ExclusionStrategy,
    /// Height used when the strategy is `Over`
    pub over_z: f64,
    pub shape: Polygon,
}

impl ExclusionArea {
    pub fn new(
        id: u32,
        source_kind: impl Into<String>,
        strategy: ExclusionStrategy,
        over_z: f64,
        shape: Polygon,
    ) -> Self {
        Self {
            id,
            source_kind: source_kind.into(),
            strategy,
            over_z,
            shape,
        }
    }

    /// Area using the strategy and lift height configured on a tool
    pub fn with_tool_defaults(
        id: u32,
        source_kind: impl Into<String>,
        shape: Polygon,
        params: &ParamSet,
    ) -> Self {
        Self::new(
            id,
            source_kind,
            params.exclusion_strategy,
            params.exclusion_over_z,
            shape,
        )
    }

    /// Apply a tool's exclusion shape setting
    ///
    /// `Square` replaces the shape with its bounding rectangle.
    pub fn shaped(&self, shape: ExclusionShape) -> ExclusionArea {
        match shape {
            ExclusionShape::Polygon => self.clone(),
            ExclusionShape::Square => {
                let mut area = self.clone();
                if let Some(bb) = self.shape.bounds() {
                    area.shape = bb.to_polygon();
                }
                area
            }
        }
    }
}
