//! Generation context shared by every step of a run.

use std::fmt;
use std::sync::Arc;

use pcbmill_core::{format_number, EventBus, ExclusionArea, Units};

use crate::kernel::{CavcKernel, GeometryKernel};

/// Explicit settings and collaborators for a generation run.
///
/// Nothing in the engine reads global state; whatever a run needs comes
/// through this struct.
#[derive(Clone)]
pub struct GenerationContext {
    pub units: Units,
    /// Decimals written for X, Y and Z words
    pub coord_decimals: usize,
    /// Decimals written for F words
    pub feed_decimals: usize,
    /// Geometry tolerance (vertex merge distance)
    pub tolerance: f64,
    /// Segments used for a full circle when arcs are linearized
    pub steps_per_circle: usize,
    /// Safety margin added to the tool radius around exclusion areas
    pub exclusion_margin: f64,
    pub exclusions: Vec<ExclusionArea>,
    pub kernel: Arc<dyn GeometryKernel>,
    pub events: Arc<EventBus>,
}

impl Default for GenerationContext {
    fn default() -> Self {
        let tolerance = 1e-5;
        let steps_per_circle = 64;
        Self {
            units: Units::Mm,
            coord_decimals: 4,
            feed_decimals: 2,
            tolerance,
            steps_per_circle,
            exclusion_margin: 0.5,
            exclusions: Vec::new(),
            kernel: Arc::new(CavcKernel::new(steps_per_circle, tolerance)),
            events: Arc::new(EventBus::new()),
        }
    }
}

impl fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationContext")
            .field("units", &self.units)
            .field("coord_decimals", &self.coord_decimals)
            .field("feed_decimals", &self.feed_decimals)
            .field("tolerance", &self.tolerance)
            .field("steps_per_circle", &self.steps_per_circle)
            .field("exclusion_margin", &self.exclusion_margin)
            .field("exclusions", &self.exclusions.len())
            .finish_non_exhaustive()
    }
}

impl GenerationContext {
    /// Replace the geometry kernel
    pub fn with_kernel(mut self, kernel: Arc<dyn GeometryKernel>) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<ExclusionArea>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn fmt_coord(&self, value: f64) -> String {
        format_number(value, self.coord_decimals)
    }

    pub fn fmt_feed(&self, value: f64) -> String {
        format_number(value, self.feed_decimals)
    }
}
