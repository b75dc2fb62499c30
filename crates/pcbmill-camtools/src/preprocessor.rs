//! Machine dialects selected by a tool's `preprocessor` name.

use pcbmill_core::{ParamSet, ToolId};
use tracing::warn;

use crate::context::GenerationContext;

/// Controller dialect used for toolchange, rapids and probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preprocessor {
    /// `T<n>` followed by `M6`
    #[default]
    Default,
    /// `T<n>` and an operator pause with `M0`, no `M6`
    Grbl11,
    /// No tool select, pause with `M0`, rapids carry a feed word
    Marlin,
    /// `Grbl11` plus a Z probe after the toolchange
    ProbeGrbl,
}

impl Preprocessor {
    /// Look up a preprocessor by name; unknown names fall back to `Default`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "default" | "" => Self::Default,
            "grbl_11" | "grbl" => Self::Grbl11,
            "marlin" => Self::Marlin,
            "probe_grbl" => Self::ProbeGrbl,
            other => {
                warn!("Unknown preprocessor '{}', using default", other);
                Self::Default
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grbl11 => "grbl_11",
            Self::Marlin => "marlin",
            Self::ProbeGrbl => "probe_grbl",
        }
    }

    /// Whether this dialect runs a probe cycle after the toolchange
    pub fn probes(&self) -> bool {
        matches!(self, Self::ProbeGrbl)
    }

    /// Suffix appended to every rapid move
    pub fn rapid_suffix(&self, ctx: &GenerationContext, params: &ParamSet) -> String {
        match self {
            Self::Marlin => format!(" F{}", ctx.fmt_feed(params.feedrate_rapid)),
            _ => String::new(),
        }
    }

    /// Tool select and operator pause
    pub fn write_tool_select(&self, gcode: &mut String, tool_id: ToolId, diameter: f64) {
        match self {
            Self::Default => {
                gcode.push_str(&format!("T{}\n", tool_id));
                gcode.push_str("M6 ; Tool change\n");
            }
            Self::Grbl11 | Self::ProbeGrbl => {
                gcode.push_str(&format!("T{}\n", tool_id));
                gcode.push_str(&format!(
                    "(MSG, Change to tool T{} with diameter {})\n",
                    tool_id, diameter
                ));
                gcode.push_str("M0 ; Pause for tool change\n");
            }
            Self::Marlin => {
                gcode.push_str(&format!(
                    "; Change to tool T{} with diameter {}\n",
                    tool_id, diameter
                ));
                gcode.push_str("M0 ; Pause for tool change\n");
            }
        }
    }

    /// Probe the new tool length and zero Z on the stock
    pub fn write_probe(&self, gcode: &mut String, ctx: &GenerationContext, params: &ParamSet) {
        if !self.probes() {
            return;
        }
        gcode.push_str(&format!(
            "G38.2 Z{} F{} ; Probe\n",
            ctx.fmt_coord(params.probe_z),
            ctx.fmt_feed(params.feedrate_probe)
        ));
        gcode.push_str("G92 Z0 ; Zero Z at probe contact\n");
        gcode.push_str(&format!(
            "G0 Z{}{}\n",
            ctx.fmt_coord(params.travel_z),
            self.rapid_suffix(ctx, params)
        ));
    }
}
