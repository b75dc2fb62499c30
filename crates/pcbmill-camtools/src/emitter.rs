//! Per-tool G-code emission.
//!
//! A [`GCodeEmitter`] takes one tool from its parameter set to finished
//! G-code in fixed steps:
//!
//! ```text
//! Idle -> OffsetResolved -> DepthPlanned -> GeometryBuilt -> Emitted -> Parsed -> Done
//! ```
//!
//! Any failing step, or a step called out of order, leaves the emitter in
//! `Failed`.

use std::sync::OnceLock;

use pcbmill_core::{
    FailKind, FailResult, Move, MoveKind, Path, Point, Polygon, ToolOutput, ToolRecord,
    ToolShape, Units,
};
use regex::Regex;
use tracing::debug;

use crate::context::GenerationContext;
use crate::depth::{plan_depths, vbit_cut_z};
use crate::exclusion::{ExclusionRouter, TravelStep};
use crate::offset::resolve_offset;
use crate::preprocessor::Preprocessor;

/// Generator line written at the top of every program
pub const GENERATOR: &str = concat!("pcbmill ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Idle,
    OffsetResolved,
    DepthPlanned,
    GeometryBuilt,
    Emitted,
    Parsed,
    Done,
    Failed,
}

/// Geometry a tool cuts
#[derive(Debug, Clone)]
pub enum GeometrySource<'a> {
    /// Material outlines; the tool offset is applied to them
    Outline(&'a [Polygon]),
    /// Finished paths (clearing passes, drill rings) cut as given
    Prepared(Vec<Path>),
}

/// Program header owned by the first tool of a job.
pub fn preamble(ctx: &GenerationContext, record: &ToolRecord) -> String {
    let mut gcode = String::new();
    gcode.push_str(&format!("; Generated by {}\n", GENERATOR));
    gcode.push_str(&format!("; Units: {}\n", ctx.units));
    gcode.push_str(&format!(
        "; First tool: T{} diameter {} ({:?})\n",
        record.tool_id,
        ctx.fmt_coord(record.diameter),
        record.params.job_type
    ));
    gcode.push_str(&format!(
        "{} ; Set units to {}\n",
        ctx.units.gcode(),
        match ctx.units {
            Units::Mm => "millimeters",
            Units::In => "inches",
        }
    ));
    gcode.push_str("G90 ; Absolute positioning\n");
    gcode.push_str("G94 ; Feed rate per minute\n");
    gcode
}

/// Tracks the machine position while text is written
struct Writer<'a> {
    ctx: &'a GenerationContext,
    rapid_suffix: String,
    gcode: String,
    position: Option<Point>,
    z: Option<f64>,
}

impl<'a> Writer<'a> {
    fn new(ctx: &'a GenerationContext, rapid_suffix: String) -> Self {
        Self {
            ctx,
            rapid_suffix,
            gcode: String::new(),
            position: None,
            z: None,
        }
    }

    fn line(&mut self, text: &str) {
        self.gcode.push_str(text);
        self.gcode.push('\n');
    }

    fn rapid_z(&mut self, z: f64) {
        self.gcode.push_str(&format!(
            "G0 Z{}{}\n",
            self.ctx.fmt_coord(z),
            self.rapid_suffix
        ));
        self.z = Some(z);
    }

    fn rapid_xy(&mut self, p: Point) {
        self.gcode.push_str(&format!(
            "G0 X{} Y{}{}\n",
            self.ctx.fmt_coord(p.x),
            self.ctx.fmt_coord(p.y),
            self.rapid_suffix
        ));
        self.position = Some(p);
    }

    fn plunge(&mut self, z: f64, feed: f64) {
        self.gcode.push_str(&format!(
            "G1 Z{} F{}\n",
            self.ctx.fmt_coord(z),
            self.ctx.fmt_feed(feed)
        ));
        self.z = Some(z);
    }

    fn cut(&mut self, p: Point, feed: f64) {
        self.gcode.push_str(&format!(
            "G1 X{} Y{} F{}\n",
            self.ctx.fmt_coord(p.x),
            self.ctx.fmt_coord(p.y),
            self.ctx.fmt_feed(feed)
        ));
        self.position = Some(p);
    }

    fn spindle_on(&mut self, speed: Option<u32>) {
        match speed {
            Some(s) => self.line(&format!("M3 S{} ; Start spindle", s)),
            None => self.line("M3 ; Start spindle"),
        }
    }

    fn dwell(&mut self, seconds: f64) {
        self.line(&format!("G4 P{} ; Dwell", self.ctx.fmt_feed(seconds)));
    }
}

/// Points that re-cut the first `length` of a closed ring
fn extracut_points(points: &[Point], length: f64) -> Vec<Point> {
    let mut remaining = length;
    let mut out = Vec::new();
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let segment = a.distance_to(&b);
        if segment < 1e-12 {
            continue;
        }
        if segment >= remaining {
            out.push(a.lerp(&b, remaining / segment));
            break;
        }
        out.push(b);
        remaining -= segment;
    }
    out
}

/// Emits one tool's G-code
pub struct GCodeEmitter<'a> {
    ctx: &'a GenerationContext,
    record: &'a ToolRecord,
    preprocessor: Preprocessor,
    state: EmitterState,
    offset: f64,
    cut_z: f64,
    vbit_fallback: bool,
    depths: Vec<f64>,
    paths: Vec<Path>,
    gcode: String,
    moves: Vec<Move>,
}

impl<'a> GCodeEmitter<'a> {
    pub fn new(ctx: &'a GenerationContext, record: &'a ToolRecord) -> Self {
        Self {
            ctx,
            record,
            preprocessor: Preprocessor::from_name(&record.params.preprocessor),
            state: EmitterState::Idle,
            offset: 0.0,
            cut_z: record.params.cut_z,
            vbit_fallback: false,
            depths: Vec::new(),
            paths: Vec::new(),
            gcode: String::new(),
            moves: Vec::new(),
        }
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Effective cut depth, derived for V-bits once depths are planned
    pub fn cut_z(&self) -> f64 {
        self.cut_z
    }

    /// Whether the V-bit derivation fell back to the stored cut depth
    pub fn vbit_fallback(&self) -> bool {
        self.vbit_fallback
    }

    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    fn fail(&mut self, err: FailKind) -> FailKind {
        self.state = EmitterState::Failed;
        err
    }

    fn require_state(&mut self, expected: EmitterState) -> FailResult<()> {
        if self.state == expected {
            return Ok(());
        }
        let err = FailKind::internal(format!(
            "emitter step out of order: expected {:?}, state is {:?}",
            expected, self.state
        ));
        Err(self.fail(err))
    }

    pub fn resolve_offset(&mut self) -> FailResult<f64> {
        self.require_state(EmitterState::Idle)?;
        let p = &self.record.params;
        match resolve_offset(
            p.offset_type,
            self.record.diameter,
            p.offset_value,
            self.record.tool_id,
        ) {
            Ok(offset) => {
                self.offset = offset;
                self.state = EmitterState::OffsetResolved;
                Ok(offset)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn plan_depths(&mut self) -> FailResult<&[f64]> {
        self.require_state(EmitterState::OffsetResolved)?;
        let p = &self.record.params;
        if p.tool_shape == ToolShape::V {
            let (cut_z, fallback) =
                vbit_cut_z(self.record.diameter, p.v_tip_dia, p.v_tip_angle, p.cut_z);
            self.cut_z = cut_z;
            self.vbit_fallback = fallback;
        }
        self.depths = match plan_depths(self.cut_z, p.depth_per_pass, p.multidepth) {
            Ok(depths) => depths,
            Err(err) => return Err(self.fail(err)),
        };
        debug!(
            "Tool {} cuts at depths {:?}",
            self.record.tool_id, self.depths
        );
        self.state = EmitterState::DepthPlanned;
        Ok(&self.depths)
    }

    fn offset_outline(&self, polygons: &[Polygon]) -> FailResult<Vec<Path>> {
        let kernel = self.ctx.kernel.as_ref();
        let mut paths = Vec::new();
        for polygon in polygons {
            for ring in kernel.offset_ring(&polygon.exterior, self.offset)? {
                paths.push(Path::closed(ring));
            }
            for hole in &polygon.interiors {
                for ring in kernel.offset_ring(hole, -self.offset)? {
                    paths.push(Path::closed(ring));
                }
            }
        }
        Ok(paths)
    }

    pub fn build_geometry(&mut self, source: GeometrySource<'_>) -> FailResult<&[Path]> {
        self.require_state(EmitterState::DepthPlanned)?;
        let built = match source {
            GeometrySource::Outline(polygons) => self.offset_outline(polygons),
            GeometrySource::Prepared(paths) => Ok(paths),
        };
        let paths: Vec<Path> = match built {
            Ok(paths) => paths.into_iter().filter(|p| !p.is_empty()).collect(),
            Err(err) => return Err(self.fail(err)),
        };
        if paths.is_empty() {
            let err = FailKind::empty(format!("tool {} has nothing to cut", self.record.tool_id));
            return Err(self.fail(err));
        }
        self.paths = paths;
        self.state = EmitterState::GeometryBuilt;
        Ok(&self.paths)
    }

    /// Write the tool body.
    ///
    /// The toolchange block is written when the tool asks for one and it is
    /// either the first tool of the job or `retrigger` is set.
    pub fn emit(&mut self, first: bool, retrigger: bool) -> FailResult<&str> {
        self.require_state(EmitterState::GeometryBuilt)?;
        match self.write_body(first, retrigger) {
            Ok(gcode) => {
                self.gcode = gcode;
                self.state = EmitterState::Emitted;
                Ok(&self.gcode)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn write_body(&self, first: bool, retrigger: bool) -> FailResult<String> {
        let record = self.record;
        let p = &record.params;
        let ctx = self.ctx;
        let mut w = Writer::new(ctx, self.preprocessor.rapid_suffix(ctx, p));

        w.line(&format!(
            "; T{}: {:?} {:?} diameter {} cut Z {}",
            record.tool_id,
            p.job_type,
            p.tool_shape,
            ctx.fmt_coord(record.diameter),
            ctx.fmt_coord(self.cut_z)
        ));

        if p.toolchange && (first || retrigger) {
            w.rapid_z(p.toolchange_z);
            if let Some(xy) = p.toolchange_xy {
                w.rapid_xy(xy);
            }
            self.preprocessor
                .write_tool_select(&mut w.gcode, record.tool_id, record.diameter);
            w.spindle_on(p.spindle_speed);
            if self.preprocessor.probes() {
                self.preprocessor.write_probe(&mut w.gcode, ctx, p);
                w.z = Some(p.travel_z);
            }
        } else {
            w.spindle_on(p.spindle_speed);
        }
        if p.dwell {
            w.dwell(p.dwell_time);
        }

        let router = if p.exclusion && !ctx.exclusions.is_empty() {
            ExclusionRouter::new(
                ctx.kernel.as_ref(),
                &ctx.exclusions,
                p.exclusion_shape,
                record.radius() + ctx.exclusion_margin,
            )?
        } else {
            ExclusionRouter::default()
        };

        for path in &self.paths {
            let Some(start) = path.start() else {
                continue;
            };
            for &depth in &self.depths {
                if w.z != Some(p.travel_z) {
                    w.rapid_z(p.travel_z);
                }
                match w.position {
                    Some(from) => {
                        for step in router.route(from, start, p.travel_z)?.steps {
                            match step {
                                TravelStep::Rapid(point) => w.rapid_xy(point),
                                TravelStep::RiseTo(z) | TravelStep::LowerTo(z) => w.rapid_z(z),
                            }
                        }
                    }
                    None => w.rapid_xy(start),
                }
                w.plunge(depth, p.feedrate_z);
                for point in &path.points[1..] {
                    w.cut(*point, p.feedrate_xy);
                }
                if path.closed {
                    w.cut(start, p.feedrate_xy);
                    if p.extracut {
                        for point in extracut_points(&path.points, p.extracut_length) {
                            w.cut(point, p.feedrate_xy);
                        }
                    }
                }
            }
        }

        w.rapid_z(p.end_z);
        if let Some(xy) = p.end_xy {
            w.rapid_xy(xy);
        }
        w.line("M5 ; Stop spindle");
        Ok(w.gcode)
    }

    pub fn parse(&mut self) -> FailResult<&[Move]> {
        self.require_state(EmitterState::Emitted)?;
        self.moves = parse_moves(&self.gcode);
        self.state = EmitterState::Parsed;
        Ok(&self.moves)
    }

    pub fn finish(mut self) -> FailResult<ToolOutput> {
        self.require_state(EmitterState::Parsed)?;
        self.state = EmitterState::Done;
        Ok(ToolOutput {
            tool_id: self.record.tool_id,
            diameter: self.record.diameter,
            job_type: self.record.params.job_type,
            gcode: self.gcode,
            parsed_moves: self.moves,
            geometry: self.paths,
            cut_z: self.cut_z,
        })
    }

    /// Run every step in order
    pub fn run(
        mut self,
        source: GeometrySource<'_>,
        first: bool,
        retrigger: bool,
    ) -> FailResult<ToolOutput> {
        self.resolve_offset()?;
        self.plan_depths()?;
        self.build_geometry(source)?;
        self.emit(first, retrigger)?;
        self.parse()?;
        self.finish()
    }
}

/// Parse motion lines of generated G-code into absolute moves.
///
/// Only `G0`, `G1` and `G38.2` produce moves; `G92` resets Z. Comments in
/// `;` or parenthesis form are ignored.
pub fn parse_moves(gcode: &str) -> Vec<Move> {
    static COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    let comments =
        COMMENT_REGEX.get_or_init(|| Regex::new(r"[;(].*").expect("invalid regex pattern"));
    let commands = COMMAND_REGEX.get_or_init(|| {
        Regex::new(r"^(G38\.2|G92|G0?1|G0?0)(\s|$)").expect("invalid regex pattern")
    });
    let words = WORD_REGEX.get_or_init(|| {
        Regex::new(r"([XYZF])\s*(-?\d*\.?\d+)").expect("invalid regex pattern")
    });

    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    let mut moves = Vec::new();
    for raw in gcode.lines() {
        let line = comments.replace(raw, "").trim().to_uppercase();
        let Some(caps) = commands.captures(&line) else {
            continue;
        };
        let kind = match &caps[1] {
            "G0" | "G00" => Some(MoveKind::Rapid),
            "G1" | "G01" => Some(MoveKind::Linear),
            "G38.2" => Some(MoveKind::Probe),
            _ => None,
        };

        let mut feed = None;
        let (mut nx, mut ny, mut nz) = (x, y, z);
        for word in words.captures_iter(&line[caps[1].len()..]) {
            let Ok(value) = word[2].parse::<f64>() else {
                continue;
            };
            match &word[1] {
                "X" => nx = value,
                "Y" => ny = value,
                "Z" => nz = value,
                "F" => feed = Some(value),
                _ => {}
            }
        }

        match kind {
            Some(kind) => {
                x = nx;
                y = ny;
                z = nz;
                moves.push(Move {
                    kind,
                    x,
                    y,
                    z,
                    feed,
                });
            }
            // G92 redefines the current position without moving
            None => z = nz,
        }
    }
    moves
}
