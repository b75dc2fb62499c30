//! Area clearing for polish passes.
//!
//! Three strategies cover a target area with tool passes spaced
//! `tool_diameter * (1 - overlap)` apart:
//! - Standard: inward offset rings, outside-in, linked into one path
//! - Seed: circles growing outward from an interior seed, clipped to the
//!   area and finished by a contour pass
//! - Lines: a contour ring plus zig-zag raster lines inside it
//!
//! Every result is checked on a sample grid over the region the tool
//! centre can reach. A sample farther than a tool radius from every pass
//! means the area was not cleared; clearing is then retried once with the
//! spacing reduced to the tool radius.
//!
//! Every loop polls the cancellation token.

use std::collections::HashMap;
use std::f64::consts::PI;

use pcbmill_core::geometry::ring_contains;
use pcbmill_core::{
    BoundingBox, CancellationToken, FailKind, FailResult, Path, Point, PolishMethod, Polygon,
};
use tracing::debug;

use crate::kernel::GeometryKernel;

/// Upper bound on rings, circles or scan lines for one area
const MAX_ITERATIONS: usize = 10_000;

/// Bisection steps when searching for the deepest inset
const DEPTH_SEARCH_STEPS: usize = 32;

/// Samples per side of the coverage grid
const MAX_COVERAGE_SAMPLES: usize = 200;

/// Allowed coverage error, relative to the tool radius
const COVERAGE_TOLERANCE: f64 = 0.02;

/// Allowed circle chord sagitta, relative to the tool radius
const ARC_TOLERANCE: f64 = 0.01;

const MIN_CIRCLE_SEGMENTS: usize = 16;
const MAX_CIRCLE_SEGMENTS: usize = 4096;

/// Pocket clearing for a polygonal area
pub struct PolygonClearer<'a> {
    kernel: &'a dyn GeometryKernel,
    tool_diameter: f64,
    overlap: f64,
    cancel: &'a CancellationToken,
}

impl<'a> PolygonClearer<'a> {
    pub fn new(
        kernel: &'a dyn GeometryKernel,
        tool_diameter: f64,
        overlap: f64,
        cancel: &'a CancellationToken,
    ) -> FailResult<Self> {
        if tool_diameter <= 0.0 || !tool_diameter.is_finite() {
            return Err(FailKind::InvalidParameters(format!(
                "clearing tool diameter must be positive, got {}",
                tool_diameter
            )));
        }
        if !(0.0..1.0).contains(&overlap) {
            return Err(FailKind::InvalidParameters(format!(
                "overlap must be in [0, 1), got {}",
                overlap
            )));
        }
        Ok(Self {
            kernel,
            tool_diameter,
            overlap,
            cancel,
        })
    }

    /// Distance between neighbouring passes
    pub fn spacing(&self) -> f64 {
        self.tool_diameter * (1.0 - self.overlap)
    }

    fn radius(&self) -> f64 {
        self.tool_diameter / 2.0
    }

    /// Clear a bounding box grown by `margin`
    pub fn clear_bounds(
        &self,
        bounds: &BoundingBox,
        margin: f64,
        method: PolishMethod,
    ) -> FailResult<Vec<Path>> {
        self.clear(&bounds.expand(margin).to_polygon(), method)
    }

    /// Clear the exterior of `area`
    pub fn clear(&self, area: &Polygon, method: PolishMethod) -> FailResult<Vec<Path>> {
        if area.is_empty() {
            return Err(FailKind::empty("polish area"));
        }
        self.cancel.check()?;
        let reach = self.tool_region(area)?;
        let radius = self.radius();
        let mut spacing = self.spacing();

        loop {
            let paths = match method {
                PolishMethod::Standard => self.standard(area, &reach, spacing)?,
                PolishMethod::Seed => self.seed(area, &reach, spacing)?,
                PolishMethod::Lines => self.lines(area, &reach, spacing)?,
            };
            if paths.iter().all(Path::is_empty) {
                return Err(FailKind::AreaNotFullyCleared {
                    reason: format!("{:?} clearing produced no paths", method),
                });
            }

            let uncovered = self.uncovered_samples(&reach, &paths)?;
            if uncovered == 0 {
                debug!("{:?} clearing produced {} paths", method, paths.len());
                return Ok(paths);
            }
            if spacing <= radius + 1e-12 {
                return Err(FailKind::AreaNotFullyCleared {
                    reason: format!(
                        "{:?} clearing left {} sampled points out of tool reach",
                        method, uncovered
                    ),
                });
            }
            debug!(
                "{:?} clearing at spacing {} left {} sampled points uncut, retrying at {}",
                method, spacing, uncovered, radius
            );
            spacing = radius;
        }
    }

    /// Rings bounding the positions the tool centre can take inside `area`
    fn tool_region(&self, area: &Polygon) -> FailResult<Vec<Vec<Point>>> {
        let reach = self.kernel.offset_ring(&area.exterior, -self.radius())?;
        if reach.is_empty() {
            return Err(FailKind::AreaNotFullyCleared {
                reason: format!("tool {} does not fit into the area", self.tool_diameter),
            });
        }
        Ok(reach)
    }

    fn standard(
        &self,
        area: &Polygon,
        reach: &[Vec<Point>],
        spacing: f64,
    ) -> FailResult<Vec<Path>> {
        let rings = self.offset_levels(area, reach, spacing)?;
        Ok(link_rings(area, rings, None))
    }

    /// Inward offset rings, outermost (the contour pass) first
    fn offset_levels(
        &self,
        area: &Polygon,
        reach: &[Vec<Point>],
        spacing: f64,
    ) -> FailResult<Vec<Vec<Point>>> {
        let radius = self.radius();
        let mut rings = reach.to_vec();
        let mut level = 0usize;
        let last_depth = loop {
            self.cancel.check()?;
            if level >= MAX_ITERATIONS {
                return Err(FailKind::AreaNotFullyCleared {
                    reason: format!("gave up after {} offset rings", MAX_ITERATIONS),
                });
            }
            let depth = radius + level as f64 * spacing;
            let offsets = self
                .kernel
                .offset_ring(&area.exterior, -(depth + spacing))?;
            if offsets.is_empty() {
                break depth;
            }
            rings.extend(offsets);
            level += 1;
        };

        // The deepest point may lie beyond a tool radius from the last ring
        let deepest = self.deepest_inset(area, last_depth, last_depth + spacing)?;
        if deepest - last_depth > radius {
            let middle = (last_depth + deepest) / 2.0;
            debug!(
                "Adding centre ring at depth {} (deepest {})",
                middle, deepest
            );
            rings.extend(self.kernel.offset_ring(&area.exterior, -middle)?);
        }
        Ok(rings)
    }

    /// Largest inset depth in `[inside, outside)` that still leaves rings
    fn deepest_inset(&self, area: &Polygon, mut inside: f64, mut outside: f64) -> FailResult<f64> {
        for _ in 0..DEPTH_SEARCH_STEPS {
            self.cancel.check()?;
            let middle = (inside + outside) / 2.0;
            if self.kernel.offset_ring(&area.exterior, -middle)?.is_empty() {
                outside = middle;
            } else {
                inside = middle;
            }
        }
        Ok(inside)
    }

    fn seed(&self, area: &Polygon, reach: &[Vec<Point>], spacing: f64) -> FailResult<Vec<Path>> {
        let center = area
            .bounds()
            .map(|bb| bb.center())
            .ok_or_else(|| FailKind::empty("polish area"))?;
        let seed = seed_point(center, reach);
        let extent = reach
            .iter()
            .flatten()
            .map(|p| p.distance_to(&seed))
            .fold(0.0, f64::max);
        let sagitta = self.radius() * ARC_TOLERANCE;

        let mut circles = Vec::new();
        let mut arcs = Vec::new();
        let mut step = 0usize;
        while step as f64 * spacing <= extent {
            self.cancel.check()?;
            if step >= MAX_ITERATIONS {
                return Err(FailKind::AreaNotFullyCleared {
                    reason: format!("gave up after {} seed circles", MAX_ITERATIONS),
                });
            }
            let circle = circle_ring(seed, (step as f64 + 0.5) * spacing, sagitta);
            match clip_ring(&circle, reach) {
                Clipped::Inside => circles.push(circle),
                Clipped::Pieces(pieces) => arcs.extend(pieces),
            }
            step += 1;
        }
        debug!(
            "Seed at ({:.3}, {:.3}): {} full circles, {} arcs",
            seed.x,
            seed.y,
            circles.len(),
            arcs.len()
        );

        let mut paths = link_rings(area, circles, Some(seed));
        let mut position = paths.last().and_then(Path::end).unwrap_or(seed);
        for mut arc in arcs {
            if let (Some(first), Some(last)) = (arc.first(), arc.last()) {
                if last.distance_to(&position) < first.distance_to(&position) {
                    arc.reverse();
                }
            }
            if let Some(last) = arc.last() {
                position = *last;
            }
            paths.push(Path::open(arc));
        }
        for ring in reach {
            let ring = start_nearest(ring.clone(), &position);
            position = ring[0];
            paths.push(Path::closed(ring));
        }
        Ok(paths)
    }

    fn lines(&self, area: &Polygon, reach: &[Vec<Point>], spacing: f64) -> FailResult<Vec<Path>> {
        let mut paths: Vec<Path> = reach.iter().cloned().map(Path::closed).collect();
        for contour in reach {
            paths.extend(self.raster(area, contour, spacing)?);
        }
        Ok(paths)
    }

    /// Zig-zag scan lines inside one contour ring
    fn raster(&self, area: &Polygon, contour: &[Point], spacing: f64) -> FailResult<Vec<Path>> {
        let Some(bb) = BoundingBox::from_points(contour) else {
            return Ok(Vec::new());
        };
        let mut paths: Vec<Path> = Vec::new();
        let mut current: Vec<Point> = Vec::new();
        let mut forward = true;
        let mut line = 1usize;

        loop {
            self.cancel.check()?;
            let y = bb.min_y + line as f64 * spacing;
            if y >= bb.max_y - 1e-9 {
                break;
            }
            if line >= MAX_ITERATIONS {
                return Err(FailKind::AreaNotFullyCleared {
                    reason: format!("gave up after {} scan lines", MAX_ITERATIONS),
                });
            }

            let mut segments = scanline_segments(contour, y);
            if !forward {
                segments.reverse();
            }
            for (x_start, x_end) in segments {
                let (a, b) = if forward {
                    (Point::new(x_start, y), Point::new(x_end, y))
                } else {
                    (Point::new(x_end, y), Point::new(x_start, y))
                };
                let linked = current
                    .last()
                    .is_some_and(|last| area.contains(&last.lerp(&a, 0.5)));
                if !linked && !current.is_empty() {
                    paths.push(Path::open(std::mem::take(&mut current)));
                }
                current.push(a);
                current.push(b);
            }

            forward = !forward;
            line += 1;
        }
        if !current.is_empty() {
            paths.push(Path::open(current));
        }
        Ok(paths)
    }

    /// Count grid samples inside `reach` farther than a tool radius from
    /// every pass, connecting moves included
    fn uncovered_samples(&self, reach: &[Vec<Point>], paths: &[Path]) -> FailResult<usize> {
        let Some(bb) = BoundingBox::from_points(reach.iter().flatten()) else {
            return Ok(0);
        };
        let limit = self.radius() * (1.0 + COVERAGE_TOLERANCE);
        let step = (self.radius().min(self.spacing()) / 2.0)
            .max(bb.width() / MAX_COVERAGE_SAMPLES as f64)
            .max(bb.height() / MAX_COVERAGE_SAMPLES as f64);
        let index = SegmentIndex::new(paths, limit.max(step));
        let columns = ((bb.width() / step).ceil() as usize).max(1);
        let rows = ((bb.height() / step).ceil() as usize).max(1);

        let mut uncovered = 0usize;
        for i in 0..columns {
            self.cancel.check()?;
            let x = bb.min_x + (i as f64 + 0.5) * step;
            for j in 0..rows {
                let sample = Point::new(x, bb.min_y + (j as f64 + 0.5) * step);
                if reach.iter().any(|ring| ring_contains(ring, &sample))
                    && !index.within(&sample, limit)
                {
                    uncovered += 1;
                }
            }
        }
        Ok(uncovered)
    }
}

/// Path segments bucketed on a square grid
struct SegmentIndex {
    cell: f64,
    buckets: HashMap<(i64, i64), Vec<(Point, Point)>>,
}

impl SegmentIndex {
    /// `cell` must be at least the largest distance queried
    fn new(paths: &[Path], cell: f64) -> Self {
        let mut index = Self {
            cell,
            buckets: HashMap::new(),
        };
        for path in paths {
            let points = &path.points;
            if points.len() == 1 {
                index.insert(points[0], points[0]);
            }
            for pair in points.windows(2) {
                index.insert(pair[0], pair[1]);
            }
            if path.closed && points.len() > 2 {
                index.insert(points[points.len() - 1], points[0]);
            }
        }
        index
    }

    fn key(&self, p: &Point) -> (i64, i64) {
        (
            (p.x / self.cell).floor() as i64,
            (p.y / self.cell).floor() as i64,
        )
    }

    /// Files the segment under every cell it passes, walking in half cells
    fn insert(&mut self, a: Point, b: Point) {
        let steps = (a.distance_to(&b) / (self.cell / 2.0)).ceil() as usize;
        let mut previous = None;
        for k in 0..=steps {
            let t = if steps == 0 {
                0.0
            } else {
                k as f64 / steps as f64
            };
            let key = self.key(&a.lerp(&b, t));
            if previous != Some(key) {
                self.buckets.entry(key).or_default().push((a, b));
                previous = Some(key);
            }
        }
    }

    /// A walked point lies within a quarter cell of the nearest point, so
    /// two cells around the query suffice
    fn within(&self, p: &Point, limit: f64) -> bool {
        let (cx, cy) = self.key(p);
        (cx - 2..=cx + 2).any(|x| {
            (cy - 2..=cy + 2).any(|y| {
                self.buckets.get(&(x, y)).is_some_and(|segments| {
                    segments
                        .iter()
                        .any(|(a, b)| segment_distance(p, a, b) <= limit)
                })
            })
        })
    }
}

fn segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq < 1e-24 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance_to(&a.lerp(b, t))
}

/// `center` when the tool can reach it, else the nearest reachable vertex
fn seed_point(center: Point, reach: &[Vec<Point>]) -> Point {
    if reach.iter().any(|ring| ring_contains(ring, &center)) {
        return center;
    }
    reach
        .iter()
        .flatten()
        .min_by(|a, b| a.distance_to(&center).total_cmp(&b.distance_to(&center)))
        .copied()
        .unwrap_or(center)
}

/// Circle polygon whose chords stay within `sagitta` of the true circle
fn circle_ring(center: Point, radius: f64, sagitta: f64) -> Vec<Point> {
    let half_angle = (1.0 - sagitta / radius).clamp(-1.0, 1.0).acos();
    let segments = ((PI / half_angle).ceil() as usize)
        .clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS);
    (0..segments)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / segments as f64;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

enum Clipped {
    /// The ring lies entirely inside the regions
    Inside,
    /// Open runs of the ring that lie inside
    Pieces(Vec<Vec<Point>>),
}

/// Clip a closed ring to the union of disjoint `regions`
fn clip_ring(ring: &[Point], regions: &[Vec<Point>]) -> Clipped {
    let inside = |p: &Point| regions.iter().any(|region| ring_contains(region, p));
    let n = ring.len();
    let mut runs: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut starts_inside = None;
    let mut crossed = false;

    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        let mut cuts: Vec<f64> = regions
            .iter()
            .flat_map(|region| segment_crossings(a, b, region))
            .collect();
        cuts.sort_by(|x, y| x.total_cmp(y));
        cuts.push(1.0);

        let mut t0 = 0.0;
        for t1 in cuts {
            if t1 - t0 < 1e-12 {
                continue;
            }
            let (p0, p1) = (a.lerp(&b, t0), a.lerp(&b, t1));
            let piece_inside = inside(&p0.lerp(&p1, 0.5));
            starts_inside.get_or_insert(piece_inside);
            if piece_inside {
                if current.is_empty() {
                    current.push(p0);
                }
                current.push(p1);
            } else {
                crossed = true;
                if current.len() > 1 {
                    runs.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            t0 = t1;
        }
    }

    if !crossed {
        return Clipped::Inside;
    }
    if current.len() > 1 {
        // The run closing the ring continues into the first one
        if starts_inside == Some(true) && !runs.is_empty() {
            let head = runs.remove(0);
            current.extend(head.into_iter().skip(1));
        }
        runs.push(current);
    }
    Clipped::Pieces(runs)
}

/// Parameters along `a`-`b` where it crosses an edge of `ring`
fn segment_crossings(a: Point, b: Point, ring: &[Point]) -> Vec<f64> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut out = Vec::new();
    for i in 0..ring.len() {
        let (p, q) = (ring[i], ring[(i + 1) % ring.len()]);
        let (ex, ey) = (q.x - p.x, q.y - p.y);
        let denom = dx * ey - dy * ex;
        if denom.abs() < 1e-15 {
            continue;
        }
        let (wx, wy) = (p.x - a.x, p.y - a.y);
        let t = (wx * ey - wy * ex) / denom;
        let u = (wx * dy - wy * dx) / denom;
        if t > 0.0 && t < 1.0 && (0.0..=1.0).contains(&u) {
            out.push(t);
        }
    }
    out
}

/// Intersections of a horizontal line with a ring, paired into inside spans
fn scanline_segments(ring: &[Point], y: f64) -> Vec<(f64, f64)> {
    let mut xs = Vec::new();
    for i in 0..ring.len() {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % ring.len()];
        if ((p1.y <= y && p2.y > y) || (p2.y <= y && p1.y > y)) && (p2.y - p1.y).abs() > 1e-12 {
            xs.push(p1.x + (y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y));
        }
    }
    xs.sort_by(|a, b| a.total_cmp(b));
    xs.chunks_exact(2)
        .filter(|pair| pair[1] - pair[0] > 1e-9)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Rotate a ring so it starts at the vertex closest to `target`.
fn start_nearest(mut ring: Vec<Point>, target: &Point) -> Vec<Point> {
    let nearest = ring
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.distance_to(target).total_cmp(&b.distance_to(target)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    ring.rotate_left(nearest);
    ring
}

/// Chain rings into paths, cutting straight from one ring to the next while
/// the connecting move stays inside `area`.
fn link_rings(area: &Polygon, rings: Vec<Vec<Point>>, seed: Option<Point>) -> Vec<Path> {
    let mut chains: Vec<Vec<Vec<Point>>> = Vec::new();
    let mut position = seed;

    for ring in rings {
        let ring = match position {
            Some(p) => start_nearest(ring, &p),
            None => ring,
        };
        let start = ring[0];
        let linked = chains
            .last()
            .and_then(|chain| chain.last())
            .is_some_and(|prev| {
                ring_contains(&area.exterior, &prev[0].lerp(&start, 0.5))
            });
        match chains.last_mut() {
            Some(chain) if linked => chain.push(ring),
            _ => chains.push(vec![ring]),
        }
        position = Some(start);
    }

    chains
        .into_iter()
        .map(|mut chain| {
            if chain.len() == 1 {
                return Path::closed(chain.remove(0));
            }
            let mut points = Vec::new();
            for ring in chain {
                let start = ring[0];
                points.extend(ring);
                points.push(start);
            }
            Path::open(points)
        })
        .collect()
}
