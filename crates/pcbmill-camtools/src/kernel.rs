//! Geometry kernel seam.
//!
//! The toolpath engine never does polygon offsetting itself; it asks a
//! [`GeometryKernel`]. [`CavcKernel`] is the default implementation on top
//! of `cavalier_contours`, with arcs linearized at a fixed number of steps
//! per full circle.

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use pcbmill_core::geometry::{ring_signed_area, Point};
use pcbmill_core::{FailKind, FailResult};
use std::f64::consts::PI;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Offset and buffer operations the engine relies on.
///
/// Rings are closed and carry no repeated closing vertex.
pub trait GeometryKernel: Send + Sync {
    /// Offset a closed ring by a signed distance.
    ///
    /// Positive distances grow the ring, negative ones shrink it. Shrinking
    /// may split the ring or make it vanish (empty result).
    fn offset_ring(&self, ring: &[Point], distance: f64) -> FailResult<Vec<Vec<Point>>>;

    /// Circle of `radius` around `center`.
    fn buffer_point(&self, center: Point, radius: f64) -> FailResult<Vec<Point>>;

    /// Capsule of `radius` around the segment `start`-`stop`.
    fn buffer_segment(&self, start: Point, stop: Point, radius: f64) -> FailResult<Vec<Point>>;
}

/// `cavalier_contours` backed kernel
#[derive(Debug, Clone)]
pub struct CavcKernel {
    steps_per_circle: usize,
    tolerance: f64,
}

impl Default for CavcKernel {
    fn default() -> Self {
        Self::new(64, 1e-5)
    }
}

impl CavcKernel {
    /// Create a kernel; `tolerance` is the distance under which vertices merge
    pub fn new(steps_per_circle: usize, tolerance: f64) -> Self {
        Self {
            steps_per_circle: steps_per_circle.max(4),
            tolerance: tolerance.max(0.0),
        }
    }

    pub fn steps_per_circle(&self) -> usize {
        self.steps_per_circle
    }

    /// Drop repeated vertices, including a closing vertex equal to the first.
    fn clean_ring(&self, ring: &[Point]) -> Vec<Point> {
        let mut clean: Vec<Point> = Vec::with_capacity(ring.len());
        for p in ring {
            if clean
                .last()
                .map_or(true, |last: &Point| last.distance_to(p) > self.tolerance)
            {
                clean.push(*p);
            }
        }
        while clean.len() > 1
            && clean[0].distance_to(&clean[clean.len() - 1]) <= self.tolerance
        {
            clean.pop();
        }
        clean
    }

    /// Closed clockwise polyline, the winding the offset sign assumes.
    fn to_polyline(ring: &[Point]) -> Polyline<f64> {
        let mut points = ring.to_vec();
        if ring_signed_area(&points) > 0.0 {
            points.reverse();
        }
        let mut pline = Polyline::new();
        for p in points {
            pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
        }
        pline.set_is_closed(true);
        pline
    }

    fn parallel_offset(pline: &Polyline<f64>, value: f64) -> FailResult<Vec<Polyline<f64>>> {
        panic::catch_unwind(AssertUnwindSafe(|| pline.parallel_offset(value))).map_err(|_| {
            warn!("Panic during parallel offset by {}", value);
            FailKind::internal(format!("parallel offset by {} failed", value))
        })
    }

    /// Linearize a closed polyline, expanding bulge arcs.
    fn flatten(&self, pline: &Polyline<f64>) -> Vec<Point> {
        let count = pline.vertex_count();
        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            let v1 = pline.at(i);
            let v2 = pline.at((i + 1) % count);
            points.push(Point::new(v1.x, v1.y));

            if v1.bulge.abs() <= 1e-9 {
                continue;
            }
            let theta = 4.0 * v1.bulge.atan();
            let chord_len = ((v2.x - v1.x).powi(2) + (v2.y - v1.y).powi(2)).sqrt();
            if chord_len < 1e-12 {
                continue;
            }
            let radius = (chord_len / (2.0 * (theta / 2.0).sin())).abs();
            let dist_to_center = radius * (theta.abs() / 2.0).cos();

            // Left normal of the chord
            let nx = -(v2.y - v1.y) / chord_len;
            let ny = (v2.x - v1.x) / chord_len;
            let sign = if v1.bulge > 0.0 { 1.0 } else { -1.0 };
            let cx = (v1.x + v2.x) / 2.0 + nx * dist_to_center * sign;
            let cy = (v1.y + v2.y) / 2.0 + ny * dist_to_center * sign;

            let start_angle = (v1.y - cy).atan2(v1.x - cx);
            let mut end_angle = (v2.y - cy).atan2(v2.x - cx);
            if v1.bulge > 0.0 {
                if end_angle <= start_angle {
                    end_angle += 2.0 * PI;
                }
            } else if end_angle >= start_angle {
                end_angle -= 2.0 * PI;
            }

            let sweep = end_angle - start_angle;
            let steps = (sweep.abs() / (2.0 * PI)) * self.steps_per_circle as f64;
            let segments = (steps - 1e-6).ceil().max(1.0) as usize;
            for j in 1..segments {
                let angle = start_angle + sweep * (j as f64 / segments as f64);
                points.push(Point::new(
                    cx + radius * angle.cos(),
                    cy + radius * angle.sin(),
                ));
            }
        }
        points
    }

    /// Flattened counter-clockwise rings with at least three vertices.
    fn collect_rings(&self, plines: &[Polyline<f64>]) -> Vec<Vec<Point>> {
        plines
            .iter()
            .map(|pline| {
                let mut ring = self.clean_ring(&self.flatten(pline));
                if ring_signed_area(&ring) < 0.0 {
                    ring.reverse();
                }
                ring
            })
            .filter(|ring| ring.len() >= 3)
            .collect()
    }

    fn offset_went_expected_way(rings: &[Vec<Point>], original_area: f64, distance: f64) -> bool {
        if distance > 0.0 {
            let total: f64 = rings.iter().map(|r| ring_signed_area(r).abs()).sum();
            !rings.is_empty() && total > original_area
        } else {
            rings
                .iter()
                .all(|r| ring_signed_area(r).abs() < original_area)
        }
    }
}

impl GeometryKernel for CavcKernel {
    fn offset_ring(&self, ring: &[Point], distance: f64) -> FailResult<Vec<Vec<Point>>> {
        let clean = self.clean_ring(ring);
        if clean.len() < 3 {
            return Ok(Vec::new());
        }
        if distance.abs() < 1e-12 {
            return Ok(vec![clean]);
        }

        let original_area = ring_signed_area(&clean).abs();
        let pline = Self::to_polyline(&clean);

        let rings = self.collect_rings(&Self::parallel_offset(&pline, distance)?);
        // Offset side depends on winding; confirm against the ring area.
        if Self::offset_went_expected_way(&rings, original_area, distance) {
            return Ok(rings);
        }
        let flipped = self.collect_rings(&Self::parallel_offset(&pline, -distance)?);
        if Self::offset_went_expected_way(&flipped, original_area, distance) {
            debug!("Offset by {} resolved with flipped side", distance);
            return Ok(flipped);
        }
        Err(FailKind::internal(format!(
            "offset by {} produced no consistent result",
            distance
        )))
    }

    fn buffer_point(&self, center: Point, radius: f64) -> FailResult<Vec<Point>> {
        if radius <= 0.0 || !radius.is_finite() {
            return Err(FailKind::internal(format!("invalid buffer radius {}", radius)));
        }
        let mut pline = Polyline::new();
        pline.add_vertex(PlineVertex::new(center.x + radius, center.y, 1.0));
        pline.add_vertex(PlineVertex::new(center.x - radius, center.y, 1.0));
        pline.set_is_closed(true);
        Ok(self.flatten(&pline))
    }

    fn buffer_segment(&self, start: Point, stop: Point, radius: f64) -> FailResult<Vec<Point>> {
        let length = start.distance_to(&stop);
        if length < 1e-12 {
            return self.buffer_point(start, radius);
        }
        if radius <= 0.0 || !radius.is_finite() {
            return Err(FailKind::internal(format!("invalid buffer radius {}", radius)));
        }

        // Right-hand normal of the segment direction
        let rx = (stop.y - start.y) / length * radius;
        let ry = -(stop.x - start.x) / length * radius;

        let mut pline = Polyline::new();
        pline.add_vertex(PlineVertex::new(start.x + rx, start.y + ry, 0.0));
        pline.add_vertex(PlineVertex::new(stop.x + rx, stop.y + ry, 1.0));
        pline.add_vertex(PlineVertex::new(stop.x - rx, stop.y - ry, 0.0));
        pline.add_vertex(PlineVertex::new(start.x - rx, start.y - ry, 1.0));
        pline.set_is_closed(true);
        Ok(self.flatten(&pline))
    }
}
