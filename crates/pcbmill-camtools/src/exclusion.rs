//! Travel routing around exclusion areas.
//!
//! A rapid move between two cuts is checked against every exclusion area.
//! `Around` areas are grown by the tool radius plus a safety margin and the
//! move follows the shorter side of the grown outline. `Over` areas keep
//! the XY path and lift the tool to the area's `over_z` for the move.

use pcbmill_core::geometry::{ring_contains, ring_signed_area};
use pcbmill_core::{ExclusionArea, ExclusionShape, ExclusionStrategy, FailResult, Point};
use tracing::{debug, warn};

use crate::kernel::GeometryKernel;

/// One step of a routed travel move
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TravelStep {
    /// Rapid XY move at the current height
    Rapid(Point),
    /// Rapid Z move up before crossing
    RiseTo(f64),
    /// Rapid Z move back down after crossing
    LowerTo(f64),
}

/// Ordered travel steps ending at the requested target
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutedPath {
    pub steps: Vec<TravelStep>,
}

impl RoutedPath {
    /// A straight move with no detour
    pub fn direct(to: Point) -> Self {
        Self {
            steps: vec![TravelStep::Rapid(to)],
        }
    }

    pub fn is_direct(&self) -> bool {
        self.steps.len() == 1
    }
}

#[derive(Debug, Clone)]
struct Zone {
    id: u32,
    strategy: ExclusionStrategy,
    over_z: f64,
    ring: Vec<Point>,
}

/// Crossing of the travel segment with a zone edge
#[derive(Debug, Clone, Copy)]
struct Hit {
    /// Position along the travel segment, 0 at the start
    t: f64,
    /// Index of the crossed edge (from vertex `edge` to `edge + 1`)
    edge: usize,
    point: Point,
}

fn cross(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

fn segment_hits(ring: &[Point], from: Point, to: Point) -> Vec<Hit> {
    let rx = to.x - from.x;
    let ry = to.y - from.y;
    let n = ring.len();
    let mut hits = Vec::new();
    for edge in 0..n {
        let q = ring[edge];
        let q2 = ring[(edge + 1) % n];
        let sx = q2.x - q.x;
        let sy = q2.y - q.y;
        let denom = cross(rx, ry, sx, sy);
        if denom.abs() < 1e-12 {
            continue;
        }
        let qpx = q.x - from.x;
        let qpy = q.y - from.y;
        let t = cross(qpx, qpy, sx, sy) / denom;
        let u = cross(qpx, qpy, rx, ry) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..1.0).contains(&u) {
            hits.push(Hit {
                t,
                edge,
                point: Point::new(from.x + rx * t, from.y + ry * t),
            });
        }
    }
    hits.sort_by(|a, b| a.t.total_cmp(&b.t));
    hits
}

fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Walk the ring from the entry edge to the exit edge along the shorter side
fn detour(ring: &[Point], entry: &Hit, exit: &Hit) -> Vec<Point> {
    let n = ring.len();

    let mut forward = vec![entry.point];
    let mut k = (entry.edge + 1) % n;
    loop {
        forward.push(ring[k]);
        if k == exit.edge {
            break;
        }
        k = (k + 1) % n;
    }
    forward.push(exit.point);

    let mut backward = vec![entry.point];
    let stop = (exit.edge + 1) % n;
    let mut k = entry.edge;
    loop {
        backward.push(ring[k]);
        if k == stop {
            break;
        }
        k = (k + n - 1) % n;
    }
    backward.push(exit.point);

    if polyline_length(&forward) <= polyline_length(&backward) {
        forward
    } else {
        backward
    }
}

/// Routes travel moves for one tool
#[derive(Debug, Clone, Default)]
pub struct ExclusionRouter {
    zones: Vec<Zone>,
}

impl ExclusionRouter {
    /// Prepare zones for a tool.
    ///
    /// `clearance` is the tool radius plus the safety margin; only `Around`
    /// zones are grown by it.
    pub fn new(
        kernel: &dyn GeometryKernel,
        areas: &[ExclusionArea],
        shape: ExclusionShape,
        clearance: f64,
    ) -> FailResult<Self> {
        let mut zones = Vec::with_capacity(areas.len());
        for area in areas {
            let shaped = area.shaped(shape);
            if shaped.shape.is_empty() {
                continue;
            }
            let ring = match area.strategy {
                ExclusionStrategy::Over => shaped.shape.exterior,
                ExclusionStrategy::Around => kernel
                    .offset_ring(&shaped.shape.exterior, clearance)?
                    .into_iter()
                    .max_by(|a, b| {
                        ring_signed_area(a)
                            .abs()
                            .total_cmp(&ring_signed_area(b).abs())
                    })
                    .unwrap_or(shaped.shape.exterior),
            };
            zones.push(Zone {
                id: area.id,
                strategy: area.strategy,
                over_z: area.over_z,
                ring,
            });
        }
        Ok(Self { zones })
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Route a rapid move from `from` to `to` at `working_z`.
    pub fn route(&self, from: Point, to: Point, working_z: f64) -> FailResult<RoutedPath> {
        if self.zones.is_empty() || from.distance_to(&to) < 1e-12 {
            return Ok(RoutedPath::direct(to));
        }

        let mut rise: Option<f64> = None;
        let mut detours: Vec<(f64, Vec<Point>)> = Vec::new();

        for zone in &self.zones {
            let hits = segment_hits(&zone.ring, from, to);
            match zone.strategy {
                ExclusionStrategy::Over => {
                    let crossed = !hits.is_empty()
                        || ring_contains(&zone.ring, &from)
                        || ring_contains(&zone.ring, &to);
                    if crossed {
                        rise = Some(rise.map_or(zone.over_z, |z| z.max(zone.over_z)));
                    }
                }
                ExclusionStrategy::Around => {
                    if ring_contains(&zone.ring, &from) || ring_contains(&zone.ring, &to) {
                        warn!(
                            "Travel endpoint lies inside exclusion area {}, moving straight",
                            zone.id
                        );
                        continue;
                    }
                    if hits.len() < 2 {
                        continue;
                    }
                    let entry = hits[0];
                    let exit = hits[hits.len() - 1];
                    if entry.edge == exit.edge {
                        continue;
                    }
                    detours.push((entry.t, detour(&zone.ring, &entry, &exit)));
                }
            }
        }

        if rise.is_none() && detours.is_empty() {
            return Ok(RoutedPath::direct(to));
        }
        debug!(
            "Routing travel with {} detours{}",
            detours.len(),
            if rise.is_some() { " and a lift" } else { "" }
        );

        let mut steps = Vec::new();
        let lift = rise.filter(|z| *z > working_z);
        if let Some(z) = lift {
            steps.push(TravelStep::RiseTo(z));
        }
        detours.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, points) in detours {
            steps.extend(points.into_iter().map(TravelStep::Rapid));
        }
        steps.push(TravelStep::Rapid(to));
        if lift.is_some() {
            steps.push(TravelStep::LowerTo(working_z));
        }
        Ok(RoutedPath { steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CavcKernel;
    use pcbmill_core::Polygon;

    fn area(strategy: ExclusionStrategy, over_z: f64) -> ExclusionArea {
        ExclusionArea::new(
            1,
            "clamp",
            strategy,
            over_z,
            Polygon::rectangle(4.0, -1.0, 2.0, 2.0),
        )
    }

    fn rect_distance(p: &Point) -> f64 {
        let dx = (4.0 - p.x).max(0.0).max(p.x - 6.0);
        let dy = (-1.0 - p.y).max(0.0).max(p.y - 1.0);
        (dx * dx + dy * dy).sqrt()
    }

    #[test]
    fn test_around_walks_outline() {
        let kernel = CavcKernel::default();
        let router = ExclusionRouter::new(
            &kernel,
            &[area(ExclusionStrategy::Around, 0.0)],
            ExclusionShape::Polygon,
            0.0,
        )
        .unwrap();
        let routed = router
            .route(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 2.0)
            .unwrap();
        assert_eq!(
            routed.steps,
            vec![
                TravelStep::Rapid(Point::new(4.0, 0.0)),
                TravelStep::Rapid(Point::new(4.0, -1.0)),
                TravelStep::Rapid(Point::new(6.0, -1.0)),
                TravelStep::Rapid(Point::new(6.0, 0.0)),
                TravelStep::Rapid(Point::new(10.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_around_keeps_clearance() {
        let kernel = CavcKernel::default();
        let router = ExclusionRouter::new(
            &kernel,
            &[area(ExclusionStrategy::Around, 0.0)],
            ExclusionShape::Polygon,
            0.5,
        )
        .unwrap();
        let routed = router
            .route(Point::new(0.0, 0.2), Point::new(10.0, 0.2), 2.0)
            .unwrap();
        assert!(!routed.is_direct());
        for step in &routed.steps {
            if let TravelStep::Rapid(p) = step {
                assert!(rect_distance(p) >= 0.5 - 1e-6, "{:?} too close", p);
            }
        }
    }

    #[test]
    fn test_over_lifts_and_lowers() {
        let kernel = CavcKernel::default();
        let router = ExclusionRouter::new(
            &kernel,
            &[area(ExclusionStrategy::Over, 3.0)],
            ExclusionShape::Square,
            0.5,
        )
        .unwrap();
        let to = Point::new(10.0, 0.0);
        let routed = router.route(Point::new(0.0, 0.0), to, 1.0).unwrap();
        assert_eq!(
            routed.steps,
            vec![
                TravelStep::RiseTo(3.0),
                TravelStep::Rapid(to),
                TravelStep::LowerTo(1.0)
            ]
        );

        // Already above the area
        let routed = router.route(Point::new(0.0, 0.0), to, 5.0).unwrap();
        assert!(routed.is_direct());
    }

    #[test]
    fn test_miss_is_direct() {
        let kernel = CavcKernel::default();
        let router = ExclusionRouter::new(
            &kernel,
            &[area(ExclusionStrategy::Around, 0.0)],
            ExclusionShape::Polygon,
            0.5,
        )
        .unwrap();
        let to = Point::new(10.0, 5.0);
        let routed = router.route(Point::new(0.0, 5.0), to, 2.0).unwrap();
        assert_eq!(routed, RoutedPath::direct(to));
    }

    #[test]
    fn test_endpoint_inside_goes_straight() {
        let kernel = CavcKernel::default();
        let router = ExclusionRouter::new(
            &kernel,
            &[area(ExclusionStrategy::Around, 0.0)],
            ExclusionShape::Polygon,
            0.0,
        )
        .unwrap();
        let to = Point::new(5.0, 0.0);
        assert!(router
            .route(Point::new(0.0, 0.0), to, 2.0)
            .unwrap()
            .is_direct());
    }
}
