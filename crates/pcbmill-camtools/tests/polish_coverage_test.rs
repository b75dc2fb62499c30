use pcbmill_camtools::{CavcKernel, GeometryKernel, PolygonClearer};
use pcbmill_core::geometry::ring_contains;
use pcbmill_core::{BoundingBox, CancellationToken, Path, Point, PolishMethod, Polygon};

const METHODS: [PolishMethod; 3] = [
    PolishMethod::Standard,
    PolishMethod::Seed,
    PolishMethod::Lines,
];

fn segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance_to(&a.lerp(b, t))
}

fn nearest_pass(paths: &[Path], p: &Point) -> f64 {
    let mut best = f64::INFINITY;
    for path in paths {
        let points = &path.points;
        for pair in points.windows(2) {
            best = best.min(segment_distance(p, &pair[0], &pair[1]));
        }
        if path.closed && points.len() > 1 {
            best = best.min(segment_distance(p, &points[points.len() - 1], &points[0]));
        }
    }
    best
}

/// Every point the tool centre can reach lies within a tool radius of a pass
fn assert_area_cleared(area: &Polygon, diameter: f64, overlap: f64) {
    let kernel = CavcKernel::default();
    let cancel = CancellationToken::new();
    let clearer = PolygonClearer::new(&kernel, diameter, overlap, &cancel).unwrap();
    let radius = diameter / 2.0;
    let reach = kernel.offset_ring(&area.exterior, -radius).unwrap();
    let bb = BoundingBox::from_points(reach.iter().flatten()).unwrap();

    for method in METHODS {
        let paths = clearer.clear(area, method).unwrap();
        let step = radius / 3.0;
        let mut x = bb.min_x + step / 2.0;
        while x < bb.max_x {
            let mut y = bb.min_y + step / 2.0;
            while y < bb.max_y {
                let sample = Point::new(x, y);
                if reach.iter().any(|ring| ring_contains(ring, &sample)) {
                    let gap = nearest_pass(&paths, &sample);
                    assert!(
                        gap <= radius * 1.02,
                        "{:?} d={} overlap={}: ({:.3}, {:.3}) is {:.3} from the nearest pass",
                        method,
                        diameter,
                        overlap,
                        x,
                        y,
                        gap
                    );
                }
                y += step;
            }
            x += step;
        }
    }
}

#[test]
fn test_odd_square_is_cleared() {
    assert_area_cleared(&Polygon::rectangle(0.0, 0.0, 11.0, 11.0), 2.0, 0.25);
}

#[test]
fn test_even_square_is_cleared() {
    assert_area_cleared(&Polygon::rectangle(0.0, 0.0, 10.0, 10.0), 2.0, 0.25);
}

#[test]
fn test_narrow_strip_is_cleared() {
    assert_area_cleared(&Polygon::rectangle(-3.0, 2.0, 20.0, 3.7), 1.0, 0.1);
}

#[test]
fn test_cleared_without_overlap() {
    assert_area_cleared(&Polygon::rectangle(0.0, 0.0, 7.3, 5.9), 1.0, 0.0);
}

#[test]
fn test_cleared_with_heavy_overlap() {
    assert_area_cleared(&Polygon::rectangle(1.0, 1.0, 6.0, 4.5), 0.8, 0.6);
}

#[test]
fn test_l_shape_is_cleared() {
    let area = Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(12.0, 0.0),
        Point::new(12.0, 4.0),
        Point::new(5.0, 4.0),
        Point::new(5.0, 10.0),
        Point::new(0.0, 10.0),
    ]);
    assert_area_cleared(&area, 1.5, 0.2);
}
