//! 2D geometry primitives shared by the toolpath engine.
//!
//! These are plain data types. Offsetting and buffering are delegated to a
//! geometry kernel; only measurements needed for validation and routing
//! (areas, bounds, containment, lengths) live here.

use serde::{Deserialize, Serialize};

/// A point in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation towards `other` at parameter `t`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds of a set of points, `None` when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = BoundingBox::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bb.min_x = bb.min_x.min(p.x);
            bb.min_y = bb.min_y.min(p.y);
            bb.max_x = bb.max_x.max(p.x);
            bb.max_y = bb.max_y.max(p.y);
        }
        Some(bb)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> BoundingBox {
        BoundingBox::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// The box as a counter-clockwise rectangle polygon.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ])
    }
}

/// Signed area of a closed ring (positive when counter-clockwise).
pub fn ring_signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % ring.len()];
        sum += p1.x * p2.y - p2.x * p1.y;
    }
    sum / 2.0
}

/// Ray casting point-in-ring test.
pub fn ring_contains(ring: &[Point], point: &Point) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let pi = ring[i];
        let pj = ring[j];
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A polygon with an exterior ring and optional holes.
///
/// Rings are stored without a repeated closing vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    #[serde(default)]
    pub interiors: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Point>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    pub fn with_interiors(exterior: Vec<Point>, interiors: Vec<Vec<Point>>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    /// Axis aligned rectangle from a corner and its size.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        BoundingBox::new(x, y, x + width, y + height).to_polygon()
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.len() < 3
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.exterior)
    }

    /// Unsigned area of the exterior minus its holes.
    pub fn area(&self) -> f64 {
        let holes: f64 = self
            .interiors
            .iter()
            .map(|r| ring_signed_area(r).abs())
            .sum();
        ring_signed_area(&self.exterior).abs() - holes
    }

    /// Whether `point` lies inside the exterior and outside every hole.
    pub fn contains(&self, point: &Point) -> bool {
        ring_contains(&self.exterior, point)
            && !self.interiors.iter().any(|h| ring_contains(h, point))
    }
}

/// Bounds of a set of polygons.
pub fn polygons_bounds(polygons: &[Polygon]) -> Option<BoundingBox> {
    polygons
        .iter()
        .filter_map(Polygon::bounds)
        .reduce(|a, b| a.union(&b))
}

/// A millable path: a closed ring or an open polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Path {
    pub fn closed(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    pub fn open(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Point where the tool ends up after cutting the path.
    pub fn end(&self) -> Option<Point> {
        if self.closed {
            self.start()
        } else {
            self.points.last().copied()
        }
    }

    /// Length of the path, including the closing segment of a ring.
    pub fn length(&self) -> f64 {
        let mut total: f64 = self
            .points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum();
        if self.closed && self.points.len() > 1 {
            if let (Some(first), Some(last)) = (self.points.first(), self.points.last()) {
                total += last.distance_to(first);
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_area_orientation() {
        let square = Polygon::rectangle(0.0, 0.0, 2.0, 3.0);
        assert_eq!(ring_signed_area(&square.exterior), 6.0);

        let mut reversed = square.exterior.clone();
        reversed.reverse();
        assert_eq!(ring_signed_area(&reversed), -6.0);
    }

    #[test]
    fn test_polygon_with_hole() {
        let hole = Polygon::rectangle(1.0, 1.0, 1.0, 1.0).exterior;
        let poly = Polygon::with_interiors(Polygon::rectangle(0.0, 0.0, 3.0, 3.0).exterior, vec![hole]);
        assert_eq!(poly.area(), 8.0);
        assert!(poly.contains(&Point::new(0.5, 0.5)));
        assert!(!poly.contains(&Point::new(1.5, 1.5)));
        assert!(!poly.contains(&Point::new(4.0, 1.5)));
    }

    #[test]
    fn test_bounds_expand() {
        let bb = Polygon::rectangle(1.0, 2.0, 4.0, 2.0).bounds().unwrap();
        let grown = bb.expand(0.5);
        assert_eq!(grown, BoundingBox::new(0.5, 1.5, 5.5, 4.5));
        assert_eq!(grown.center(), Point::new(3.0, 3.0));
    }

    #[test]
    fn test_path_length() {
        let ring = Path::closed(Polygon::rectangle(0.0, 0.0, 1.0, 1.0).exterior);
        assert_eq!(ring.length(), 4.0);
        let line = Path::open(vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)]);
        assert_eq!(line.length(), 5.0);
        assert_eq!(line.end(), Some(Point::new(3.0, 4.0)));
        assert_eq!(ring.end(), ring.start());
    }
}
