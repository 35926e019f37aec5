//! Coordinate primitives shared by the parsers, checks and net builder.
//!
//! Schematic space is Y-down, library symbol space is Y-up. All coordinates
//! are millimetres snapped to two decimals so that values computed here match
//! values round-tripped through the files.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Tolerance for coordinate comparison (mm).
pub const TOLERANCE: f64 = 0.0001;

/// Round to the 0.01 mm grid used by the files' writer.
pub fn snap(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    // avoid "-0" in reports
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// A snapped 2D point.
///
/// Equality, ordering and hashing go through the integer hundredth-of-a-mm
/// key, so two points snapping to the same grid value are interchangeable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: snap(x),
            y: snap(y),
        }
    }

    fn key(&self) -> (i64, i64) {
        ((self.x * 100.0).round() as i64, (self.y * 100.0).round() as i64)
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Both axes within [`TOLERANCE`].
pub fn pts_close(a: &Point, b: &Point) -> bool {
    (a.x - b.x).abs() < TOLERANCE && (a.y - b.y).abs() < TOLERANCE
}

/// Library-space offset `(lib_x, lib_y)` to a schematic-space offset for a
/// symbol placed at `angle` degrees (clockwise in Y-down space).
pub fn rotate_offset(lib_x: f64, lib_y: f64, angle_deg: f64) -> (f64, f64) {
    let (bx, by) = (lib_x, -lib_y);
    let (cos_a, sin_a) = rounded_trig(angle_deg, 10);
    (
        snap(cos_a * bx + sin_a * by),
        snap(-sin_a * bx + cos_a * by),
    )
}

/// Unit direction of a library-space angle after Y flip and symbol rotation.
/// Used for pin stubs, so it is not snapped to the grid.
pub fn rotate_direction(lib_angle_deg: f64, rotation_deg: f64) -> (f64, f64) {
    let (dir_x, dir_y) = rounded_trig(lib_angle_deg, 6);
    let by = -dir_y;
    let (cos_r, sin_r) = rounded_trig(rotation_deg, 6);
    (
        round_to(cos_r * dir_x + sin_r * by, 6),
        round_to(-sin_r * dir_x + cos_r * by, 6),
    )
}

fn rounded_trig(angle_deg: f64, places: i32) -> (f64, f64) {
    let rad = angle_deg.to_radians();
    (round_to(rad.cos(), places), round_to(rad.sin(), places))
}

fn round_to(v: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let r = (v * scale).round() / scale;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Axis-aligned box `(min_x, min_y, max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing every `(x, y)`; `None` when empty.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        coords.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => BBox::new(x, y, x, y),
                Some(b) => BBox::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
            })
        })
    }

    /// Sheet-style rectangle from an origin and a size.
    pub fn from_origin_size(origin: Point, width: f64, height: f64) -> Self {
        BBox::new(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Transform a library-space (Y-up) box into schematic space for an
    /// instance at `center` rotated by `angle` degrees.
    pub fn to_schematic(&self, center: Point, angle_deg: f64) -> BBox {
        let corners = [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ];
        let transformed = corners.iter().map(|&(lx, ly)| {
            let (dx, dy) = rotate_offset(lx, ly, angle_deg);
            (snap(center.x + dx), snap(center.y + dy))
        });
        // four corners always produce a box
        BBox::from_coords(transformed).unwrap_or(*self)
    }

    /// Strict interior containment, shrunk by tolerance.
    pub fn contains_strict(&self, p: &Point) -> bool {
        self.min_x + TOLERANCE < p.x
            && p.x < self.max_x - TOLERANCE
            && self.min_y + TOLERANCE < p.y
            && p.y < self.max_y - TOLERANCE
    }

    /// Inclusive containment.
    pub fn contains(&self, p: &Point) -> bool {
        self.min_x <= p.x && p.x <= self.max_x && self.min_y <= p.y && p.y <= self.max_y
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2},{:.2}]-[{:.2},{:.2}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// True when the two boxes share interior area (edges touching do not count).
pub fn bboxes_overlap(a: &BBox, b: &BBox) -> bool {
    a.min_x < b.max_x - TOLERANCE
        && a.max_x > b.min_x + TOLERANCE
        && a.min_y < b.max_y - TOLERANCE
        && a.max_y > b.min_y + TOLERANCE
}

/// Orientation of a two-point wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
    Diagonal,
}

/// A straight wire segment between two snapped points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn axis(&self) -> Axis {
        // zero-length wires count as horizontal, like the overlap grouping does
        if (self.start.y - self.end.y).abs() < TOLERANCE {
            Axis::Horizontal
        } else if (self.start.x - self.end.x).abs() < TOLERANCE {
            Axis::Vertical
        } else {
            Axis::Diagonal
        }
    }

    pub fn endpoints(&self) -> [Point; 2] {
        [self.start, self.end]
    }

    /// `(min, max)` along the wire's running axis.
    pub fn range(&self) -> (f64, f64) {
        match self.axis() {
            Axis::Vertical => (self.start.y.min(self.end.y), self.start.y.max(self.end.y)),
            _ => (self.start.x.min(self.end.x), self.start.x.max(self.end.x)),
        }
    }

    /// Point lies on the wire, endpoints included (tolerance-inclusive).
    pub fn touches(&self, p: &Point) -> bool {
        let (lo, hi) = self.range();
        match self.axis() {
            Axis::Horizontal => {
                (p.y - self.start.y).abs() < TOLERANCE && lo - TOLERANCE <= p.x && p.x <= hi + TOLERANCE
            }
            Axis::Vertical => {
                (p.x - self.start.x).abs() < TOLERANCE && lo - TOLERANCE <= p.y && p.y <= hi + TOLERANCE
            }
            Axis::Diagonal => false,
        }
    }

    /// Point lies strictly inside the wire, endpoints excluded.
    pub fn interior_contains(&self, p: &Point) -> bool {
        let (lo, hi) = self.range();
        match self.axis() {
            Axis::Horizontal => {
                (p.y - self.start.y).abs() < TOLERANCE && lo + TOLERANCE < p.x && p.x < hi - TOLERANCE
            }
            Axis::Vertical => {
                (p.x - self.start.x).abs() < TOLERANCE && lo + TOLERANCE < p.y && p.y < hi - TOLERANCE
            }
            Axis::Diagonal => false,
        }
    }

    /// Interior of an axis-aligned wire crosses the interior of `bbox`.
    /// A wire running along a box edge does not count.
    pub fn crosses_bbox(&self, bbox: &BBox) -> bool {
        let (lo, hi) = self.range();
        match self.axis() {
            Axis::Horizontal => {
                let y = self.start.y;
                if y <= bbox.min_y + TOLERANCE || y >= bbox.max_y - TOLERANCE {
                    return false;
                }
                lo + TOLERANCE < bbox.max_x && hi - TOLERANCE > bbox.min_x
            }
            Axis::Vertical => {
                let x = self.start.x;
                if x <= bbox.min_x + TOLERANCE || x >= bbox.max_x - TOLERANCE {
                    return false;
                }
                lo + TOLERANCE < bbox.max_y && hi - TOLERANCE > bbox.min_y
            }
            Axis::Diagonal => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})->({},{})",
            self.start.x, self.start.y, self.end.x, self.end.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_rounds_to_grid() {
        assert_eq!(snap(1.004999), 1.0);
        assert_eq!(snap(2.546), 2.55);
        assert_eq!(snap(-0.001), 0.0);
    }

    #[test]
    fn test_points_equal_after_snapping() {
        let a = Point::new(10.0000001, 20.0);
        let b = Point::new(10.0, 19.9999999);
        assert_eq!(a, b);
        assert!(pts_close(&a, &b));
    }

    #[test]
    fn test_rotate_offset_follows_file_convention() {
        // pin at library (0, 2.54) is above the body, i.e. negative Y on the sheet
        assert_eq!(rotate_offset(0.0, 2.54, 0.0), (0.0, -2.54));
        assert_eq!(rotate_offset(5.08, 0.0, 90.0), (0.0, -5.08));
        assert_eq!(rotate_offset(5.08, 0.0, 180.0), (-5.08, 0.0));
        assert_eq!(rotate_offset(5.08, 0.0, 270.0), (0.0, 5.08));
    }

    #[test]
    fn test_symmetric_bbox_same_at_0_and_180() {
        let lib = BBox::new(-2.54, -1.27, 2.54, 1.27);
        let at0 = lib.to_schematic(Point::new(100.0, 50.0), 0.0);
        let at180 = lib.to_schematic(Point::new(100.0, 50.0), 180.0);
        assert_eq!(at0, at180);
        assert_eq!(at0, BBox::new(97.46, 48.73, 102.54, 51.27));
    }

    #[test]
    fn test_bbox_rotation_swaps_extent() {
        let lib = BBox::new(-5.0, -1.0, 5.0, 1.0);
        let rotated = lib.to_schematic(Point::new(0.0, 0.0), 90.0);
        assert!((rotated.width() - 2.0).abs() < TOLERANCE);
        assert!((rotated.height() - 10.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_wire_on_bbox_edge_is_not_a_crossing() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let on_edge = Segment::new(Point::new(-5.0, 10.0), Point::new(15.0, 10.0));
        assert!(!on_edge.crosses_bbox(&bbox));
        let through = Segment::new(Point::new(-5.0, 5.0), Point::new(15.0, 5.0));
        assert!(through.crosses_bbox(&bbox));
        let ending_at_edge = Segment::new(Point::new(-5.0, 5.0), Point::new(0.0, 5.0));
        assert!(!ending_at_edge.crosses_bbox(&bbox));
    }

    #[test]
    fn test_touches_and_interior() {
        let w = Segment::new(Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        assert_eq!(w.axis(), Axis::Vertical);
        assert!(w.touches(&Point::new(0.0, 10.0)));
        assert!(!w.interior_contains(&Point::new(0.0, 10.0)));
        assert!(w.interior_contains(&Point::new(0.0, 5.0)));
        assert!(!w.touches(&Point::new(1.0, 5.0)));
    }

    #[test]
    fn test_bboxes_touching_edges_do_not_overlap() {
        let a = BBox::new(0.0, 0.0, 5.0, 5.0);
        let b = BBox::new(5.0, 0.0, 10.0, 5.0);
        let c = BBox::new(4.0, 4.0, 6.0, 6.0);
        assert!(!bboxes_overlap(&a, &b));
        assert!(bboxes_overlap(&a, &c));
    }

    #[test]
    fn test_stub_direction_rotates_with_symbol() {
        // pin pointing right in library space (angle 0) stays right at 0 deg
        assert_eq!(rotate_direction(0.0, 0.0), (1.0, 0.0));
        // library "up" (90) becomes schematic -Y
        assert_eq!(rotate_direction(90.0, 0.0), (0.0, -1.0));
        // rotating the symbol 90 turns right into up
        assert_eq!(rotate_direction(0.0, 90.0), (0.0, -1.0));
    }
}
