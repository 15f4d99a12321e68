//! Paths with optional arc segments
//!
//! A path is a list of vertices; each vertex carries the sweep angle of the
//! segment leading to the next vertex (zero for a straight line). Paths are
//! flattened to point lists with a maximum arc deviation before they are
//! handed to the clipping library.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI};

use super::units::{Angle, Length, Point};

/// A path vertex and the arc angle of the segment starting at it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub pos: Point,
    #[serde(default)]
    pub angle: Angle,
}

impl Vertex {
    pub const fn new(pos: Point) -> Self {
        Self { pos, angle: Angle::ZERO }
    }

    pub const fn with_angle(pos: Point, angle: Angle) -> Self {
        Self { pos, angle }
    }
}

/// Polyline or polygon with optional arc segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    pub vertices: Vec<Vertex>,
}

impl Path {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    pub fn from_points(points: &[Point]) -> Self {
        Self::new(points.iter().copied().map(Vertex::new).collect())
    }

    /// Closed axis-aligned rectangle from two opposite corners
    pub fn rect(p1: Point, p2: Point) -> Self {
        Self::from_points(&[
            p1,
            Point::new(p2.x, p1.y),
            p2,
            Point::new(p1.x, p2.y),
            p1,
        ])
    }

    /// Closed circle centered at the origin, made of two half arcs
    pub fn circle(diameter: Length) -> Self {
        let r = diameter / 2;
        Self::new(vec![
            Vertex::with_angle(Point::new(r, Length::ZERO), Angle::deg180()),
            Vertex::with_angle(Point::new(-r, Length::ZERO), Angle::deg180()),
            Vertex::new(Point::new(r, Length::ZERO)),
        ])
    }

    /// Closed stadium shape around the segment `p1`-`p2`
    pub fn obround(p1: Point, p2: Point, width: Length) -> Self {
        if p1 == p2 {
            return Self::circle(width).translated(p1);
        }
        let (x1, y1) = p1.to_f64();
        let (x2, y2) = p2.to_f64();
        let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        let r = width.nm() as f64 / 2.0;
        // Left normal of the segment, scaled to the half width
        let nx = -(y2 - y1) / len * r;
        let ny = (x2 - x1) / len * r;
        let v0 = Point::from_f64(x1 - nx, y1 - ny);
        let v1 = Point::from_f64(x2 - nx, y2 - ny);
        let v2 = Point::from_f64(x2 + nx, y2 + ny);
        let v3 = Point::from_f64(x1 + nx, y1 + ny);
        Self::new(vec![
            Vertex::new(v0),
            Vertex::with_angle(v1, Angle::deg180()),
            Vertex::new(v2),
            Vertex::with_angle(v3, Angle::deg180()),
            Vertex::new(v0),
        ])
    }

    /// Closed rectangle centered at the origin with rounded corners
    pub fn rounded_rect(width: Length, height: Length, radius: Length) -> Self {
        let hw = width / 2;
        let hh = height / 2;
        let r = radius.max(Length::ZERO).min(hw.min(hh));
        if r == Length::ZERO {
            return Self::rect(Point::new(-hw, -hh), Point::new(hw, hh));
        }
        let quarter = Angle::deg90();
        Self::new(vec![
            Vertex::new(Point::new(-hw + r, -hh)),
            Vertex::with_angle(Point::new(hw - r, -hh), quarter),
            Vertex::new(Point::new(hw, -hh + r)),
            Vertex::with_angle(Point::new(hw, hh - r), quarter),
            Vertex::new(Point::new(hw - r, hh)),
            Vertex::with_angle(Point::new(-hw + r, hh), quarter),
            Vertex::new(Point::new(-hw, hh - r)),
            Vertex::with_angle(Point::new(-hw, -hh + r), quarter),
            Vertex::new(Point::new(-hw + r, -hh)),
        ])
    }

    pub fn translated(&self, offset: Point) -> Self {
        Self::new(
            self.vertices
                .iter()
                .map(|v| Vertex::with_angle(v.pos + offset, v.angle))
                .collect(),
        )
    }

    pub fn is_closed(&self) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) => self.vertices.len() > 1 && first.pos == last.pos,
            _ => false,
        }
    }

    /// Append the first vertex if the path is open; the angle of the last
    /// vertex then applies to the closing segment
    pub fn to_closed(&self) -> Self {
        let mut path = self.clone();
        if let Some(first) = self.vertices.first() {
            if !self.is_closed() {
                path.vertices.push(Vertex::new(first.pos));
            }
        }
        path
    }

    /// Polyline with all arcs replaced by line segments
    pub fn flattened(&self, tolerance: Length) -> Vec<Point> {
        let mut out: Vec<Point> = Vec::with_capacity(self.vertices.len());
        for (i, vertex) in self.vertices.iter().enumerate() {
            push_unique(&mut out, vertex.pos);
            if let Some(next) = self.vertices.get(i + 1) {
                if !vertex.angle.is_zero() {
                    push_arc(&mut out, vertex.pos, next.pos, vertex.angle.to_rad(), tolerance);
                }
            }
        }
        out
    }

    /// Ring of the closed path without the repeated closing point
    pub fn closed_points(&self, tolerance: Length) -> Vec<Point> {
        let mut points = self.to_closed().flattened(tolerance);
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        points
    }

    /// One closed ring per segment, each segment stroked with round ends
    pub fn to_outline_strokes(&self, width: Length, tolerance: Length) -> Vec<Vec<Point>> {
        let points = self.flattened(tolerance);
        match points.len() {
            0 => Vec::new(),
            1 => vec![Self::circle(width).translated(points[0]).closed_points(tolerance)],
            _ => points
                .windows(2)
                .map(|seg| Self::obround(seg[0], seg[1], width).closed_points(tolerance))
                .collect(),
        }
    }
}

/// Largest angular step for an arc of the given radius that keeps the chord
/// within `tolerance` of the true arc
pub fn arc_step(radius: f64, tolerance: f64) -> f64 {
    if radius <= tolerance || tolerance <= 0.0 {
        return FRAC_PI_4;
    }
    (2.0 * (1.0 - tolerance / radius).acos()).clamp(1e-3, FRAC_PI_4)
}

/// Bounding box `[min_x, min_y, max_x, max_y]` in nanometres
pub fn points_bounds(points: &[Point]) -> Option<[f64; 4]> {
    let first = points.first()?.to_f64();
    Some(points.iter().fold(
        [first.0, first.1, first.0, first.1],
        |b, p| {
            let (x, y) = p.to_f64();
            [b[0].min(x), b[1].min(y), b[2].max(x), b[3].max(y)]
        },
    ))
}

fn push_unique(out: &mut Vec<Point>, p: Point) {
    if out.last() != Some(&p) {
        out.push(p);
    }
}

/// Push the interior points of the arc from `p1` to `p2` (exclusive ends)
fn push_arc(out: &mut Vec<Point>, p1: Point, p2: Point, sweep: f64, tolerance: Length) {
    let (x1, y1) = p1.to_f64();
    let (x2, y2) = p2.to_f64();
    let (dx, dy) = (x2 - x1, y2 - y1);
    let chord = (dx * dx + dy * dy).sqrt();
    if chord == 0.0 || sweep.abs() < 1e-9 || sweep.abs() >= 2.0 * PI {
        return;
    }
    let half = sweep / 2.0;
    let radius = (chord / (2.0 * half.sin())).abs();
    // Signed distance from the chord midpoint to the center, along the left normal
    let h = chord / (2.0 * half.tan());
    let cx = (x1 + x2) / 2.0 - dy / chord * h;
    let cy = (y1 + y2) / 2.0 + dx / chord * h;
    let start = (y1 - cy).atan2(x1 - cx);
    let steps = (sweep.abs() / arc_step(radius, tolerance.nm() as f64)).ceil().max(1.0) as usize;
    for i in 1..steps {
        let a = start + sweep * i as f64 / steps as f64;
        push_unique(out, Point::from_f64(cx + radius * a.cos(), cy + radius * a.sin()));
    }
}
