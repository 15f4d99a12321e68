//! Boolean polygon operations on top of `geo`
//!
//! All regions are `MultiPolygon<f64>` in nanometre units. Every library call
//! is guarded so that a failure inside the clipper is reported as a
//! `ClipError` instead of unwinding through the fill engine.

use geo::algorithm::buffer::{BufferStyle, LineJoin};
use geo::{Area, BooleanOps, Buffer, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::constants::{MAX_COORDINATE, MIN_FRAGMENT_AREA};
use super::path::arc_step;
use super::units::{Length, Point};
use crate::error::ClipError;

/// Region of the board plane, in nanometres
pub type Region = MultiPolygon<f64>;

/// One connected piece of filled copper
///
/// Canonical form: exterior counter-clockwise, holes clockwise, each ring
/// starting at its smallest point (by x, then y), holes sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fragment {
    pub outline: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<Point>>,
}

impl Fragment {
    /// Filled area in mm²
    pub fn area_mm2(&self) -> f64 {
        let holes: i128 = self.holes.iter().map(|h| signed_area2(h).abs()).sum();
        (signed_area2(&self.outline).abs() - holes) as f64 / 2.0 / 1.0e12
    }
}

pub fn empty() -> Region {
    MultiPolygon::new(Vec::new())
}

pub fn area(region: &Region) -> f64 {
    region.unsigned_area()
}

/// True if the region has no area worth keeping
pub fn is_empty(region: &Region) -> bool {
    region.0.is_empty() || area(region) < MIN_FRAGMENT_AREA
}

pub fn check_point(p: Point) -> Result<(), ClipError> {
    if p.x.nm().abs() > MAX_COORDINATE || p.y.nm().abs() > MAX_COORDINATE {
        return Err(ClipError::CoordinateOutOfRange { x: p.x.nm(), y: p.y.nm() });
    }
    Ok(())
}

/// Region enclosed by a ring, with self-intersections resolved
pub fn ring(points: &[Point]) -> Result<Region, ClipError> {
    for p in points {
        check_point(*p)?;
    }
    if points.len() < 3 {
        return Ok(empty());
    }
    let exterior: LineString<f64> = points
        .iter()
        .map(|p| {
            let (x, y) = p.to_f64();
            Coord { x, y }
        })
        .collect();
    let polygon = MultiPolygon::new(vec![Polygon::new(exterior, Vec::new())]);
    guarded("sanitize", || polygon.union(&empty()))
}

/// Union of all rings; overlapping rings merge instead of cancelling
pub fn rings(rings_points: &[Vec<Point>]) -> Result<Region, ClipError> {
    let regions = rings_points
        .iter()
        .map(|points| ring(points))
        .collect::<Result<Vec<_>, _>>()?;
    unite_all(regions)
}

pub fn unite(a: &Region, b: &Region) -> Result<Region, ClipError> {
    if b.0.is_empty() {
        return Ok(a.clone());
    }
    if a.0.is_empty() {
        return Ok(b.clone());
    }
    guarded("union", || a.union(b))
}

/// Union of many regions, reduced pairwise to keep operands balanced
pub fn unite_all(mut regions: Vec<Region>) -> Result<Region, ClipError> {
    regions.retain(|r| !r.0.is_empty());
    while regions.len() > 1 {
        let mut next = Vec::with_capacity(regions.len().div_ceil(2));
        let mut iter = regions.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => next.push(unite(&a, &b)?),
                None => next.push(a),
            }
        }
        regions = next;
    }
    Ok(regions.pop().unwrap_or_else(empty))
}

pub fn subtract(a: &Region, b: &Region) -> Result<Region, ClipError> {
    if a.0.is_empty() || b.0.is_empty() {
        return Ok(a.clone());
    }
    guarded("difference", || a.difference(b))
}

pub fn intersect(a: &Region, b: &Region) -> Result<Region, ClipError> {
    if a.0.is_empty() || b.0.is_empty() {
        return Ok(empty());
    }
    guarded("intersection", || a.intersection(b))
}

/// Symmetric difference, used to combine outlines with the even-odd rule
pub fn xor(a: &Region, b: &Region) -> Result<Region, ClipError> {
    if a.0.is_empty() {
        return Ok(b.clone());
    }
    if b.0.is_empty() {
        return Ok(a.clone());
    }
    guarded("xor", || a.xor(b))
}

/// Grow (positive) or shrink (negative) a region with round corners
pub fn offset(region: &Region, distance: Length, tolerance: Length) -> Result<Region, ClipError> {
    if distance == Length::ZERO || region.0.is_empty() {
        return Ok(region.clone());
    }
    let d = distance.nm() as f64;
    let step = arc_step(d.abs(), tolerance.nm() as f64);
    let style = BufferStyle::new(d).line_join(LineJoin::Round(step));
    guarded("offset", || region.buffer_with_style(style))
}

/// Morphological opening: removes every part narrower than `2 * radius`
///
/// The result is clipped to the input so that arc approximation can never
/// grow the region.
pub fn open(region: &Region, radius: Length, tolerance: Length) -> Result<Region, ClipError> {
    if !radius.is_positive() || region.0.is_empty() {
        return Ok(region.clone());
    }
    let eroded = offset(region, -radius, tolerance)?;
    if is_empty(&eroded) {
        return Ok(empty());
    }
    let dilated = offset(&eroded, radius, tolerance)?;
    intersect(&dilated, region)
}

/// Split a region into its connected polygons
pub fn polygons(region: &Region) -> Vec<Region> {
    region
        .0
        .iter()
        .map(|p| MultiPolygon::new(vec![p.clone()]))
        .collect()
}

/// Canonical, grid-aligned fragments of a region
pub fn to_fragments(region: &Region) -> Vec<Fragment> {
    let mut fragments: Vec<Fragment> = region
        .0
        .iter()
        .filter_map(|polygon| {
            let outline = canonical_ring(polygon.exterior(), true)?;
            let mut holes: Vec<Vec<Point>> = polygon
                .interiors()
                .iter()
                .filter_map(|r| canonical_ring(r, false))
                .collect();
            holes.sort();
            Some(Fragment { outline, holes })
        })
        .collect();
    fragments.sort();
    fragments
}

/// Region covered by already canonical fragments
pub fn from_fragments(fragments: &[Fragment]) -> Region {
    let to_line = |points: &[Point]| -> LineString<f64> {
        points
            .iter()
            .map(|p| {
                let (x, y) = p.to_f64();
                Coord { x, y }
            })
            .collect()
    };
    MultiPolygon::new(
        fragments
            .iter()
            .map(|f| Polygon::new(to_line(&f.outline), f.holes.iter().map(|h| to_line(h)).collect()))
            .collect(),
    )
}

/// Twice the signed area of a ring (counter-clockwise positive)
fn signed_area2(points: &[Point]) -> i128 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x.nm() as i128 * b.y.nm() as i128 - b.x.nm() as i128 * a.y.nm() as i128
        })
        .sum()
}

fn canonical_ring(ring: &LineString<f64>, counter_clockwise: bool) -> Option<Vec<Point>> {
    let mut points: Vec<Point> = Vec::with_capacity(ring.0.len());
    for c in ring.coords() {
        let p = Point::from_f64(c.x, c.y);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return None;
    }
    let doubled = signed_area2(&points);
    if (doubled.abs() as f64) / 2.0 < MIN_FRAGMENT_AREA {
        return None;
    }
    if (doubled > 0) != counter_clockwise {
        points.reverse();
    }
    let start = points
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| **p)
        .map(|(i, _)| i)
        .unwrap_or(0);
    points.rotate_left(start);
    Some(points)
}

fn guarded<T>(operation: &'static str, f: impl FnOnce() -> T) -> Result<T, ClipError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| ClipError::Operation {
        operation,
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic in clipping library".to_string()
    }
}
