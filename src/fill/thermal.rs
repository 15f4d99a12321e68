//! Thermal relief spokes
//!
//! A same-net pad or via in a thermal relief plane sits in a gap of
//! `thermal_gap` and is tied to the fill by up to four straight spokes of
//! `thermal_spoke_width`. Spokes point along the pad rotation (0° for vias)
//! and its three right-angle turns. A spoke that would leave the copper
//! allowed for the plane is tried once more at +45°; a spoke that does not
//! reach the fill is left out. Placed spokes are clipped to the allowed
//! copper, so a spoke grazing foreign clearance loses the grazing corner.

use super::job::{Obstacle, PlaneData};
use crate::error::ClipError;
use crate::geometry::clip::{self, Region};
use crate::geometry::{Angle, Length, Point, MAX_ARC_TOLERANCE};

const QUARTER_TURN: Angle = Angle::from_micro_deg(90_000_000);
const EIGHTH_TURN: Angle = Angle::from_micro_deg(45_000_000);

/// Spokes of one pad or via
#[derive(Debug, Default)]
pub struct ThermalOutcome {
    pub spokes: Vec<Region>,
    /// The terminal lies inside the plane outline but no spoke fits
    pub unconnected: bool,
}

enum Spoke {
    Blocked,
    Unreached,
    Placed(Region),
}

/// Spokes connecting `terminal` to `fill`
///
/// `allowed` is the plane area before relief cuts and the width opening.
pub fn connect(
    plane: &PlaneData,
    terminal: &Obstacle,
    outline: &Region,
    allowed: &Region,
    fill: &Region,
) -> Result<ThermalOutcome, ClipError> {
    let copper = terminal.copper_region(Length::ZERO)?;
    let holes = terminal.holes_region(Length::ZERO)?;
    let reachable = clip::unite(&copper, allowed)?;
    let ctx = SpokeContext {
        plane,
        terminal,
        copper: &copper,
        holes: &holes,
        reachable: &reachable,
        fill,
    };

    let mut outcome = ThermalOutcome::default();
    let mut angle = terminal.rotation;
    for _ in 0..4 {
        let spoke = match ctx.spoke(angle)? {
            Spoke::Blocked => ctx.spoke(angle + EIGHTH_TURN)?,
            other => other,
        };
        if let Spoke::Placed(region) = spoke {
            outcome.spokes.push(region);
        }
        angle = angle + QUARTER_TURN;
    }

    if outcome.spokes.is_empty() {
        outcome.unconnected = clip::is_empty(&clip::subtract(&copper, outline)?);
    }
    Ok(outcome)
}

struct SpokeContext<'a> {
    plane: &'a PlaneData,
    terminal: &'a Obstacle,
    copper: &'a Region,
    holes: &'a Region,
    /// Terminal copper plus the allowed plane area
    reachable: &'a Region,
    fill: &'a Region,
}

impl SpokeContext<'_> {
    fn spoke(&self, angle: Angle) -> Result<Spoke, ClipError> {
        let width = self.plane.thermal_spoke_width;
        let (sin, cos) = angle.to_rad().sin_cos();
        let dir = (cos, sin);
        let anchor = self.terminal.anchor;
        let reach = self
            .terminal
            .copper
            .iter()
            .map(|s| s.reach(anchor, dir))
            .fold(0.0, f64::max);
        let length = reach + (self.plane.thermal_gap + width).nm() as f64;

        let rect = clip::ring(&spoke_corners(anchor, dir, length, width.nm() as f64))?;
        let violation = clip::subtract(&rect, self.reachable)?;
        if clip::area(&violation) > (width.nm() * MAX_ARC_TOLERANCE.nm()) as f64 {
            return Ok(Spoke::Blocked);
        }
        let outside = clip::subtract(&rect, self.copper)?;
        if clip::is_empty(&clip::intersect(&outside, self.fill)?) {
            return Ok(Spoke::Unreached);
        }
        let clipped = clip::intersect(&rect, self.reachable)?;
        Ok(Spoke::Placed(clip::subtract(&clipped, self.holes)?))
    }
}

/// Rectangle of `width` from `origin` along `dir` for `length` nm
fn spoke_corners(origin: Point, dir: (f64, f64), length: f64, width: f64) -> Vec<Point> {
    let (ox, oy) = origin.to_f64();
    let (nx, ny) = (-dir.1 * width / 2.0, dir.0 * width / 2.0);
    let (ex, ey) = (ox + dir.0 * length, oy + dir.1 * length);
    vec![
        Point::from_f64(ox - nx, oy - ny),
        Point::from_f64(ex - nx, ey - ny),
        Point::from_f64(ex + nx, ey + ny),
        Point::from_f64(ox + nx, oy + ny),
    ]
}
