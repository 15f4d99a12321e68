//! Immutable snapshot of everything a fill build needs

use rstar::{RTreeObject, AABB};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::board::{ConnectStyle, Layer, Plane};
use crate::error::ClipError;
use crate::geometry::clip::{self, Region};
use crate::geometry::{points_bounds, Angle, Length, Path, Point, MAX_ARC_TOLERANCE};

/// Plane configuration copied out of the board
#[derive(Debug, Clone)]
pub struct PlaneData {
    pub uuid: Uuid,
    pub layers: BTreeSet<Layer>,
    pub net: Option<Uuid>,
    pub outline: Path,
    pub min_width: Length,
    pub min_clearance: Length,
    pub keep_orphans: bool,
    pub priority: i32,
    pub connect_style: ConnectStyle,
    pub thermal_gap: Length,
    pub thermal_spoke_width: Length,
}

impl PlaneData {
    pub fn from_plane(plane: &Plane) -> Self {
        Self {
            uuid: plane.uuid,
            layers: plane.layers.clone(),
            net: plane.net,
            outline: plane.outline.clone(),
            min_width: plane.min_width,
            min_clearance: plane.min_clearance,
            keep_orphans: plane.keep_orphans,
            priority: plane.priority,
            connect_style: plane.connect_style,
            thermal_gap: plane.thermal_gap,
            thermal_spoke_width: plane.thermal_spoke_width,
        }
    }

    /// Both have a net and it is the same one
    pub fn shares_net(&self, net: Option<Uuid>) -> bool {
        self.net.is_some() && self.net == net
    }

    /// Sanitized outline region
    pub fn outline_region(&self) -> Result<Region, ClipError> {
        clip::ring(&self.outline.closed_points(MAX_ARC_TOLERANCE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    Polygon,
    Pad,
    Via,
    Trace,
    Text,
    Hole,
    Keepout,
}

/// Geometry of an obstacle, in board coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Filled closed outline
    Area(Path),
    /// Every segment stroked with round ends
    Stroke { path: Path, width: Length },
    Circle { center: Point, diameter: Length },
}

impl Shape {
    /// Region of the shape grown by `grow` on every side
    pub fn to_region(&self, grow: Length) -> Result<Region, ClipError> {
        match self {
            Shape::Area(path) => {
                let region = clip::ring(&path.closed_points(MAX_ARC_TOLERANCE))?;
                clip::offset(&region, grow, MAX_ARC_TOLERANCE)
            }
            Shape::Stroke { path, width } => {
                let width = *width + grow * 2;
                if !width.is_positive() {
                    return Ok(clip::empty());
                }
                clip::rings(&path.to_outline_strokes(width, MAX_ARC_TOLERANCE))
            }
            Shape::Circle { center, diameter } => {
                let diameter = *diameter + grow * 2;
                if !diameter.is_positive() {
                    return Ok(clip::empty());
                }
                let ring = Path::circle(diameter)
                    .translated(*center)
                    .closed_points(MAX_ARC_TOLERANCE);
                clip::ring(&ring)
            }
        }
    }

    /// Bounding box `[min_x, min_y, max_x, max_y]` including `grow`
    pub fn bounds(&self, grow: Length) -> Option<[f64; 4]> {
        let (b, margin) = match self {
            Shape::Area(path) => (points_bounds(&path.flattened(MAX_ARC_TOLERANCE))?, grow),
            Shape::Stroke { path, width } => {
                (points_bounds(&path.flattened(MAX_ARC_TOLERANCE))?, *width / 2 + grow)
            }
            Shape::Circle { center, diameter } => {
                (points_bounds(&[*center])?, *diameter / 2 + grow)
            }
        };
        let m = margin.nm().max(0) as f64;
        Some([b[0] - m, b[1] - m, b[2] + m, b[3] + m])
    }

    /// Largest extent of the shape from `origin` along the unit vector `dir`
    pub fn reach(&self, origin: Point, dir: (f64, f64)) -> f64 {
        let (ox, oy) = origin.to_f64();
        let project = |p: &Point| {
            let (x, y) = p.to_f64();
            (x - ox) * dir.0 + (y - oy) * dir.1
        };
        let max_along = |points: &[Point]| points.iter().map(|p| project(p)).fold(f64::MIN, f64::max);
        match self {
            Shape::Area(path) => max_along(&path.flattened(MAX_ARC_TOLERANCE)),
            Shape::Stroke { path, width } => {
                max_along(&path.flattened(MAX_ARC_TOLERANCE)) + width.nm() as f64 / 2.0
            }
            Shape::Circle { center, diameter } => project(center) + diameter.nm() as f64 / 2.0,
        }
    }
}

/// Anything that blocks plane copper or connects to it
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub layers: BTreeSet<Layer>,
    pub net: Option<Uuid>,
    /// Clearance required by the obstacle itself
    pub clearance: Length,
    pub copper: Vec<Shape>,
    /// Plated holes through the copper
    pub holes: Vec<Shape>,
    /// Origin and base orientation of thermal spokes
    pub anchor: Point,
    pub rotation: Angle,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, layers: BTreeSet<Layer>, net: Option<Uuid>) -> Self {
        Self {
            kind,
            layers,
            net,
            clearance: Length::ZERO,
            copper: Vec::new(),
            holes: Vec::new(),
            anchor: Point::default(),
            rotation: Angle::ZERO,
        }
    }

    /// Holes and keepout zones, which exclude copper regardless of net
    pub fn is_keepout(&self) -> bool {
        matches!(self.kind, ObstacleKind::Hole | ObstacleKind::Keepout)
    }

    /// Pads and vias, which get thermal reliefs
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ObstacleKind::Pad | ObstacleKind::Via)
    }

    pub fn copper_region(&self, grow: Length) -> Result<Region, ClipError> {
        shapes_region(&self.copper, grow)
    }

    pub fn holes_region(&self, grow: Length) -> Result<Region, ClipError> {
        shapes_region(&self.holes, grow)
    }

    /// Copper and plated holes grown by `grow`
    pub fn exclusion_region(&self, grow: Length) -> Result<Region, ClipError> {
        let copper = self.copper_region(grow)?;
        let holes = self.holes_region(grow)?;
        clip::unite(&copper, &holes)
    }

    pub fn bounds(&self, grow: Length) -> Option<[f64; 4]> {
        self.copper
            .iter()
            .chain(self.holes.iter())
            .filter_map(|s| s.bounds(grow))
            .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])])
    }
}

fn shapes_region(shapes: &[Shape], grow: Length) -> Result<Region, ClipError> {
    let regions = shapes
        .iter()
        .map(|s| s.to_region(grow))
        .collect::<Result<Vec<_>, _>>()?;
    clip::unite_all(regions)
}

/// Entry of the per-layer obstacle index
#[derive(Debug, Clone)]
pub struct ObstacleEnvelope {
    pub index: usize,
    pub bounds: AABB<[f64; 2]>,
}

impl ObstacleEnvelope {
    pub fn new(index: usize, b: [f64; 4]) -> Self {
        Self { index, bounds: AABB::from_corners([b[0], b[1]], [b[2], b[3]]) }
    }
}

impl RTreeObject for ObstacleEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

/// One fill computation request
#[derive(Debug, Clone)]
pub struct Job {
    pub board: Uuid,
    /// Layers to rebuild
    pub layers: BTreeSet<Layer>,
    pub enabled_layers: BTreeSet<Layer>,
    /// Schedule revisions seen when the job was taken
    pub revisions: BTreeMap<Layer, u64>,
    /// Sorted by priority, then uuid
    pub planes: Vec<PlaneData>,
    pub obstacles: Vec<Obstacle>,
    pub board_outlines: Vec<Path>,
}

impl Job {
    pub fn planes_on(&self, layer: Layer) -> impl Iterator<Item = &PlaneData> {
        self.planes.iter().filter(move |p| p.layers.contains(&layer))
    }

    pub fn obstacles_on(&self, layer: Layer) -> impl Iterator<Item = (usize, &Obstacle)> {
        self.obstacles
            .iter()
            .enumerate()
            .filter(move |(_, o)| o.layers.contains(&layer))
    }
}
