//! Board items seen by the plane fill engine

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::layer::Layer;
use crate::geometry::{Fragment, Length, Path, Point, Transform};

/// How a plane connects to pads and vias of its own net
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectStyle {
    /// Isolated like foreign copper
    None,
    /// Gap around the pad, bridged by spokes
    ThermalRelief,
    #[default]
    Solid,
}

fn default_min_width() -> Length {
    Length::from_mm(0.2)
}

fn default_min_clearance() -> Length {
    Length::from_mm(0.3)
}

fn default_thermal_gap() -> Length {
    Length::from_mm(0.3)
}

fn default_thermal_spoke_width() -> Length {
    Length::from_mm(0.3)
}

/// A copper plane and its fill rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub uuid: Uuid,
    pub layers: BTreeSet<Layer>,
    #[serde(default)]
    pub net: Option<Uuid>,
    pub outline: Path,
    #[serde(default = "default_min_width")]
    pub min_width: Length,
    #[serde(default = "default_min_clearance")]
    pub min_clearance: Length,
    #[serde(default)]
    pub keep_orphans: bool,
    /// Lower values are filled first
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub connect_style: ConnectStyle,
    #[serde(default = "default_thermal_gap")]
    pub thermal_gap: Length,
    #[serde(default = "default_thermal_spoke_width")]
    pub thermal_spoke_width: Length,
    /// Derived copper, replaced by every rebuild
    #[serde(default)]
    pub fragments: BTreeMap<Layer, Vec<Fragment>>,
}

impl Plane {
    pub fn new(uuid: Uuid, layer: Layer, net: Option<Uuid>, outline: Path) -> Self {
        Self {
            uuid,
            layers: BTreeSet::from([layer]),
            net,
            outline,
            min_width: default_min_width(),
            min_clearance: default_min_clearance(),
            keep_orphans: false,
            priority: 0,
            connect_style: ConnectStyle::default(),
            thermal_gap: default_thermal_gap(),
            thermal_spoke_width: default_thermal_spoke_width(),
            fragments: BTreeMap::new(),
        }
    }

    pub fn fragments(&self, layer: Layer) -> &[Fragment] {
        self.fragments.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Polygon drawn on a board layer (no net)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardPolygon {
    pub uuid: Uuid,
    pub layer: Layer,
    pub path: Path,
    /// Line width of the outline stroke, zero for none
    #[serde(default)]
    pub width: Length,
    #[serde(default)]
    pub filled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub layer: Layer,
    pub center: Point,
    pub diameter: Length,
    #[serde(default)]
    pub line_width: Length,
    #[serde(default)]
    pub filled: bool,
}

/// Non-plated hole; the path is its center line (a single point for a drill)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub uuid: Uuid,
    pub diameter: Length,
    pub path: Path,
}

/// Text made of stroked glyph center lines (no net)
///
/// `layer` and `transform` are absolute, like pads; `paths` are in text
/// coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeText {
    pub uuid: Uuid,
    pub layer: Layer,
    pub transform: Transform,
    pub stroke_width: Length,
    #[serde(default)]
    pub paths: Vec<Path>,
}

/// Area where no plane copper may be placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keepout {
    pub uuid: Uuid,
    pub layers: BTreeSet<Layer>,
    pub outline: Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PadShape {
    RoundedRect { width: Length, height: Length, #[serde(default)] radius: Length },
    Stroke { width: Length, path: Path },
    Custom { outline: Path },
}

/// Plated hole of a pad, in pad coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadHole {
    pub diameter: Length,
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadGeometry {
    pub shape: PadShape,
    #[serde(default)]
    pub holes: Vec<PadHole>,
}

/// A footprint pad
///
/// `transform` is the absolute placement on the board; `geometries` are in
/// pad coordinates, keyed by the board layer they end up on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub uuid: Uuid,
    pub transform: Transform,
    #[serde(default)]
    pub net: Option<Uuid>,
    #[serde(default)]
    pub clearance: Length,
    pub geometries: BTreeMap<Layer, Vec<PadGeometry>>,
}

/// A placed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub uuid: Uuid,
    pub transform: Transform,
    #[serde(default)]
    pub pads: Vec<Pad>,
    /// Footprint graphics in device coordinates
    #[serde(default)]
    pub polygons: Vec<BoardPolygon>,
    #[serde(default)]
    pub circles: Vec<Circle>,
    #[serde(default)]
    pub holes: Vec<Hole>,
    #[serde(default)]
    pub stroke_texts: Vec<StrokeText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub uuid: Uuid,
    pub position: Point,
    pub size: Length,
    pub drill: Length,
    pub start_layer: Layer,
    pub end_layer: Layer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub uuid: Uuid,
    pub layer: Layer,
    pub start: Point,
    pub end: Point,
    pub width: Length,
}

/// Vias and traces of one net (or of no net)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetSegment {
    pub uuid: Uuid,
    #[serde(default)]
    pub net: Option<Uuid>,
    #[serde(default)]
    pub vias: Vec<Via>,
    #[serde(default)]
    pub traces: Vec<Trace>,
}
