//! Build outputs, warnings and controller events

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::board::Layer;
use crate::error::FillError;
use crate::geometry::{Fragment, Point};

/// Non-fatal problem found while filling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillWarning {
    /// The plane is on a layer the board does not have
    LayerNotEnabled { plane: Uuid, layer: Layer },
    /// The outline encloses no area
    DegenerateOutline { plane: Uuid, layer: Layer },
    /// A pad or via inside the plane got no thermal spoke
    ThermalUnconnected { plane: Uuid, layer: Layer, position: Point },
}

/// Fragments per plane and layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentResult {
    pub planes: BTreeMap<Uuid, BTreeMap<Layer, Vec<Fragment>>>,
    #[serde(default)]
    pub warnings: Vec<FillWarning>,
}

impl FragmentResult {
    pub fn fragments(&self, plane: &Uuid, layer: Layer) -> Option<&[Fragment]> {
        self.planes.get(plane)?.get(&layer).map(Vec::as_slice)
    }

    pub fn fragment_count(&self) -> usize {
        self.planes.values().flat_map(|l| l.values()).map(Vec::len).sum()
    }
}

/// Statistics of a committed build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub planes: usize,
    pub layers: Vec<Layer>,
    pub fragments: usize,
    pub warnings: Vec<FillWarning>,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildStatus {
    /// Fragments were committed to the board
    Succeeded(BuildSummary),
    Cancelled,
    Failed(FillError),
}

/// Notification sent to subscribers of a plane fragments builder
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderEvent {
    Started { planes: usize, layers: Vec<Layer> },
    Finished(BuildStatus),
}
