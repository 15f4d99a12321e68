//! In-memory board model
//!
//! Holds everything the plane fill engine reads (planes, devices, net
//! segments, polygons, texts, holes and keepouts) and the schedule of plane layers
//! waiting for a rebuild. The engine only ever writes plane fragments and
//! acknowledges the schedule.

mod items;
mod layer;

pub use items::{
    BoardPolygon, Circle, ConnectStyle, Device, Hole, Keepout, NetSegment, Pad, PadGeometry,
    PadHole, PadShape, Plane, StrokeText, Trace, Via,
};
pub use layer::{copper_layers, copper_span, Layer};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::geometry::Fragment;

/// Plane layers waiting for a rebuild
///
/// Every invalidation bumps the revision of the layer, so an acknowledgement
/// for an older revision leaves a newer invalidation in place.
#[derive(Debug, Clone, Default)]
struct RebuildSchedule {
    counter: u64,
    layers: BTreeMap<Layer, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inner_layer_count: u8,
    #[serde(default)]
    pub planes: IndexMap<Uuid, Plane>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub net_segments: Vec<NetSegment>,
    #[serde(default)]
    pub polygons: Vec<BoardPolygon>,
    #[serde(default)]
    pub stroke_texts: Vec<StrokeText>,
    #[serde(default)]
    pub holes: Vec<Hole>,
    #[serde(default)]
    pub keepouts: Vec<Keepout>,
    #[serde(skip)]
    schedule: RebuildSchedule,
}

impl Board {
    pub fn new(name: &str, inner_layer_count: u8) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            inner_layer_count,
            planes: IndexMap::new(),
            devices: Vec::new(),
            net_segments: Vec::new(),
            polygons: Vec::new(),
            stroke_texts: Vec::new(),
            holes: Vec::new(),
            keepouts: Vec::new(),
            schedule: RebuildSchedule::default(),
        }
    }

    /// Copper layers existing on this board
    pub fn enabled_layers(&self) -> BTreeSet<Layer> {
        copper_layers(self.inner_layer_count).into_iter().collect()
    }

    pub fn add_plane(&mut self, plane: Plane) {
        let layers: Vec<Layer> = plane.layers.iter().copied().collect();
        self.planes.insert(plane.uuid, plane);
        for layer in layers {
            self.invalidate_planes(Some(layer));
        }
    }

    pub fn remove_plane(&mut self, uuid: &Uuid) -> Option<Plane> {
        self.planes.shift_remove(uuid)
    }

    /// Schedule a rebuild of one layer, or of all plane layers
    pub fn invalidate_planes(&mut self, layer: Option<Layer>) {
        let layers: Vec<Layer> = match layer {
            Some(layer) => vec![layer],
            None => self
                .planes
                .values()
                .flat_map(|p| p.layers.iter().copied())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };
        for layer in layers {
            self.schedule.counter += 1;
            self.schedule.layers.insert(layer, self.schedule.counter);
        }
    }

    /// Scheduled layers among `candidates`, with their current revision
    pub fn scheduled_layers(&self, candidates: &BTreeSet<Layer>) -> BTreeMap<Layer, u64> {
        self.schedule
            .layers
            .iter()
            .filter(|(layer, _)| candidates.contains(layer))
            .map(|(layer, rev)| (*layer, *rev))
            .collect()
    }

    pub fn is_scheduled(&self, layer: Layer) -> bool {
        self.schedule.layers.contains_key(&layer)
    }

    /// Clear the schedule for layers not invalidated since `revisions` was taken
    pub fn acknowledge_planes_rebuild(&mut self, revisions: &BTreeMap<Layer, u64>) {
        for (layer, seen) in revisions {
            if self.schedule.layers.get(layer) == Some(seen) {
                self.schedule.layers.remove(layer);
            }
        }
    }

    /// Returns false if the plane no longer exists
    pub fn set_plane_fragments(&mut self, plane: &Uuid, layer: Layer, fragments: Vec<Fragment>) -> bool {
        match self.planes.get_mut(plane) {
            Some(plane) => {
                plane.fragments.insert(layer, fragments);
                true
            }
            None => false,
        }
    }
}
