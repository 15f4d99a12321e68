//! Placement transform of devices and pads
//!
//! Maps item-local geometry onto the board: mirror (about the Y axis), then
//! rotate, then translate. Mirroring also flips the copper side of layers.

use serde::{Deserialize, Serialize};

use super::path::{Path, Vertex};
use super::units::{Angle, Point};
use crate::board::Layer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Point,
    #[serde(default)]
    pub rotation: Angle,
    #[serde(default)]
    pub mirrored: bool,
}

impl Transform {
    pub fn new(position: Point, rotation: Angle, mirrored: bool) -> Self {
        Self { position, rotation, mirrored }
    }

    pub fn map_point(&self, p: Point) -> Point {
        let (mut x, y) = p.to_f64();
        if self.mirrored {
            x = -x;
        }
        let (mut rx, mut ry) = (x, y);
        if !self.rotation.is_zero() {
            let (sin, cos) = self.rotation.to_rad().sin_cos();
            rx = x * cos - y * sin;
            ry = x * sin + y * cos;
        }
        Point::from_f64(rx, ry) + self.position
    }

    /// Mirroring reverses the turning direction of arcs
    pub fn map_path(&self, path: &Path) -> Path {
        Path::new(
            path.vertices
                .iter()
                .map(|v| {
                    let angle = if self.mirrored { -v.angle } else { v.angle };
                    Vertex::with_angle(self.map_point(v.pos), angle)
                })
                .collect(),
        )
    }

    pub fn map_layer(&self, layer: Layer, inner_layer_count: u8) -> Layer {
        if self.mirrored {
            layer.mirrored(inner_layer_count)
        } else {
            layer
        }
    }

    /// Absolute rotation of something rotated by `rotation` in local space
    pub fn map_rotation(&self, rotation: Angle) -> Angle {
        let local = if self.mirrored { -rotation } else { rotation };
        self.rotation + local
    }

    /// Combined transform: `inner` applied first, then `self`
    pub fn compose(&self, inner: &Transform) -> Transform {
        Transform {
            position: self.map_point(inner.position),
            rotation: self.map_rotation(inner.rotation),
            mirrored: self.mirrored != inner.mirrored,
        }
    }
}
