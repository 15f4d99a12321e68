//! Board snapshot extraction
//!
//! Walks the board and copies every plane and every copper-bearing item on
//! the layers to rebuild into a self-contained [`Job`]. Item geometry is
//! transformed into board coordinates here; conversion into clipping regions
//! is left to the builder so failures can be reported per plane and layer.

use std::collections::BTreeSet;

use super::job::{Job, Obstacle, ObstacleKind, PlaneData, Shape};
use crate::board::{
    copper_span, Board, Device, Layer, Pad, PadGeometry, PadHole, PadShape, StrokeText,
};
use crate::geometry::{Length, Path, Transform};

/// Snapshot the board for a rebuild of the plane layers
///
/// Without a filter every plane layer is rebuilt; with a filter only the
/// scheduled plane layers inside it. Returns `None` if there is nothing to
/// rebuild.
pub fn create_job(board: &Board, filter: Option<&BTreeSet<Layer>>) -> Option<Job> {
    let candidates: BTreeSet<Layer> = board
        .planes
        .values()
        .flat_map(|p| p.layers.iter().copied())
        .filter(|l| filter.map_or(true, |f| f.contains(l)))
        .collect();
    let revisions = board.scheduled_layers(&candidates);
    let layers: BTreeSet<Layer> = match filter {
        Some(_) => revisions.keys().copied().collect(),
        None => candidates,
    };
    if layers.is_empty() {
        return None;
    }

    let mut planes: Vec<PlaneData> = board
        .planes
        .values()
        .filter(|p| p.layers.iter().any(|l| layers.contains(l)))
        .map(PlaneData::from_plane)
        .collect();
    planes.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.uuid.cmp(&b.uuid)));

    let mut extractor = Extractor {
        layers: &layers,
        copper: board.enabled_layers(),
        inner_layer_count: board.inner_layer_count,
        obstacles: Vec::new(),
        board_outlines: Vec::new(),
    };
    extractor.add_board_polygons(board);
    extractor.add_stroke_texts(&board.stroke_texts);
    for device in &board.devices {
        extractor.add_device(device);
    }
    extractor.add_net_segments(board);
    extractor.add_holes_and_keepouts(board);

    log::debug!(
        "[PlaneFill] Job for board {}: {} planes, {} obstacles, layers {:?}",
        board.uuid,
        planes.len(),
        extractor.obstacles.len(),
        layers.iter().map(|l| l.id()).collect::<Vec<_>>()
    );

    Some(Job {
        board: board.uuid,
        enabled_layers: board.enabled_layers(),
        obstacles: extractor.obstacles,
        board_outlines: extractor.board_outlines,
        layers,
        revisions,
        planes,
    })
}

struct Extractor<'a> {
    layers: &'a BTreeSet<Layer>,
    copper: BTreeSet<Layer>,
    inner_layer_count: u8,
    obstacles: Vec<Obstacle>,
    board_outlines: Vec<Path>,
}

impl Extractor<'_> {
    /// Layers of `on` that are being rebuilt
    fn relevant(&self, on: impl IntoIterator<Item = Layer>) -> BTreeSet<Layer> {
        on.into_iter().filter(|l| self.layers.contains(l)).collect()
    }

    fn push(&mut self, obstacle: Obstacle) {
        if !obstacle.layers.is_empty() && !(obstacle.copper.is_empty() && obstacle.holes.is_empty()) {
            self.obstacles.push(obstacle);
        }
    }

    /// Filled area and/or outline stroke of a drawn polygon
    fn polygon_shapes(path: Path, width: Length, filled: bool) -> Vec<Shape> {
        let mut shapes = Vec::new();
        if width.is_positive() {
            shapes.push(Shape::Stroke { path: path.clone(), width });
        }
        if filled {
            shapes.push(Shape::Area(path));
        }
        shapes
    }

    fn add_polygon(&mut self, layer: Layer, path: Path, width: Length, filled: bool) {
        if layer == Layer::BoardOutlines {
            self.board_outlines.push(path);
            return;
        }
        let mut obstacle = Obstacle::new(ObstacleKind::Polygon, self.relevant([layer]), None);
        obstacle.copper = Self::polygon_shapes(path, width, filled);
        self.push(obstacle);
    }

    fn add_board_polygons(&mut self, board: &Board) {
        for polygon in &board.polygons {
            self.add_polygon(polygon.layer, polygon.path.clone(), polygon.width, polygon.filled);
        }
    }

    /// Every glyph stroke of a text as foreign copper
    fn add_stroke_texts(&mut self, texts: &[StrokeText]) {
        for text in texts {
            let mut obstacle = Obstacle::new(ObstacleKind::Text, self.relevant([text.layer]), None);
            obstacle.copper = text
                .paths
                .iter()
                .map(|path| Shape::Stroke { path: text.transform.map_path(path), width: text.stroke_width })
                .collect();
            self.push(obstacle);
        }
    }

    fn add_device(&mut self, device: &Device) {
        let t = &device.transform;
        for polygon in &device.polygons {
            let layer = t.map_layer(polygon.layer, self.inner_layer_count);
            self.add_polygon(layer, t.map_path(&polygon.path), polygon.width, polygon.filled);
        }
        for circle in &device.circles {
            let layer = t.map_layer(circle.layer, self.inner_layer_count);
            let path = t.map_path(&Path::circle(circle.diameter).translated(circle.center));
            self.add_polygon(layer, path, circle.line_width, circle.filled);
        }
        for hole in &device.holes {
            self.add_hole(t.map_path(&hole.path), hole.diameter);
        }
        for pad in &device.pads {
            self.add_pad(pad);
        }
        self.add_stroke_texts(&device.stroke_texts);
    }

    fn add_pad(&mut self, pad: &Pad) {
        for (layer, geometries) in &pad.geometries {
            if !self.layers.contains(layer) {
                continue;
            }
            let mut obstacle = Obstacle::new(ObstacleKind::Pad, BTreeSet::from([*layer]), pad.net);
            obstacle.clearance = pad.clearance;
            obstacle.anchor = pad.transform.position;
            obstacle.rotation = pad.transform.rotation;
            for geometry in geometries {
                let (copper, holes) = pad_shapes(&pad.transform, geometry);
                obstacle.copper.push(copper);
                obstacle.holes.extend(holes);
            }
            self.push(obstacle);
        }
        self.add_pad_drills(pad);
    }

    /// Drills of a through-hole pad on the copper layers the pad has no copper on
    fn add_pad_drills(&mut self, pad: &Pad) {
        let mut drills: Vec<&PadHole> = Vec::new();
        for hole in pad.geometries.values().flatten().flat_map(|g| g.holes.iter()) {
            if !drills.contains(&hole) {
                drills.push(hole);
            }
        }
        let bare: Vec<Layer> = self
            .copper
            .iter()
            .copied()
            .filter(|l| pad.geometries.get(l).map_or(true, Vec::is_empty))
            .collect();
        for hole in drills {
            let path = pad.transform.map_path(&hole.path);
            let mut obstacle = Obstacle::new(ObstacleKind::Hole, self.relevant(bare.iter().copied()), None);
            obstacle.copper.push(Shape::Stroke { path, width: hole.diameter });
            self.push(obstacle);
        }
    }

    fn add_net_segments(&mut self, board: &Board) {
        for segment in &board.net_segments {
            for via in &segment.vias {
                let span = copper_span(via.start_layer, via.end_layer, self.inner_layer_count);
                let mut obstacle = Obstacle::new(ObstacleKind::Via, self.relevant(span), segment.net);
                obstacle.anchor = via.position;
                obstacle.copper.push(Shape::Circle { center: via.position, diameter: via.size });
                obstacle.holes.push(Shape::Circle { center: via.position, diameter: via.drill });
                self.push(obstacle);
            }
            for trace in &segment.traces {
                let mut obstacle =
                    Obstacle::new(ObstacleKind::Trace, self.relevant([trace.layer]), segment.net);
                obstacle.copper.push(Shape::Stroke {
                    path: Path::from_points(&[trace.start, trace.end]),
                    width: trace.width,
                });
                self.push(obstacle);
            }
        }
    }

    fn add_hole(&mut self, path: Path, diameter: Length) {
        let mut obstacle = Obstacle::new(ObstacleKind::Hole, self.relevant(self.copper.clone()), None);
        obstacle.copper.push(Shape::Stroke { path, width: diameter });
        self.push(obstacle);
    }

    fn add_holes_and_keepouts(&mut self, board: &Board) {
        for hole in &board.holes {
            self.add_hole(hole.path.clone(), hole.diameter);
        }
        for keepout in &board.keepouts {
            let layers = self.relevant(keepout.layers.iter().copied());
            let mut obstacle = Obstacle::new(ObstacleKind::Keepout, layers, None);
            obstacle.copper.push(Shape::Area(keepout.outline.clone()));
            self.push(obstacle);
        }
    }
}

/// Copper shape and plated holes of one pad geometry, in board coordinates
fn pad_shapes(t: &Transform, geometry: &PadGeometry) -> (Shape, Vec<Shape>) {
    let copper = match &geometry.shape {
        PadShape::RoundedRect { width, height, radius } => {
            Shape::Area(t.map_path(&Path::rounded_rect(*width, *height, *radius)))
        }
        PadShape::Stroke { width, path } => Shape::Stroke { path: t.map_path(path), width: *width },
        PadShape::Custom { outline } => Shape::Area(t.map_path(outline)),
    };
    let holes = geometry
        .holes
        .iter()
        .map(|h| Shape::Stroke { path: t.map_path(&h.path), width: h.diameter })
        .collect();
    (copper, holes)
}
