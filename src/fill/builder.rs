//! Plane fill builder
//!
//! Turns a [`Job`] into the fragments of every plane on every requested
//! layer. Layers are independent and are filled in parallel; within a layer
//! planes are filled one after another in priority order, each one yielding
//! to the copper claimed by the planes before it.
//!
//! Per plane the pipeline is:
//! 1. collect the obstacles near the outline from the layer's R-tree
//! 2. build the removed area (foreign copper, keepouts, earlier planes)
//! 3. clip the outline to the board and subtract the removed area, plated
//!    holes and thermal relief cuts
//! 4. open the result by half the minimum width
//! 5. add thermal spokes
//! 6. drop orphan islands
//!
//! The abort flag is checked between obstacles and between steps.

use geo::BoundingRect;
use rayon::prelude::*;
use rstar::{RTree, AABB};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use uuid::Uuid;

use super::job::{Job, Obstacle, ObstacleEnvelope, PlaneData};
use super::result::{FillWarning, FragmentResult};
use super::thermal;
use crate::board::{ConnectStyle, Layer};
use crate::error::{ClipError, FillError};
use crate::geometry::clip::{self, Region};
use crate::geometry::{Fragment, Length, MAX_ARC_TOLERANCE};

/// Compute the fragments of all planes on the job's layers
///
/// Returns `FillError::Cancelled` as soon as `abort` is seen set.
pub fn build_fragments(job: &Job, abort: &AtomicBool) -> Result<FragmentResult, FillError> {
    let start = Instant::now();
    let layers: Vec<Layer> = job.layers.iter().copied().collect();

    let outcomes: Vec<Result<LayerOutcome, FillError>> = layers
        .par_iter()
        .map(|layer| fill_layer(job, *layer, abort))
        .collect();

    let mut result = FragmentResult::default();
    for outcome in outcomes {
        let outcome = outcome?;
        for (plane, fragments) in outcome.fragments {
            result.planes.entry(plane).or_default().insert(outcome.layer, fragments);
        }
        result.warnings.extend(outcome.warnings);
    }
    check_abort(abort)?;

    log::debug!(
        "[PlaneFill] Built {} fragments on {} layers in {:.2}ms",
        result.fragment_count(),
        layers.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(result)
}

fn check_abort(abort: &AtomicBool) -> Result<(), FillError> {
    if abort.load(Ordering::Relaxed) {
        Err(FillError::Cancelled)
    } else {
        Ok(())
    }
}

struct LayerOutcome {
    layer: Layer,
    fragments: Vec<(Uuid, Vec<Fragment>)>,
    warnings: Vec<FillWarning>,
}

/// Copper placed by an earlier plane on the same layer
struct Claim {
    net: Option<Uuid>,
    clearance: Length,
    region: Region,
}

fn fill_layer(job: &Job, layer: Layer, abort: &AtomicBool) -> Result<LayerOutcome, FillError> {
    let layer_start = Instant::now();
    let planes: Vec<&PlaneData> = job.planes_on(layer).collect();
    let mut outcome = LayerOutcome { layer, fragments: Vec::new(), warnings: Vec::new() };

    if !job.enabled_layers.contains(&layer) {
        for plane in planes {
            log::warn!("[PlaneFill] Plane {} is on layer {} which is not enabled", plane.uuid, layer);
            outcome.warnings.push(FillWarning::LayerNotEnabled { plane: plane.uuid, layer });
            outcome.fragments.push((plane.uuid, Vec::new()));
        }
        return Ok(outcome);
    }
    if planes.is_empty() {
        return Ok(outcome);
    }

    let board_area = board_region(job).map_err(|source| FillError::BoardOutline { layer, source })?;
    let entries: Vec<ObstacleEnvelope> = job
        .obstacles_on(layer)
        .filter_map(|(i, o)| o.bounds(Length::ZERO).map(|b| ObstacleEnvelope::new(i, b)))
        .collect();
    let max_clearance = job
        .obstacles_on(layer)
        .map(|(_, o)| o.clearance)
        .max()
        .unwrap_or(Length::ZERO);
    let index = RTree::bulk_load(entries);

    let mut claims: Vec<Claim> = Vec::new();
    for plane in planes {
        check_abort(abort)?;
        let filler = PlaneFiller {
            job,
            layer,
            plane,
            index: &index,
            max_clearance,
            board_area: board_area.as_ref(),
            abort,
        };
        let fill = filler.fill(&claims, &mut outcome.warnings)?;
        outcome.fragments.push((plane.uuid, clip::to_fragments(&fill)));
        claims.push(Claim { net: plane.net, clearance: plane.min_clearance, region: fill });
    }

    log::debug!(
        "[PlaneFill] Layer {}: {} planes in {:.2}ms",
        layer,
        claims.len(),
        layer_start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(outcome)
}

/// Area inside the board outlines, combined even-odd; `None` without outlines
fn board_region(job: &Job) -> Result<Option<Region>, ClipError> {
    if job.board_outlines.is_empty() {
        return Ok(None);
    }
    let mut region = clip::empty();
    for outline in &job.board_outlines {
        let ring = clip::ring(&outline.closed_points(MAX_ARC_TOLERANCE))?;
        region = clip::xor(&region, &ring)?;
    }
    Ok(Some(region))
}

struct PlaneFiller<'a> {
    job: &'a Job,
    layer: Layer,
    plane: &'a PlaneData,
    index: &'a RTree<ObstacleEnvelope>,
    max_clearance: Length,
    board_area: Option<&'a Region>,
    abort: &'a AtomicBool,
}

impl PlaneFiller<'_> {
    fn geometry(&self, source: ClipError) -> FillError {
        FillError::Geometry { plane: self.plane.uuid, layer: self.layer, source }
    }

    /// Obstacles whose envelope comes near the outline, in job order
    fn nearby_obstacles(&self, outline: &Region) -> Vec<&Obstacle> {
        let Some(rect) = outline.bounding_rect() else {
            return Vec::new();
        };
        let margin = (self.plane.min_clearance.max(self.plane.thermal_gap) + self.max_clearance).nm() as f64;
        let envelope = AABB::from_corners(
            [rect.min().x - margin, rect.min().y - margin],
            [rect.max().x + margin, rect.max().y + margin],
        );
        let mut indices: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.index)
            .collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| &self.job.obstacles[i]).collect()
    }

    fn fill(&self, claims: &[Claim], warnings: &mut Vec<FillWarning>) -> Result<Region, FillError> {
        let plane = self.plane;
        let outline = plane.outline_region().map_err(|e| self.geometry(e))?;
        if clip::is_empty(&outline) {
            log::warn!("[PlaneFill] Plane {} has a degenerate outline on layer {}", plane.uuid, self.layer);
            warnings.push(FillWarning::DegenerateOutline { plane: plane.uuid, layer: self.layer });
            return Ok(clip::empty());
        }

        let mut removed: Vec<Region> = Vec::new();
        let mut cuts: Vec<Region> = Vec::new();
        let mut connected: Vec<Region> = Vec::new();
        let mut terminals: Vec<&Obstacle> = Vec::new();

        for obstacle in self.nearby_obstacles(&outline) {
            check_abort(self.abort)?;
            let foreign_clearance = plane.min_clearance.max(obstacle.clearance);
            let region = if obstacle.is_keepout() {
                obstacle.exclusion_region(plane.min_clearance)
            } else if !plane.shares_net(obstacle.net) || plane.connect_style == ConnectStyle::None {
                obstacle.exclusion_region(foreign_clearance)
            } else {
                connected.push(obstacle.copper_region(Length::ZERO).map_err(|e| self.geometry(e))?);
                if plane.connect_style == ConnectStyle::ThermalRelief && obstacle.is_terminal() {
                    terminals.push(obstacle);
                    cuts.push(obstacle.exclusion_region(plane.thermal_gap).map_err(|e| self.geometry(e))?);
                } else {
                    cuts.push(obstacle.holes_region(Length::ZERO).map_err(|e| self.geometry(e))?);
                }
                continue;
            };
            removed.push(region.map_err(|e| self.geometry(e))?);
        }

        for claim in claims {
            if plane.shares_net(claim.net) {
                connected.push(claim.region.clone());
            } else {
                let grown = clip::offset(&claim.region, plane.min_clearance.max(claim.clearance), MAX_ARC_TOLERANCE)
                    .map_err(|e| self.geometry(e))?;
                removed.push(grown);
            }
        }
        check_abort(self.abort)?;

        let allowed = self.allowed_area(&outline, removed).map_err(|e| self.geometry(e))?;
        check_abort(self.abort)?;

        let cuts = clip::unite_all(cuts).map_err(|e| self.geometry(e))?;
        let raw = clip::subtract(&allowed, &cuts).map_err(|e| self.geometry(e))?;
        let mut fill = clip::open(&raw, plane.min_width / 2, MAX_ARC_TOLERANCE).map_err(|e| self.geometry(e))?;
        check_abort(self.abort)?;

        if !terminals.is_empty() {
            let mut spokes = Vec::new();
            for terminal in terminals {
                check_abort(self.abort)?;
                let outcome = thermal::connect(plane, terminal, &outline, &allowed, &fill)
                    .map_err(|e| self.geometry(e))?;
                if outcome.unconnected {
                    log::warn!(
                        "[PlaneFill] No thermal spoke fits for {:?} at {:?} in plane {} on {}",
                        terminal.kind,
                        terminal.anchor,
                        plane.uuid,
                        self.layer
                    );
                    warnings.push(FillWarning::ThermalUnconnected {
                        plane: plane.uuid,
                        layer: self.layer,
                        position: terminal.anchor,
                    });
                }
                spokes.extend(outcome.spokes);
            }
            let spokes = clip::unite_all(spokes).map_err(|e| self.geometry(e))?;
            fill = clip::unite(&fill, &spokes).map_err(|e| self.geometry(e))?;
        }

        if !plane.keep_orphans && plane.net.is_some() && plane.connect_style != ConnectStyle::None {
            check_abort(self.abort)?;
            let connected = clip::unite_all(connected).map_err(|e| self.geometry(e))?;
            fill = remove_orphans(&fill, &connected).map_err(|e| self.geometry(e))?;
        }
        Ok(fill)
    }

    /// Outline clipped to the board, minus everything the plane must avoid
    fn allowed_area(&self, outline: &Region, removed: Vec<Region>) -> Result<Region, ClipError> {
        let mut area = outline.clone();
        if let Some(board) = self.board_area {
            let inside = clip::offset(board, -self.plane.min_clearance, MAX_ARC_TOLERANCE)?;
            area = clip::intersect(&area, &inside)?;
        }
        let removed = clip::unite_all(removed)?;
        clip::subtract(&area, &removed)
    }
}

/// Keep only the islands overlapping `connected`
fn remove_orphans(fill: &Region, connected: &Region) -> Result<Region, ClipError> {
    let mut kept = Vec::new();
    for island in clip::polygons(fill) {
        if !clip::is_empty(&clip::intersect(&island, connected)?) {
            kept.extend(island.0);
        }
    }
    Ok(Region::new(kept))
}
