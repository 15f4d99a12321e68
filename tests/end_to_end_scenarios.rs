// End-to-end plane fill scenarios on small boards
use plane_fill::board::{
    Board, BoardPolygon, ConnectStyle, Device, Layer, NetSegment, Pad, PadGeometry, PadHole,
    PadShape, Plane, StrokeText, Trace, Via,
};
use plane_fill::fill::{FillWarning, PlaneFragmentsBuilder, Shape};
use plane_fill::geometry::clip::{self, Region};
use plane_fill::geometry::{Angle, Fragment, Length, Path, Point, Transform};
use std::collections::BTreeMap;
use uuid::Uuid;

fn square_plane(net: Option<Uuid>, style: ConnectStyle) -> Plane {
    let mut plane = Plane::new(
        Uuid::new_v4(),
        Layer::TopCopper,
        net,
        Path::rect(Point::from_mm(0.0, 0.0), Point::from_mm(10.0, 10.0)),
    );
    plane.connect_style = style;
    plane
}

fn via(net: Option<Uuid>, x: f64, y: f64) -> NetSegment {
    NetSegment {
        uuid: Uuid::new_v4(),
        net,
        vias: vec![Via {
            uuid: Uuid::new_v4(),
            position: Point::from_mm(x, y),
            size: Length::from_mm(0.6),
            drill: Length::from_mm(0.3),
            start_layer: Layer::TopCopper,
            end_layer: Layer::BotCopper,
        }],
        traces: Vec::new(),
    }
}

fn trace(net: Option<Uuid>, from: Point, to: Point, width: f64) -> NetSegment {
    NetSegment {
        uuid: Uuid::new_v4(),
        net,
        vias: Vec::new(),
        traces: vec![Trace {
            uuid: Uuid::new_v4(),
            layer: Layer::TopCopper,
            start: from,
            end: to,
            width: Length::from_mm(width),
        }],
    }
}

fn fill(board: &mut Board) -> plane_fill::fill::BuildSummary {
    PlaneFragmentsBuilder::new()
        .run_synchronously(board, None)
        .expect("fill failed")
        .expect("nothing scheduled")
}

fn fragments(board: &Board, plane: &Uuid) -> Vec<Fragment> {
    board.planes[plane].fragments(Layer::TopCopper).to_vec()
}

fn area_mm2(fragments: &[Fragment]) -> f64 {
    fragments.iter().map(Fragment::area_mm2).sum()
}

fn region(fragments: &[Fragment]) -> Region {
    clip::from_fragments(fragments)
}

/// Square pad with a 0.8mm drill, copper on the outer layers only
fn through_hole_device(net: Option<Uuid>, position: Point) -> Device {
    let geometry = PadGeometry {
        shape: PadShape::RoundedRect {
            width: Length::from_mm(1.5),
            height: Length::from_mm(1.5),
            radius: Length::ZERO,
        },
        holes: vec![PadHole { diameter: Length::from_mm(0.8), path: Path::from_points(&[Point::default()]) }],
    };
    let mut geometries = BTreeMap::new();
    geometries.insert(Layer::TopCopper, vec![geometry.clone()]);
    geometries.insert(Layer::BotCopper, vec![geometry]);
    Device {
        uuid: Uuid::new_v4(),
        transform: Transform::new(position, Angle::ZERO, false),
        pads: vec![Pad {
            uuid: Uuid::new_v4(),
            transform: Transform::new(position, Angle::ZERO, false),
            net,
            clearance: Length::ZERO,
            geometries,
        }],
        polygons: Vec::new(),
        circles: Vec::new(),
        holes: Vec::new(),
        stroke_texts: Vec::new(),
    }
}

/// Copper of `fragments` closer than `distance` to `shape`
fn intrusion_mm2(fragments: &[Fragment], shape: &Shape, distance: Length) -> f64 {
    // Arc flattening may cut up to the arc tolerance into the clearance
    let grown = shape.to_region(distance - Length::from_nm(10_000)).unwrap();
    clip::area(&clip::intersect(&region(fragments), &grown).unwrap()) / 1.0e12
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_1_empty_square() {
        let mut board = Board::new("scenario 1", 0);
        let plane = square_plane(None, ConnectStyle::None);
        let uuid = plane.uuid;
        board.add_plane(plane);
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        assert_eq!(frags.len(), 1);
        assert!(frags[0].holes.is_empty());
        // The width opening only rounds the four corners
        assert!((area_mm2(&frags) - 100.0).abs() < 0.01, "area {}", area_mm2(&frags));
        let xs: Vec<i64> = frags[0].outline.iter().map(|p| p.x.nm()).collect();
        assert_eq!(xs.iter().min(), Some(&0));
        assert_eq!(xs.iter().max(), Some(&10_000_000));
        println!("✓ 10mm square filled: {:.4} mm²", area_mm2(&frags));
    }

    #[test]
    fn test_scenario_2_solid_via_merges() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("scenario 2", 0);
        let plane = square_plane(gnd, ConnectStyle::Solid);
        let uuid = plane.uuid;
        board.add_plane(plane);
        board.net_segments.push(via(gnd, 5.0, 5.0));
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        assert_eq!(frags.len(), 1);
        // Only the drill is cut out
        assert_eq!(frags[0].holes.len(), 1);
        let expected = 100.0 - std::f64::consts::PI * 0.15 * 0.15;
        assert!((area_mm2(&frags) - expected).abs() < 0.01, "area {}", area_mm2(&frags));
    }

    #[test]
    fn test_scenario_3_isolated_via_gets_clearance() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("scenario 3", 0);
        let plane = square_plane(gnd, ConnectStyle::None);
        let uuid = plane.uuid;
        board.add_plane(plane);
        board.net_segments.push(via(gnd, 5.0, 5.0));
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].holes.len(), 1);
        // Via radius 0.3mm plus 0.3mm clearance
        let expected = 100.0 - std::f64::consts::PI * 0.6 * 0.6;
        assert!((area_mm2(&frags) - expected).abs() < 0.01, "area {}", area_mm2(&frags));
    }

    #[test]
    fn test_scenario_4_priority_yields_with_clearance() {
        let mut board = Board::new("scenario 4", 0);
        board.polygons.push(BoardPolygon {
            uuid: Uuid::new_v4(),
            layer: Layer::BoardOutlines,
            path: Path::rect(Point::from_mm(0.0, 0.0), Point::from_mm(20.0, 10.0)),
            width: Length::ZERO,
            filled: false,
        });
        let mut a = square_plane(Some(Uuid::new_v4()), ConnectStyle::Solid);
        a.keep_orphans = true;
        let mut b = square_plane(Some(Uuid::new_v4()), ConnectStyle::Solid);
        b.outline = Path::rect(Point::from_mm(0.0, 0.0), Point::from_mm(20.0, 10.0));
        b.priority = 1;
        b.keep_orphans = true;
        let (ua, ub) = (a.uuid, b.uuid);
        board.add_plane(b);
        board.add_plane(a);
        fill(&mut board);

        let fa = fragments(&board, &ua);
        let fb = fragments(&board, &ub);
        assert_eq!(fa.len(), 1);
        assert_eq!(fb.len(), 1);
        // A: 0.3..10 x 0.3..9.7, B: 10.3..19.7 x 0.3..9.7
        assert!((area_mm2(&fa) - 9.7 * 9.4).abs() < 0.02, "area A {}", area_mm2(&fa));
        assert!((area_mm2(&fb) - 9.4 * 9.4).abs() < 0.02, "area B {}", area_mm2(&fb));
        let min_x = fb[0].outline.iter().map(|p| p.x).min().unwrap();
        assert!(min_x >= Length::from_mm(10.3) - Length::from_nm(10));
        let overlap = clip::intersect(&region(&fa), &region(&fb)).unwrap();
        assert!(clip::is_empty(&overlap));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("idempotent", 0);
        let mut plane = square_plane(gnd, ConnectStyle::ThermalRelief);
        plane.outline = Path::new(vec![
            plane_fill::geometry::Vertex::with_angle(Point::from_mm(0.0, 0.0), Angle::from_deg(-30.0)),
            plane_fill::geometry::Vertex::new(Point::from_mm(10.0, 0.0)),
            plane_fill::geometry::Vertex::new(Point::from_mm(10.0, 10.0)),
            plane_fill::geometry::Vertex::new(Point::from_mm(0.0, 10.0)),
        ]);
        let uuid = plane.uuid;
        board.add_plane(plane);
        board.net_segments.push(via(gnd, 3.0, 3.0));
        board.net_segments.push(via(Some(Uuid::new_v4()), 7.0, 7.0));
        board.net_segments.push(trace(None, Point::from_mm(1.0, 8.0), Point::from_mm(9.0, 8.5), 0.25));
        fill(&mut board);
        let first = fragments(&board, &uuid);

        board.invalidate_planes(None);
        fill(&mut board);
        assert_eq!(fragments(&board, &uuid), first);
    }

    #[test]
    fn test_clearance_to_foreign_copper() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("clearance", 0);
        let mut plane = square_plane(gnd, ConnectStyle::Solid);
        plane.keep_orphans = true;
        plane.min_clearance = Length::from_mm(0.4);
        let uuid = plane.uuid;
        board.add_plane(plane);
        let from = Point::from_mm(2.0, 2.0);
        let to = Point::from_mm(8.0, 6.0);
        board.net_segments.push(trace(Some(Uuid::new_v4()), from, to, 0.3));
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        let shape = Shape::Stroke { path: Path::from_points(&[from, to]), width: Length::from_mm(0.3) };
        assert!(intrusion_mm2(&frags, &shape, Length::from_mm(0.4)) < 1e-6);
    }

    #[test]
    fn test_pad_clearance_wins_when_larger() {
        let mut board = Board::new("pad clearance", 0);
        let mut plane = square_plane(None, ConnectStyle::Solid);
        plane.keep_orphans = true;
        let uuid = plane.uuid;
        board.add_plane(plane);

        let mut geometries = BTreeMap::new();
        geometries.insert(
            Layer::TopCopper,
            vec![PadGeometry {
                shape: PadShape::RoundedRect {
                    width: Length::from_mm(1.0),
                    height: Length::from_mm(2.0),
                    radius: Length::from_mm(0.2),
                },
                holes: Vec::new(),
            }],
        );
        let position = Point::from_mm(5.0, 5.0);
        board.devices.push(Device {
            uuid: Uuid::new_v4(),
            transform: Transform::new(position, Angle::ZERO, false),
            pads: vec![Pad {
                uuid: Uuid::new_v4(),
                transform: Transform::new(position, Angle::deg90(), false),
                net: Some(Uuid::new_v4()),
                clearance: Length::from_mm(0.8),
                geometries,
            }],
            polygons: Vec::new(),
            circles: Vec::new(),
            holes: Vec::new(),
            stroke_texts: Vec::new(),
        });
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        // Rotated by 90°: 2mm wide, 1mm high
        let pad = Shape::Area(Path::rounded_rect(Length::from_mm(2.0), Length::from_mm(1.0), Length::from_mm(0.2)).translated(position));
        assert!(intrusion_mm2(&frags, &pad, Length::from_mm(0.8)) < 1e-6);
        assert!(intrusion_mm2(&frags, &pad, Length::from_mm(1.0)) > 0.1);
    }

    #[test]
    fn test_narrow_neck_is_removed() {
        let mut board = Board::new("width", 0);
        let mut plane = square_plane(None, ConnectStyle::Solid);
        plane.min_width = Length::from_mm(0.5);
        let uuid = plane.uuid;
        board.add_plane(plane);
        // Two foreign traces leave a 0.3mm neck at x = 5mm
        let net = Some(Uuid::new_v4());
        board.net_segments.push(trace(net, Point::from_mm(5.0, -1.0), Point::from_mm(5.0, 4.45), 0.2));
        board.net_segments.push(trace(net, Point::from_mm(5.0, 5.55), Point::from_mm(5.0, 11.0), 0.2));
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        assert_eq!(frags.len(), 2, "neck below the minimum width must be opened");
    }

    #[test]
    fn test_orphan_islands() {
        let gnd = Some(Uuid::new_v4());
        let other = Some(Uuid::new_v4());
        for keep in [false, true] {
            let mut board = Board::new("orphans", 0);
            let mut plane = square_plane(gnd, ConnectStyle::Solid);
            plane.keep_orphans = keep;
            let uuid = plane.uuid;
            board.add_plane(plane);
            board.net_segments.push(trace(other, Point::from_mm(5.0, -1.0), Point::from_mm(5.0, 11.0), 0.2));
            board.net_segments.push(via(gnd, 2.0, 5.0));
            fill(&mut board);

            let frags = fragments(&board, &uuid);
            assert_eq!(frags.len(), if keep { 2 } else { 1 });
            let via_copper = Shape::Circle { center: Point::from_mm(2.0, 5.0), diameter: Length::from_mm(0.6) };
            if !keep {
                assert!(intrusion_mm2(&frags, &via_copper, Length::from_nm(10_000)) > 0.0);
            }
        }
    }

    #[test]
    fn test_no_net_plane_keeps_islands() {
        let mut board = Board::new("no net", 0);
        let plane = square_plane(None, ConnectStyle::Solid);
        let uuid = plane.uuid;
        board.add_plane(plane);
        board.net_segments.push(trace(None, Point::from_mm(5.0, -1.0), Point::from_mm(5.0, 11.0), 0.2));
        fill(&mut board);
        assert_eq!(fragments(&board, &uuid).len(), 2);
    }

    #[test]
    fn test_thermal_relief_connects_pad() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("thermal", 0);
        let plane = square_plane(gnd, ConnectStyle::ThermalRelief);
        let uuid = plane.uuid;
        board.add_plane(plane);

        let mut geometries = BTreeMap::new();
        geometries.insert(
            Layer::TopCopper,
            vec![PadGeometry {
                shape: PadShape::RoundedRect {
                    width: Length::from_mm(1.5),
                    height: Length::from_mm(1.5),
                    radius: Length::ZERO,
                },
                holes: vec![PadHole {
                    diameter: Length::from_mm(0.8),
                    path: Path::from_points(&[Point::default()]),
                }],
            }],
        );
        let position = Point::from_mm(5.0, 5.0);
        board.devices.push(Device {
            uuid: Uuid::new_v4(),
            transform: Transform::new(position, Angle::ZERO, false),
            pads: vec![Pad {
                uuid: Uuid::new_v4(),
                transform: Transform::new(position, Angle::ZERO, false),
                net: gnd,
                clearance: Length::ZERO,
                geometries,
            }],
            polygons: Vec::new(),
            circles: Vec::new(),
            holes: Vec::new(),
            stroke_texts: Vec::new(),
        });
        let summary = fill(&mut board);
        assert!(summary.warnings.is_empty());

        let frags = fragments(&board, &uuid);
        assert_eq!(frags.len(), 1, "spokes join the pad to the plane");
        let pad = Shape::Area(Path::rounded_rect(Length::from_mm(1.5), Length::from_mm(1.5), Length::ZERO).translated(position));
        // Four 0.3mm spokes cross the 0.3mm gap
        let in_gap = intrusion_mm2(&frags, &pad, Length::from_mm(0.3)) - intrusion_mm2(&frags, &pad, Length::from_nm(10_000));
        assert!((in_gap - 4.0 * 0.3 * 0.3).abs() < 0.05, "gap copper {}", in_gap);
        // The drill stays open
        let drill = Shape::Circle { center: position, diameter: Length::from_mm(0.8) };
        assert!(intrusion_mm2(&frags, &drill, Length::from_nm(10_000)) < 1e-6);
    }

    #[test]
    fn test_boxed_in_thermal_is_reported() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("boxed thermal", 0);
        let plane = square_plane(gnd, ConnectStyle::ThermalRelief);
        let uuid = plane.uuid;
        board.add_plane(plane);
        board.net_segments.push(via(gnd, 5.0, 5.0));
        // A foreign copper ring around the via blocks all eight directions
        board.polygons.push(BoardPolygon {
            uuid: Uuid::new_v4(),
            layer: Layer::TopCopper,
            path: Path::circle(Length::from_mm(2.2)).translated(Point::from_mm(5.0, 5.0)),
            width: Length::from_mm(0.2),
            filled: false,
        });
        let summary = fill(&mut board);

        assert_eq!(
            summary.warnings,
            vec![FillWarning::ThermalUnconnected {
                plane: uuid,
                layer: Layer::TopCopper,
                position: Point::from_mm(5.0, 5.0),
            }]
        );
        // Nothing overlaps the via any more, so every island is an orphan
        assert_eq!(fragments(&board, &uuid).len(), 0);
    }

    #[test]
    fn test_keepout_and_hole_exclude_any_net() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("keepout", 0);
        let mut plane = square_plane(gnd, ConnectStyle::Solid);
        plane.keep_orphans = true;
        let uuid = plane.uuid;
        board.add_plane(plane);
        board.keepouts.push(plane_fill::board::Keepout {
            uuid: Uuid::new_v4(),
            layers: [Layer::TopCopper].into_iter().collect(),
            outline: Path::rect(Point::from_mm(0.0, 0.0), Point::from_mm(2.0, 10.0)),
        });
        board.holes.push(plane_fill::board::Hole {
            uuid: Uuid::new_v4(),
            diameter: Length::from_mm(1.0),
            path: Path::from_points(&[Point::from_mm(6.0, 5.0)]),
        });
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].holes.len(), 1);
        let expected = 100.0 - 2.3 * 10.0 - std::f64::consts::PI * 0.8 * 0.8;
        assert!((area_mm2(&frags) - expected).abs() < 0.05, "area {}", area_mm2(&frags));
    }

    #[test]
    fn test_grazed_thermal_spoke_keeps_foreign_clearance() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("grazed spoke", 0);
        let plane = square_plane(gnd, ConnectStyle::ThermalRelief);
        let uuid = plane.uuid;
        board.add_plane(plane);
        board.net_segments.push(via(gnd, 5.0, 5.0));
        // Its clearance zone clips the corner of the spoke pointing along +x
        board.net_segments.push(via(Some(Uuid::new_v4()), 6.303, 5.553));
        let summary = fill(&mut board);
        assert!(summary.warnings.is_empty());

        let frags = fragments(&board, &uuid);
        assert_eq!(frags.len(), 1);
        let foreign = Shape::Circle { center: Point::from_mm(6.303, 5.553), diameter: Length::from_mm(0.6) };
        let intrusion = intrusion_mm2(&frags, &foreign, Length::from_mm(0.3));
        assert!(intrusion < 1e-6, "copper inside foreign clearance: {} mm²", intrusion);
        // The spoke still bridges the gap around the own via
        let own = Shape::Circle { center: Point::from_mm(5.0, 5.0), diameter: Length::from_mm(0.6) };
        assert!(intrusion_mm2(&frags, &own, Length::from_mm(0.3)) > 4.0 * 0.3 * 0.2);
        println!("✓ grazed spoke clipped, intrusion {:.9} mm²", intrusion);
    }

    #[test]
    fn test_inner_plane_avoids_through_hole_drill() {
        let mut board = Board::new("tht drill", 2);
        let mut plane = Plane::new(
            Uuid::new_v4(),
            Layer::InnerCopper(1),
            Some(Uuid::new_v4()),
            Path::rect(Point::from_mm(0.0, 0.0), Point::from_mm(10.0, 10.0)),
        );
        plane.keep_orphans = true;
        let uuid = plane.uuid;
        board.add_plane(plane);
        let position = Point::from_mm(5.0, 5.0);
        board.devices.push(through_hole_device(Some(Uuid::new_v4()), position));
        fill(&mut board);

        let frags = board.planes[&uuid].fragments(Layer::InnerCopper(1)).to_vec();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].holes.len(), 1);
        let drill = Shape::Circle { center: position, diameter: Length::from_mm(0.8) };
        assert!(intrusion_mm2(&frags, &drill, Length::from_mm(0.3)) < 1e-6);
        // Drill radius 0.4mm plus 0.3mm clearance
        let expected = 100.0 - std::f64::consts::PI * 0.7 * 0.7;
        assert!((area_mm2(&frags) - expected).abs() < 0.03, "area {}", area_mm2(&frags));
    }

    #[test]
    fn test_copper_text_is_cleared() {
        let gnd = Some(Uuid::new_v4());
        let mut board = Board::new("text", 0);
        let mut plane = square_plane(gnd, ConnectStyle::Solid);
        plane.keep_orphans = true;
        let uuid = plane.uuid;
        board.add_plane(plane);
        let stroke = Path::from_points(&[Point::from_mm(0.0, 0.0), Point::from_mm(2.0, 0.0)]);
        board.stroke_texts.push(StrokeText {
            uuid: Uuid::new_v4(),
            layer: Layer::TopCopper,
            transform: Transform::new(Point::from_mm(4.0, 5.0), Angle::ZERO, false),
            stroke_width: Length::from_mm(0.2),
            paths: vec![stroke],
        });
        fill(&mut board);

        let frags = fragments(&board, &uuid);
        assert_eq!(frags[0].holes.len(), 1);
        let text = Shape::Stroke {
            path: Path::from_points(&[Point::from_mm(4.0, 5.0), Point::from_mm(6.0, 5.0)]),
            width: Length::from_mm(0.2),
        };
        assert!(intrusion_mm2(&frags, &text, Length::from_mm(0.3)) < 1e-6);
    }
}
