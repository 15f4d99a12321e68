// Synchronous and background execution of plane fill builds
use plane_fill::board::{Board, ConnectStyle, Layer, NetSegment, Plane, Via};
use plane_fill::fill::{BuildStatus, BuilderEvent, PlaneFragmentsBuilder};
use plane_fill::geometry::{Length, Path, Point};
use plane_fill::FillError;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn board_with_plane(size_mm: f64) -> (Board, Uuid) {
    let mut board = Board::new("controller", 0);
    let mut plane = Plane::new(
        Uuid::new_v4(),
        Layer::TopCopper,
        Some(Uuid::new_v4()),
        Path::rect(Point::from_mm(0.0, 0.0), Point::from_mm(size_mm, size_mm)),
    );
    plane.connect_style = ConnectStyle::None;
    let uuid = plane.uuid;
    board.add_plane(plane);
    (board, uuid)
}

/// A grid of foreign vias, enough work to outlive a cancel request
fn add_via_grid(board: &mut Board, size_mm: f64, pitch_mm: f64) {
    let mut vias = Vec::new();
    let steps = (size_mm / pitch_mm) as usize;
    for i in 0..steps {
        for j in 0..steps {
            vias.push(Via {
                uuid: Uuid::new_v4(),
                position: Point::from_mm(i as f64 * pitch_mm + 0.5, j as f64 * pitch_mm + 0.5),
                size: Length::from_mm(0.5),
                drill: Length::from_mm(0.25),
                start_layer: Layer::TopCopper,
                end_layer: Layer::BotCopper,
            });
        }
    }
    board.net_segments.push(NetSegment { uuid: Uuid::new_v4(), net: Some(Uuid::new_v4()), vias, traces: Vec::new() });
}

fn drain(events: &crossbeam_channel::Receiver<BuilderEvent>) -> Vec<BuilderEvent> {
    events.try_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_build_commits_on_wait() {
        let (mut board, uuid) = board_with_plane(10.0);
        let mut builder = PlaneFragmentsBuilder::new();
        let events = builder.subscribe();

        assert!(builder.start_asynchronously(&board, None));
        assert!(builder.is_busy());
        // Nothing is applied before the outcome is collected
        assert!(board.planes[&uuid].fragments(Layer::TopCopper).is_empty());

        let status = builder.wait(&mut board).expect("no build in flight");
        assert!(matches!(status, BuildStatus::Succeeded(ref s) if s.fragments == 1));
        assert!(!builder.is_busy());
        assert_eq!(board.planes[&uuid].fragments(Layer::TopCopper).len(), 1);
        assert!(!board.is_scheduled(Layer::TopCopper));

        let events = drain(&events);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], BuilderEvent::Started { planes: 1, .. }));
        assert!(matches!(events[1], BuilderEvent::Finished(BuildStatus::Succeeded(_))));
    }

    #[test]
    fn test_poll_until_done() {
        let (mut board, uuid) = board_with_plane(10.0);
        let mut builder = PlaneFragmentsBuilder::new();
        assert!(builder.start_asynchronously(&board, None));

        let deadline = Instant::now() + Duration::from_secs(60);
        let status = loop {
            if let Some(status) = builder.poll(&mut board) {
                break status;
            }
            assert!(Instant::now() < deadline, "build did not finish");
            std::thread::sleep(Duration::from_millis(5));
        };
        assert!(matches!(status, BuildStatus::Succeeded(_)));
        assert_eq!(board.planes[&uuid].fragments(Layer::TopCopper).len(), 1);
        assert!(builder.poll(&mut board).is_none());
    }

    #[test]
    fn test_scenario_5_cancel_keeps_previous_fragments() {
        let (mut board, uuid) = board_with_plane(40.0);
        let mut builder = PlaneFragmentsBuilder::new();
        builder.run_synchronously(&mut board, None).unwrap();
        let before = board.planes[&uuid].fragments(Layer::TopCopper).to_vec();
        assert_eq!(before.len(), 1);

        add_via_grid(&mut board, 40.0, 1.0);
        board.invalidate_planes(Some(Layer::TopCopper));
        let events = builder.subscribe();
        assert!(builder.start_asynchronously(&board, None));
        builder.cancel();

        assert!(!builder.is_busy());
        assert_eq!(board.planes[&uuid].fragments(Layer::TopCopper), &before[..]);
        // Unfinished work stays scheduled
        assert!(board.is_scheduled(Layer::TopCopper));
        let events = drain(&events);
        assert!(matches!(events.last(), Some(BuilderEvent::Finished(BuildStatus::Cancelled))));
        assert!(builder.wait(&mut board).is_none());
    }

    #[test]
    fn test_restart_cancels_running_build() {
        let (mut board, _) = board_with_plane(40.0);
        add_via_grid(&mut board, 40.0, 1.0);
        let mut builder = PlaneFragmentsBuilder::new();
        let events = builder.subscribe();

        assert!(builder.start_asynchronously(&board, None));
        assert!(builder.start_asynchronously(&board, None));
        builder.cancel();

        let finished: Vec<BuilderEvent> = drain(&events)
            .into_iter()
            .filter(|e| matches!(e, BuilderEvent::Finished(_)))
            .collect();
        assert_eq!(finished.len(), 2);
        assert!(finished.iter().all(|e| *e == BuilderEvent::Finished(BuildStatus::Cancelled)));
        assert!(board.is_scheduled(Layer::TopCopper));
    }

    #[test]
    fn test_geometry_error_aborts_without_commit() {
        let (mut board, uuid) = board_with_plane(10.0);
        let mut builder = PlaneFragmentsBuilder::new();
        builder.run_synchronously(&mut board, None).unwrap();

        let far = Point::from_nm(2_000_000_000_000, 0);
        board.planes[&uuid].outline = Path::from_points(&[Point::default(), far, Point::from_mm(0.0, 10.0)]);
        board.invalidate_planes(None);
        let err = builder.run_synchronously(&mut board, None).unwrap_err();
        assert!(matches!(err, FillError::Geometry { plane, layer: Layer::TopCopper, .. } if plane == uuid));
        assert_eq!(board.planes[&uuid].fragments(Layer::TopCopper).len(), 1);
        assert!(board.is_scheduled(Layer::TopCopper));

        assert!(builder.start_asynchronously(&board, None));
        let status = builder.wait(&mut board).unwrap();
        assert!(matches!(status, BuildStatus::Failed(FillError::Geometry { .. })));
        assert_eq!(board.planes[&uuid].fragments(Layer::TopCopper).len(), 1);
    }

    #[test]
    fn test_layer_filter_only_builds_scheduled_layers() {
        let mut board = Board::new("filter", 0);
        let mut plane = Plane::new(
            Uuid::new_v4(),
            Layer::TopCopper,
            None,
            Path::rect(Point::from_mm(0.0, 0.0), Point::from_mm(5.0, 5.0)),
        );
        plane.layers.insert(Layer::BotCopper);
        let uuid = plane.uuid;
        board.add_plane(plane);
        let mut builder = PlaneFragmentsBuilder::new();
        builder.run_synchronously(&mut board, None).unwrap();

        board.invalidate_planes(Some(Layer::BotCopper));
        let top = BTreeSet::from([Layer::TopCopper]);
        assert_eq!(builder.run_synchronously(&mut board, Some(&top)), Ok(None));
        assert!(!builder.start_asynchronously(&board, Some(&top)));

        let bottom = BTreeSet::from([Layer::BotCopper]);
        let summary = builder.run_synchronously(&mut board, Some(&bottom)).unwrap().unwrap();
        assert_eq!(summary.layers, vec![Layer::BotCopper]);
        assert_eq!(board.planes[&uuid].fragments(Layer::BotCopper).len(), 1);
    }

    #[test]
    fn test_deleted_plane_is_skipped_on_commit() {
        let (mut board, uuid) = board_with_plane(10.0);
        let mut builder = PlaneFragmentsBuilder::new();
        assert!(builder.start_asynchronously(&board, None));
        board.remove_plane(&uuid);
        let status = builder.wait(&mut board).unwrap();
        assert!(matches!(status, BuildStatus::Succeeded(ref s) if s.planes == 0));
    }

    #[test]
    fn test_drop_joins_worker() {
        let (mut board, _) = board_with_plane(40.0);
        add_via_grid(&mut board, 40.0, 1.0);
        let events = {
            let mut builder = PlaneFragmentsBuilder::new();
            let events = builder.subscribe();
            assert!(builder.start_asynchronously(&board, None));
            events
        };
        let events = drain(&events);
        assert!(matches!(events.last(), Some(BuilderEvent::Finished(BuildStatus::Cancelled))));
    }
}
