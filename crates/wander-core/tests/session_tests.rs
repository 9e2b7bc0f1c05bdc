// Host-side tests for session-level behavior: selection, pointer flow and
// walking along queued waypoints.

use glam::{Vec2, Vec3};
use std::collections::HashSet;
use std::time::Duration;
use wander_core::{
    CloudPoint, Heightmap, PathTraversal, PointCloud, PointerPhase, SceneCommand, Session,
    Settings, SpatialIndex,
};

fn ring_cloud() -> PointCloud {
    // 40 points on two rings around the origin, radius 0.1 and 0.15
    let points = (0..40u32)
        .map(|i| {
            let a = i as f32 / 20.0 * std::f32::consts::TAU;
            let r = if i < 20 { 0.1 } else { 0.15 };
            CloudPoint {
                index: i,
                position: Vec3::new(r * a.cos(), 0.2, r * a.sin()),
            }
        })
        .collect();
    PointCloud::from_points(points)
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn candidates_are_a_permutation_of_the_neighborhood() {
    let cloud = ring_cloud();
    let index = SpatialIndex::build(&cloud);
    let mut session = Session::new(Settings::default(), cloud, 11);
    session.select_at(Vec3::ZERO);

    let expected: HashSet<u32> = index
        .nearest(Vec2::ZERO, 100, 0.2)
        .iter()
        .map(|n| n.point.index)
        .collect();
    let got: Vec<u32> = session.candidates().iter().map(|n| n.point.index).collect();
    assert_eq!(got.len(), expected.len());
    assert_eq!(got.iter().copied().collect::<HashSet<_>>(), expected);
}

#[test]
fn search_limit_caps_candidates() {
    let mut settings = Settings::default();
    settings.search_limit = 20;
    let mut session = Session::new(settings, ring_cloud(), 5);
    session.select_at(Vec3::ZERO);
    // the inner ring is strictly closer
    assert!(session.candidates().iter().all(|n| n.point.index < 20));
    assert_eq!(session.candidates().len(), 20);
}

#[test]
fn reselecting_reports_stale_pending_slots() {
    let mut session = Session::new(Settings::default(), ring_cloud(), 5);
    session.select_at(Vec3::ZERO);
    let first = session.poll_queue().unwrap();
    let second = session.poll_queue().unwrap();
    let stale = session.select_at(Vec3::new(0.01, 0.0, 0.0));
    assert_eq!(stale, vec![first.id, second.id]);
    // still counted until their loads finish or are aborted
    assert_eq!(session.audio_queue().borrow().active(), 2);
    let next = session.poll_queue().unwrap();
    assert_eq!(next.rank, 0);
    assert_eq!(next.generation, session.generation());
}

#[test]
fn tap_selects_under_the_pointer() {
    let mut session = Session::new(Settings::default(), ring_cloud(), 5);
    let mut sink: Vec<SceneCommand> = Vec::new();
    session.pointer_move(ms(0), Vec2::ZERO);
    session.frame(ms(0), 1.0, &mut sink);
    assert_eq!(session.controller().phase(), PointerPhase::Hovering);

    session.pointer_down(ms(10), Vec2::ZERO);
    session.frame(ms(100), 1.0, &mut sink);
    session.pointer_up(ms(100));

    let focus = session.focus().unwrap();
    assert!(Vec2::new(focus.x, focus.z).length() < 0.05);
    assert!(!session.candidates().is_empty());
    assert!(sink.iter().any(|c| matches!(c, SceneCommand::Ring(Some(_)))));
}

#[test]
fn drag_does_not_select() {
    let mut session = Session::new(Settings::default(), ring_cloud(), 5);
    let mut sink: Vec<SceneCommand> = Vec::new();
    session.pointer_move(ms(0), Vec2::ZERO);
    session.frame(ms(0), 1.0, &mut sink);
    session.pointer_down(ms(10), Vec2::ZERO);
    for i in 1..=6u64 {
        session.pointer_move(ms(10 + i * 5), Vec2::new(i as f32 * 0.01, 0.0));
    }
    session.pointer_up(ms(60));
    assert!(session.focus().is_none());
}

#[test]
fn hold_queues_a_waypoint_from_the_focus() {
    let mut session = Session::new(Settings::default(), ring_cloud(), 5);
    let mut sink: Vec<SceneCommand> = Vec::new();
    session.select_at(Vec3::new(1.0, 0.0, 1.0));
    session.pointer_move(ms(0), Vec2::ZERO);
    session.frame(ms(0), 1.0, &mut sink);
    session.pointer_down(ms(10), Vec2::ZERO);
    session.frame(ms(200), 1.0, &mut sink);
    assert_eq!(session.controller().phase(), PointerPhase::Pressing);
    session.frame(ms(400), 1.0, &mut sink);
    assert!(session.controller().is_selecting_target());
    session.pointer_up(ms(400));

    assert_eq!(session.path().len(), 1);
    let sketch = session.path().sketches().next().unwrap();
    assert_eq!(sketch.points[0], Vec3::new(1.0, 0.0, 1.0));
}

#[test]
fn walk_continues_to_second_waypoint_without_input() {
    let heightmap = Heightmap::default();
    let mut path = PathTraversal::with_step(0.05, 0.01);
    let a = Vec3::new(0.5, 0.0, 0.0);
    let b = Vec3::new(0.5, 0.0, 0.5);
    path.push(Vec3::ZERO, a, &heightmap);
    path.push(Vec3::ZERO, b, &heightmap);

    let mut focus = Vec3::ZERO;
    let mut arrivals = Vec::new();
    for frame in 0..100 {
        let Some(step) = path.advance(focus) else {
            break;
        };
        focus = step.focus;
        if step.arrived {
            arrivals.push((frame, focus));
        }
    }
    assert_eq!(arrivals.len(), 2);
    assert!(arrivals[0].1.distance(a) < 0.01);
    assert!(arrivals[1].1.distance(b) < 0.01);
    assert!(arrivals[0].0 < arrivals[1].0);
    assert!(!path.is_active());
}

#[test]
fn session_walk_moves_focus_and_listener() {
    let mut session = Session::new(Settings::default(), ring_cloud(), 5)
        .with_path(PathTraversal::with_step(0.1, 0.1));
    let mut sink: Vec<SceneCommand> = Vec::new();
    session.select_at(Vec3::new(1.0, 0.0, 1.0));
    // queue a waypoint near the origin by holding the pointer at the centre
    session.pointer_move(ms(0), Vec2::ZERO);
    session.frame(ms(0), 1.0, &mut sink);
    session.pointer_down(ms(10), Vec2::ZERO);
    session.frame(ms(400), 1.0, &mut sink);
    session.pointer_up(ms(400));
    assert_eq!(session.path().len(), 1);
    let target = session.path().waypoints().next().unwrap();

    for i in 0..100 {
        session.frame(ms(500 + i * 16), 1.0, &mut sink);
    }
    assert!(!session.path().is_active());
    let focus = session.focus().unwrap();
    assert!(focus.distance(target) < 0.1);
    let listener = session.listener().position;
    assert_eq!(listener, Vec3::new(focus.x, 0.0, focus.z));
}
