use crate::constants::{PATH_ARRIVE_DISTANCE, PATH_STEP, SKETCH_END_DISTANCE, SKETCH_STEP};
use crate::heightmap::Heightmap;
use glam::Vec3;
use std::collections::VecDeque;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SketchPath {
    pub points: Vec<Vec3>,
    pub length: f32,
}

/// Sample a leg every `SKETCH_STEP` units until within `SKETCH_END_DISTANCE`
/// of the end, then close on the end point itself.
pub fn sketch_polyline(start: Vec3, end: Vec3, heightmap: &Heightmap) -> SketchPath {
    let length = start.distance(end);
    let step = (end - start).normalize_or_zero() * SKETCH_STEP;
    let mut points = vec![start];
    if step != Vec3::ZERO {
        let max_steps = (length / SKETCH_STEP).ceil() as usize + 1;
        for k in 1..=max_steps {
            let cursor = start + step * k as f32;
            if cursor.distance(end) <= SKETCH_END_DISTANCE {
                break;
            }
            points.push(heightmap.on_surface(cursor));
        }
    }
    points.push(end);
    SketchPath { points, length }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStep {
    pub focus: Vec3,
    pub progress: f32,
    /// The leg's waypoint was reached and dropped this frame.
    pub arrived: bool,
}

#[derive(Clone, Debug)]
pub struct PathTraversal {
    legs: VecDeque<(Vec3, SketchPath)>,
    step: f32,
    arrive_distance: f32,
}

impl Default for PathTraversal {
    fn default() -> Self {
        Self::with_step(PATH_STEP, PATH_ARRIVE_DISTANCE)
    }
}

impl PathTraversal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(step: f32, arrive_distance: f32) -> Self {
        Self {
            legs: VecDeque::new(),
            step,
            arrive_distance,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.legs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn waypoints(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.legs.iter().map(|(target, _)| *target)
    }

    pub fn sketches(&self) -> impl Iterator<Item = &SketchPath> + '_ {
        self.legs.iter().map(|(_, sketch)| sketch)
    }

    /// Queue `target`; the new leg starts at the last queued waypoint, or at
    /// `focus` when the path is empty.
    pub fn push(&mut self, focus: Vec3, target: Vec3, heightmap: &Heightmap) {
        let start = self.legs.back().map_or(focus, |(last, _)| *last);
        let sketch = sketch_polyline(start, target, heightmap);
        log::debug!(
            "[path] waypoint {} queued, leg length {:.3}",
            self.legs.len() + 1,
            sketch.length
        );
        self.legs.push_back((target, sketch));
    }

    pub fn clear(&mut self) {
        self.legs.clear();
    }

    pub fn advance(&mut self, focus: Vec3) -> Option<PathStep> {
        let (target, sketch) = self.legs.front()?;
        let remaining = focus.distance(*target);
        let moved = focus + (*target - focus).normalize_or_zero() * self.step.min(remaining);
        let left = moved.distance(*target);
        let progress = if sketch.length > 0.0 {
            (1.0 - left / sketch.length).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let arrived = left < self.arrive_distance;
        if arrived {
            self.legs.pop_front();
        }
        Some(PathStep {
            focus: moved,
            progress: if arrived { 1.0 } else { progress },
            arrived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sketch_follows_terrain_and_ends_on_target() {
        let h = Heightmap::default();
        let end = Vec3::new(1.05, 0.0, 0.0);
        let sketch = sketch_polyline(Vec3::ZERO, end, &h);
        assert_eq!(sketch.points.first(), Some(&Vec3::ZERO));
        assert_eq!(sketch.points.last(), Some(&end));
        assert!((sketch.length - 1.05).abs() < 1e-6);
        // 0.1 .. 0.8 are sampled, 0.9 is inside the end window
        assert_eq!(sketch.points.len(), 10);
    }

    #[test]
    fn degenerate_sketch_has_both_ends() {
        let p = Vec3::new(2.0, 0.0, 2.0);
        let sketch = sketch_polyline(p, p, &Heightmap::default());
        assert_eq!(sketch.points, vec![p, p]);
    }

    #[test]
    fn empty_path_does_not_move() {
        let mut path = PathTraversal::new();
        assert!(path.advance(Vec3::ONE).is_none());
    }

    #[test]
    fn steps_snap_onto_target() {
        let mut path = PathTraversal::with_step(0.3, 0.01);
        path.push(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), &Heightmap::default());
        let first = path.advance(Vec3::ZERO).unwrap();
        assert!((first.focus.x - 0.3).abs() < 1e-6);
        assert!(!first.arrived);
        let second = path.advance(first.focus).unwrap();
        assert!(second.arrived);
        assert!((second.focus.x - 0.5).abs() < 1e-6);
        assert_eq!(second.progress, 1.0);
        assert!(!path.is_active());
    }

    #[test]
    fn legs_chain_from_last_waypoint() {
        let mut path = PathTraversal::new();
        let h = Heightmap::default();
        path.push(Vec3::ZERO, Vec3::X, &h);
        path.push(Vec3::new(9.0, 0.0, 9.0), Vec3::new(1.0, 0.0, 1.0), &h);
        let sketches: Vec<_> = path.sketches().collect();
        assert_eq!(sketches[1].points[0], Vec3::X);
        assert!((sketches[1].length - 1.0).abs() < 1e-6);
    }
}
