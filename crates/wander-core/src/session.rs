use crate::audio::{AudioQueue, Generation, SlotId, SlotTicket};
use crate::camera::OrbitCamera;
use crate::constants::{
    hsl_to_rgb, BEAM_HEIGHT, BEAM_OPACITY, IDLE_AUTO_ROTATE_SEC, PLANE_SEGMENTS, POINT_BASE_HSL,
    POINT_HIGHLIGHT_HSL, RING_COLOR, RING_SEGMENTS, RING_TARGET_COLOR,
};
use crate::heightmap::Heightmap;
use crate::path::PathTraversal;
use crate::points::PointCloud;
use crate::scene::{BeamVisual, RingVisual, SceneCommand, SceneSink, SketchVisual};
use crate::selection::{Hover, SelectionAction, SelectionController};
use crate::settings::{SettingAdjust, SettingEffect, Settings};
use crate::spatial::{Neighbor, SpatialIndex};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

// Longest frame step fed to time-based motion (tab switches, debugger pauses).
const MAX_FRAME_DT: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ListenerPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
        }
    }
}

pub struct Session {
    settings: Settings,
    cloud: PointCloud,
    index: SpatialIndex,
    heightmap: Heightmap,
    rng: StdRng,

    generation: Generation,
    candidates: Vec<Neighbor>,
    highlighted: Vec<u32>,
    color_updates: Vec<(u32, [f32; 3])>,
    focus: Option<Vec3>,
    listener: ListenerPose,
    stale_slots: Vec<SlotId>,
    queue: Rc<RefCell<AudioQueue>>,

    controller: SelectionController,
    path: PathTraversal,
    sketches_dirty: bool,
    terrain_dirty: bool,
    camera: OrbitCamera,
    pointer: Option<Vec2>,
    last_interaction: Option<Duration>,
    last_frame: Option<Duration>,
}

impl Session {
    pub fn new(settings: Settings, cloud: PointCloud, seed: u64) -> Self {
        let settings = settings.sanitized();
        let index = SpatialIndex::build(&cloud);
        log::info!("[session] indexed {} points", index.len());
        let queue = AudioQueue::new();
        let mut camera = OrbitCamera::new();
        camera.auto_rotate = settings.auto_rotate;
        Self {
            generation: queue.generation(),
            queue: Rc::new(RefCell::new(queue)),
            settings,
            cloud,
            index,
            heightmap: Heightmap::default(),
            rng: StdRng::seed_from_u64(seed),
            candidates: Vec::new(),
            highlighted: Vec::new(),
            color_updates: Vec::new(),
            focus: None,
            listener: ListenerPose::default(),
            stale_slots: Vec::new(),
            controller: SelectionController::new(),
            path: PathTraversal::new(),
            sketches_dirty: false,
            terrain_dirty: false,
            camera,
            pointer: None,
            last_interaction: None,
            last_frame: None,
        }
    }

    pub fn with_path(mut self, path: PathTraversal) -> Self {
        self.path = path;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    /// Heights read 0 until this is called; the next frame re-sends the terrain.
    pub fn set_heightmap(&mut self, heightmap: Heightmap) {
        self.heightmap = heightmap;
        self.terrain_dirty = true;
    }

    pub fn candidates(&self) -> &[Neighbor] {
        &self.candidates
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn focus(&self) -> Option<Vec3> {
        self.focus
    }

    pub fn listener(&self) -> ListenerPose {
        self.listener
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    pub fn path(&self) -> &PathTraversal {
        &self.path
    }

    pub fn audio_queue(&self) -> Rc<RefCell<AudioQueue>> {
        self.queue.clone()
    }

    pub fn take_stale_slots(&mut self) -> Vec<SlotId> {
        std::mem::take(&mut self.stale_slots)
    }

    /// Listen at `point`: new generation, fresh shuffled candidates, highlight,
    /// listener, beam and camera target. Returns the stale pending slots.
    pub fn select_at(&mut self, point: Vec3) -> Vec<SlotId> {
        let found = self.query(point);
        self.replace_candidates(found, point)
    }

    /// Follow a moving focus: only a changed neighborhood starts a new
    /// generation, so clips keep playing while walking inside it.
    fn follow(&mut self, point: Vec3) {
        let found = self.query(point);
        let same = found.len() == self.candidates.len()
            && found
                .iter()
                .all(|n| self.highlighted.contains(&n.point.index));
        if same {
            self.move_focus(point);
        } else {
            let stale = self.replace_candidates(found, point);
            self.stale_slots.extend(stale);
        }
    }

    fn query(&self, point: Vec3) -> Vec<Neighbor> {
        self.index.nearest(
            Vec2::new(point.x, point.z),
            self.settings.search_limit as usize,
            self.settings.selection_radius(),
        )
    }

    fn replace_candidates(&mut self, mut found: Vec<Neighbor>, point: Vec3) -> Vec<SlotId> {
        let stale = self.queue.borrow_mut().advance_generation();
        self.generation = self.queue.borrow().generation();
        found.shuffle(&mut self.rng);
        log::debug!(
            "[session] generation {} at ({:.3}, {:.3}): {} candidates",
            self.generation.0,
            point.x,
            point.z,
            found.len()
        );

        let base = hsl_to_rgb(POINT_BASE_HSL);
        let highlight = hsl_to_rgb(POINT_HIGHLIGHT_HSL);
        for idx in self.highlighted.drain(..) {
            self.color_updates.push((idx, base));
        }
        for n in &found {
            self.highlighted.push(n.point.index);
            self.color_updates.push((n.point.index, highlight));
        }
        self.candidates = found;
        self.move_focus(point);
        stale
    }

    fn move_focus(&mut self, point: Vec3) {
        self.focus = Some(point);
        self.listener.position = Vec3::new(point.x, 0.0, point.z);
        self.camera.set_look_at(point);
    }

    pub fn poll_queue(&self) -> Option<SlotTicket> {
        self.queue.borrow_mut().enqueue_next(
            self.generation,
            &self.candidates,
            self.settings.max_simultaneous as usize,
        )
    }

    pub fn pointer_move(&mut self, now: Duration, ndc: Vec2) {
        let previous = self.pointer.replace(ndc);
        if !self.controller.is_pointer_down() {
            return;
        }
        self.note_interaction(now);
        self.controller.pointer_moved();
        if let Some(prev) = previous {
            if !self.controller.is_selecting_target() {
                self.camera.drag(ndc - prev);
            }
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer = None;
    }

    pub fn pointer_down(&mut self, now: Duration, ndc: Vec2) {
        self.pointer = Some(ndc);
        self.controller.pointer_down(now);
    }

    pub fn pointer_up(&mut self, now: Duration) {
        if self.controller.is_pointer_down() {
            self.note_interaction(now);
        }
        match self.controller.pointer_up() {
            Some(SelectionAction::Tap(point)) => {
                let stale = self.select_at(point);
                self.stale_slots.extend(stale);
                if self.path.is_active() {
                    self.path.clear();
                    self.sketches_dirty = true;
                }
            }
            Some(SelectionAction::AddWaypoint(point)) => {
                let Some(focus) = self.focus else {
                    return;
                };
                self.path.push(focus, point, &self.heightmap);
                self.sketches_dirty = true;
            }
            None => {}
        }
    }

    /// Presses, drags and wheel turns pause auto-rotation until the idle delay passes.
    pub fn note_interaction(&mut self, now: Duration) {
        self.last_interaction = Some(now);
        self.camera.auto_rotate = false;
    }

    pub fn wheel(&mut self, now: Duration, steps: f32) {
        self.note_interaction(now);
        self.camera.zoom(steps);
    }

    pub fn adjust_setting(&mut self, adjust: SettingAdjust) -> SettingEffect {
        let effect = self.settings.adjust(adjust);
        if matches!(adjust, SettingAdjust::ToggleAutoRotate) {
            self.camera.auto_rotate = self.settings.auto_rotate;
        }
        if effect != SettingEffect::None {
            if let Some(focus) = self.focus {
                let stale = self.select_at(focus);
                self.stale_slots.extend(stale);
            }
        }
        effect
    }

    pub fn frame(&mut self, now: Duration, aspect: f32, sink: &mut impl SceneSink) {
        let dt = self
            .last_frame
            .map_or(0.0, |t| now.saturating_sub(t).as_secs_f32())
            .min(MAX_FRAME_DT);
        self.last_frame = Some(now);

        self.listener.forward = self.camera.listener_forward();

        let radius = self.settings.selection_radius();
        let view = self.camera.camera(aspect);
        let hit = self
            .pointer
            .and_then(|ndc| view.ray_from_ndc(ndc).intersect_ground());
        let ring = hit.map(|p| self.heightmap.ring(Vec2::new(p.x, p.z), radius, RING_SEGMENTS));
        let hover = hit.zip(ring.as_ref()).map(|(p, r)| Hover {
            point: self.heightmap.on_surface(p),
            over_edge: r.over_edge,
        });
        self.controller.set_hover(hover);
        self.controller.update(now, self.focus.is_some());

        let ring_visual = ring.map(|r| RingVisual {
            color: if self.controller.is_selecting_target() {
                RING_TARGET_COLOR
            } else {
                RING_COLOR
            },
            opacity: if r.over_edge { 0.5 } else { 1.0 },
            points: r.points,
        });

        let mut progress = None;
        if let Some(focus) = self.focus {
            if let Some(step) = self.path.advance(focus) {
                self.follow(step.focus);
                if step.arrived {
                    self.sketches_dirty = true;
                } else {
                    progress = Some(step.progress);
                }
            }
        }

        if self.settings.auto_rotate && !self.camera.auto_rotate {
            let idle = self.last_interaction.map_or(true, |t| {
                now.saturating_sub(t).as_secs_f32() >= IDLE_AUTO_ROTATE_SEC
            });
            if idle {
                self.camera.auto_rotate = true;
            }
        } else if !self.settings.auto_rotate {
            self.camera.auto_rotate = false;
        }
        self.camera.update(dt);

        let view = self.camera.camera(aspect);
        sink.apply(SceneCommand::Camera {
            view_proj: view.view_proj(),
            eye: view.eye,
            target: view.target,
        });
        if std::mem::take(&mut self.terrain_dirty) {
            sink.apply(SceneCommand::Terrain(
                self.heightmap.plane_heights(PLANE_SEGMENTS),
            ));
        }
        if !self.color_updates.is_empty() {
            sink.apply(SceneCommand::PointColors(std::mem::take(&mut self.color_updates)));
        }
        sink.apply(SceneCommand::Ring(ring_visual));
        sink.apply(SceneCommand::Beam(self.focus.map(|p| BeamVisual {
            base: self.heightmap.on_surface(p),
            radius,
            height: BEAM_HEIGHT,
            opacity: BEAM_OPACITY,
        })));
        if self.sketches_dirty || progress.is_some() {
            self.sketches_dirty = false;
            let sketches = self
                .path
                .sketches()
                .enumerate()
                .map(|(i, s)| SketchVisual {
                    points: s.points.clone(),
                    progress: if i == 0 { progress.unwrap_or(0.0) } else { 0.0 },
                    active: i == 0 && progress.is_some(),
                })
                .collect();
            sink.apply(SceneCommand::Sketches(sketches));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::CloudPoint;

    fn grid_cloud() -> PointCloud {
        let mut points = Vec::new();
        for i in 0..10u32 {
            points.push(CloudPoint {
                index: i,
                position: Vec3::new(i as f32 * 0.045, 0.3, 0.0),
            });
        }
        PointCloud::from_points(points)
    }

    #[test]
    fn select_at_highlights_and_moves_listener() {
        let mut s = Session::new(Settings::default(), grid_cloud(), 7);
        let g0 = s.generation();
        let stale = s.select_at(Vec3::new(0.0, 0.0, 0.0));
        assert!(stale.is_empty());
        assert_ne!(s.generation(), g0);
        // radius 0.2 reaches x = 0.0 ..= 0.18
        assert_eq!(s.candidates().len(), 5);
        assert_eq!(s.listener().position, Vec3::ZERO);
        assert_eq!(s.camera().look_at_target(), Vec3::ZERO);

        let mut frame: Vec<SceneCommand> = Vec::new();
        s.frame(Duration::ZERO, 1.0, &mut frame);
        let colors = frame.iter().find_map(|c| match c {
            SceneCommand::PointColors(c) => Some(c.clone()),
            _ => None,
        });
        assert_eq!(colors.map(|c| c.len()), Some(5));
    }

    #[test]
    fn reselect_restores_previous_colors() {
        let mut s = Session::new(Settings::default(), grid_cloud(), 1);
        s.select_at(Vec3::ZERO);
        let mut frame: Vec<SceneCommand> = Vec::new();
        s.frame(Duration::ZERO, 1.0, &mut frame);
        frame.clear();
        s.select_at(Vec3::new(5.0, 0.0, 5.0));
        assert!(s.candidates().is_empty());
        s.frame(Duration::from_millis(16), 1.0, &mut frame);
        let base = hsl_to_rgb(POINT_BASE_HSL);
        let colors = frame
            .iter()
            .find_map(|c| match c {
                SceneCommand::PointColors(c) => Some(c.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(colors.len(), 5);
        assert!(colors.iter().all(|(_, c)| *c == base));
    }

    #[test]
    fn poll_respects_slot_cap() {
        let mut settings = Settings::default();
        settings.max_simultaneous = 2;
        let mut s = Session::new(settings, grid_cloud(), 3);
        assert!(s.poll_queue().is_none());
        s.select_at(Vec3::ZERO);
        assert!(s.poll_queue().is_some());
        assert!(s.poll_queue().is_some());
        assert!(s.poll_queue().is_none());
        assert_eq!(s.audio_queue().borrow().active(), 2);
    }

    #[test]
    fn idle_auto_rotate_resumes_after_delay() {
        let mut s = Session::new(Settings::default(), grid_cloud(), 3);
        let mut sink: Vec<SceneCommand> = Vec::new();
        s.note_interaction(Duration::from_secs(1));
        s.frame(Duration::from_secs(5), 1.0, &mut sink);
        assert!(!s.camera().auto_rotate);
        s.frame(Duration::from_secs(11), 1.0, &mut sink);
        assert!(s.camera().auto_rotate);
    }

    #[test]
    fn late_heightmap_resends_terrain_once() {
        let mut s = Session::new(Settings::default(), grid_cloud(), 3);
        let is_terrain = |c: &SceneCommand| matches!(c, SceneCommand::Terrain(_));
        let mut sink: Vec<SceneCommand> = Vec::new();
        s.frame(Duration::ZERO, 1.0, &mut sink);
        assert!(!sink.iter().any(is_terrain));
        assert_eq!(s.heightmap().height_at(0.0, 0.0), 0.0);

        s.set_heightmap(Heightmap::from_luma(2, 2, vec![255; 4]));
        sink.clear();
        s.frame(Duration::from_millis(16), 1.0, &mut sink);
        let heights = sink
            .iter()
            .find_map(|c| match c {
                SceneCommand::Terrain(h) => Some(h.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(heights.len(), (PLANE_SEGMENTS + 1) * (PLANE_SEGMENTS + 1));
        assert!(s.heightmap().height_at(0.0, 0.0) > 0.0);

        sink.clear();
        s.frame(Duration::from_millis(32), 1.0, &mut sink);
        assert!(!sink.iter().any(is_terrain));
    }

    #[test]
    fn long_drag_keeps_auto_rotate_paused() {
        let mut s = Session::new(Settings::default(), grid_cloud(), 3);
        let mut sink: Vec<SceneCommand> = Vec::new();
        s.note_interaction(Duration::ZERO);
        s.pointer_down(Duration::ZERO, Vec2::ZERO);
        for i in 1..=120u64 {
            let now = Duration::from_millis(i * 100);
            s.pointer_move(now, Vec2::new((i % 7) as f32 * 0.01, 0.0));
            s.frame(now, 1.0, &mut sink);
            assert!(!s.camera().auto_rotate, "resumed mid-drag at {:?}", now);
        }
        s.pointer_up(Duration::from_secs(12));
        s.frame(Duration::from_secs(20), 1.0, &mut sink);
        assert!(!s.camera().auto_rotate);
        s.frame(Duration::from_secs(23), 1.0, &mut sink);
        assert!(s.camera().auto_rotate);
    }

    #[test]
    fn setting_change_requeries_at_focus() {
        let mut s = Session::new(Settings::default(), grid_cloud(), 3);
        s.select_at(Vec3::ZERO);
        let g = s.generation();
        let effect = s.adjust_setting(SettingAdjust::SearchScale(-0.5));
        assert_eq!(effect, SettingEffect::Rescale);
        assert_ne!(s.generation(), g);
        // radius 0.1 now
        assert_eq!(s.candidates().len(), 3);
    }
}
