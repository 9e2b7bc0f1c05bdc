use crate::constants::{MAX_PRESS_MOVES, PRESS_DWELL_MS};
use glam::Vec3;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerPhase {
    #[default]
    Idle,
    Hovering,
    Pressing,
    SelectingTarget,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hover {
    pub point: Vec3,
    pub over_edge: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionAction {
    /// Quick release: listen at this point.
    Tap(Vec3),
    /// Released after a dwell: walk to this point next.
    AddWaypoint(Vec3),
}

#[derive(Clone, Debug, Default)]
pub struct SelectionController {
    phase: PointerPhase,
    hover: Option<Hover>,
    pointer_down: bool,
    press_started: Duration,
    moves: u32,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    pub fn hover(&self) -> Option<Hover> {
        self.hover
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    pub fn is_selecting_target(&self) -> bool {
        self.phase == PointerPhase::SelectingTarget
    }

    /// A press is a camera drag once it moved too much.
    pub fn is_dragging(&self) -> bool {
        self.pointer_down && self.moves >= MAX_PRESS_MOVES
    }

    pub fn move_count(&self) -> u32 {
        self.moves
    }

    pub fn set_hover(&mut self, hover: Option<Hover>) {
        self.hover = hover;
        match (self.phase, hover.is_some()) {
            (PointerPhase::Idle, true) => self.phase = PointerPhase::Hovering,
            (PointerPhase::Hovering, false) => self.phase = PointerPhase::Idle,
            _ => {}
        }
    }

    pub fn pointer_moved(&mut self) {
        self.moves = self.moves.saturating_add(1);
    }

    pub fn pointer_down(&mut self, now: Duration) {
        self.pointer_down = true;
        self.moves = 0;
        self.press_started = now;
        if self.phase == PointerPhase::Hovering {
            self.phase = PointerPhase::Pressing;
        }
    }

    /// Dwell check, run every frame. Returns true on entering target selection.
    pub fn update(&mut self, now: Duration, has_focus: bool) -> bool {
        if self.phase != PointerPhase::Pressing || !has_focus {
            return false;
        }
        let held = now.saturating_sub(self.press_started);
        let steady = self.moves < MAX_PRESS_MOVES;
        let on_solid_ground = self.hover.is_some_and(|h| !h.over_edge);
        if held > Duration::from_millis(PRESS_DWELL_MS) && steady && on_solid_ground {
            log::debug!("[selection] picking path target");
            self.phase = PointerPhase::SelectingTarget;
            return true;
        }
        false
    }

    pub fn pointer_up(&mut self) -> Option<SelectionAction> {
        self.pointer_down = false;
        let action = match self.phase {
            PointerPhase::SelectingTarget => self.hover.map(|h| SelectionAction::AddWaypoint(h.point)),
            PointerPhase::Pressing if self.moves < MAX_PRESS_MOVES => {
                self.hover.map(|h| SelectionAction::Tap(h.point))
            }
            _ => None,
        };
        if matches!(self.phase, PointerPhase::Pressing | PointerPhase::SelectingTarget) {
            self.phase = PointerPhase::Idle;
            if self.hover.is_some() {
                self.phase = PointerPhase::Hovering;
            }
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Vec3 = Vec3::new(1.0, 0.0, 2.0);

    fn hovering() -> SelectionController {
        let mut c = SelectionController::new();
        c.set_hover(Some(Hover {
            point: P,
            over_edge: false,
        }));
        c
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn hover_enters_and_leaves() {
        let mut c = hovering();
        assert_eq!(c.phase(), PointerPhase::Hovering);
        c.set_hover(None);
        assert_eq!(c.phase(), PointerPhase::Idle);
    }

    #[test]
    fn quick_release_is_a_tap() {
        let mut c = hovering();
        c.pointer_down(ms(0));
        assert_eq!(c.phase(), PointerPhase::Pressing);
        c.pointer_moved();
        assert!(!c.update(ms(100), true));
        assert_eq!(c.pointer_up(), Some(SelectionAction::Tap(P)));
        assert_eq!(c.phase(), PointerPhase::Hovering);
    }

    #[test]
    fn dragging_selects_nothing() {
        let mut c = hovering();
        c.pointer_down(ms(0));
        for _ in 0..MAX_PRESS_MOVES {
            c.pointer_moved();
        }
        assert!(c.is_dragging());
        assert!(!c.update(ms(1000), true));
        assert_eq!(c.pointer_up(), None);
    }

    #[test]
    fn dwell_enters_target_selection() {
        let mut c = hovering();
        c.pointer_down(ms(1000));
        assert!(!c.update(ms(1300), true));
        assert!(c.update(ms(1301), true));
        assert!(c.is_selecting_target());
        assert_eq!(c.pointer_up(), Some(SelectionAction::AddWaypoint(P)));
        assert!(!c.is_selecting_target());
    }

    #[test]
    fn dwell_needs_a_focus_point() {
        let mut c = hovering();
        c.pointer_down(ms(0));
        assert!(!c.update(ms(5000), false));
        assert_eq!(c.pointer_up(), Some(SelectionAction::Tap(P)));
    }

    #[test]
    fn dwell_over_an_edge_falls_back_to_tap() {
        let mut c = SelectionController::new();
        c.set_hover(Some(Hover {
            point: P,
            over_edge: true,
        }));
        c.pointer_down(ms(0));
        assert!(!c.update(ms(2000), true));
        assert_eq!(c.pointer_up(), Some(SelectionAction::Tap(P)));
    }

    #[test]
    fn press_without_hover_does_nothing() {
        let mut c = SelectionController::new();
        c.pointer_down(ms(0));
        assert_eq!(c.phase(), PointerPhase::Idle);
        assert_eq!(c.pointer_up(), None);
    }

    #[test]
    fn losing_hover_while_pressed_cancels_tap() {
        let mut c = hovering();
        c.pointer_down(ms(0));
        c.set_hover(None);
        assert_eq!(c.phase(), PointerPhase::Pressing);
        assert_eq!(c.pointer_up(), None);
        assert_eq!(c.phase(), PointerPhase::Idle);
    }
}
