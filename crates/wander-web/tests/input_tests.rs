// Host-side tests for pure input functions.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod input {
    include!("../src/input.rs");
}

use glam::Vec2;
use input::*;

#[test]
fn canvas_corners_map_to_ndc() {
    let origin = Vec2::new(10.0, 20.0);
    let size = Vec2::new(200.0, 100.0);
    assert_eq!(client_to_ndc(origin, origin, size), Some(Vec2::new(-1.0, 1.0)));
    assert_eq!(
        client_to_ndc(origin + size, origin, size),
        Some(Vec2::new(1.0, -1.0))
    );
    assert_eq!(
        client_to_ndc(origin + size * 0.5, origin, size),
        Some(Vec2::ZERO)
    );
}

#[test]
fn collapsed_canvas_has_no_ndc() {
    assert_eq!(client_to_ndc(Vec2::ONE, Vec2::ZERO, Vec2::new(0.0, 10.0)), None);
}

#[test]
fn wheel_is_one_step_per_event() {
    assert_eq!(wheel_steps(120.0), 1.0);
    assert_eq!(wheel_steps(-3.0), -1.0);
    assert_eq!(wheel_steps(0.0), 0.0);
}

#[test]
fn backing_size_never_zero() {
    assert_eq!(backing_size(400.0, 300.0, 2.0), (800, 600));
    assert_eq!(backing_size(0.0, 0.0, 1.0), (1, 1));
}
