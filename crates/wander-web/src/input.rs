use glam::Vec2;

// Pointer helpers free of DOM types; the event handlers read the rect and
// client coordinates and pass plain numbers in.

/// Map a client-space position to normalized device coordinates of a canvas
/// whose bounding rect starts at `origin` with `size` (CSS pixels). Returns
/// `None` for a collapsed canvas.
#[inline]
pub fn client_to_ndc(client: Vec2, origin: Vec2, size: Vec2) -> Option<Vec2> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    let local = (client - origin) / size;
    Some(Vec2::new(local.x * 2.0 - 1.0, 1.0 - local.y * 2.0))
}

/// One zoom step per wheel event, positive when scrolling away from the scene.
#[inline]
pub fn wheel_steps(delta_y: f64) -> f32 {
    if delta_y > 0.0 {
        1.0
    } else if delta_y < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Canvas backing size for a CSS size and device pixel ratio.
#[inline]
pub fn backing_size(css_width: f64, css_height: f64, dpr: f64) -> (u32, u32) {
    let w = (css_width * dpr).max(0.0) as u32;
    let h = (css_height * dpr).max(0.0) as u32;
    (w.max(1), h.max(1))
}
