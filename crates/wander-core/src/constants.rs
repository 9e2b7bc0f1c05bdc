use glam::Vec3;

// Shared scene/audio tuning constants used by the core session and the web frontend.

// Terrain plane: 16x16 world units centred on the origin
pub const PLANE_SIZE: f32 = 16.0;
pub const PLANE_HALF: f32 = PLANE_SIZE * 0.5;
pub const PLANE_SEGMENTS: usize = 100;
pub const TERRAIN_HEIGHT_SCALE: f32 = 2.0; // full-white pixel height in world units

// Points asset is expressed in raster pixels around a 2048px map
pub const POINTS_PIXEL_ORIGIN: f32 = 1024.0;
pub const POINTS_PIXELS_PER_UNIT: f32 = 128.0;

// Selection
pub const DEFAULT_SELECTION_RADIUS: f32 = 0.2; // scaled by `search_scale`
pub const PRESS_DWELL_MS: u64 = 300;
pub const MAX_PRESS_MOVES: u32 = 5;
pub const EDGE_HEIGHT_DELTA: f32 = 0.01;
pub const RING_SEGMENTS: usize = 64;

// Path traversal (world units per frame)
pub const PATH_STEP: f32 = 0.0001;
pub const PATH_ARRIVE_DISTANCE: f32 = PATH_STEP;
pub const SKETCH_STEP: f32 = 0.1;
pub const SKETCH_END_DISTANCE: f32 = 0.2;

// Playback
pub const CLIP_DURATION_SEC: f64 = 5.0;
pub const CLIP_FADE_SEC: f64 = 0.5;
pub const CLIP_FLOOR_GAIN: f32 = 0.01;
pub const PANNER_REF_DISTANCE: f64 = 0.01;
pub const PANNER_MAX_DISTANCE: f64 = 10_000.0;
pub const PANNER_ROLLOFF: f64 = 10.0;

// Camera
pub const LOOK_AT_SMOOTHING: f32 = 0.02; // fraction of remaining distance per frame
pub const IDLE_AUTO_ROTATE_SEC: f32 = 10.0;
pub const AUTO_ROTATE_SPEED: f32 = 0.3;
pub const CAMERA_MIN_DISTANCE: f32 = 2.0;
pub const CAMERA_MAX_DISTANCE: f32 = 10.0;
pub const CAMERA_FOVY_DEG: f32 = 75.0;
pub const CAMERA_ZNEAR: f32 = 0.1;
pub const CAMERA_ZFAR: f32 = 100_000.0;
pub const CAMERA_START_EYE: Vec3 = Vec3::new(0.0, 10.0, -10.0);
pub const ORBIT_RADIANS_PER_NDC: f32 = std::f32::consts::PI;
pub const ZOOM_PER_WHEEL_STEP: f32 = 0.95;

// Beam
pub const BEAM_HEIGHT: f32 = 50.0;
pub const BEAM_OPACITY: f32 = 0.3;

// Palette (HSL hue/saturation/lightness)
pub const POINT_BASE_HSL: [f32; 3] = [0.08, 0.8, 0.5];
pub const POINT_HIGHLIGHT_HSL: [f32; 3] = [0.08, 1.0, 1.0];
pub const RING_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
pub const RING_TARGET_COLOR: [f32; 3] = [0x4D as f32 / 255.0, 0xA1 as f32 / 255.0, 0xA9 as f32 / 255.0];
pub const SKETCH_COLOR: [f32; 3] = [0.3, 0.63, 0.66];

/// Convert an HSL triple (all components in \[0, 1\]) to linear RGB.
pub fn hsl_to_rgb([h, s, l]: [f32; 3]) -> [f32; 3] {
    if s <= 0.0 {
        return [l, l, l];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lightness_is_white() {
        let c = hsl_to_rgb(POINT_HIGHLIGHT_HSL);
        for v in c {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn base_color_is_warm_orange() {
        let [r, g, b] = hsl_to_rgb(POINT_BASE_HSL);
        assert!(r > g && g > b, "expected orange, got {r} {g} {b}");
        assert!((r - 0.9).abs() < 1e-4);
        assert!((b - 0.1).abs() < 1e-4);
    }
}
