// CPU-side vertex builders for the scene. Kept free of GPU and DOM types so
// the host tests can include this file directly.

use glam::Vec3;
use wander_core::constants::SKETCH_COLOR;
use wander_core::{BeamVisual, RingVisual, SketchVisual};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColorVertex {
    pub pos: [f32; 3],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointInstance {
    pub pos: [f32; 3],
    pub scale: f32,
    pub color: [f32; 4],
}

pub const POINT_SCALE: f32 = 0.035;
pub const BEAM_SIDES: usize = 16;
// Overlays sit slightly above the terrain to avoid z-fighting.
pub const OVERLAY_LIFT: f32 = 0.01;
const TERRAIN_LOW: [f32; 3] = [0.05, 0.06, 0.08];
const TERRAIN_HIGH: [f32; 3] = [0.16, 0.18, 0.2];
const SKETCH_BASE_ALPHA: f32 = 0.3;

/// Byte offset of point `index`'s color inside the instance buffer.
#[inline]
pub fn point_color_offset(index: u32) -> u64 {
    (index as u64) * std::mem::size_of::<PointInstance>() as u64 + 16
}

pub fn point_instances(positions: &[Vec3], rgb: [f32; 3]) -> Vec<PointInstance> {
    positions
        .iter()
        .map(|p| PointInstance {
            pos: p.to_array(),
            scale: POINT_SCALE,
            color: [rgb[0], rgb[1], rgb[2], 1.0],
        })
        .collect()
}

/// Displaced plane as an indexed triangle list; `heights` is row-major from
/// the +z edge with `(segments + 1)^2` entries.
pub fn terrain_mesh(heights: &[f32], segments: usize, size: f32) -> (Vec<ColorVertex>, Vec<u32>) {
    let verts = segments + 1;
    if segments == 0 || heights.len() != verts * verts {
        return (Vec::new(), Vec::new());
    }
    let half = size * 0.5;
    let top = heights.iter().cloned().fold(0.0f32, f32::max).max(1e-3);
    let mut vertices = Vec::with_capacity(verts * verts);
    for row in 0..verts {
        for col in 0..verts {
            let x = -half + size * col as f32 / segments as f32;
            let z = half - size * row as f32 / segments as f32;
            let y = heights[row * verts + col];
            let k = (y / top).clamp(0.0, 1.0);
            let c = |i: usize| TERRAIN_LOW[i] + (TERRAIN_HIGH[i] - TERRAIN_LOW[i]) * k;
            vertices.push(ColorVertex {
                pos: [x, y, z],
                color: [c(0), c(1), c(2), 1.0],
            });
        }
    }
    let mut indices = Vec::with_capacity(segments * segments * 6);
    for row in 0..segments {
        for col in 0..segments {
            let a = (row * verts + col) as u32;
            let b = a + 1;
            let c = a + verts as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    (vertices, indices)
}

/// Append a polyline as line-list segments, coloring each vertex by its index.
pub fn push_polyline(
    out: &mut Vec<ColorVertex>,
    points: &[Vec3],
    mut color: impl FnMut(usize) -> [f32; 4],
) {
    for (i, pair) in points.windows(2).enumerate() {
        out.push(ColorVertex {
            pos: pair[0].to_array(),
            color: color(i),
        });
        out.push(ColorVertex {
            pos: pair[1].to_array(),
            color: color(i + 1),
        });
    }
}

fn lifted(points: &[Vec3]) -> Vec<Vec3> {
    points.iter().map(|p| *p + Vec3::Y * OVERLAY_LIFT).collect()
}

pub fn ring_lines(out: &mut Vec<ColorVertex>, ring: &RingVisual) {
    let [r, g, b] = ring.color;
    push_polyline(out, &lifted(&ring.points), |_| [r, g, b, ring.opacity]);
}

/// Vertical sides of the beam plus its base circle.
pub fn beam_lines(out: &mut Vec<ColorVertex>, beam: &BeamVisual) {
    let base = beam.base + Vec3::Y * OVERLAY_LIFT;
    let circle: Vec<Vec3> = (0..=BEAM_SIDES)
        .map(|i| {
            let a = i as f32 / BEAM_SIDES as f32 * std::f32::consts::TAU;
            base + Vec3::new(beam.radius * a.cos(), 0.0, beam.radius * a.sin())
        })
        .collect();
    push_polyline(out, &circle, |_| [1.0, 1.0, 1.0, 1.0]);
    for p in circle.iter().take(BEAM_SIDES) {
        out.push(ColorVertex {
            pos: p.to_array(),
            color: [1.0, 1.0, 1.0, beam.opacity],
        });
        out.push(ColorVertex {
            pos: (*p + Vec3::Y * beam.height).to_array(),
            color: [1.0, 1.0, 1.0, 0.0],
        });
    }
}

fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Walked part hidden; the active leg pulses along its length over `time`.
pub fn sketch_alpha(u: f32, progress: f32, active: bool, time: f32) -> f32 {
    let visible = smoothstep(progress, progress + 0.01, u);
    let glow = if active {
        (1.0 + (-5.0 * time + u * 50.0).sin()) * 0.5 * 0.7 + SKETCH_BASE_ALPHA
    } else {
        SKETCH_BASE_ALPHA
    };
    visible * glow
}

pub fn sketch_lines(out: &mut Vec<ColorVertex>, sketch: &SketchVisual, time: f32) {
    let points = lifted(&sketch.points);
    let mut along = Vec::with_capacity(points.len());
    let mut acc = 0.0f32;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += p.distance(points[i - 1]);
        }
        along.push(acc);
    }
    let total = acc.max(1e-6);
    let [r, g, b] = SKETCH_COLOR;
    push_polyline(out, &points, |i| {
        let a = sketch_alpha(along[i] / total, sketch.progress, sketch.active, time);
        [r, g, b, a]
    });
}
