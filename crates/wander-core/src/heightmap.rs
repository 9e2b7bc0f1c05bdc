use crate::constants::{EDGE_HEIGHT_DELTA, PLANE_HALF, PLANE_SIZE, TERRAIN_HEIGHT_SCALE};
use crate::error::LoadError;
use glam::{Vec2, Vec3};

// Pixel inset used when displacing the plane grid, as authored for the map asset.
const PLANE_SAMPLE_INSET: f32 = 10.0;

#[derive(Clone, Debug, Default)]
pub struct Heightmap {
    width: u32,
    height: u32,
    values: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct RingShape {
    pub points: Vec<Vec3>,
    pub over_edge: bool,
}

impl Heightmap {
    pub fn from_luma(width: u32, height: u32, values: Vec<u8>) -> Self {
        if values.len() != (width as usize) * (height as usize) {
            log::warn!(
                "[heightmap] {}x{} raster with {} values; ignoring",
                width,
                height,
                values.len()
            );
            return Self::default();
        }
        Self {
            width,
            height,
            values,
        }
    }

    /// Decode an encoded image (PNG); the red channel carries the height.
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        let values = rgba.pixels().map(|p| p.0[0]).collect();
        log::info!("[heightmap] decoded {}x{}", width, height);
        Ok(Self::from_luma(width, height, values))
    }

    pub fn is_loaded(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sample_pixel(&self, px: i64, py: i64) -> f32 {
        if px < 0 || py < 0 || px >= self.width as i64 || py >= self.height as i64 {
            return 0.0;
        }
        let v = self.values[py as usize * self.width as usize + px as usize];
        TERRAIN_HEIGHT_SCALE * v as f32 / 255.0
    }

    /// Height at normalized raster coordinates (`u` right, `v` down).
    pub fn sample_normalized(&self, u: f32, v: f32) -> f32 {
        let px = (u * self.width as f32).round() as i64;
        let py = (v * self.height as f32).round() as i64;
        self.sample_pixel(px, py)
    }

    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let u = (x + PLANE_HALF) / PLANE_SIZE;
        let v = 1.0 - (z + PLANE_HALF) / PLANE_SIZE;
        self.sample_normalized(u, v)
    }

    pub fn on_surface(&self, p: Vec3) -> Vec3 {
        Vec3::new(p.x, self.height_at(p.x, p.z), p.z)
    }

    /// Vertex heights for a `segments` x `segments` plane, row-major from the
    /// far (+z) edge, `(segments + 1)^2` values.
    pub fn plane_heights(&self, segments: usize) -> Vec<f32> {
        let verts = segments + 1;
        let mut out = Vec::with_capacity(verts * verts);
        let x_step = self.width as f32 / verts as f32;
        let y_step = self.height as f32 / verts as f32;
        for row in 0..verts {
            for col in 0..verts {
                let px = (col as f32 * x_step + PLANE_SAMPLE_INSET).round() as i64;
                let py = (row as f32 * y_step + PLANE_SAMPLE_INSET).round() as i64;
                out.push(if self.is_loaded() {
                    self.sample_pixel(px, py)
                } else {
                    0.0
                });
            }
        }
        out
    }

    /// Sample a ring of `radius` around `center` on the terrain.
    ///
    /// The ring is over an edge when its samples span more than
    /// `EDGE_HEIGHT_DELTA` in height.
    pub fn ring(&self, center: Vec2, radius: f32, segments: usize) -> RingShape {
        let segments = segments.max(3);
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        let points: Vec<Vec3> = (0..=segments)
            .map(|i| {
                let a = i as f32 / segments as f32 * std::f32::consts::TAU;
                let x = center.x + radius * a.cos();
                let z = center.y + radius * a.sin();
                let y = self.height_at(x, z);
                lo = lo.min(y);
                hi = hi.max(y);
                Vec3::new(x, y, z)
            })
            .collect();
        RingShape {
            points,
            over_edge: hi - lo > EDGE_HEIGHT_DELTA,
        }
    }
}
