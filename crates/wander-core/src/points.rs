use crate::constants::{POINTS_PIXELS_PER_UNIT, POINTS_PIXEL_ORIGIN};
use crate::error::LoadError;
use glam::{Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloudPoint {
    pub index: u32,
    pub position: Vec3,
}

impl CloudPoint {
    #[inline]
    pub fn planar(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.z)
    }
}

#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    points: Vec<CloudPoint>,
}

impl PointCloud {
    pub fn from_points(points: Vec<CloudPoint>) -> Self {
        Self { points }
    }

    /// Project raw pixel-space triplets into world space.
    pub fn from_raw(raw: &[f32]) -> Result<Self, LoadError> {
        if raw.len() % 3 != 0 {
            return Err(LoadError::PartialTriplet(raw.len()));
        }
        let points = raw
            .chunks_exact(3)
            .enumerate()
            .map(|(i, c)| CloudPoint {
                index: i as u32,
                position: pixel_to_world(c[0], c[1], c[2]),
            })
            .collect();
        Ok(Self { points })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, LoadError> {
        let raw: Vec<f32> = serde_json::from_slice(bytes)?;
        let cloud = Self::from_raw(&raw)?;
        log::info!("[points] loaded {} points", cloud.len());
        Ok(cloud)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[CloudPoint] {
        &self.points
    }

    pub fn get(&self, index: u32) -> Option<&CloudPoint> {
        self.points.get(index as usize)
    }
}

#[inline]
pub fn pixel_to_world(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(
        (x - POINTS_PIXEL_ORIGIN) / POINTS_PIXELS_PER_UNIT,
        y / POINTS_PIXELS_PER_UNIT,
        (POINTS_PIXEL_ORIGIN - z) / POINTS_PIXELS_PER_UNIT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_pixels_around_map_centre() {
        let cloud = PointCloud::from_raw(&[1024.0, 0.0, 1024.0, 1152.0, 256.0, 896.0]).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points()[0].position, Vec3::ZERO);
        assert_eq!(cloud.points()[1].position, Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(cloud.points()[1].index, 1);
        assert_eq!(cloud.points()[1].planar(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn rejects_partial_triplet() {
        let err = PointCloud::from_raw(&[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(err, LoadError::PartialTriplet(4)));
    }

    #[test]
    fn parses_json_array() {
        let cloud = PointCloud::from_json(b"[1024, 128, 1024]").unwrap();
        assert_eq!(cloud.points()[0].position, Vec3::new(0.0, 1.0, 0.0));
        assert!(PointCloud::from_json(b"{\"not\": \"an array\"}").is_err());
    }
}
