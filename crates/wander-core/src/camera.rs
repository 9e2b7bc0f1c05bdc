use crate::constants::{
    AUTO_ROTATE_SPEED, CAMERA_FOVY_DEG, CAMERA_MAX_DISTANCE, CAMERA_MIN_DISTANCE, CAMERA_START_EYE,
    CAMERA_ZFAR, CAMERA_ZNEAR, LOOK_AT_SMOOTHING, ORBIT_RADIANS_PER_NDC, PLANE_HALF,
    ZOOM_PER_WHEEL_STEP,
};
use glam::{Mat4, Vec2, Vec3, Vec4};

const MIN_POLAR: f32 = 0.05;
const MAX_POLAR: f32 = std::f32::consts::FRAC_PI_2 - 0.05;

/// Right-handed perspective camera snapshot.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv = self.view_proj().inverse();
        // Near-plane unprojection; the far plane is too distant for f32 here.
        let near = inv * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let near: Vec3 = near.truncate() / near.w;
        Ray {
            origin: self.eye,
            direction: (near - self.eye).normalize_or_zero(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Hit on the `y = 0` ground proxy, limited to the terrain plane.
    pub fn intersect_ground(&self) -> Option<Vec3> {
        if self.direction.y.abs() < f32::EPSILON {
            return None;
        }
        let t = -self.origin.y / self.direction.y;
        if t <= 0.0 {
            return None;
        }
        let hit = self.origin + self.direction * t;
        if hit.x.abs() > PLANE_HALF || hit.z.abs() > PLANE_HALF {
            return None;
        }
        Some(Vec3::new(hit.x, 0.0, hit.z))
    }
}

/// Orbit controls state. Angles are spherical around `target`: `azimuth`
/// from +z towards +x, `polar` down from +y.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    target: Vec3,
    look_at: Vec3,
    azimuth: f32,
    polar: f32,
    distance: f32,
    pub auto_rotate: bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        let offset = CAMERA_START_EYE;
        let distance = offset.length();
        Self {
            target: Vec3::ZERO,
            look_at: Vec3::ZERO,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / distance).acos().clamp(MIN_POLAR, MAX_POLAR),
            distance: distance.clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE),
            auto_rotate: true,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn look_at_target(&self) -> Vec3 {
        self.look_at
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_look_at(&mut self, point: Vec3) {
        self.look_at = point;
    }

    pub fn eye(&self) -> Vec3 {
        let (sp, cp) = self.polar.sin_cos();
        let (sa, ca) = self.azimuth.sin_cos();
        self.target + self.distance * Vec3::new(sp * sa, cp, sp * ca)
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye()).normalize_or_zero()
    }

    /// Horizontal listener facing derived from the view direction.
    pub fn listener_forward(&self) -> Vec3 {
        let dir = self.forward();
        let angle = dir.x.atan2(dir.z);
        Vec3::new(angle.sin(), 0.0, angle.cos())
    }

    /// One frame: ease the target towards the look-at point and apply
    /// auto-rotation for `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.target += (self.look_at - self.target) * LOOK_AT_SMOOTHING;
        if self.auto_rotate {
            let rate = std::f32::consts::TAU / 60.0 * AUTO_ROTATE_SPEED;
            self.azimuth -= rate * dt;
        }
    }

    /// Rotate by a pointer drag measured in NDC units.
    pub fn drag(&mut self, delta: Vec2) {
        self.azimuth -= delta.x * ORBIT_RADIANS_PER_NDC;
        self.polar = (self.polar + delta.y * ORBIT_RADIANS_PER_NDC).clamp(MIN_POLAR, MAX_POLAR);
    }

    /// Dolly by wheel steps; positive steps move away.
    pub fn zoom(&mut self, steps: f32) {
        let factor = ZOOM_PER_WHEEL_STEP.powf(-steps);
        self.distance = (self.distance * factor).clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
    }

    pub fn camera(&self, aspect: f32) -> Camera {
        Camera {
            eye: self.eye(),
            target: self.target,
            up: Vec3::Y,
            aspect: aspect.max(1e-3),
            fovy_radians: CAMERA_FOVY_DEG.to_radians(),
            znear: CAMERA_ZNEAR,
            zfar: CAMERA_ZFAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_behind_origin_within_zoom_limits() {
        let cam = OrbitCamera::new();
        let eye = cam.eye();
        assert!(eye.z < 0.0 && eye.y > 0.0);
        assert!((eye.length() - CAMERA_MAX_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn target_eases_towards_look_at() {
        let mut cam = OrbitCamera::new();
        cam.auto_rotate = false;
        cam.set_look_at(Vec3::new(1.0, 0.0, 0.0));
        cam.update(0.016);
        assert!((cam.target().x - LOOK_AT_SMOOTHING).abs() < 1e-6);
        for _ in 0..1000 {
            cam.update(0.016);
        }
        assert!((cam.target().x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = OrbitCamera::new();
        cam.zoom(-100.0);
        assert_eq!(cam.distance(), CAMERA_MIN_DISTANCE);
        cam.zoom(100.0);
        assert_eq!(cam.distance(), CAMERA_MAX_DISTANCE);
    }

    #[test]
    fn listener_faces_along_view() {
        let cam = OrbitCamera::new();
        let f = cam.listener_forward();
        assert!(f.y == 0.0);
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!(f.z > 0.99);
    }

    #[test]
    fn centre_ray_hits_target() {
        let cam = OrbitCamera::new().camera(1.5);
        let hit = cam.ray_from_ndc(Vec2::ZERO).intersect_ground().unwrap();
        assert!(hit.length() < 1e-2);
    }

    #[test]
    fn ray_missing_the_plane() {
        let up = Ray {
            origin: Vec3::new(0.0, 5.0, 0.0),
            direction: Vec3::Y,
        };
        assert!(up.intersect_ground().is_none());
        let far = Ray {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::new(1.0, -0.01, 0.0).normalize(),
        };
        assert!(far.intersect_ground().is_none());
    }
}
