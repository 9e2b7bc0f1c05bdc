use glam::{Mat4, Vec3};

#[derive(Clone, Debug, PartialEq)]
pub struct RingVisual {
    pub points: Vec<Vec3>,
    pub color: [f32; 3],
    pub opacity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamVisual {
    pub base: Vec3,
    pub radius: f32,
    pub height: f32,
    pub opacity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SketchVisual {
    pub points: Vec<Vec3>,
    /// Portion of the leg already walked; drawn hidden.
    pub progress: f32,
    /// The leg currently being walked.
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneCommand {
    Camera {
        view_proj: Mat4,
        eye: Vec3,
        target: Vec3,
    },
    /// Per-point color overrides, applied in order.
    PointColors(Vec<(u32, [f32; 3])>),
    Ring(Option<RingVisual>),
    Beam(Option<BeamVisual>),
    Sketches(Vec<SketchVisual>),
    /// Plane vertex heights, row-major from the far edge; sent when the
    /// heightmap changes.
    Terrain(Vec<f32>),
}

pub trait SceneSink {
    fn apply(&mut self, command: SceneCommand);
}

impl SceneSink for Vec<SceneCommand> {
    fn apply(&mut self, command: SceneCommand) {
        self.push(command);
    }
}
