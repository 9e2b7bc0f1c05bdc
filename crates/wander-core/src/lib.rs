pub mod audio;
pub mod camera;
pub mod constants;
pub mod error;
pub mod heightmap;
pub mod path;
pub mod points;
pub mod scene;
pub mod selection;
pub mod session;
pub mod settings;
pub mod spatial;
pub static SCENE_WGSL: &str = include_str!("../shaders/scene.wgsl");

pub use audio::*;
pub use camera::*;
pub use error::*;
pub use heightmap::*;
pub use path::*;
pub use points::*;
pub use scene::*;
pub use selection::*;
pub use session::*;
pub use settings::*;
pub use spatial::*;
