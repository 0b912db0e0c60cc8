//! # Pivot
//!
//! **A small 3D model viewer for comparing Euler and axis-angle rotation input.**
//!
//! Load a mesh, fly around it, and turn it with the keyboard. Two rotation modes
//! are available and can be switched at any time:
//!
//! - **Euler** (key `1`): yaw/pitch/roll are accumulated as angles and the model
//!   matrix is rebuilt from them every frame.
//! - **Axis-angle** (key `2`): each frame's per-axis increment becomes a
//!   quaternion that is multiplied onto a running model matrix.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pivot::{ViewerConfig, run};
//!
//! fn main() -> Result<(), pivot::ViewerError> {
//!     run(ViewerConfig::new().title("Helicopter").model("heli.obj"))
//! }
//! ```
//!
//! The orientation math is usable on its own:
//!
//! ```
//! use pivot::{EulerAngles, Mat4, compose_euler};
//!
//! assert_eq!(compose_euler(EulerAngles::ZERO), Mat4::IDENTITY);
//! ```

mod app;
mod bindings;
mod camera;
mod freelook_camera;
mod geometry;
mod gpu;
mod input;
mod mesh;
mod mesh_pass;
mod orientation;
mod texture;

pub use app::{FrameOutcome, MeshSource, Viewer, ViewerConfig, ViewerError, run};
pub use bindings::{
    Action, Axis, DEFAULT_BINDINGS, FrameInput, KeyBinding, KeyMap, KeyState, Sign, Trigger,
};
pub use camera::Camera;
pub use freelook_camera::{FreelookCamera, ViewMode};
pub use geometry::{GeometryError, GeometryOptions, RawGeometry};
pub use gpu::{GpuContext, GpuError};
pub use input::Input;
pub use mesh::{Mesh, Vertex3d};
pub use mesh_pass::{CameraUniforms, FrameMatrices, MeshPass, ModelUniforms};
pub use orientation::{
    AxisAngleDelta, AxisAngleEntry, EulerAngles, FrameDelta, OrientationConfig, OrientationState,
    RotationMode, axis_angle_quat, compose_axis_angle, compose_euler,
};
pub use texture::Texture;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec3};

// Re-export the key type used by bindings
pub use winit::keyboard::KeyCode;
