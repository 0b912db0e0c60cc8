use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::bindings::KeyMap;
use crate::freelook_camera::{FreelookCamera, ViewMode};
use crate::geometry::{GeometryError, GeometryOptions, RawGeometry};
use crate::gpu::{GpuContext, GpuError};
use crate::input::Input;
use crate::mesh::Mesh;
use crate::mesh_pass::{FrameMatrices, MeshPass};
use crate::orientation::{OrientationConfig, OrientationState, RotationMode};
use crate::texture::Texture;

/// Fatal viewer failures.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("failed to load mesh {}: {source}", path.display())]
    Geometry {
        path: PathBuf,
        #[source]
        source: GeometryError,
    },
    #[error("failed to load texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("ran out of GPU memory while presenting")]
    OutOfMemory,
}

/// Which mesh the viewer shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MeshSource {
    /// Built-in unit cube.
    #[default]
    Cube,
    /// A model file, prepared with the given options.
    File {
        path: PathBuf,
        options: GeometryOptions,
    },
}

impl MeshSource {
    pub fn load(&self) -> Result<RawGeometry, ViewerError> {
        match self {
            MeshSource::Cube => Ok(RawGeometry::cube()),
            MeshSource::File { path, options } => {
                let mut geometry =
                    RawGeometry::from_file(path).map_err(|source| ViewerError::Geometry {
                        path: path.clone(),
                        source,
                    })?;
                options.apply(&mut geometry);
                Ok(geometry)
            }
        }
    }
}

/// Viewer settings, built with a fluent API.
///
/// # Example
/// ```
/// use pivot::{AxisAngleEntry, OrientationConfig, ViewerConfig};
///
/// let config = ViewerConfig::new()
///     .title("Helicopter")
///     .size(1280, 720)
///     .model("heli.stl")
///     .orientation(OrientationConfig::new().axis_entry(AxisAngleEntry::Preserve));
/// assert_eq!(config.width, 1280);
/// ```
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub mesh: MeshSource,
    pub texture: Option<PathBuf>,
    pub clear_color: wgpu::Color,
    pub mesh_color: [f32; 4],
    pub orientation: OrientationConfig,
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub fov_degrees: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Pivot".to_string(),
            width: 800,
            height: 600,
            mesh: MeshSource::Cube,
            texture: None,
            clear_color: wgpu::Color {
                r: 0.45,
                g: 0.78,
                b: 0.9,
                a: 1.0,
            },
            mesh_color: [0.85, 0.85, 0.85, 1.0],
            orientation: OrientationConfig::default(),
            camera_speed: 3.0,
            mouse_sensitivity: 0.003,
            fov_degrees: 45.0,
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Show a model file with the default preparation (centered, unit size).
    pub fn model(mut self, path: impl Into<PathBuf>) -> Self {
        self.mesh = MeshSource::File {
            path: path.into(),
            options: GeometryOptions::default(),
        };
        self
    }

    pub fn mesh(mut self, mesh: MeshSource) -> Self {
        self.mesh = mesh;
        self
    }

    pub fn texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture = Some(path.into());
        self
    }

    pub fn orientation(mut self, orientation: OrientationConfig) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn camera_speed(mut self, speed: f32) -> Self {
        self.camera_speed = speed;
        self
    }

    pub fn mouse_sensitivity(mut self, sensitivity: f32) -> Self {
        self.mouse_sensitivity = sensitivity;
        self
    }

    pub fn fov(mut self, degrees: f32) -> Self {
        self.fov_degrees = degrees;
        self
    }

    fn window_title(&self, mode: RotationMode, view: ViewMode) -> String {
        let view = match view {
            ViewMode::FirstPerson => "first person",
            ViewMode::Locked => "locked view",
        };
        format!("{} | {} rotation | {}", self.title, mode, view)
    }
}

/// Per-frame update: input → orientation → camera.
///
/// Kept separate from rendering so the whole frame step runs without a GPU.
#[derive(Debug)]
pub struct Viewer {
    pub orientation: OrientationState,
    pub camera: FreelookCamera,
    keymap: KeyMap,
    config: OrientationConfig,
}

/// What the event loop should do after a frame update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub quit: bool,
    /// The rotation mode or view mode changed this frame.
    pub status_changed: bool,
}

impl Viewer {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            orientation: OrientationState::with_entry(config.orientation.axis_entry),
            camera: FreelookCamera::new()
                .speed(config.camera_speed)
                .sensitivity(config.mouse_sensitivity)
                .fov(config.fov_degrees),
            keymap: KeyMap::default(),
            config: config.orientation,
        }
    }

    /// Run the update half of a frame. `dt` only affects camera movement.
    pub fn update(&mut self, input: &Input, dt: f32) -> FrameOutcome {
        let frame = self
            .keymap
            .poll(input, self.orientation.mode(), &self.config);
        let before = self.orientation.mode();

        self.orientation.apply(&frame.delta);

        let mut status_changed = self.orientation.mode() != before;
        if frame.delta.reset {
            info!(mode = %self.orientation.mode(), "orientation reset");
        }
        if frame.toggle_view {
            let view = self.camera.toggle_view();
            info!(?view, "camera view toggled");
            status_changed = true;
        }

        self.camera.update(input, dt);

        FrameOutcome {
            quit: frame.quit,
            status_changed,
        }
    }

    /// Matrices for the render step, read after [`update`](Self::update).
    pub fn frame_matrices(&self, aspect: f32, time: f32) -> FrameMatrices {
        let camera = self.camera.camera();
        FrameMatrices {
            model: self.orientation.model_matrix(),
            view: camera.view_matrix(),
            projection: camera.projection_matrix(aspect),
            camera_position: camera.position,
            time,
        }
    }
}

/// Open the viewer window and run until it is closed.
pub fn run(config: ViewerConfig) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::Pending {
        config: Some(config),
    };
    event_loop.run_app(&mut app)?;

    match app {
        ViewerApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

enum ViewerApp {
    Pending {
        config: Option<ViewerConfig>,
    },
    Running(Box<Running>),
    Failed(ViewerError),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    mesh: Mesh,
    mesh_pass: MeshPass,
    viewer: Viewer,
    input: Input,
    config: ViewerConfig,
    start_time: Instant,
    last_frame: Instant,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: ViewerConfig) -> Result<Self, ViewerError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContext::new(window.clone())?;

        let geometry = config.mesh.load()?;
        info!(
            triangles = geometry.triangle_count(),
            source = ?config.mesh,
            "mesh loaded"
        );
        if config.texture.is_some() && !geometry.has_uvs() {
            warn!(
                source = ?config.mesh,
                "mesh has no texture coordinates, texture will show as a flat color"
            );
        }
        let mesh = geometry.upload(&gpu);

        let mut mesh_pass = MeshPass::new(&gpu);
        if let Some(path) = &config.texture {
            let texture = Texture::from_file(&gpu, path).map_err(|source| ViewerError::Texture {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), width = texture.width, height = texture.height, "texture loaded");
            mesh_pass.set_texture(&gpu, &texture);
        }

        grab_cursor(&window);

        let viewer = Viewer::new(&config);
        window.set_title(&config.window_title(viewer.orientation.mode(), viewer.camera.view_mode()));

        Ok(Self {
            window,
            gpu,
            mesh,
            mesh_pass,
            viewer,
            input: Input::new(),
            config,
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }

    /// One update-then-render cycle. Returns `Ok(false)` when the viewer should close.
    fn frame(&mut self) -> Result<bool, ViewerError> {
        let now = Instant::now();
        let time = self.start_time.elapsed().as_secs_f32();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let outcome = self.viewer.update(&self.input, dt);
        self.input.begin_frame();
        if outcome.quit {
            return Ok(false);
        }
        if outcome.status_changed {
            self.window.set_title(&self.config.window_title(
                self.viewer.orientation.mode(),
                self.viewer.camera.view_mode(),
            ));
        }

        let matrices = self.viewer.frame_matrices(self.gpu.aspect(), time);
        match self.mesh_pass.draw_frame(
            &self.gpu,
            &self.mesh,
            &matrices,
            self.config.clear_color,
            self.config.mesh_color,
        ) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(ViewerError::OutOfMemory),
            Err(e) => warn!(error = %e, "skipping frame"),
        }

        Ok(true)
    }
}

fn grab_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(e) = grabbed {
        warn!(error = %e, "cursor grab unavailable, mouse look may stop at window edges");
    }
    window.set_cursor_visible(false);
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ViewerApp::Pending { config } = self else {
            return;
        };
        let Some(config) = config.take() else {
            return;
        };

        *self = match Running::start(event_loop, config) {
            Ok(running) => {
                running.window.request_redraw();
                ViewerApp::Running(Box::new(running))
            }
            Err(err) => {
                event_loop.exit();
                ViewerApp::Failed(err)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ViewerApp::Running(running) = self else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => match running.frame() {
                Ok(true) => running.window.request_redraw(),
                Ok(false) => event_loop.exit(),
                Err(err) => {
                    event_loop.exit();
                    *self = ViewerApp::Failed(err);
                }
            },
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let ViewerApp::Running(running) = self {
            running.input.handle_device_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use winit::keyboard::KeyCode;

    fn tap(viewer: &mut Viewer, input: &mut Input, key: KeyCode) -> FrameOutcome {
        input.press(key);
        let outcome = viewer.update(input, 0.016);
        input.begin_frame();
        input.release(key);
        input.begin_frame();
        outcome
    }

    #[test]
    fn holding_rotation_keys_turns_the_model() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        let mut input = Input::new();
        input.press(KeyCode::KeyU);

        for _ in 0..10 {
            viewer.update(&input, 0.016);
            input.begin_frame();
        }

        let yaw = viewer.orientation.euler_angles().yaw;
        assert!((yaw - 10.0 * 0.5_f32.to_radians()).abs() < 1e-5);
        assert!(!viewer.orientation.model_matrix().abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn mode_keys_switch_and_reset() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        let mut input = Input::new();

        let outcome = tap(&mut viewer, &mut input, KeyCode::Digit2);
        assert!(outcome.status_changed);
        assert_eq!(viewer.orientation.mode(), RotationMode::AxisAngle);

        input.press(KeyCode::KeyI);
        viewer.update(&input, 0.016);
        input.begin_frame();
        input.release(KeyCode::KeyI);
        assert!(!viewer.orientation.model_matrix().abs_diff_eq(Mat4::IDENTITY, 1e-5));

        tap(&mut viewer, &mut input, KeyCode::Digit1);
        tap(&mut viewer, &mut input, KeyCode::Digit2);
        assert_eq!(viewer.orientation.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn view_toggle_and_quit_are_reported() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        let mut input = Input::new();

        let outcome = tap(&mut viewer, &mut input, KeyCode::Digit3);
        assert!(outcome.status_changed);
        assert_eq!(viewer.camera.view_mode(), ViewMode::Locked);

        let outcome = tap(&mut viewer, &mut input, KeyCode::Escape);
        assert!(outcome.quit);
    }

    #[test]
    fn frame_matrices_carry_the_model_matrix() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        let mut input = Input::new();
        input.press(KeyCode::KeyO);
        viewer.update(&input, 0.016);

        let matrices = viewer.frame_matrices(4.0 / 3.0, 0.0);
        assert_eq!(matrices.model, viewer.orientation.model_matrix());
        assert_eq!(matrices.camera_position, viewer.camera.camera().position);
    }

    #[test]
    fn window_title_names_mode_and_view() {
        let config = ViewerConfig::new().title("Heli");
        let title = config.window_title(RotationMode::AxisAngle, ViewMode::Locked);
        assert_eq!(title, "Heli | Axis-angle rotation | locked view");
    }

    #[test]
    fn missing_model_reports_path() {
        let source = MeshSource::File {
            path: PathBuf::from("does-not-exist.stl"),
            options: GeometryOptions::default(),
        };
        let err = source.load().unwrap_err();
        assert!(err.to_string().contains("does-not-exist.stl"), "{err}");
    }
}
