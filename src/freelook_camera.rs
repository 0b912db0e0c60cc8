//! A first-person fly camera with a lockable view.
//!
//! [`FreelookCamera`] has two view modes:
//!
//! - **FirstPerson**: WASD moves, the mouse looks around, the scroll wheel zooms.
//! - **Locked**: the camera sits at its home pose and ignores movement and look
//!   input. Zoom still works.
//!
//! The viewer toggles between them with a key binding; the orientation of the
//! model is unaffected by either mode.
//!
//! # Example
//!
//! ```
//! use pivot::{FreelookCamera, Input, ViewMode};
//!
//! let mut camera = FreelookCamera::new().position([0.0, 0.0, 3.0]).speed(3.0);
//! let input = Input::new();
//!
//! // In the frame loop:
//! camera.update(&input, 1.0 / 60.0);
//! let snapshot = camera.camera();
//! assert_eq!(camera.view_mode(), ViewMode::FirstPerson);
//! # let _ = snapshot;
//! ```

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::input::Input;

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;
const MIN_FOV_DEGREES: f32 = 1.0;
const MAX_FOV_DEGREES: f32 = 45.0;

/// Whether the camera follows user input or stays at its home pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    FirstPerson,
    Locked,
}

/// The pose the camera returns to while locked.
#[derive(Clone, Copy, Debug, PartialEq)]
struct HomePose {
    position: Vec3,
    yaw: f32,
    pitch: f32,
}

/// A first-person camera controller.
///
/// # Controls (first person)
///
/// - **W/S**: Move forward/backward
/// - **A/D**: Strafe left/right
/// - **Mouse**: Look around
/// - **Scroll**: Zoom (narrows the field of view)
#[derive(Clone, Debug)]
pub struct FreelookCamera {
    /// Current camera position.
    pub position: Vec3,
    /// Horizontal angle in radians. 0 = looking toward -Z.
    pub yaw: f32,
    /// Vertical angle in radians. 0 = horizontal, positive = up.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Radians of turn per pixel of mouse motion.
    pub sensitivity: f32,
    /// Movement speed in units per second.
    pub speed: f32,
    pub near: f32,
    pub far: f32,
    view_mode: ViewMode,
    home: HomePose,
}

impl Default for FreelookCamera {
    fn default() -> Self {
        let position = Vec3::new(0.0, 0.0, 3.0);
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: MAX_FOV_DEGREES.to_radians(),
            sensitivity: 0.003,
            speed: 3.0,
            near: 0.1,
            far: 100.0,
            view_mode: ViewMode::FirstPerson,
            home: HomePose {
                position,
                yaw: 0.0,
                pitch: 0.0,
            },
        }
    }
}

impl FreelookCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the camera position. This also becomes the home position.
    pub fn position(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self.home.position = self.position;
        self
    }

    /// Set the field of view in degrees, clamped to the zoom range.
    pub fn fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees
            .clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES)
            .to_radians();
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Flip between first-person and locked view.
    ///
    /// Locking snaps to the home pose. Unlocking resumes from there.
    pub fn toggle_view(&mut self) -> ViewMode {
        self.view_mode = match self.view_mode {
            ViewMode::FirstPerson => {
                self.position = self.home.position;
                self.yaw = self.home.yaw;
                self.pitch = self.home.pitch;
                ViewMode::Locked
            }
            ViewMode::Locked => ViewMode::FirstPerson,
        };
        self.view_mode
    }

    fn forward_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
        .normalize_or_zero()
    }

    fn right_direction(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin()).normalize_or_zero()
    }

    /// Update the camera from this frame's input. `dt` is in seconds.
    pub fn update(&mut self, input: &Input, dt: f32) {
        let zoom = input.scroll_delta().y;
        if zoom != 0.0 {
            let degrees = (self.fov.to_degrees() - zoom).clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES);
            self.fov = degrees.to_radians();
        }

        if self.view_mode == ViewMode::Locked {
            return;
        }

        let delta = input.mouse_delta();
        self.yaw += delta.x * self.sensitivity;
        self.pitch = (self.pitch - delta.y * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let forward = self.forward_direction();
        let right = self.right_direction();
        let mut velocity = Vec3::ZERO;

        if input.key_down(KeyCode::KeyW) {
            velocity += forward;
        }
        if input.key_down(KeyCode::KeyS) {
            velocity -= forward;
        }
        if input.key_down(KeyCode::KeyA) {
            velocity -= right;
        }
        if input.key_down(KeyCode::KeyD) {
            velocity += right;
        }

        if velocity.length_squared() > 0.0 {
            self.position += velocity.normalize() * self.speed * dt;
        }
    }

    /// Get the current camera state.
    pub fn camera(&self) -> Camera {
        Camera {
            position: self.position,
            forward: self.forward_direction(),
            up: Vec3::Y,
            fov: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn starts_looking_down_negative_z() {
        let camera = FreelookCamera::new();
        assert!(approx(camera.camera().forward, Vec3::NEG_Z));
        assert!(approx(camera.camera().position, Vec3::new(0.0, 0.0, 3.0)));
    }

    #[test]
    fn w_moves_forward_at_speed() {
        let mut camera = FreelookCamera::new().speed(2.0);
        let mut input = Input::new();
        input.press(KeyCode::KeyW);

        camera.update(&input, 0.5);
        assert!(approx(camera.position, Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn strafing_moves_along_right() {
        let mut camera = FreelookCamera::new().speed(1.0);
        let mut input = Input::new();
        input.press(KeyCode::KeyD);

        camera.update(&input, 1.0);
        assert!(approx(camera.position, Vec3::new(1.0, 0.0, 3.0)));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = FreelookCamera::new().sensitivity(0.01);
        let mut input = Input::new();
        input.move_mouse(Vec2::new(0.0, -10_000.0));

        camera.update(&input, 0.016);
        assert!((camera.pitch - PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn locked_view_ignores_look_and_move() {
        let mut camera = FreelookCamera::new();
        let mut input = Input::new();
        input.press(KeyCode::KeyW);
        input.move_mouse(Vec2::new(200.0, 50.0));
        camera.update(&input, 1.0);
        assert!(!approx(camera.position, Vec3::new(0.0, 0.0, 3.0)));

        assert_eq!(camera.toggle_view(), ViewMode::Locked);
        assert!(approx(camera.position, Vec3::new(0.0, 0.0, 3.0)));
        assert_eq!(camera.yaw, 0.0);

        camera.update(&input, 1.0);
        assert!(approx(camera.position, Vec3::new(0.0, 0.0, 3.0)));
        assert!(approx(camera.camera().forward, Vec3::NEG_Z));

        assert_eq!(camera.toggle_view(), ViewMode::FirstPerson);
    }

    #[test]
    fn scroll_zoom_stays_in_range() {
        let mut camera = FreelookCamera::new();
        let mut input = Input::new();

        input.scroll(Vec2::new(0.0, 100.0));
        camera.update(&input, 0.016);
        assert!((camera.fov.to_degrees() - MIN_FOV_DEGREES).abs() < 1e-4);

        input.begin_frame();
        input.scroll(Vec2::new(0.0, -100.0));
        camera.update(&input, 0.016);
        assert!((camera.fov.to_degrees() - MAX_FOV_DEGREES).abs() < 1e-4);
    }
}
