//! Model orientation: rotation composers and the per-frame accumulation state.
//!
//! Two input styles drive the model matrix:
//!
//! - **Euler**: absolute yaw/pitch/roll in radians. The matrix is rebuilt from the
//!   current angles every frame, so it never drifts.
//! - **Axis-angle**: small per-axis increments in degrees. Each frame's increment is
//!   turned into a quaternion and right-multiplied onto a running model matrix.
//!
//! The asymmetry is intentional: Euler input is stateless with respect to the
//! matrix, axis-angle input is incremental.
//!
//! # Example
//!
//! ```
//! use pivot::{AxisAngleDelta, FrameDelta, OrientationState, RotationMode};
//!
//! let mut orientation = OrientationState::new();
//! orientation.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
//! orientation.apply(&FrameDelta::axis(AxisAngleDelta::new(90.0, 0.0, 0.0)));
//!
//! let model = orientation.model_matrix();
//! assert!(model.abs_diff_eq(pivot::compose_axis_angle(AxisAngleDelta::new(90.0, 0.0, 0.0)), 1e-6));
//! ```

use std::fmt;
use std::ops::{Add, AddAssign};

use glam::{Mat4, Quat, Vec3, Vec4};
use tracing::info;

/// Which parameter set currently drives the model matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RotationMode {
    /// Absolute yaw/pitch/roll, recomputed every frame.
    #[default]
    Euler,
    /// Incremental quaternion rotations accumulated into a running matrix.
    AxisAngle,
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationMode::Euler => f.write_str("Euler"),
            RotationMode::AxisAngle => f.write_str("Axis-angle"),
        }
    }
}

/// Yaw, pitch and roll in radians. No wraparound is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EulerAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl EulerAngles {
    pub const ZERO: Self = Self {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    };

    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }
}

impl Add for EulerAngles {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.yaw + rhs.yaw, self.pitch + rhs.pitch, self.roll + rhs.roll)
    }
}

impl AddAssign for EulerAngles {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Per-axis rotation increments in **degrees** about the world X, Y and Z axes.
///
/// This is not a persistent axis: every nonzero component contributes its own
/// small rotation for the frame it is consumed in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisAngleDelta {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AxisAngleDelta {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for AxisAngleDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for AxisAngleDelta {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Builds a rotation matrix from yaw, pitch and roll.
///
/// The entries are written out in closed form. They equal
/// `Rz(yaw) * Ry(pitch) * Rx(roll)`: yaw about the model's up axis, then pitch,
/// then roll about the resulting forward axis. Columns are stored the way glam
/// stores them, so the result post-multiplies column vectors.
pub fn compose_euler(angles: EulerAngles) -> Mat4 {
    let (sy, cy) = angles.yaw.sin_cos();
    let (sp, cp) = angles.pitch.sin_cos();
    let (sr, cr) = angles.roll.sin_cos();

    Mat4::from_cols(
        Vec4::new(cy * cp, sy * cp, -sp, 0.0),
        Vec4::new(cy * sp * sr - sy * cr, sy * sp * sr + cy * cr, cp * sr, 0.0),
        Vec4::new(cy * sp * cr + sy * sr, sy * sp * cr - cy * sr, cp * cr, 0.0),
        Vec4::W,
    )
}

/// Unit quaternion for a rotation of `degrees` about a unit basis `axis`.
fn basis_quat(axis: Vec3, degrees: f32) -> Quat {
    let (s, c) = (degrees.to_radians() * 0.5).sin_cos();
    Quat::from_xyzw(axis.x * s, axis.y * s, axis.z * s, c)
}

/// Combines the per-axis increments into one normalized quaternion.
///
/// Order is fixed: X, then Y, then Z (`qx * qy * qz`). Quaternion products do not
/// commute, so changing the order changes the result.
pub fn axis_angle_quat(delta: AxisAngleDelta) -> Quat {
    let combined = [(Vec3::X, delta.x), (Vec3::Y, delta.y), (Vec3::Z, delta.z)]
        .into_iter()
        .filter(|(_, degrees)| *degrees != 0.0)
        .fold(Quat::IDENTITY, |acc, (axis, degrees)| {
            acc * basis_quat(axis, degrees)
        });

    let norm = Vec4::from(combined).length();
    if norm > 0.0 && norm.is_finite() {
        Quat::from_vec4(Vec4::from(combined) / norm)
    } else {
        // Degenerate product; fall back rather than divide by zero.
        Quat::IDENTITY
    }
}

/// Builds the rotation matrix for one frame's axis-angle increment.
///
/// `delta` is in degrees; conversion to radians happens here and nowhere upstream.
pub fn compose_axis_angle(delta: AxisAngleDelta) -> Mat4 {
    Mat4::from_quat(axis_angle_quat(delta))
}

/// What happens to the accumulated matrix when axis-angle mode is (re-)entered.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AxisAngleEntry {
    /// Start again from the identity matrix.
    #[default]
    Discard,
    /// Keep whatever was accumulated before leaving the mode.
    Preserve,
    /// Start from a fixed rotation, given as per-axis degrees.
    Preset(AxisAngleDelta),
}

/// Step sizes and re-entry policy for the orientation subsystem.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationConfig {
    /// Euler increment per held-key frame, in radians.
    pub euler_step: f32,
    /// Axis-angle increment per held-key frame, in degrees.
    pub axis_step_degrees: f32,
    /// Behavior of the accumulated matrix when entering axis-angle mode.
    pub axis_entry: AxisAngleEntry,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            euler_step: 0.5_f32.to_radians(),
            axis_step_degrees: 0.35,
            axis_entry: AxisAngleEntry::Discard,
        }
    }
}

impl OrientationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Euler step in degrees (stored in radians).
    pub fn euler_step_degrees(mut self, degrees: f32) -> Self {
        self.euler_step = degrees.to_radians();
        self
    }

    pub fn axis_step_degrees(mut self, degrees: f32) -> Self {
        self.axis_step_degrees = degrees;
        self
    }

    pub fn axis_entry(mut self, entry: AxisAngleEntry) -> Self {
        self.axis_entry = entry;
        self
    }
}

/// Everything the input mapper produced for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameDelta {
    /// Mode switch requested this frame, applied before any increment.
    pub switch_to: Option<RotationMode>,
    /// Reset the active mode's parameters.
    pub reset: bool,
    /// Euler increment (radians). Ignored outside Euler mode.
    pub euler: EulerAngles,
    /// Axis-angle increment (degrees). Ignored outside axis-angle mode.
    pub axis: AxisAngleDelta,
}

impl FrameDelta {
    pub fn switch_to(mode: RotationMode) -> Self {
        Self {
            switch_to: Some(mode),
            ..Default::default()
        }
    }

    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Default::default()
        }
    }

    pub fn euler(euler: EulerAngles) -> Self {
        Self {
            euler,
            ..Default::default()
        }
    }

    pub fn axis(axis: AxisAngleDelta) -> Self {
        Self {
            axis,
            ..Default::default()
        }
    }
}

/// Owned orientation state for the displayed model.
///
/// Only one parameter set is live at a time, chosen by [`RotationMode`]. The
/// other set is kept but ignored until its mode is entered again (which resets
/// it according to the entry rules).
#[derive(Clone, Debug)]
pub struct OrientationState {
    mode: RotationMode,
    euler: EulerAngles,
    pending: AxisAngleDelta,
    accumulated: Mat4,
    entry: AxisAngleEntry,
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            mode: RotationMode::Euler,
            euler: EulerAngles::ZERO,
            pending: AxisAngleDelta::ZERO,
            accumulated: Mat4::IDENTITY,
            entry: AxisAngleEntry::Discard,
        }
    }
}

impl OrientationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state that uses `entry` when axis-angle mode is entered.
    pub fn with_entry(entry: AxisAngleEntry) -> Self {
        Self {
            entry,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    pub fn euler_angles(&self) -> EulerAngles {
        self.euler
    }

    /// The running axis-angle product, whether or not it is currently live.
    pub fn accumulated(&self) -> Mat4 {
        self.accumulated
    }

    /// Enter `mode`, resetting its parameters.
    ///
    /// Entering Euler zeroes the angles. Entering axis-angle zeroes the pending
    /// increment and rebuilds the accumulated matrix from the entry policy.
    pub fn switch_to(&mut self, mode: RotationMode) {
        match mode {
            RotationMode::Euler => {
                self.euler = EulerAngles::ZERO;
            }
            RotationMode::AxisAngle => {
                self.pending = AxisAngleDelta::ZERO;
                match self.entry {
                    AxisAngleEntry::Discard => self.accumulated = Mat4::IDENTITY,
                    AxisAngleEntry::Preserve => {}
                    AxisAngleEntry::Preset(preset) => {
                        self.accumulated = compose_axis_angle(preset);
                    }
                }
            }
        }
        info!(from = %self.mode, to = %mode, "rotation mode entered");
        self.mode = mode;
    }

    /// Reset the live parameter set to its neutral value.
    ///
    /// Unlike [`switch_to`](Self::switch_to), this ignores the entry policy: the
    /// accumulated matrix always returns to identity.
    pub fn reset(&mut self) {
        match self.mode {
            RotationMode::Euler => self.euler = EulerAngles::ZERO,
            RotationMode::AxisAngle => {
                self.pending = AxisAngleDelta::ZERO;
                self.accumulated = Mat4::IDENTITY;
            }
        }
    }

    /// Apply one frame of input.
    ///
    /// Order: mode switch, reset, then the increment for whichever mode is live.
    pub fn apply(&mut self, delta: &FrameDelta) {
        if let Some(mode) = delta.switch_to {
            self.switch_to(mode);
        }
        if delta.reset {
            self.reset();
        }

        match self.mode {
            RotationMode::Euler => {
                self.euler += delta.euler;
            }
            RotationMode::AxisAngle => {
                self.pending += delta.axis;
                if !self.pending.is_zero() {
                    self.accumulated *= compose_axis_angle(self.pending);
                }
                self.pending = AxisAngleDelta::ZERO;
            }
        }
    }

    /// The matrix to upload as the model uniform this frame.
    ///
    /// Pure read: calling it repeatedly without [`apply`](Self::apply) in between
    /// returns the same matrix.
    pub fn model_matrix(&self) -> Mat4 {
        match self.mode {
            RotationMode::Euler => compose_euler(self.euler),
            RotationMode::AxisAngle => self.accumulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPSILON: f32 = 1e-5;

    fn assert_mat_eq(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, EPSILON), "\n{a:?}\n!=\n{b:?}");
    }

    fn assert_orthonormal(m: Mat4) {
        let cols = [m.x_axis.truncate(), m.y_axis.truncate(), m.z_axis.truncate()];
        for (i, a) in cols.iter().enumerate() {
            assert!((a.length() - 1.0).abs() < EPSILON, "column {i} length {}", a.length());
            for b in cols.iter().skip(i + 1) {
                assert!(a.dot(*b).abs() < EPSILON, "columns not perpendicular: {a} {b}");
            }
        }
        assert_eq!(m.w_axis, Vec4::W);
    }

    #[test]
    fn euler_zero_is_exact_identity() {
        assert_eq!(compose_euler(EulerAngles::ZERO), Mat4::IDENTITY);
    }

    #[test]
    fn euler_is_orthonormal_across_inputs() {
        let samples = [-7.3, -PI, -1.0, -0.25, 0.0, 0.1, 0.5, FRAC_PI_2, 2.9, 12.0];
        for &yaw in &samples {
            for &pitch in &samples {
                for &roll in &samples {
                    assert_orthonormal(compose_euler(EulerAngles::new(yaw, pitch, roll)));
                }
            }
        }
    }

    #[test]
    fn euler_matches_yaw_pitch_roll_product() {
        let angles = EulerAngles::new(0.7, -0.4, 1.9);
        let expected = Mat4::from_rotation_z(angles.yaw)
            * Mat4::from_rotation_y(angles.pitch)
            * Mat4::from_rotation_x(angles.roll);
        assert_mat_eq(compose_euler(angles), expected);
    }

    #[test]
    fn euler_nan_propagates() {
        let m = compose_euler(EulerAngles::new(f32::NAN, 0.0, 0.0));
        assert!(m.x_axis.x.is_nan());
    }

    #[test]
    fn axis_angle_zero_is_identity() {
        assert_eq!(axis_angle_quat(AxisAngleDelta::ZERO), Quat::IDENTITY);
        assert_mat_eq(compose_axis_angle(AxisAngleDelta::ZERO), Mat4::IDENTITY);
    }

    #[test]
    fn axis_angle_single_axis_matches_glam() {
        assert_mat_eq(
            compose_axis_angle(AxisAngleDelta::new(30.0, 0.0, 0.0)),
            Mat4::from_rotation_x(30.0_f32.to_radians()),
        );
        assert_mat_eq(
            compose_axis_angle(AxisAngleDelta::new(0.0, -45.0, 0.0)),
            Mat4::from_rotation_y(-45.0_f32.to_radians()),
        );
        assert_mat_eq(
            compose_axis_angle(AxisAngleDelta::new(0.0, 0.0, 120.0)),
            Mat4::from_rotation_z(120.0_f32.to_radians()),
        );
    }

    #[test]
    fn axis_angle_quaternion_is_unit() {
        let q = axis_angle_quat(AxisAngleDelta::new(17.0, -203.0, 71.5));
        assert!((q.length() - 1.0).abs() < 1e-6);
        assert_orthonormal(compose_axis_angle(AxisAngleDelta::new(17.0, -203.0, 71.5)));
    }

    #[test]
    fn two_quarter_turns_about_x_make_a_half_turn() {
        let quarter = compose_axis_angle(AxisAngleDelta::new(90.0, 0.0, 0.0));
        let accumulated = Mat4::IDENTITY * quarter * quarter;
        assert_mat_eq(accumulated, Mat4::from_rotation_x(PI));
    }

    #[test]
    fn axis_order_is_x_then_y_then_z() {
        let combined = compose_axis_angle(AxisAngleDelta::new(90.0, 90.0, 0.0));
        let x = compose_axis_angle(AxisAngleDelta::new(90.0, 0.0, 0.0));
        let y = compose_axis_angle(AxisAngleDelta::new(0.0, 90.0, 0.0));

        assert_mat_eq(combined, x * y);
        assert!(!combined.abs_diff_eq(y * x, EPSILON));
    }

    #[test]
    fn starts_in_euler_with_identity() {
        let state = OrientationState::new();
        assert_eq!(state.mode(), RotationMode::Euler);
        assert_eq!(state.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn euler_increments_add_and_recompute() {
        let mut state = OrientationState::new();
        state.apply(&FrameDelta::euler(EulerAngles::new(0.1, 0.0, 0.0)));
        state.apply(&FrameDelta::euler(EulerAngles::new(0.1, -0.2, 0.3)));

        let angles = state.euler_angles();
        assert!((angles.yaw - 0.2).abs() < 1e-6);
        assert!((angles.pitch + 0.2).abs() < 1e-6);
        assert!((angles.roll - 0.3).abs() < 1e-6);
        assert_eq!(state.model_matrix(), compose_euler(angles));
    }

    #[test]
    fn euler_mode_ignores_axis_increments() {
        let mut state = OrientationState::new();
        state.apply(&FrameDelta::axis(AxisAngleDelta::new(45.0, 0.0, 0.0)));
        assert_eq!(state.model_matrix(), Mat4::IDENTITY);
        assert_eq!(state.accumulated(), Mat4::IDENTITY);
    }

    #[test]
    fn axis_angle_right_multiplies_each_frame() {
        let mut state = OrientationState::new();
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));

        let first = AxisAngleDelta::new(30.0, 0.0, 0.0);
        let second = AxisAngleDelta::new(0.0, 0.0, 50.0);
        state.apply(&FrameDelta::axis(first));
        state.apply(&FrameDelta::axis(second));

        assert_mat_eq(
            state.model_matrix(),
            compose_axis_angle(first) * compose_axis_angle(second),
        );
    }

    #[test]
    fn axis_angle_frame_without_input_keeps_matrix() {
        let mut state = OrientationState::new();
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        state.apply(&FrameDelta::axis(AxisAngleDelta::new(10.0, 20.0, 30.0)));
        let before = state.model_matrix();

        state.apply(&FrameDelta::default());
        assert_eq!(state.model_matrix(), before);
    }

    #[test]
    fn round_trip_through_euler_discards_accumulation() {
        let mut state = OrientationState::new();
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        state.apply(&FrameDelta::axis(AxisAngleDelta::new(40.0, 10.0, 0.0)));
        assert!(!state.model_matrix().abs_diff_eq(Mat4::IDENTITY, EPSILON));

        state.apply(&FrameDelta::switch_to(RotationMode::Euler));
        assert_eq!(state.model_matrix(), Mat4::IDENTITY);

        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        assert_eq!(state.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn switching_to_euler_zeroes_angles() {
        let mut state = OrientationState::new();
        state.apply(&FrameDelta::euler(EulerAngles::new(1.0, 2.0, 3.0)));
        state.apply(&FrameDelta::switch_to(RotationMode::Euler));
        assert_eq!(state.euler_angles(), EulerAngles::ZERO);
        assert_eq!(state.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn preserve_policy_keeps_accumulation() {
        let mut state = OrientationState::with_entry(AxisAngleEntry::Preserve);
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        state.apply(&FrameDelta::axis(AxisAngleDelta::new(0.0, 25.0, 0.0)));
        let kept = state.model_matrix();

        state.apply(&FrameDelta::switch_to(RotationMode::Euler));
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        assert_eq!(state.model_matrix(), kept);
    }

    #[test]
    fn preset_policy_seeds_accumulation() {
        let preset = AxisAngleDelta::new(0.0, 0.0, 90.0);
        let mut state = OrientationState::with_entry(AxisAngleEntry::Preset(preset));
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        assert_mat_eq(state.model_matrix(), compose_axis_angle(preset));
    }

    #[test]
    fn reset_ignores_entry_policy() {
        let mut state = OrientationState::with_entry(AxisAngleEntry::Preserve);
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        state.apply(&FrameDelta::axis(AxisAngleDelta::new(5.0, 5.0, 5.0)));
        state.apply(&FrameDelta::reset());
        assert_eq!(state.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn switch_applies_before_increment() {
        let mut state = OrientationState::new();
        let delta = FrameDelta {
            switch_to: Some(RotationMode::AxisAngle),
            axis: AxisAngleDelta::new(90.0, 0.0, 0.0),
            ..Default::default()
        };
        state.apply(&delta);
        assert_mat_eq(state.model_matrix(), Mat4::from_rotation_x(FRAC_PI_2));
    }

    #[test]
    fn model_matrix_is_idempotent() {
        let mut state = OrientationState::new();
        state.apply(&FrameDelta::switch_to(RotationMode::AxisAngle));
        state.apply(&FrameDelta::axis(AxisAngleDelta::new(3.0, 4.0, 5.0)));
        assert_eq!(state.model_matrix(), state.model_matrix());
    }
}
