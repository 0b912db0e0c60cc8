//! Declarative key table mapping keyboard state to per-frame orientation input.
//!
//! Physical keys never reach the rotation math directly. Each [`KeyBinding`]
//! names a key, when it fires and what it does; [`KeyMap::poll`] walks the table
//! once per frame and folds everything that fired into a [`FrameInput`].
//!
//! # Default layout
//!
//! | Key     | Euler mode   | Axis-angle mode | Trigger |
//! |---------|--------------|-----------------|---------|
//! | U / J   | yaw + / -    | X + / -         | held    |
//! | I / K   | pitch + / -  | Y + / -         | held    |
//! | O / L   | roll + / -   | Z + / -         | held    |
//! | 1       | switch to Euler              || pressed |
//! | 2       | switch to axis-angle         || pressed |
//! | 3       | toggle camera view lock      || pressed |
//! | R       | reset active mode            || pressed |
//! | Escape  | quit                         || pressed |
//!
//! Camera movement (WASD) is read by the camera controller itself.

use winit::keyboard::KeyCode;

use crate::orientation::{
    AxisAngleDelta, EulerAngles, FrameDelta, OrientationConfig, RotationMode,
};

use Axis::{X, Y, Z};
use RotationMode::{AxisAngle, Euler};
use Sign::{Negative, Positive};

/// Read-only view of which keys are held or were just pressed.
pub trait KeyState {
    fn is_down(&self, key: KeyCode) -> bool;
    fn was_pressed(&self, key: KeyCode) -> bool;
}

/// Rotation axis slot. In Euler mode X, Y and Z are yaw, pitch and roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    pub fn factor(self) -> f32 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }
}

/// When a binding fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Every frame while the key is down.
    Held,
    /// Once, on the frame the key goes down.
    Pressed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Step one axis of the given mode. Ignored while another mode is active.
    Rotate {
        axis: Axis,
        sign: Sign,
        mode: RotationMode,
    },
    SwitchMode(RotationMode),
    Reset,
    ToggleView,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub trigger: Trigger,
    pub action: Action,
}

impl KeyBinding {
    pub const fn held(key: KeyCode, action: Action) -> Self {
        Self {
            key,
            trigger: Trigger::Held,
            action,
        }
    }

    pub const fn pressed(key: KeyCode, action: Action) -> Self {
        Self {
            key,
            trigger: Trigger::Pressed,
            action,
        }
    }

    fn fired(&self, keys: &impl KeyState) -> bool {
        match self.trigger {
            Trigger::Held => keys.is_down(self.key),
            Trigger::Pressed => keys.was_pressed(self.key),
        }
    }
}

const fn rotate(axis: Axis, sign: Sign, mode: RotationMode) -> Action {
    Action::Rotate { axis, sign, mode }
}

pub const DEFAULT_BINDINGS: &[KeyBinding] = &[
    KeyBinding::held(KeyCode::KeyU, rotate(X, Positive, Euler)),
    KeyBinding::held(KeyCode::KeyJ, rotate(X, Negative, Euler)),
    KeyBinding::held(KeyCode::KeyI, rotate(Y, Positive, Euler)),
    KeyBinding::held(KeyCode::KeyK, rotate(Y, Negative, Euler)),
    KeyBinding::held(KeyCode::KeyO, rotate(Z, Positive, Euler)),
    KeyBinding::held(KeyCode::KeyL, rotate(Z, Negative, Euler)),
    KeyBinding::held(KeyCode::KeyU, rotate(X, Positive, AxisAngle)),
    KeyBinding::held(KeyCode::KeyJ, rotate(X, Negative, AxisAngle)),
    KeyBinding::held(KeyCode::KeyI, rotate(Y, Positive, AxisAngle)),
    KeyBinding::held(KeyCode::KeyK, rotate(Y, Negative, AxisAngle)),
    KeyBinding::held(KeyCode::KeyO, rotate(Z, Positive, AxisAngle)),
    KeyBinding::held(KeyCode::KeyL, rotate(Z, Negative, AxisAngle)),
    KeyBinding::pressed(KeyCode::Digit1, Action::SwitchMode(Euler)),
    KeyBinding::pressed(KeyCode::Digit2, Action::SwitchMode(AxisAngle)),
    KeyBinding::pressed(KeyCode::Digit3, Action::ToggleView),
    KeyBinding::pressed(KeyCode::KeyR, Action::Reset),
    KeyBinding::pressed(KeyCode::Escape, Action::Quit),
];

/// Everything the key table produced for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub delta: FrameDelta,
    pub toggle_view: bool,
    pub quit: bool,
}

/// A key table plus the logic to evaluate it.
#[derive(Clone, Debug)]
pub struct KeyMap {
    bindings: Vec<KeyBinding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new(DEFAULT_BINDINGS.to_vec())
    }
}

impl KeyMap {
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self { bindings }
    }

    /// Evaluate the table against `keys` for a frame spent in `mode`.
    ///
    /// Rotation steps come from `config`: radians for Euler bindings, degrees for
    /// axis-angle bindings. If several switch bindings fire in one frame, the
    /// last one in table order wins.
    pub fn poll(
        &self,
        keys: &impl KeyState,
        mode: RotationMode,
        config: &OrientationConfig,
    ) -> FrameInput {
        let mut input = FrameInput::default();
        let mut euler = EulerAngles::ZERO;
        let mut axis = AxisAngleDelta::ZERO;

        for binding in self.bindings.iter().filter(|b| b.fired(keys)) {
            match binding.action {
                Action::Rotate {
                    axis: slot,
                    sign,
                    mode: binding_mode,
                } => {
                    if binding_mode != mode {
                        continue;
                    }
                    match binding_mode {
                        RotationMode::Euler => {
                            let step = sign.factor() * config.euler_step;
                            match slot {
                                Axis::X => euler.yaw += step,
                                Axis::Y => euler.pitch += step,
                                Axis::Z => euler.roll += step,
                            }
                        }
                        RotationMode::AxisAngle => {
                            let step = sign.factor() * config.axis_step_degrees;
                            match slot {
                                Axis::X => axis.x += step,
                                Axis::Y => axis.y += step,
                                Axis::Z => axis.z += step,
                            }
                        }
                    }
                }
                Action::SwitchMode(target) => input.delta.switch_to = Some(target),
                Action::Reset => input.delta.reset = true,
                Action::ToggleView => input.toggle_view = true,
                Action::Quit => input.quit = true,
            }
        }

        input.delta.euler = euler;
        input.delta.axis = axis;
        input
    }
}
