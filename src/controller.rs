//! Operator controller input.
//!
//! Controller state lives in a per-thread table keyed by driver station port.
//! On a real robot the table is fed by the driver station; in simulation and
//! tests it is written through [`Controller::set_button`] and
//! [`Controller::set_axis`].

use std::cell::RefCell;

use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

#[derive(Default)]
struct HidState {
    buttons: HashMap<(u8, Button), bool>,
    axes: HashMap<(u8, Axis), f64>,
}

thread_local! {
    static HID: RefCell<HidState> = RefCell::default();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controller {
    port: u8,
}

impl Controller {
    pub const fn new(port: u8) -> Self {
        Self { port }
    }

    pub const fn port(&self) -> u8 {
        self.port
    }

    pub fn button(&self, button: Button) -> bool {
        HID.with(|hid| {
            hid.borrow()
                .buttons
                .get(&(self.port, button))
                .copied()
                .unwrap_or(false)
        })
    }

    /// Axis value in `[-1, 1]`.
    pub fn axis(&self, axis: Axis) -> f64 {
        HID.with(|hid| {
            hid.borrow()
                .axes
                .get(&(self.port, axis))
                .copied()
                .unwrap_or(0.0)
        })
    }

    pub fn set_button(&self, button: Button, pressed: bool) {
        HID.with(|hid| {
            hid.borrow_mut().buttons.insert((self.port, button), pressed);
        });
    }

    pub fn set_axis(&self, axis: Axis, value: f64) {
        HID.with(|hid| {
            hid.borrow_mut()
                .axes
                .insert((self.port, axis), value.clamp(-1.0, 1.0));
        });
    }
}

/// Zeroes inputs inside `deadband` and rescales the rest to keep the full range.
pub fn apply_deadband(value: f64, deadband: f64) -> f64 {
    if value.abs() < deadband {
        0.0
    } else {
        value.signum() * (value.abs() - deadband) / (1.0 - deadband)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_independent() {
        let driver = Controller::new(0);
        let operator = Controller::new(1);
        driver.set_axis(Axis::LeftY, 2.0);
        operator.set_button(Button::B, true);

        assert_eq!(driver.axis(Axis::LeftY), 1.0);
        assert_eq!(operator.axis(Axis::LeftY), 0.0);
        assert!(operator.button(Button::B));
        assert!(!driver.button(Button::B));
    }

    #[test]
    fn deadband_rescales() {
        assert_eq!(apply_deadband(0.05, 0.1), 0.0);
        assert_eq!(apply_deadband(1.0, 0.1), 1.0);
        assert!((apply_deadband(-0.55, 0.1) + 0.5).abs() < 1e-9);
    }
}
