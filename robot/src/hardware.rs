//! Actuator and sensor capabilities used by the subsystems.
//!
//! The `Sim*` implementations keep their state behind shared handles so the
//! simulation loop and tests can read outputs and inject sensor values.

use std::{cell::Cell, fmt::Debug, rc::Rc};

use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum HardwareError {
    #[snafu(display("{device} is not responding"))]
    Disconnected { device: &'static str },
}

pub trait MotorController: Debug {
    /// Sets the output in `[-1, 1]`.
    fn set(&mut self, output: f64) -> Result<(), HardwareError>;
    fn get(&self) -> f64;
}

pub trait BeamBreak: Debug {
    /// True while an object interrupts the beam.
    fn is_broken(&self) -> Result<bool, HardwareError>;
}

pub trait WristActuator: Debug {
    fn set_position(&mut self, angle: f64);
    fn position(&self) -> f64;
    /// Advances the simulated mechanism by one loop period.
    fn sim_step(&mut self) {}
}

#[derive(Debug, Default)]
pub struct SimMotor {
    output: Rc<Cell<f64>>,
}

impl SimMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Rc<Cell<f64>> {
        self.output.clone()
    }
}

impl MotorController for SimMotor {
    fn set(&mut self, output: f64) -> Result<(), HardwareError> {
        self.output.set(output.clamp(-1.0, 1.0));
        Ok(())
    }

    fn get(&self) -> f64 {
        self.output.get()
    }
}

/// Beam-break whose state is `None` while unplugged.
#[derive(Debug)]
pub struct SimBeamBreak {
    state: Rc<Cell<Option<bool>>>,
}

impl SimBeamBreak {
    pub fn new(broken: bool) -> Self {
        Self {
            state: Rc::new(Cell::new(Some(broken))),
        }
    }

    pub fn handle(&self) -> Rc<Cell<Option<bool>>> {
        self.state.clone()
    }
}

impl BeamBreak for SimBeamBreak {
    fn is_broken(&self) -> Result<bool, HardwareError> {
        self.state
            .get()
            .ok_or(HardwareError::Disconnected { device: "beam break" })
    }
}

/// Wrist that slews toward its setpoint at a fixed rate per step.
#[derive(Debug)]
pub struct SimWrist {
    position: Rc<Cell<f64>>,
    setpoint: Rc<Cell<Option<f64>>>,
    max_step: f64,
}

impl SimWrist {
    pub fn new(position: f64, max_step: f64) -> Self {
        Self {
            position: Rc::new(Cell::new(position)),
            setpoint: Rc::new(Cell::new(None)),
            max_step,
        }
    }

    pub fn handle(&self) -> Rc<Cell<f64>> {
        self.position.clone()
    }

    /// Last commanded angle, `None` until the wrist is first commanded.
    pub fn setpoint_handle(&self) -> Rc<Cell<Option<f64>>> {
        self.setpoint.clone()
    }
}

impl WristActuator for SimWrist {
    fn set_position(&mut self, angle: f64) {
        self.setpoint.set(Some(angle));
    }

    fn position(&self) -> f64 {
        self.position.get()
    }

    fn sim_step(&mut self) {
        if let Some(setpoint) = self.setpoint.get() {
            let position = self.position.get();
            let step = (setpoint - position).clamp(-self.max_step, self.max_step);
            self.position.set(position + step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_output_is_clamped() {
        let mut motor = SimMotor::new();
        motor.set(1.5).unwrap();
        assert_eq!(motor.get(), 1.0);
        assert_eq!(motor.handle().get(), 1.0);
    }

    #[test]
    fn unplugged_beam_break_errors() {
        let sensor = SimBeamBreak::new(true);
        assert!(sensor.is_broken().unwrap());
        sensor.handle().set(None);
        assert!(matches!(
            sensor.is_broken(),
            Err(HardwareError::Disconnected { .. })
        ));
    }

    #[test]
    fn wrist_slews_to_setpoint() {
        let mut wrist = SimWrist::new(0.0, 5.0);
        let setpoint = wrist.setpoint_handle();
        wrist.sim_step();
        assert_eq!(wrist.position(), 0.0);
        assert_eq!(setpoint.get(), None);

        wrist.set_position(12.0);
        assert_eq!(setpoint.get(), Some(12.0));
        wrist.sim_step();
        assert_eq!(wrist.position(), 5.0);
        wrist.sim_step();
        wrist.sim_step();
        assert_eq!(wrist.position(), 12.0);
    }
}
