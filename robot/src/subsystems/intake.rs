use frc_command::{dashboard, subsystem::Subsystem};

use crate::hardware::{BeamBreak, HardwareError, MotorController};

#[derive(Debug)]
pub struct IntakeSubsystem {
    motor: Box<dyn MotorController>,
    beam_break: Box<dyn BeamBreak>,
}

impl IntakeSubsystem {
    pub fn new(motor: Box<dyn MotorController>, beam_break: Box<dyn BeamBreak>) -> Self {
        Self { motor, beam_break }
    }

    /// Runs the intake at `power` in `[-1, 1]`.
    pub fn set_intake(&mut self, power: f64) -> Result<(), HardwareError> {
        self.motor.set(power.clamp(-1.0, 1.0))
    }

    pub fn intake_power(&self) -> f64 {
        self.motor.get()
    }

    /// True while a note interrupts the beam.
    pub fn read_beam_break(&self) -> Result<bool, HardwareError> {
        self.beam_break.is_broken()
    }
}

impl Subsystem for IntakeSubsystem {
    fn periodic(&mut self) {
        if let Ok(broken) = self.beam_break.is_broken() {
            dashboard::put_boolean("noteDetected", broken);
        }
    }
}
