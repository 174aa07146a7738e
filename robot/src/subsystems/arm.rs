use frc_command::{dashboard, subsystem::Subsystem};

use crate::hardware::WristActuator;

#[derive(Debug)]
pub struct ArmSubsystem {
    wrist: Box<dyn WristActuator>,
}

impl ArmSubsystem {
    pub fn new(wrist: Box<dyn WristActuator>) -> Self {
        Self { wrist }
    }

    pub fn set_wrist_position(&mut self, angle: f64) {
        self.wrist.set_position(angle);
    }

    pub fn get_wrist_position(&self) -> f64 {
        self.wrist.position()
    }
}

impl Subsystem for ArmSubsystem {
    fn periodic(&mut self) {
        dashboard::put_number("wristPosition", self.wrist.position());
    }

    fn sim_periodic(&mut self) {
        self.wrist.sim_step();
    }
}
