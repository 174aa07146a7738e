use std::env;

use frc_command::{
    driver_station::{self, Alliance, Mode},
    robot::{deploy_directory, start_robot},
};
use frc_robot::{
    hardware::{SimBeamBreak, SimMotor, SimWrist},
    robot::{Hardware, Robot},
};
use tracing_subscriber::EnvFilter;

fn main() -> frc_command::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Without a field connection the match state comes from the environment.
    driver_station::set_mode(match env::var("FRC_SIM_MODE").as_deref() {
        Ok("auto") => Mode::Autonomous,
        Ok("disabled") => Mode::Disabled,
        _ => Mode::Teleop,
    });
    driver_station::set_alliance(match env::var("FRC_SIM_ALLIANCE").as_deref() {
        Ok("red") => Some(Alliance::Red),
        Ok("blue") => Some(Alliance::Blue),
        _ => None,
    });

    let hardware = Hardware {
        intake_motor: Box::new(SimMotor::new()),
        beam_break: Box::new(SimBeamBreak::new(false)),
        wrist: Box::new(SimWrist::new(0.0, 0.5)),
    };
    let mut robot = Robot::new(hardware, deploy_directory());
    robot.configure_button_bindings()?;
    start_robot(robot)
}
