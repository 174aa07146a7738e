use std::{cell::Cell, path::PathBuf, rc::Rc};

use frc_command::{
    controller::{Axis, Button, Controller},
    dashboard,
    driver_station::{self, Alliance, Mode},
    robot::step_robot,
    CommandScheduler, SubsystemRef,
};
use frc_robot::{
    constants::operator::DRIVER_PORT,
    hardware::{HardwareError, MotorController, SimBeamBreak, SimMotor, SimWrist},
    robot::{Hardware, Robot},
};

struct Rig {
    robot: Robot,
    previous_mode: Option<Mode>,
    intake_power: Rc<Cell<f64>>,
    beam: Rc<Cell<Option<bool>>>,
    wrist: Rc<Cell<f64>>,
    wrist_setpoint: Rc<Cell<Option<f64>>>,
    driver: Controller,
}

impl Rig {
    fn new(deploy: PathBuf) -> Self {
        let motor = SimMotor::new();
        let sensor = SimBeamBreak::new(true);
        let wrist = SimWrist::new(0.0, 5.0);
        let (intake_power, beam, wrist_position) = (motor.handle(), sensor.handle(), wrist.handle());
        let wrist_setpoint = wrist.setpoint_handle();

        let mut robot = Robot::new(
            Hardware {
                intake_motor: Box::new(motor),
                beam_break: Box::new(sensor),
                wrist: Box::new(wrist),
            },
            deploy,
        );
        robot.configure_button_bindings().unwrap();

        Self {
            robot,
            previous_mode: None,
            intake_power,
            beam,
            wrist: wrist_position,
            wrist_setpoint,
            driver: Controller::new(DRIVER_PORT),
        }
    }

    fn step(&mut self) {
        step_robot(&mut self.robot, &mut self.previous_mode).unwrap();
    }

    fn press(&mut self, button: Button) {
        self.driver.set_button(button, true);
        self.step();
    }

    fn release(&mut self, button: Button) {
        self.driver.set_button(button, false);
        self.step();
    }
}

fn deploy() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("deploy")
}

#[test]
fn back_out_note_until_beam_clears() {
    driver_station::set_mode(Mode::Teleop);
    let mut rig = Rig::new(deploy());
    let intake = SubsystemRef(rig.robot.intake().clone());
    rig.step();

    rig.press(Button::LeftBumper);
    assert_eq!(rig.intake_power.get(), 0.2);
    assert!(CommandScheduler::is_required(&intake));

    rig.step();
    assert_eq!(rig.intake_power.get(), 0.2);

    rig.beam.set(Some(false));
    rig.step();
    assert_eq!(rig.intake_power.get(), 0.0);
    assert!(!CommandScheduler::is_required(&intake));
}

#[test]
fn releasing_the_button_interrupts_and_stops_the_intake() {
    driver_station::set_mode(Mode::Teleop);
    let mut rig = Rig::new(deploy());

    rig.press(Button::LeftBumper);
    assert_eq!(rig.intake_power.get(), 0.2);

    rig.release(Button::LeftBumper);
    assert_eq!(rig.intake_power.get(), 0.0);
    assert!(!CommandScheduler::is_required(&SubsystemRef(
        rig.robot.intake().clone()
    )));
}

#[test]
fn wrist_reaches_intake_angle_and_releases_mechanisms() {
    driver_station::set_mode(Mode::Teleop);
    let mut rig = Rig::new(deploy());
    let arm = SubsystemRef(rig.robot.arm().clone());
    let intake = SubsystemRef(rig.robot.intake().clone());

    rig.press(Button::RightBumper);
    assert!(CommandScheduler::is_required(&arm));
    assert!(CommandScheduler::is_required(&intake));

    for _ in 0..3 {
        rig.step();
    }
    assert_eq!(rig.wrist.get(), 14.0);
    assert!(!CommandScheduler::is_required(&arm));
    assert!(!CommandScheduler::is_required(&intake));

    // Nothing resets the wrist once the command is done.
    for _ in 0..5 {
        rig.step();
    }
    assert_eq!(rig.wrist_setpoint.get(), Some(14.0));
    assert_eq!(rig.wrist.get(), 14.0);
}

#[test]
fn toggle_button_flips_drive_mode() {
    driver_station::set_mode(Mode::Teleop);
    let mut rig = Rig::new(deploy());
    rig.step();

    rig.press(Button::A);
    assert_eq!(dashboard::get_boolean("relativityMode"), Some(false));
    rig.release(Button::A);
    rig.press(Button::A);
    assert_eq!(dashboard::get_boolean("relativityMode"), Some(true));
    let swerve = rig.robot.swerve().unwrap();
    assert!(swerve.borrow().is_field_relative());
}

#[test]
fn joystick_drives_the_default_command() {
    driver_station::set_mode(Mode::Teleop);
    let mut rig = Rig::new(deploy());
    rig.step();

    rig.driver.set_axis(Axis::LeftY, -1.0);
    for _ in 0..10 {
        rig.step();
    }

    let swerve = rig.robot.swerve().unwrap();
    let pose = swerve.borrow().get_pose();
    assert!(pose.x() > 0.0);
    assert!(pose.y().abs() < 1e-9);
}

#[test]
fn red_autonomous_follows_the_mirrored_path() {
    driver_station::set_alliance(Some(Alliance::Red));
    driver_station::set_mode(Mode::Autonomous);
    let mut rig = Rig::new(deploy());

    rig.step();
    let swerve = rig.robot.swerve().unwrap().clone();
    let start = swerve.borrow().get_pose();
    assert!((start.x() - (16.54 - 1.35)).abs() < 1e-9);
    assert!((start.y() - 5.55).abs() < 1e-9);
    assert!((start.rotation.degrees().abs() - 180.0).abs() < 1e-9);

    for _ in 0..50 {
        rig.step();
    }
    assert!(swerve.borrow().get_pose().x() < start.x());

    // Teleop cancels the path and the idle joystick command takes over.
    driver_station::set_mode(Mode::Teleop);
    rig.step();
    rig.step();
    assert!(CommandScheduler::is_required(&SubsystemRef(swerve.clone())));
    assert!(swerve.borrow().get_chassis_speeds().vx.abs() < 1e-9);
}

#[test]
fn missing_swerve_config_leaves_the_rest_running() {
    driver_station::set_mode(Mode::Teleop);
    let mut rig = Rig::new(deploy().join("missing"));
    assert!(rig.robot.swerve().is_none());

    rig.press(Button::LeftBumper);
    assert_eq!(rig.intake_power.get(), 0.2);
}

#[derive(Debug)]
struct UnpluggedMotor;

impl MotorController for UnpluggedMotor {
    fn set(&mut self, _output: f64) -> Result<(), HardwareError> {
        Err(HardwareError::Disconnected {
            device: "intake motor",
        })
    }

    fn get(&self) -> f64 {
        0.0
    }
}

#[test]
fn unplugged_intake_motor_does_not_stop_the_robot() {
    driver_station::set_mode(Mode::Teleop);
    let wrist = SimWrist::new(0.0, 5.0);
    let wrist_position = wrist.handle();
    let mut robot = Robot::new(
        Hardware {
            intake_motor: Box::new(UnpluggedMotor),
            beam_break: Box::new(SimBeamBreak::new(true)),
            wrist: Box::new(wrist),
        },
        deploy(),
    );
    robot.configure_button_bindings().unwrap();
    let intake = SubsystemRef(robot.intake().clone());
    let swerve = SubsystemRef(robot.swerve().unwrap().clone());
    let driver = Controller::new(DRIVER_PORT);
    let mut previous_mode = None;

    driver.set_button(Button::LeftBumper, true);
    step_robot(&mut robot, &mut previous_mode).unwrap();
    assert!(!CommandScheduler::is_required(&intake));

    driver.set_button(Button::LeftBumper, false);
    driver.set_button(Button::RightBumper, true);
    driver.set_axis(Axis::LeftY, -1.0);
    for _ in 0..5 {
        step_robot(&mut robot, &mut previous_mode).unwrap();
    }

    assert_eq!(wrist_position.get(), 14.0);
    assert!(CommandScheduler::is_required(&swerve));
    assert!(robot.swerve().unwrap().borrow().get_pose().x() > 0.0);
}
