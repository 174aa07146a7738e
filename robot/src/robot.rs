use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use frc_command::{
    auto::{AutoBuilder, Path as AutoPath},
    command::button::Trigger,
    controller::{Button, Controller},
    prelude::*,
    robot::ScheduledRobot,
    run_once, SetDefaultCommandError,
};

use crate::{
    commands::{DriveWithJoystickCommand, IntakeReverseCommand, WristToIntakeCommand},
    constants::{self, operator::DRIVER_PORT, timeouts},
    hardware::{BeamBreak, MotorController, WristActuator},
    subsystems::{arm::ArmSubsystem, drivetrain::SwerveSubsystem, intake::IntakeSubsystem},
};

/// Devices the robot is built from.
pub struct Hardware {
    pub intake_motor: Box<dyn MotorController>,
    pub beam_break: Box<dyn BeamBreak>,
    pub wrist: Box<dyn WristActuator>,
}

pub struct Robot {
    swerve: Option<Rc<RefCell<SwerveSubsystem>>>,
    intake: Rc<RefCell<IntakeSubsystem>>,
    arm: Rc<RefCell<ArmSubsystem>>,
    driver: Controller,
    deploy_directory: PathBuf,
    autonomous_command: Option<CommandRef>,
}

impl Robot {
    pub fn new(hardware: Hardware, deploy_directory: impl AsRef<Path>) -> Self {
        let deploy_directory = deploy_directory.as_ref().to_path_buf();
        Self {
            swerve: SwerveSubsystem::init(
                deploy_directory.join(constants::drivetrain::CONFIG_DIRECTORY),
            ),
            intake: IntakeSubsystem::new(hardware.intake_motor, hardware.beam_break).register(),
            arm: ArmSubsystem::new(hardware.wrist).register(),
            driver: Controller::new(DRIVER_PORT),
            deploy_directory,
            autonomous_command: None,
        }
    }

    pub fn swerve(&self) -> Option<&Rc<RefCell<SwerveSubsystem>>> {
        self.swerve.as_ref()
    }

    pub fn intake(&self) -> &Rc<RefCell<IntakeSubsystem>> {
        &self.intake
    }

    pub fn arm(&self) -> &Rc<RefCell<ArmSubsystem>> {
        &self.arm
    }

    pub fn configure_button_bindings(&mut self) -> Result<(), SetDefaultCommandError> {
        if let Some(swerve) = &self.swerve {
            CommandScheduler::set_default_command(
                swerve,
                DriveWithJoystickCommand::new(swerve.clone(), self.driver),
            )?;

            Trigger::button(self.driver, Button::A)
                .on_true(SwerveSubsystem::toggle_oriented_mode(swerve));

            let heading = swerve.clone();
            Trigger::button(self.driver, Button::B).on_true(run_once!(
                {
                    heading.borrow_mut().reset_heading();
                    Ok(())
                },
                SubsystemRef(swerve.clone())
            ));
        }

        Trigger::button(self.driver, Button::RightBumper).on_true(
            WristToIntakeCommand::new(self.arm.clone(), self.intake.clone())
                .with_timeout(timeouts::WRIST_TO_INTAKE),
        );
        Trigger::button(self.driver, Button::LeftBumper).while_true(
            IntakeReverseCommand::new(self.intake.clone()).with_timeout(timeouts::BACK_OUT_NOTE),
        );

        Ok(())
    }

    fn autonomous_command(&self) -> Option<CommandRef> {
        let file = self.deploy_directory.join(constants::auto::PATH);
        let path = match AutoPath::from_json_file(&file) {
            Ok(path) => path,
            Err(err) => {
                tracing::error!(%err, "no autonomous path");
                return None;
            }
        };
        match AutoBuilder::follow_path(path) {
            Ok(command) => Some(command.into()),
            Err(err) => {
                tracing::error!(%err, "no autonomous command");
                None
            }
        }
    }
}

impl ScheduledRobot for Robot {
    fn periodic(&mut self) -> Result {
        CommandScheduler::run()
    }

    fn autonomous_init(&mut self) -> Result {
        self.autonomous_command = self.autonomous_command();
        if let Some(command) = &self.autonomous_command {
            command.schedule()?;
        }
        Ok(())
    }

    fn teleop_init(&mut self) -> Result {
        if let Some(command) = self.autonomous_command.take() {
            command.cancel()?;
        }
        Ok(())
    }
}
