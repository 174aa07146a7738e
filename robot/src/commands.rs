use std::{cell::RefCell, rc::Rc};

use frc_command::{
    controller::{apply_deadband, Axis, Controller},
    geometry::Translation2d,
    prelude::*,
};

use crate::{
    constants::{
        drivetrain::DRIVE_BASE_RADIUS,
        intake::REVERSE_POWER,
        operator::DEADBAND,
        wrist::{INTAKE_ANGLE, TOLERANCE},
    },
    subsystems::{arm::ArmSubsystem, drivetrain::SwerveSubsystem, intake::IntakeSubsystem},
};

/// What the intake reversal does when the beam-break cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorFaultPolicy {
    /// Treat the note as cleared and stop reversing.
    #[default]
    FinishImmediately,
    /// Keep reversing; something else (a timeout, the driver) has to end the command.
    KeepRunning,
}

/// Backs a note out of the intake until the beam-break clears.
pub struct IntakeReverseCommand {
    intake: Rc<RefCell<IntakeSubsystem>>,
    fault_policy: SensorFaultPolicy,
    requirements: Vec<SubsystemRef>,
}

impl IntakeReverseCommand {
    pub fn new(intake: Rc<RefCell<IntakeSubsystem>>) -> Self {
        Self {
            requirements: vec![SubsystemRef(intake.clone())],
            intake,
            fault_policy: SensorFaultPolicy::default(),
        }
    }

    pub fn with_fault_policy(mut self, fault_policy: SensorFaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }
}

impl Command for IntakeReverseCommand {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn execute(&mut self) -> Result {
        self.intake.borrow_mut().set_intake(REVERSE_POWER)?;
        Ok(())
    }

    fn end(&mut self, _interrupted: bool) -> Result {
        self.intake.borrow_mut().set_intake(0.0)?;
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        match self.intake.borrow().read_beam_break() {
            Ok(broken) => Ok(!broken),
            Err(err) => {
                tracing::warn!(%err, policy = ?self.fault_policy, "beam break unreadable");
                Ok(self.fault_policy == SensorFaultPolicy::FinishImmediately)
            }
        }
    }
}

/// Moves the wrist to the intake angle. The last setpoint holds after the command ends.
pub struct WristToIntakeCommand {
    arm: Rc<RefCell<ArmSubsystem>>,
    requirements: Vec<SubsystemRef>,
}

impl WristToIntakeCommand {
    pub fn new(arm: Rc<RefCell<ArmSubsystem>>, intake: Rc<RefCell<IntakeSubsystem>>) -> Self {
        Self {
            requirements: vec![SubsystemRef(arm.clone()), SubsystemRef(intake)],
            arm,
        }
    }
}

impl Command for WristToIntakeCommand {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn execute(&mut self) -> Result {
        self.arm.borrow_mut().set_wrist_position(INTAKE_ANGLE);
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok((self.arm.borrow().get_wrist_position() - INTAKE_ANGLE).abs() < TOLERANCE)
    }
}

pub struct DriveWithJoystickCommand {
    drivetrain: Rc<RefCell<SwerveSubsystem>>,
    controller: Controller,
    requirements: Vec<SubsystemRef>,
}

impl DriveWithJoystickCommand {
    pub fn new(drivetrain: Rc<RefCell<SwerveSubsystem>>, controller: Controller) -> Self {
        Self {
            requirements: vec![SubsystemRef(drivetrain.clone())],
            drivetrain,
            controller,
        }
    }
}

impl Command for DriveWithJoystickCommand {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn execute(&mut self) -> Result {
        let read = |axis| apply_deadband(self.controller.axis(axis), DEADBAND);
        let mut drivetrain = self.drivetrain.borrow_mut();
        let max_speed = drivetrain.max_speed();

        // Stick forward reads negative; +y on the robot is left.
        let translation = Translation2d::new(-read(Axis::LeftY), -read(Axis::LeftX)) * max_speed;
        let rotation = -read(Axis::RightX) * max_speed / DRIVE_BASE_RADIUS;
        drivetrain.drive(translation, rotation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use frc_command::geometry::{ChassisSpeeds, Pose2d, Rotation2d};

    use super::*;
    use crate::{
        hardware::{SimBeamBreak, SimMotor, SimWrist},
        swerve::SimSwerveDrive,
    };

    struct IntakeRig {
        intake: Rc<RefCell<IntakeSubsystem>>,
        power: Rc<Cell<f64>>,
        beam: Rc<Cell<Option<bool>>>,
    }

    fn intake_rig() -> IntakeRig {
        let motor = SimMotor::new();
        let sensor = SimBeamBreak::new(true);
        IntakeRig {
            power: motor.handle(),
            beam: sensor.handle(),
            intake: Rc::new(RefCell::new(IntakeSubsystem::new(
                Box::new(motor),
                Box::new(sensor),
            ))),
        }
    }

    fn arm_at(position: f64) -> (Rc<RefCell<ArmSubsystem>>, Rc<Cell<f64>>) {
        let wrist = SimWrist::new(position, 1.0);
        let handle = wrist.handle();
        (Rc::new(RefCell::new(ArmSubsystem::new(Box::new(wrist)))), handle)
    }

    #[test]
    fn intake_reverse_runs_until_beam_clears() {
        let rig = intake_rig();
        let mut command = IntakeReverseCommand::new(rig.intake.clone());

        command.initialize().unwrap();
        command.execute().unwrap();
        assert_eq!(rig.power.get(), 0.2);
        assert_eq!(rig.intake.borrow().intake_power(), 0.2);
        assert!(!command.is_finished().unwrap());

        rig.beam.set(Some(false));
        assert!(command.is_finished().unwrap());
    }

    #[test]
    fn intake_reverse_always_stops_motor() {
        for interrupted in [false, true] {
            let rig = intake_rig();
            let mut command = IntakeReverseCommand::new(rig.intake.clone());
            command.execute().unwrap();
            command.end(interrupted).unwrap();
            assert_eq!(rig.power.get(), 0.0);
        }
    }

    #[test]
    fn sensor_fault_policy_is_explicit() {
        let rig = intake_rig();
        rig.beam.set(None);

        let conservative = IntakeReverseCommand::new(rig.intake.clone());
        assert!(conservative.is_finished().unwrap());

        let persistent = IntakeReverseCommand::new(rig.intake.clone())
            .with_fault_policy(SensorFaultPolicy::KeepRunning);
        assert!(!persistent.is_finished().unwrap());
    }

    #[test]
    fn wrist_tolerance_is_strict() {
        let rig = intake_rig();
        for (position, finished) in [
            (12.01, true),
            (11.99, false),
            (12.0, false),
            (14.0, true),
            (15.99, true),
            (16.0, false),
        ] {
            let (arm, _) = arm_at(position);
            let command = WristToIntakeCommand::new(arm, rig.intake.clone());
            assert_eq!(command.is_finished().unwrap(), finished, "position {position}");
        }
    }

    #[test]
    fn wrist_commands_intake_angle_and_requires_both() {
        let rig = intake_rig();
        let (arm, position) = arm_at(0.0);
        let mut command = WristToIntakeCommand::new(arm.clone(), rig.intake.clone());

        command.execute().unwrap();
        arm.borrow_mut().sim_periodic();
        assert_eq!(position.get(), 1.0);
        let requirements = command.get_requirements();
        assert!(requirements.contains(&SubsystemRef(arm.clone())));
        assert!(requirements.contains(&SubsystemRef(rig.intake.clone())));
    }

    #[test]
    fn joystick_drive_scales_to_max_speed() {
        let modules = vec![Translation2d::new(0.3, 0.3), Translation2d::new(-0.3, -0.3)];
        let swerve = Rc::new(RefCell::new(SwerveSubsystem::new(Box::new(
            SimSwerveDrive::new(modules, 2.0),
        ))));
        swerve
            .borrow_mut()
            .reset_pose(Pose2d::new(Translation2d::default(), Rotation2d::default()));
        let controller = Controller::new(3);
        controller.set_axis(Axis::LeftY, -1.0);

        let mut command = DriveWithJoystickCommand::new(swerve.clone(), controller);
        command.execute().unwrap();

        assert_eq!(swerve.borrow().get_chassis_speeds(), ChassisSpeeds::new(2.0, 0.0, 0.0));
    }
}
