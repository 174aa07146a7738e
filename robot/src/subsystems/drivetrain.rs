use std::{
    cell::RefCell,
    path::Path,
    rc::{Rc, Weak},
};

use frc_command::{
    auto::{
        AutoBuilder, AutoBuilderError, HolonomicCallbacks, HolonomicPathFollowerConfig,
        ReplanningConfig,
    },
    command::FunctionalCommand,
    dashboard,
    driver_station::{self, Alliance},
    geometry::{feet_to_meters, ChassisSpeeds, Pose2d, Translation2d},
    subsystem::{Subsystem, SubsystemRefExt},
    SubsystemRef,
};

use crate::{
    constants::drivetrain::{
        DRIVE_BASE_RADIUS, MAX_MODULE_SPEED, MAX_SPEED_FEET_PER_SECOND, ROTATION_PID,
        TRANSLATION_PID,
    },
    swerve::{ConfigError, SwerveDrive, SwerveParser},
};

/// Adapts a [`SwerveDrive`] for driver commands and the autonomous path follower.
#[derive(Debug)]
pub struct SwerveSubsystem {
    swerve_drive: Box<dyn SwerveDrive>,
    field_relative: bool,
}

impl SwerveSubsystem {
    /// Wraps a drive and zeroes its gyro. Starts in field-relative mode.
    pub fn new(mut swerve_drive: Box<dyn SwerveDrive>) -> Self {
        swerve_drive.zero_gyro();
        Self {
            swerve_drive,
            field_relative: true,
        }
    }

    pub fn from_config_dir(directory: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let parser = SwerveParser::new(directory)?;
        let drive = parser.create_swerve_drive(feet_to_meters(MAX_SPEED_FEET_PER_SECOND));
        Ok(Self::new(Box::new(drive)))
    }

    /// Loads the drive from `directory`, registers it with the scheduler and
    /// hands it to the auto builder.
    ///
    /// Returns `None` when the configuration cannot be loaded. The failure is
    /// logged and the robot runs on without a drivetrain.
    pub fn init(directory: impl AsRef<Path>) -> Option<Rc<RefCell<Self>>> {
        let directory = directory.as_ref();
        let swerve = match Self::from_config_dir(directory) {
            Ok(swerve) => swerve.register(),
            Err(err) => {
                tracing::error!(%err, directory = %directory.display(), "drivetrain unavailable");
                return None;
            }
        };
        if let Err(err) = Self::configure_auto_builder(&swerve) {
            tracing::error!(%err, "could not configure autonomous path following");
        }
        Some(swerve)
    }

    pub fn configure_auto_builder(this: &Rc<RefCell<Self>>) -> Result<(), AutoBuilderError> {
        let callbacks = HolonomicCallbacks {
            pose_supplier: Box::new(with(this, Pose2d::default(), |swerve| swerve.get_pose())),
            reset_pose: Box::new({
                let swerve = Rc::downgrade(this);
                move |pose| {
                    if let Some(swerve) = swerve.upgrade() {
                        swerve.borrow_mut().reset_pose(pose);
                    }
                }
            }),
            robot_relative_speeds_supplier: Box::new(with(
                this,
                ChassisSpeeds::default(),
                |swerve| swerve.get_chassis_speeds(),
            )),
            robot_relative_output: Box::new({
                let swerve = Rc::downgrade(this);
                move |speeds| {
                    if let Some(swerve) = swerve.upgrade() {
                        swerve.borrow_mut().drive_relative(speeds);
                    }
                }
            }),
            should_flip_path: Box::new(is_red_alliance),
        };
        let config = HolonomicPathFollowerConfig::new(
            TRANSLATION_PID,
            ROTATION_PID,
            MAX_MODULE_SPEED,
            DRIVE_BASE_RADIUS,
            ReplanningConfig::default(),
        );
        AutoBuilder::configure_holonomic(callbacks, config, SubsystemRef(this.clone()))
    }

    pub fn reset_heading(&mut self) {
        self.swerve_drive.zero_gyro();
    }

    /// A command that flips between field- and robot-relative driving.
    pub fn toggle_oriented_mode(this: &Rc<RefCell<Self>>) -> FunctionalCommand {
        let swerve = this.clone();
        this.run_once(move || {
            let mut swerve = swerve.borrow_mut();
            swerve.field_relative = !swerve.field_relative;
            dashboard::put_boolean("relativityMode", swerve.field_relative);
            tracing::debug!(field_relative = swerve.field_relative, "drive mode toggled");
            Ok(())
        })
    }

    pub fn is_field_relative(&self) -> bool {
        self.field_relative
    }

    /// Closed-loop drive in the frame chosen by the oriented mode.
    pub fn drive(&mut self, translation: Translation2d, rotation: f64) {
        self.swerve_drive
            .drive(translation, rotation, self.field_relative, false);
    }

    pub fn update_odometry(&mut self) {
        self.swerve_drive.update_odometry();
    }

    pub fn get_pose(&self) -> Pose2d {
        self.swerve_drive.pose()
    }

    pub fn reset_pose(&mut self, pose: Pose2d) {
        self.swerve_drive.reset_odometry(pose);
    }

    /// Current velocity in the robot's frame.
    pub fn get_chassis_speeds(&self) -> ChassisSpeeds {
        self.swerve_drive.robot_velocity()
    }

    /// Drives with robot-frame speeds regardless of the oriented mode.
    pub fn drive_relative(&mut self, speeds: ChassisSpeeds) {
        self.swerve_drive.drive_robot_relative(speeds);
    }

    pub fn max_speed(&self) -> f64 {
        self.swerve_drive.max_speed()
    }
}

impl Subsystem for SwerveSubsystem {
    fn periodic(&mut self) {
        self.update_odometry();
        let pose = self.get_pose();
        dashboard::put_number("pose/x", pose.x());
        dashboard::put_number("pose/y", pose.y());
        dashboard::put_number("pose/heading", pose.rotation.degrees());
    }
}

fn is_red_alliance() -> bool {
    driver_station::alliance() == Some(Alliance::Red)
}

/// Reads the subsystem through a weak handle, falling back once it is gone.
fn with<T: Copy + 'static>(
    this: &Rc<RefCell<SwerveSubsystem>>,
    fallback: T,
    read: impl Fn(&SwerveSubsystem) -> T + 'static,
) -> impl Fn() -> T {
    let swerve: Weak<RefCell<SwerveSubsystem>> = Rc::downgrade(this);
    move || {
        swerve.upgrade().map_or(fallback, |swerve| {
            let swerve = swerve.borrow();
            read(&swerve)
        })
    }
}

#[cfg(test)]
mod tests {
    use frc_command::{command::Command, geometry::Rotation2d};

    use super::*;
    use crate::swerve::SimSwerveDrive;

    const EPS: f64 = 1e-9;

    fn sim_swerve() -> SwerveSubsystem {
        let modules = [(0.3, 0.3), (0.3, -0.3), (-0.3, 0.3), (-0.3, -0.3)]
            .into_iter()
            .map(|(x, y)| Translation2d::new(x, y))
            .collect();
        SwerveSubsystem::new(Box::new(SimSwerveDrive::new(modules, 4.0)))
    }

    fn deploy_swerve() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("deploy/swerve")
    }

    fn facing(degrees: f64) -> Pose2d {
        Pose2d::new(Translation2d::default(), Rotation2d::from_degrees(degrees))
    }

    fn assert_speeds(actual: ChassisSpeeds, vx: f64, vy: f64) {
        assert!((actual.vx - vx).abs() < EPS, "vx {} != {vx}", actual.vx);
        assert!((actual.vy - vy).abs() < EPS, "vy {} != {vy}", actual.vy);
    }

    #[test]
    fn toggling_twice_restores_mode() {
        let swerve = sim_swerve().register();
        let mut toggle = SwerveSubsystem::toggle_oriented_mode(&swerve);
        assert!(swerve.borrow().is_field_relative());

        toggle.initialize().unwrap();
        assert!(toggle.is_finished().unwrap());
        assert!(!swerve.borrow().is_field_relative());
        assert_eq!(dashboard::get_boolean("relativityMode"), Some(false));

        toggle.initialize().unwrap();
        assert!(swerve.borrow().is_field_relative());
        assert_eq!(dashboard::get_boolean("relativityMode"), Some(true));
    }

    #[test]
    fn toggle_requires_the_drivetrain() {
        let swerve = sim_swerve().register();
        let toggle = SwerveSubsystem::toggle_oriented_mode(&swerve);
        assert!(toggle
            .get_requirements()
            .contains(&SubsystemRef(swerve.clone())));
    }

    #[test]
    fn drive_uses_the_oriented_mode() {
        let mut swerve = sim_swerve();
        swerve.reset_pose(facing(90.0));

        swerve.drive(Translation2d::new(1.0, 0.0), 0.0);
        assert_speeds(swerve.get_chassis_speeds(), 0.0, -1.0);

        swerve.field_relative = false;
        swerve.drive(Translation2d::new(1.0, 0.0), 0.0);
        assert_speeds(swerve.get_chassis_speeds(), 1.0, 0.0);
    }

    #[test]
    fn drive_relative_ignores_the_oriented_mode() {
        for field_relative in [true, false] {
            let mut swerve = sim_swerve();
            swerve.field_relative = field_relative;
            swerve.reset_pose(facing(90.0));

            swerve.drive_relative(ChassisSpeeds::new(1.0, 0.5, 0.0));
            assert_speeds(swerve.get_chassis_speeds(), 1.0, 0.5);
            assert_eq!(swerve.is_field_relative(), field_relative);
        }
    }

    #[test]
    fn chassis_speeds_do_not_rotate_with_heading() {
        let mut swerve = sim_swerve();
        for heading in [0.0, 45.0, 90.0, -135.0] {
            swerve.reset_pose(facing(heading));
            swerve.drive_relative(ChassisSpeeds::new(1.0, 0.0, 0.0));
            swerve.update_odometry();
            assert_speeds(swerve.get_chassis_speeds(), 1.0, 0.0);
        }
    }

    #[test]
    fn reset_heading_redefines_forward() {
        let mut swerve = sim_swerve();
        swerve.reset_pose(Pose2d::new(Translation2d::new(3.0, 1.0), Rotation2d::from_degrees(30.0)));
        swerve.reset_heading();

        assert_eq!(swerve.get_pose().rotation, Rotation2d::default());
        swerve.drive(Translation2d::new(1.0, 0.0), 0.0);
        assert_speeds(swerve.get_chassis_speeds(), 1.0, 0.0);
    }

    #[test]
    fn pose_only_changes_through_odometry_or_reset() {
        let mut swerve = sim_swerve();
        let start = Pose2d::new(Translation2d::new(2.0, 5.0), Rotation2d::from_degrees(10.0));
        swerve.reset_pose(start);
        swerve.drive(Translation2d::new(1.0, 0.0), 0.0);
        assert_eq!(swerve.get_pose(), start);

        swerve.periodic();
        assert!(swerve.get_pose().x() > start.x());
    }

    #[test]
    fn mirroring_follows_alliance() {
        let swerve = SwerveSubsystem::init(deploy_swerve()).unwrap();
        assert!(AutoBuilder::is_configured());

        driver_station::set_alliance(None);
        assert!(!AutoBuilder::should_flip_path().unwrap());
        driver_station::set_alliance(Some(Alliance::Red));
        assert!(AutoBuilder::should_flip_path().unwrap());
        driver_station::set_alliance(Some(Alliance::Blue));
        assert!(!AutoBuilder::should_flip_path().unwrap());

        let config = AutoBuilder::config().unwrap();
        assert_eq!(config.max_module_speed, 4.5);
        assert_eq!(config.drive_base_radius, 0.4);
        assert_eq!(config.translation_constants.kp, 5.0);
        assert!((swerve.borrow().max_speed() - 0.3048).abs() < EPS);
    }

    #[test]
    fn missing_config_leaves_no_drivetrain() {
        assert!(SwerveSubsystem::init(deploy_swerve().join("missing")).is_none());
        assert!(!AutoBuilder::is_configured());
    }
}
