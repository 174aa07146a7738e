//! Swerve drive boundary: configuration parsing and the drive itself.

use std::fmt::Debug;

use frc_command::geometry::{ChassisSpeeds, Pose2d, Translation2d};

mod parser;
mod sim;

pub use parser::{
    ConfigError, DeviceJson, LocationJson, ModuleConfig, ModuleJson, MotorPair,
    PhysicalPropertiesJson, SwerveDriveJson, SwerveParser,
};
pub use sim::SimSwerveDrive;

pub trait SwerveDrive: Debug {
    /// Makes the current physical heading the new zero heading.
    fn zero_gyro(&mut self);
    /// Drives with `translation` in m/s and `rotation` in rad/s.
    fn drive(
        &mut self,
        translation: Translation2d,
        rotation: f64,
        field_relative: bool,
        open_loop: bool,
    );
    /// Drives with speeds expressed in the robot's frame.
    fn drive_robot_relative(&mut self, speeds: ChassisSpeeds);
    fn update_odometry(&mut self);
    fn pose(&self) -> Pose2d;
    fn reset_odometry(&mut self, pose: Pose2d);
    /// Current velocity in the robot's frame.
    fn robot_velocity(&self) -> ChassisSpeeds;
    fn max_speed(&self) -> f64;
}
