use frc_command::{
    geometry::{ChassisSpeeds, Pose2d, Rotation2d, Translation2d},
    robot::ITERATION_PERIOD,
};

use super::SwerveDrive;

/// Swerve drive whose modules track their commanded states exactly.
#[derive(Debug, Clone)]
pub struct SimSwerveDrive {
    module_locations: Vec<Translation2d>,
    max_speed: f64,
    pose: Pose2d,
    speeds: ChassisSpeeds,
}

impl SimSwerveDrive {
    pub fn new(module_locations: Vec<Translation2d>, max_speed: f64) -> Self {
        Self {
            module_locations,
            max_speed,
            pose: Pose2d::default(),
            speeds: ChassisSpeeds::default(),
        }
    }

    /// Scales `speeds` down so no module exceeds the maximum speed.
    fn desaturate(&self, speeds: ChassisSpeeds) -> ChassisSpeeds {
        let fastest = self
            .module_locations
            .iter()
            .map(|r| Translation2d::new(speeds.vx - speeds.omega * r.y, speeds.vy + speeds.omega * r.x).norm())
            .fold(0.0, f64::max);
        if fastest > self.max_speed {
            speeds * (self.max_speed / fastest)
        } else {
            speeds
        }
    }
}

impl SwerveDrive for SimSwerveDrive {
    fn zero_gyro(&mut self) {
        self.pose = Pose2d::new(self.pose.translation, Rotation2d::default());
    }

    fn drive(
        &mut self,
        translation: Translation2d,
        rotation: f64,
        field_relative: bool,
        _open_loop: bool,
    ) {
        let requested = ChassisSpeeds::new(translation.x, translation.y, rotation);
        let speeds = if field_relative {
            ChassisSpeeds::from_field_relative(requested, self.pose.rotation)
        } else {
            requested
        };
        self.speeds = self.desaturate(speeds);
    }

    fn drive_robot_relative(&mut self, speeds: ChassisSpeeds) {
        self.speeds = self.desaturate(speeds);
    }

    fn update_odometry(&mut self) {
        let dt = ITERATION_PERIOD.as_secs_f64();
        let field = self.speeds.to_field_relative(self.pose.rotation);
        self.pose = Pose2d::new(
            self.pose.translation + field.translation() * dt,
            self.pose.rotation + Rotation2d::from_radians(field.omega * dt),
        );
    }

    fn pose(&self) -> Pose2d {
        self.pose
    }

    fn reset_odometry(&mut self, pose: Pose2d) {
        self.pose = pose;
    }

    fn robot_velocity(&self) -> ChassisSpeeds {
        self.speeds
    }

    fn max_speed(&self) -> f64 {
        self.max_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> SimSwerveDrive {
        let modules = [(0.3, 0.3), (0.3, -0.3), (-0.3, 0.3), (-0.3, -0.3)]
            .into_iter()
            .map(|(x, y)| Translation2d::new(x, y))
            .collect();
        SimSwerveDrive::new(modules, 4.0)
    }

    #[test]
    fn odometry_integrates_field_velocity() {
        let mut drive = square();
        drive.reset_odometry(Pose2d::new(Translation2d::default(), Rotation2d::from_degrees(90.0)));
        drive.drive_robot_relative(ChassisSpeeds::new(1.0, 0.0, 0.0));
        for _ in 0..50 {
            drive.update_odometry();
        }

        // Facing +y, driving forward for one second.
        let pose = drive.pose();
        assert!(pose.x().abs() < 1e-9);
        assert!((pose.y() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn module_speeds_are_desaturated() {
        let mut drive = square();
        drive.drive_robot_relative(ChassisSpeeds::new(8.0, 0.0, 0.0));
        assert!((drive.robot_velocity().vx - 4.0).abs() < 1e-9);

        drive.drive_robot_relative(ChassisSpeeds::new(0.0, 0.0, 20.0));
        let omega = drive.robot_velocity().omega;
        assert!((omega * 0.3f64.hypot(0.3) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn zero_gyro_keeps_translation() {
        let mut drive = square();
        drive.reset_odometry(Pose2d::new(Translation2d::new(1.0, 2.0), Rotation2d::from_degrees(45.0)));
        drive.zero_gyro();
        assert_eq!(drive.pose().translation, Translation2d::new(1.0, 2.0));
        assert_eq!(drive.pose().rotation, Rotation2d::default());
    }
}
