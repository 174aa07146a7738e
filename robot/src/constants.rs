//! Tuning constants for the robot program.

pub mod intake {
    /// Output used to push a note back out of the intake.
    pub const REVERSE_POWER: f64 = 0.2;
}

pub mod wrist {
    /// Wrist setpoint for intaking, in the mechanism's native angle units.
    pub const INTAKE_ANGLE: f64 = 14.0;
    pub const TOLERANCE: f64 = 2.0;
}

pub mod drivetrain {
    use frc_command::auto::PidConstants;

    /// Swerve configuration directory, relative to the deploy directory.
    pub const CONFIG_DIRECTORY: &str = "swerve";
    pub const MAX_SPEED_FEET_PER_SECOND: f64 = 1.0;

    pub const TRANSLATION_PID: PidConstants = PidConstants::new(5.0, 0.0, 0.0);
    pub const ROTATION_PID: PidConstants = PidConstants::new(5.0, 0.0, 0.0);
    /// m/s
    pub const MAX_MODULE_SPEED: f64 = 4.5;
    /// Distance from the robot center to the furthest module, in meters.
    pub const DRIVE_BASE_RADIUS: f64 = 0.4;
}

pub mod auto {
    /// Path followed in autonomous, relative to the deploy directory.
    pub const PATH: &str = "paths/leave_start_line.json";
}

pub mod operator {
    pub const DRIVER_PORT: u8 = 0;
    pub const DEADBAND: f64 = 0.1;
}

pub mod timeouts {
    use std::time::Duration;

    pub const BACK_OUT_NOTE: Duration = Duration::from_secs(3);
    pub const WRIST_TO_INTAKE: Duration = Duration::from_secs(2);
}
