use std::rc::Rc;

use super::{HolonomicCallbacks, HolonomicPathFollowerConfig, Path, PathState, PidConstants};
use crate::{
    command::Command,
    geometry::{ChassisSpeeds, Pose2d},
    Result, SubsystemRef,
};

#[derive(Debug, Clone)]
pub struct PidController {
    constants: PidConstants,
    period: f64,
    integral: f64,
    previous_error: Option<f64>,
}

impl PidController {
    pub fn new(constants: PidConstants, period: f64) -> Self {
        Self {
            constants,
            period,
            integral: 0.0,
            previous_error: None,
        }
    }

    /// Output for the given setpoint-minus-measurement error.
    pub fn calculate(&mut self, error: f64) -> f64 {
        if error.abs() > self.constants.i_zone {
            self.integral = 0.0;
        } else {
            self.integral += error * self.period;
        }
        let derivative = self
            .previous_error
            .map_or(0.0, |previous| (error - previous) / self.period);
        self.previous_error = Some(error);

        self.constants.kp * error + self.constants.ki * self.integral + self.constants.kd * derivative
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
    }
}

/// Tracks a path state with feed-forward plus PID feedback on each axis.
#[derive(Debug, Clone)]
pub struct HolonomicDriveController {
    x: PidController,
    y: PidController,
    rotation: PidController,
    max_angular_velocity: f64,
}

impl HolonomicDriveController {
    pub fn new(config: &HolonomicPathFollowerConfig) -> Self {
        let period = config.period.as_secs_f64();
        Self {
            x: PidController::new(config.translation_constants, period),
            y: PidController::new(config.translation_constants, period),
            rotation: PidController::new(config.rotation_constants, period),
            max_angular_velocity: config.max_angular_velocity(),
        }
    }

    /// Robot-relative speeds that move `current` toward `target`.
    pub fn calculate(&mut self, current: Pose2d, target: &PathState) -> ChassisSpeeds {
        let feed_forward = target.velocity;
        let vx = feed_forward.vx + self.x.calculate(target.pose.x() - current.x());
        let vy = feed_forward.vy + self.y.calculate(target.pose.y() - current.y());
        let omega = (feed_forward.omega
            + self
                .rotation
                .calculate((target.pose.rotation - current.rotation).radians()))
        .clamp(-self.max_angular_velocity, self.max_angular_velocity);

        ChassisSpeeds::from_field_relative(ChassisSpeeds::new(vx, vy, omega), current.rotation)
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.rotation.reset();
    }
}

/// Follows a [`Path`] through the drivetrain callbacks registered with the auto builder.
pub struct FollowPathCommand {
    path: Path,
    active: Option<Path>,
    callbacks: Rc<HolonomicCallbacks>,
    controller: HolonomicDriveController,
    period: f64,
    ticks: u32,
    requirements: Vec<SubsystemRef>,
}

impl FollowPathCommand {
    pub fn new(
        path: Path,
        callbacks: Rc<HolonomicCallbacks>,
        config: HolonomicPathFollowerConfig,
        requirements: Vec<SubsystemRef>,
    ) -> Self {
        Self {
            path,
            active: None,
            controller: HolonomicDriveController::new(&config),
            callbacks,
            period: config.period.as_secs_f64(),
            ticks: 0,
            requirements,
        }
    }

    fn elapsed(&self) -> f64 {
        f64::from(self.ticks) * self.period
    }
}

impl Command for FollowPathCommand {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn initialize(&mut self) -> Result {
        let flip = (self.callbacks.should_flip_path)();
        let path = if flip {
            self.path.flipped()
        } else {
            self.path.clone()
        };
        if path.reset_odometry() {
            (self.callbacks.reset_pose)(path.start_pose());
        }
        tracing::info!(path = path.name(), flip, "following path");

        self.controller.reset();
        self.ticks = 0;
        self.active = Some(path);
        Ok(())
    }

    fn execute(&mut self) -> Result {
        let Some(path) = &self.active else {
            return Ok(());
        };
        let target = path.sample(self.elapsed());
        let pose = (self.callbacks.pose_supplier)();
        let speeds = self.controller.calculate(pose, &target);
        (self.callbacks.robot_relative_output)(speeds);
        self.ticks += 1;
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(self
            .active
            .as_ref()
            .map_or(true, |path| self.elapsed() > path.total_time()))
    }

    fn end(&mut self, interrupted: bool) -> Result {
        (self.callbacks.robot_relative_output)(ChassisSpeeds::default());
        let residual = (self.callbacks.robot_relative_speeds_supplier)();
        tracing::debug!(
            path = self.path.name(),
            interrupted,
            residual_speed = residual.translation().norm(),
            "path ended"
        );
        self.active = None;
        Ok(())
    }
}
