//! Holonomic autonomous path following.
//!
//! A drivetrain hands the [`AutoBuilder`] a [`HolonomicCallbacks`] bundle
//! (pose in/out, robot-relative velocity in/out, and the mirroring predicate)
//! together with its tuning constants. Path commands built afterwards drive
//! the robot exclusively through those callbacks.

use std::{cell::RefCell, rc::Rc, time::Duration};

use snafu::{ensure, OptionExt, Snafu};

use crate::{
    geometry::{ChassisSpeeds, Pose2d},
    SubsystemRef,
};

mod follow;
mod path;

pub use follow::{FollowPathCommand, HolonomicDriveController, PidController};
pub use path::{Path, PathError, PathState, FIELD_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidConstants {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Integral accumulation is reset while the error is outside this band.
    pub i_zone: f64,
}

impl PidConstants {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            i_zone: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplanningConfig {
    pub enable_initial_replanning: bool,
    pub enable_dynamic_replanning: bool,
    pub dynamic_replanning_total_error_threshold: f64,
    pub dynamic_replanning_error_spike_threshold: f64,
}

impl Default for ReplanningConfig {
    fn default() -> Self {
        Self {
            enable_initial_replanning: true,
            enable_dynamic_replanning: false,
            dynamic_replanning_total_error_threshold: 1.0,
            dynamic_replanning_error_spike_threshold: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HolonomicPathFollowerConfig {
    pub translation_constants: PidConstants,
    pub rotation_constants: PidConstants,
    /// Fastest a single module may move, in m/s.
    pub max_module_speed: f64,
    /// Distance from the robot center to the furthest module, in meters.
    pub drive_base_radius: f64,
    pub replanning_config: ReplanningConfig,
    pub period: Duration,
}

impl HolonomicPathFollowerConfig {
    pub fn new(
        translation_constants: PidConstants,
        rotation_constants: PidConstants,
        max_module_speed: f64,
        drive_base_radius: f64,
        replanning_config: ReplanningConfig,
    ) -> Self {
        Self {
            translation_constants,
            rotation_constants,
            max_module_speed,
            drive_base_radius,
            replanning_config,
            period: crate::robot::ITERATION_PERIOD,
        }
    }

    /// Rotation rate at which the furthest module reaches `max_module_speed`.
    pub fn max_angular_velocity(&self) -> f64 {
        self.max_module_speed / self.drive_base_radius
    }
}

/// The capabilities a drivetrain exposes to the path follower.
pub struct HolonomicCallbacks {
    pub pose_supplier: Box<dyn Fn() -> Pose2d>,
    pub reset_pose: Box<dyn Fn(Pose2d)>,
    /// Must report speeds in the robot's own frame.
    pub robot_relative_speeds_supplier: Box<dyn Fn() -> ChassisSpeeds>,
    /// Receives speeds in the robot's own frame.
    pub robot_relative_output: Box<dyn Fn(ChassisSpeeds)>,
    /// True when paths should be mirrored to the red side of the field.
    pub should_flip_path: Box<dyn Fn() -> bool>,
}

#[derive(Debug, Snafu)]
pub enum AutoBuilderError {
    #[snafu(display("The auto builder has already been configured."))]
    AlreadyConfigured,
    #[snafu(display("The auto builder has not been configured by a drivetrain."))]
    NotConfigured,
}

struct Configured {
    callbacks: Rc<HolonomicCallbacks>,
    config: HolonomicPathFollowerConfig,
    requirement: SubsystemRef,
}

thread_local! {
    static BUILDER: RefCell<Option<Configured>> = const { RefCell::new(None) };
}

pub struct AutoBuilder;

impl AutoBuilder {
    /// Registers the drivetrain used by every path command. May only be called once.
    pub fn configure_holonomic(
        callbacks: HolonomicCallbacks,
        config: HolonomicPathFollowerConfig,
        requirement: SubsystemRef,
    ) -> Result<(), AutoBuilderError> {
        BUILDER.with(|builder| {
            let mut builder = builder.borrow_mut();
            ensure!(builder.is_none(), AlreadyConfiguredSnafu);
            tracing::debug!(?config, "auto builder configured");
            *builder = Some(Configured {
                callbacks: Rc::new(callbacks),
                config,
                requirement,
            });
            Ok(())
        })
    }

    pub fn is_configured() -> bool {
        BUILDER.with(|builder| builder.borrow().is_some())
    }

    pub fn config() -> Result<HolonomicPathFollowerConfig, AutoBuilderError> {
        BUILDER.with(|builder| {
            builder
                .borrow()
                .as_ref()
                .map(|configured| configured.config)
                .context(NotConfiguredSnafu)
        })
    }

    pub fn should_flip_path() -> Result<bool, AutoBuilderError> {
        Ok((Self::callbacks()?.should_flip_path)())
    }

    /// Builds a command that drives `path` with the registered drivetrain.
    pub fn follow_path(path: Path) -> Result<FollowPathCommand, AutoBuilderError> {
        BUILDER.with(|builder| {
            let builder = builder.borrow();
            let configured = builder.as_ref().context(NotConfiguredSnafu)?;
            Ok(FollowPathCommand::new(
                path,
                configured.callbacks.clone(),
                configured.config,
                vec![configured.requirement.clone()],
            ))
        })
    }

    fn callbacks() -> Result<Rc<HolonomicCallbacks>, AutoBuilderError> {
        BUILDER.with(|builder| {
            builder
                .borrow()
                .as_ref()
                .map(|configured| configured.callbacks.clone())
                .context(NotConfiguredSnafu)
        })
    }
}
