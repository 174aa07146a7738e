use std::{
    env,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use crate::{
    driver_station::{self, Mode},
    Result,
};

/// Returns true if the code is running on a real robot and not in simulation.
pub const fn is_real() -> bool {
    cfg!(all(target_arch = "arm", target_os = "linux"))
}

/// Returns true if the code is running in simulation and not on a real robot.
pub const fn is_sim() -> bool {
    !is_real()
}

/// Directory holding files deployed alongside the robot program.
///
/// Honors `FRC_DEPLOY_DIR`, otherwise `deploy` under the working directory.
pub fn deploy_directory() -> PathBuf {
    env::var_os("FRC_DEPLOY_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("deploy"))
}

pub trait ScheduledRobot {
    fn robot_init(&mut self) -> Result {
        Ok(())
    }
    fn periodic(&mut self) -> Result {
        Ok(())
    }
    fn sim_periodic(&mut self) -> Result {
        Ok(())
    }
    fn disabled_init(&mut self) -> Result {
        Ok(())
    }
    fn disabled_periodic(&mut self) -> Result {
        Ok(())
    }
    fn autonomous_init(&mut self) -> Result {
        Ok(())
    }
    fn autonomous_periodic(&mut self) -> Result {
        Ok(())
    }
    fn teleop_init(&mut self) -> Result {
        Ok(())
    }
    fn teleop_periodic(&mut self) -> Result {
        Ok(())
    }
}

pub const ITERATION_PERIOD: Duration = Duration::from_millis(20);

/// Runs one iteration of the robot loop, entering a mode's init hook when the mode changes.
pub fn step_robot(robot: &mut impl ScheduledRobot, previous_mode: &mut Option<Mode>) -> Result {
    let current_mode = driver_station::mode();
    if *previous_mode != Some(current_mode) {
        tracing::info!(mode = ?current_mode, "entering mode");
    }
    match current_mode {
        Mode::Disabled => {
            if *previous_mode != Some(Mode::Disabled) {
                robot.disabled_init()?;
            }
            robot.disabled_periodic()?;
        }
        Mode::Autonomous => {
            if *previous_mode != Some(Mode::Autonomous) {
                robot.autonomous_init()?;
            }
            robot.autonomous_periodic()?;
        }
        Mode::Teleop => {
            if *previous_mode != Some(Mode::Teleop) {
                robot.teleop_init()?;
            }
            robot.teleop_periodic()?;
        }
    }
    *previous_mode = Some(current_mode);

    robot.periodic()?;
    if is_sim() {
        robot.sim_periodic()?;
    }
    Ok(())
}

pub fn start_robot(mut robot: impl ScheduledRobot) -> Result {
    robot.robot_init()?;

    let mut previous_mode = None;
    let mut next_tick = Instant::now();

    loop {
        if let Err(err) = step_robot(&mut robot, &mut previous_mode) {
            tracing::error!(%err, "robot loop iteration failed");
        }

        next_tick += ITERATION_PERIOD;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            tracing::warn!(overrun = ?(now - next_tick), "loop overrun");
            next_tick = now;
        }
    }
}
