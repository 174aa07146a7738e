use std::{fs, path::PathBuf};

use serde::Deserialize;
use snafu::{ensure, ResultExt, Snafu};

use crate::geometry::{ChassisSpeeds, Pose2d, Rotation2d, Translation2d};

/// Length of the field along x, in meters. Mirroring reflects across `x = FIELD_LENGTH / 2`.
pub const FIELD_LENGTH: f64 = 16.54;

#[derive(Debug, Snafu)]
pub enum PathError {
    #[snafu(display("Could not read path file {}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Malformed path file: {source}"))]
    Parse { source: serde_json::Error },
    #[snafu(display("A path needs at least one state."))]
    Empty,
    #[snafu(display("Path state {index} does not advance in time."))]
    NonMonotonic { index: usize },
}

/// Target robot state at a point in time along a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathState {
    /// Seconds since the start of the path.
    pub time: f64,
    pub pose: Pose2d,
    /// Field-relative feed-forward velocity.
    pub velocity: ChassisSpeeds,
}

impl PathState {
    fn flipped(&self) -> Self {
        Self {
            time: self.time,
            pose: Pose2d::new(
                Translation2d::new(FIELD_LENGTH - self.pose.x(), self.pose.y()),
                Rotation2d::from_radians(core::f64::consts::PI - self.pose.rotation.radians()),
            ),
            velocity: ChassisSpeeds::new(-self.velocity.vx, self.velocity.vy, -self.velocity.omega),
        }
    }

    fn interpolate(&self, end: &Self, t: f64) -> Self {
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        let rotation = self.pose.rotation
            + Rotation2d::from_radians((end.pose.rotation - self.pose.rotation).radians() * t);
        Self {
            time: lerp(self.time, end.time),
            pose: Pose2d::new(
                Translation2d::new(lerp(self.pose.x(), end.pose.x()), lerp(self.pose.y(), end.pose.y())),
                rotation,
            ),
            velocity: ChassisSpeeds::new(
                lerp(self.velocity.vx, end.velocity.vx),
                lerp(self.velocity.vy, end.velocity.vy),
                lerp(self.velocity.omega, end.velocity.omega),
            ),
        }
    }
}

#[derive(Deserialize)]
struct PathFile {
    name: String,
    #[serde(default = "reset_odometry_default")]
    reset_odometry: bool,
    states: Vec<StateFile>,
}

fn reset_odometry_default() -> bool {
    true
}

#[derive(Deserialize)]
struct StateFile {
    time: f64,
    x: f64,
    y: f64,
    heading_deg: f64,
    #[serde(default)]
    vx: f64,
    #[serde(default)]
    vy: f64,
    #[serde(default)]
    omega: f64,
}

/// A time-parameterized trajectory in blue-alliance field coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    name: String,
    states: Vec<PathState>,
    reset_odometry: bool,
}

impl Path {
    pub fn new(
        name: impl Into<String>,
        states: Vec<PathState>,
        reset_odometry: bool,
    ) -> Result<Self, PathError> {
        ensure!(!states.is_empty(), EmptySnafu);
        for (index, pair) in states.windows(2).enumerate() {
            ensure!(
                pair[1].time > pair[0].time,
                NonMonotonicSnafu { index: index + 1 }
            );
        }
        Ok(Self {
            name: name.into(),
            states,
            reset_odometry,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, PathError> {
        let file: PathFile = serde_json::from_str(json).context(ParseSnafu)?;
        let states = file
            .states
            .into_iter()
            .map(|state| PathState {
                time: state.time,
                pose: Pose2d::new(
                    Translation2d::new(state.x, state.y),
                    Rotation2d::from_degrees(state.heading_deg),
                ),
                velocity: ChassisSpeeds::new(state.vx, state.vy, state.omega),
            })
            .collect();
        Self::new(file.name, states, file.reset_odometry)
    }

    pub fn from_json_file(path: impl Into<PathBuf>) -> Result<Self, PathError> {
        let path = path.into();
        let json = fs::read_to_string(&path).context(ReadSnafu { path })?;
        Self::from_json_str(&json)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[PathState] {
        &self.states
    }

    /// Whether following the path seeds odometry with its starting pose.
    pub fn reset_odometry(&self) -> bool {
        self.reset_odometry
    }

    pub fn start_pose(&self) -> Pose2d {
        self.states[0].pose
    }

    pub fn total_time(&self) -> f64 {
        self.states[self.states.len() - 1].time
    }

    /// Target state at `time`, clamped to the ends of the path.
    pub fn sample(&self, time: f64) -> PathState {
        let first = &self.states[0];
        if time <= first.time {
            return *first;
        }
        let after = self.states.partition_point(|state| state.time <= time);
        match self.states.get(after) {
            None => self.states[self.states.len() - 1],
            Some(end) => {
                let start = &self.states[after - 1];
                start.interpolate(end, (time - start.time) / (end.time - start.time))
            }
        }
    }

    /// The same path mirrored onto the red half of the field. The origin stays on the blue side.
    pub fn flipped(&self) -> Self {
        Self {
            name: self.name.clone(),
            states: self.states.iter().map(PathState::flipped).collect(),
            reset_odometry: self.reset_odometry,
        }
    }
}
