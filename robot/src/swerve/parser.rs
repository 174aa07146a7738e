use std::{
    fs,
    path::{Path, PathBuf},
};

use frc_command::geometry::{inches_to_meters, Translation2d};
use serde::{de::DeserializeOwned, Deserialize};
use snafu::{ensure, ResultExt, Snafu};

use super::SimSwerveDrive;

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Could not read swerve config {}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Malformed swerve config {}: {source}", path.display()))]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("{} lists no swerve modules", path.display()))]
    NoModules { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceJson {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: u32,
    #[serde(default)]
    pub canbus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwerveDriveJson {
    pub imu: DeviceJson,
    #[serde(default, rename = "invertedIMU")]
    pub inverted_imu: bool,
    /// Module file names, relative to the `modules` directory.
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MotorPair<T> {
    pub drive: T,
    pub angle: T,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalPropertiesJson {
    pub conversion_factor: MotorPair<f64>,
    pub current_limit: MotorPair<u32>,
    pub ramp_rate: MotorPair<f64>,
    pub wheel_grip_coefficient_of_friction: f64,
    pub optimal_voltage: f64,
}

/// Module position relative to the robot center, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LocationJson {
    pub front: f64,
    pub left: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleJson {
    pub drive: DeviceJson,
    pub angle: DeviceJson,
    pub encoder: DeviceJson,
    #[serde(default = "not_inverted")]
    pub inverted: MotorPair<bool>,
    pub absolute_encoder_offset: f64,
    pub location: LocationJson,
}

fn not_inverted() -> MotorPair<bool> {
    MotorPair {
        drive: false,
        angle: false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfig {
    pub name: String,
    pub json: ModuleJson,
}

impl ModuleConfig {
    /// Module position in meters, +x forward and +y left.
    pub fn location(&self) -> Translation2d {
        Translation2d::new(
            inches_to_meters(self.json.location.front),
            inches_to_meters(self.json.location.left),
        )
    }
}

/// Swerve configuration read from a directory laid out as:
///
/// ```text
/// swervedrive.json
/// modules/physicalproperties.json
/// modules/<module>.json ...
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SwerveParser {
    pub drive: SwerveDriveJson,
    pub physical_properties: PhysicalPropertiesJson,
    pub modules: Vec<ModuleConfig>,
}

fn read_json<T: DeserializeOwned>(path: PathBuf) -> Result<T, ConfigError> {
    let json = fs::read_to_string(&path).context(ReadSnafu { path: path.clone() })?;
    serde_json::from_str(&json).context(ParseSnafu { path })
}

impl SwerveParser {
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let directory = directory.as_ref();
        let drive_path = directory.join("swervedrive.json");
        let drive: SwerveDriveJson = read_json(drive_path.clone())?;
        ensure!(!drive.modules.is_empty(), NoModulesSnafu { path: drive_path });

        let modules_dir = directory.join("modules");
        let physical_properties = read_json(modules_dir.join("physicalproperties.json"))?;
        let modules = drive
            .modules
            .iter()
            .map(|name| -> Result<ModuleConfig, ConfigError> {
                Ok(ModuleConfig {
                    name: name.trim_end_matches(".json").to_owned(),
                    json: read_json(modules_dir.join(name))?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            directory = %directory.display(),
            modules = modules.len(),
            "swerve config loaded"
        );
        Ok(Self {
            drive,
            physical_properties,
            modules,
        })
    }

    pub fn create_swerve_drive(&self, max_speed: f64) -> SimSwerveDrive {
        SimSwerveDrive::new(
            self.modules.iter().map(ModuleConfig::location).collect(),
            max_speed,
        )
    }
}
