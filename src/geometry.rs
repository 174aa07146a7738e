//! Planar geometry and chassis velocities.
//!
//! Field coordinates follow the usual convention: +x away from the blue
//! alliance wall, +y to the left, counter-clockwise positive rotation.

use core::{
    f64::consts::PI,
    ops::{Add, Mul, Neg, Sub},
};

pub fn feet_to_meters(feet: f64) -> f64 {
    feet * 0.3048
}

pub fn inches_to_meters(inches: f64) -> f64 {
    inches * 0.0254
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Translation2d {
    pub x: f64,
    pub y: f64,
}

impl Translation2d {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn rotate_by(&self, rotation: Rotation2d) -> Self {
        let (sin, cos) = rotation.radians().sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).norm()
    }
}

impl Add for Translation2d {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Translation2d {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Translation2d {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Translation2d {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A heading, kept normalized to `(-pi, pi]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation2d {
    radians: f64,
}

impl Rotation2d {
    pub fn from_radians(radians: f64) -> Self {
        let mut wrapped = radians.rem_euclid(2.0 * PI);
        if wrapped > PI {
            wrapped -= 2.0 * PI;
        }
        Self { radians: wrapped }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees.to_radians())
    }

    pub fn radians(&self) -> f64 {
        self.radians
    }

    pub fn degrees(&self) -> f64 {
        self.radians.to_degrees()
    }
}

impl Add for Rotation2d {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_radians(self.radians + rhs.radians)
    }
}

impl Sub for Rotation2d {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_radians(self.radians - rhs.radians)
    }
}

impl Neg for Rotation2d {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_radians(-self.radians)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2d {
    pub translation: Translation2d,
    pub rotation: Rotation2d,
}

impl Pose2d {
    pub const fn new(translation: Translation2d, rotation: Rotation2d) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }
}

/// Chassis velocity: `vx`/`vy` in m/s, `omega` in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChassisSpeeds {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl ChassisSpeeds {
    pub const fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// Converts field-frame speeds into the frame of a robot facing `heading`.
    pub fn from_field_relative(field: Self, heading: Rotation2d) -> Self {
        let robot = Translation2d::new(field.vx, field.vy).rotate_by(-heading);
        Self::new(robot.x, robot.y, field.omega)
    }

    /// Converts speeds in the frame of a robot facing `heading` into the field frame.
    pub fn to_field_relative(&self, heading: Rotation2d) -> Self {
        let field = Translation2d::new(self.vx, self.vy).rotate_by(heading);
        Self::new(field.x, field.y, self.omega)
    }

    pub fn translation(&self) -> Translation2d {
        Translation2d::new(self.vx, self.vy)
    }
}

impl Mul<f64> for ChassisSpeeds {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.vx * rhs, self.vy * rhs, self.omega * rhs)
    }
}
