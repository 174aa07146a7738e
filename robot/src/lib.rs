pub mod commands;
pub mod constants;
pub mod hardware;
pub mod robot;
pub mod subsystems;
pub mod swerve;
