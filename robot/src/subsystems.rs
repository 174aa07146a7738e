pub mod arm;
pub mod drivetrain;
pub mod intake;
