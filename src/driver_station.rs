//! Match state reported by the driver station.

use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alliance {
    Red,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
}

thread_local! {
    static ALLIANCE: Cell<Option<Alliance>> = const { Cell::new(None) };
    static MODE: Cell<Mode> = const { Cell::new(Mode::Disabled) };
}

/// The alliance for the current match, `None` until the field reports it.
pub fn alliance() -> Option<Alliance> {
    ALLIANCE.with(Cell::get)
}

pub fn set_alliance(alliance: Option<Alliance>) {
    tracing::debug!(?alliance, "alliance updated");
    ALLIANCE.with(|cell| cell.set(alliance));
}

pub fn mode() -> Mode {
    MODE.with(Cell::get)
}

pub fn set_mode(mode: Mode) {
    MODE.with(|cell| cell.set(mode));
}

pub fn is_disabled() -> bool {
    mode() == Mode::Disabled
}
