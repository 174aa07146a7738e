use std::{cell::RefCell, fmt::Debug, rc::Rc};

use crate::{command::FunctionalCommand, run, run_once, CommandScheduler, Result, SubsystemRef};

/// A collection of robot parts and other hardware that act together as a whole.
pub trait Subsystem: Debug {
    /// This method will be called once per scheduler run
    fn periodic(&mut self) {}
    /// This method will be called once per scheduler run, but only during simulation
    fn sim_periodic(&mut self) {}

    fn register(self) -> Rc<RefCell<Self>>
    where
        Self: Sized + 'static,
    {
        CommandScheduler::register(self)
    }
}

pub trait SubsystemRefExt {
    /// A command requiring this subsystem that runs `action` once and finishes.
    fn run_once(&self, action: impl FnMut() -> Result + 'static) -> FunctionalCommand;
    /// A command requiring this subsystem that runs `action` every cycle until interrupted.
    fn run(&self, action: impl FnMut() -> Result + 'static) -> FunctionalCommand;
}

impl<T> SubsystemRefExt for Rc<RefCell<T>>
where
    T: Subsystem + 'static,
{
    fn run_once(&self, mut action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        run_once!({ action() }, SubsystemRef(self.clone()))
    }
    fn run(&self, mut action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        run!({ action() }, SubsystemRef(self.clone()))
    }
}

impl SubsystemRefExt for SubsystemRef {
    fn run_once(&self, mut action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        run_once!({ action() }, self.clone())
    }
    fn run(&self, mut action: impl FnMut() -> Result + 'static) -> FunctionalCommand {
        run!({ action() }, self.clone())
    }
}
