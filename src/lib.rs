use std::{
    cell::{Cell, RefCell},
    error::Error,
    hash::Hash,
    ops::Deref,
    rc::Rc,
};

use command::{Command, InterruptionBehavior};
use event::EventLoop;
use hashbrown::{HashMap, HashSet};
use snafu::Snafu;
use subsystem::Subsystem;

pub mod auto;
pub mod command;
pub mod controller;
pub mod dashboard;
pub mod driver_station;
pub mod event;
pub mod geometry;
pub mod robot;
pub mod subsystem;

pub mod prelude {
    pub use crate::{
        command::{Command, CommandExt, CommandRefExt},
        subsystem::{Subsystem, SubsystemRefExt},
        CommandRef, CommandScheduler, Result, SubsystemRef,
    };
}

/// Result type returned by command and robot hooks.
pub type Result<T = (), E = Box<dyn Error>> = core::result::Result<T, E>;

#[derive(Clone)]
pub struct SubsystemRef(pub Rc<RefCell<dyn Subsystem>>);

impl PartialEq for SubsystemRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SubsystemRef {}

impl Hash for SubsystemRef {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).cast::<()>().hash(state);
    }
}

impl From<Rc<RefCell<dyn Subsystem>>> for SubsystemRef {
    fn from(subsystem: Rc<RefCell<dyn Subsystem>>) -> Self {
        Self(subsystem)
    }
}

impl<T: Subsystem + 'static> From<T> for SubsystemRef {
    fn from(subsystem: T) -> Self {
        Self(Rc::new(RefCell::new(subsystem)))
    }
}

impl Deref for SubsystemRef {
    type Target = Rc<RefCell<dyn Subsystem>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Clone)]
pub struct CommandRef(pub Rc<RefCell<dyn Command>>);

impl PartialEq for CommandRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for CommandRef {}

impl Hash for CommandRef {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).cast::<()>().hash(state);
    }
}

impl From<Rc<RefCell<dyn Command>>> for CommandRef {
    fn from(command: Rc<RefCell<dyn Command>>) -> Self {
        Self(command)
    }
}

impl<T: Command + 'static> From<T> for CommandRef {
    fn from(command: T) -> Self {
        Self(Rc::new(RefCell::new(command)))
    }
}

impl Deref for CommandRef {
    type Target = Rc<RefCell<dyn Command>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Snafu)]
pub enum SetDefaultCommandError {
    #[snafu(display("Default commands must require their subsystem."))]
    MustRequireSubsystem,
    #[snafu(display("Cannot set the default command on a subsystem that is not registered."))]
    NotRegistered,
}

#[derive(Default)]
struct CommandSchedulerState {
    subsystems: RefCell<HashMap<SubsystemRef, Option<CommandRef>>>,
    in_run_loop: Cell<bool>,
    to_schedule: RefCell<Vec<CommandRef>>,
    to_cancel: RefCell<Vec<CommandRef>>,
    scheduled_commands: RefCell<HashSet<CommandRef>>,
    requirements: RefCell<HashMap<SubsystemRef, CommandRef>>,
    button_loop: Rc<RefCell<EventLoop>>,
    ending_commands: RefCell<HashSet<CommandRef>>,
}

impl CommandSchedulerState {
    #[inline]
    fn is_scheduled(&self, command: &CommandRef) -> bool {
        self.scheduled_commands.borrow().contains(command)
    }

    fn requiring(&self, subsystem: &SubsystemRef) -> Option<CommandRef> {
        self.requirements.borrow().get(subsystem).cloned()
    }

    fn init_command(&self, command: CommandRef, requirements: HashSet<SubsystemRef>) -> Result {
        self.requirements
            .borrow_mut()
            .extend(requirements.into_iter().map(|r| (r, command.clone())));
        self.scheduled_commands.borrow_mut().insert(command.clone());

        let mut command = command.0.borrow_mut();
        tracing::debug!(command = command.name(), "command initialized");
        command.initialize()
    }

    /// Ends a scheduled command and releases the subsystems it holds.
    fn end_command(&self, command: &CommandRef, interrupted: bool) -> Result {
        self.ending_commands.borrow_mut().insert(command.clone());
        let result = command.0.borrow_mut().end(interrupted);
        self.ending_commands.borrow_mut().remove(command);
        self.scheduled_commands.borrow_mut().remove(command);

        let requirements = CommandScheduler::requirements_of(&*command.0.borrow());
        let mut held = self.requirements.borrow_mut();
        for requirement in requirements {
            if held.get(&requirement) == Some(command) {
                held.remove(&requirement);
            }
        }

        tracing::debug!(
            command = command.0.borrow().name(),
            interrupted,
            "command ended"
        );
        result
    }

    fn cancel(&self, command: &CommandRef) -> Result {
        if self.ending_commands.borrow().contains(command) {
            return Ok(());
        }

        if self.in_run_loop.get() {
            self.to_cancel.borrow_mut().push(command.clone());
            return Ok(());
        }

        if !self.is_scheduled(command) {
            return Ok(());
        }

        self.end_command(command, true)
    }

    fn schedule_now(&self, command: CommandRef) -> Result {
        if self.is_scheduled(&command) {
            return Ok(());
        }

        if driver_station::is_disabled() && !command.0.borrow().runs_when_disabled() {
            return Ok(());
        }

        let requirements = CommandScheduler::requirements_of(&*command.0.borrow());
        let requiring_commands = {
            let mut requiring = Vec::new();
            for requirement in &requirements {
                if let Some(holder) = self.requiring(requirement) {
                    if !requiring.contains(&holder) {
                        requiring.push(holder);
                    }
                }
            }
            requiring
        };

        for requiring in &requiring_commands {
            if requiring.0.borrow().get_interruption_behavior()
                == InterruptionBehavior::CancelIncoming
            {
                return Ok(());
            }
        }

        for requiring in &requiring_commands {
            self.cancel(requiring)?;
        }

        self.init_command(command, requirements)
    }
}

thread_local! {
    static STATE: CommandSchedulerState = CommandSchedulerState::default();
}

pub struct CommandScheduler;

impl CommandScheduler {
    /// Register a subsystem with the scheduler.
    pub fn register<S: Subsystem + 'static>(subsystem: S) -> Rc<RefCell<S>> {
        let subsystem = Rc::new(RefCell::new(subsystem));
        STATE.with(|state| {
            state
                .subsystems
                .borrow_mut()
                .insert(SubsystemRef(subsystem.clone()), None);
        });
        subsystem
    }

    /// Schedule a command to run.
    pub fn schedule(command: impl Into<CommandRef>) -> Result {
        let command = command.into();
        STATE.with(|state| {
            if state.in_run_loop.get() {
                state.to_schedule.borrow_mut().push(command);
                return Ok(());
            }

            state.schedule_now(command)
        })
    }

    pub fn cancel(command: &CommandRef) -> Result {
        STATE.with(|state| state.cancel(command))
    }

    pub fn set_default_command<S>(
        subsystem: &Rc<RefCell<S>>,
        command: impl Command + 'static,
    ) -> Result<(), SetDefaultCommandError>
    where
        S: Subsystem + 'static,
    {
        STATE.with(|state| {
            let key = SubsystemRef(subsystem.clone());
            let requirements = CommandScheduler::requirements_of(&command);
            if !requirements.contains(&key) {
                return Err(SetDefaultCommandError::MustRequireSubsystem);
            }

            let command = CommandRef(Rc::new(RefCell::new(command)));
            state
                .subsystems
                .borrow_mut()
                .get_mut(&key)
                .ok_or(SetDefaultCommandError::NotRegistered)?
                .replace(command);

            Ok(())
        })
    }

    pub fn remove_default_command<S>(subsystem: &Rc<RefCell<S>>) -> Option<CommandRef>
    where
        S: Subsystem + 'static,
    {
        STATE.with(|state| {
            state
                .subsystems
                .borrow_mut()
                .get_mut(&SubsystemRef(subsystem.clone()))?
                .take()
        })
    }

    pub fn run() -> Result {
        STATE.with(|state| {
            let sim = robot::is_sim();
            for subsystem in state.subsystems.borrow().keys() {
                let mut subsystem = subsystem.0.borrow_mut();
                subsystem.periodic();
                if sim {
                    subsystem.sim_periodic();
                }
            }

            let button_loop = state.button_loop.clone();
            button_loop.borrow_mut().poll();

            state.in_run_loop.set(true);
            let disabled = driver_station::is_disabled();

            let scheduled_commands = state
                .scheduled_commands
                .borrow()
                .iter()
                .cloned()
                .collect::<Vec<_>>();

            for command in scheduled_commands {
                if disabled && !command.0.borrow().runs_when_disabled() {
                    if let Err(err) = state.end_command(&command, true) {
                        Self::report(&command, &*err);
                    }
                } else if let Err(err) = Self::step(state, &command) {
                    Self::interrupt_failed(state, &command, &*err);
                }
            }

            state.in_run_loop.set(false);

            let to_schedule = state.to_schedule.take();
            for command in to_schedule {
                if let Err(err) = state.schedule_now(command.clone()) {
                    Self::interrupt_failed(state, &command, &*err);
                }
            }

            let to_cancel = state.to_cancel.take();
            for command in to_cancel {
                if let Err(err) = state.cancel(&command) {
                    Self::report(&command, &*err);
                }
            }

            // Add default commands for un-required registered subsystems.
            let defaults = state
                .subsystems
                .borrow()
                .iter()
                .filter(|(subsystem, _)| !state.requirements.borrow().contains_key(*subsystem))
                .filter_map(|(_, command)| command.clone())
                .collect::<Vec<_>>();
            for default_command in defaults {
                if let Err(err) = state.schedule_now(default_command.clone()) {
                    Self::interrupt_failed(state, &default_command, &*err);
                }
            }

            Ok(())
        })
    }

    /// Executes one scheduled command and ends it if it reports completion.
    fn step(state: &CommandSchedulerState, command: &CommandRef) -> Result {
        let finished = {
            let mut command = command.0.borrow_mut();
            command.execute()?;
            command.is_finished()?
        };
        if finished {
            state.end_command(command, false)?;
        }
        Ok(())
    }

    fn report(command: &CommandRef, err: &dyn Error) {
        tracing::error!(command = command.0.borrow().name(), %err, "command failed");
    }

    /// Logs a failed command and interrupts it so the rest of the robot keeps running.
    fn interrupt_failed(state: &CommandSchedulerState, command: &CommandRef, err: &dyn Error) {
        Self::report(command, err);
        if state.is_scheduled(command) {
            if let Err(err) = state.end_command(command, true) {
                Self::report(command, &*err);
            }
        }
    }

    fn requirements_of(command: &dyn Command) -> HashSet<SubsystemRef> {
        command.get_requirements().iter().cloned().collect()
    }

    /// Whether a scheduled command currently holds the subsystem.
    pub fn is_required(subsystem: &SubsystemRef) -> bool {
        STATE.with(|state| state.requirements.borrow().contains_key(subsystem))
    }

    pub fn cancel_all() -> Result {
        STATE.with(|state| {
            let scheduled_commands = state
                .scheduled_commands
                .borrow()
                .iter()
                .cloned()
                .collect::<Vec<_>>();

            for command in scheduled_commands {
                state.cancel(&command)?;
            }

            Ok(())
        })
    }

    pub fn button_event_loop() -> Rc<RefCell<EventLoop>> {
        STATE.with(|state| state.button_loop.clone())
    }

    pub fn is_scheduled(command: &CommandRef) -> bool {
        STATE.with(|state| state.is_scheduled(command))
    }
}
