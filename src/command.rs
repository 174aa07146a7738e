use std::{
    cell::Cell,
    time::{Duration, Instant},
};

use crate::{CommandRef, CommandScheduler, Result, SubsystemRef};

pub mod button;

/// An action the robot can perform. Runs when scheduled, until it is interrupted or it finishes.
pub trait Command {
    fn get_requirements(&self) -> &[SubsystemRef];

    /// The initial subroutine of a command. Called once when the command is initially scheduled.
    fn initialize(&mut self) -> Result {
        Ok(())
    }
    fn execute(&mut self) -> Result {
        Ok(())
    }
    #[allow(unused_variables)]
    fn end(&mut self, interrupted: bool) -> Result {
        Ok(())
    }

    fn is_finished(&self) -> Result<bool> {
        Ok(false)
    }

    fn runs_when_disabled(&self) -> bool {
        false
    }

    fn get_interruption_behavior(&self) -> InterruptionBehavior {
        InterruptionBehavior::default()
    }

    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

pub trait CommandRefExt {
    fn schedule(&self) -> Result;
    fn cancel(&self) -> Result;
    fn is_scheduled(&self) -> bool;
}

impl CommandRefExt for CommandRef {
    fn schedule(&self) -> Result {
        CommandScheduler::schedule(self.clone())
    }

    fn cancel(&self) -> Result {
        CommandScheduler::cancel(self)
    }

    fn is_scheduled(&self) -> bool {
        CommandScheduler::is_scheduled(self)
    }
}

pub trait CommandExt: Command + Sized {
    /// Ends the command once `timeout` has elapsed since it was initialized.
    /// A command cut short this way sees `end(true)`.
    fn with_timeout(self, timeout: Duration) -> WithTimeout<Self> {
        WithTimeout {
            inner: self,
            timeout,
            started: None,
            expired: Cell::new(false),
        }
    }
}

impl<C: Command> CommandExt for C {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptionBehavior {
    #[default]
    CancelSelf,
    CancelIncoming,
}

pub struct FunctionalCommand {
    on_init: Box<dyn FnMut() -> Result>,
    on_execute: Box<dyn FnMut() -> Result>,
    on_end: Box<dyn FnMut(bool) -> Result>,
    is_finished: Box<dyn Fn() -> Result<bool>>,
    requirements: Vec<SubsystemRef>,
}

impl FunctionalCommand {
    pub fn new(
        on_init: impl FnMut() -> Result + 'static,
        on_execute: impl FnMut() -> Result + 'static,
        on_end: impl FnMut(bool) -> Result + 'static,
        is_finished: impl Fn() -> Result<bool> + 'static,
        requirements: Vec<SubsystemRef>,
    ) -> Self {
        Self {
            on_init: Box::new(on_init),
            on_execute: Box::new(on_execute),
            on_end: Box::new(on_end),
            is_finished: Box::new(is_finished),
            requirements,
        }
    }
}

impl Command for FunctionalCommand {
    fn get_requirements(&self) -> &[SubsystemRef] {
        &self.requirements
    }

    fn initialize(&mut self) -> Result {
        (self.on_init)()
    }

    fn execute(&mut self) -> Result {
        (self.on_execute)()
    }

    fn end(&mut self, interrupted: bool) -> Result {
        (self.on_end)(interrupted)
    }

    fn is_finished(&self) -> Result<bool> {
        (self.is_finished)()
    }
}

pub struct WithTimeout<C> {
    inner: C,
    timeout: Duration,
    started: Option<Instant>,
    expired: Cell<bool>,
}

impl<C: Command> Command for WithTimeout<C> {
    fn get_requirements(&self) -> &[SubsystemRef] {
        self.inner.get_requirements()
    }

    fn initialize(&mut self) -> Result {
        self.started = Some(Instant::now());
        self.expired.set(false);
        self.inner.initialize()
    }

    fn execute(&mut self) -> Result {
        self.inner.execute()
    }

    fn end(&mut self, interrupted: bool) -> Result {
        if self.expired.get() {
            tracing::warn!(command = self.inner.name(), timeout = ?self.timeout, "command timed out");
        }
        self.inner.end(interrupted || self.expired.get())
    }

    fn is_finished(&self) -> Result<bool> {
        if self.inner.is_finished()? {
            return Ok(true);
        }
        let expired = self
            .started
            .is_some_and(|started| started.elapsed() >= self.timeout);
        self.expired.set(expired);
        Ok(expired)
    }

    fn runs_when_disabled(&self) -> bool {
        self.inner.runs_when_disabled()
    }

    fn get_interruption_behavior(&self) -> InterruptionBehavior {
        self.inner.get_interruption_behavior()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[macro_export]
macro_rules! run_once {
    ($on_init:block) => {
        $crate::command::FunctionalCommand::new(move || $on_init, || Ok(()), |_| Ok(()), || Ok(true), vec![])
    };
    ($on_init:block, $($requirement:expr),+ $(,)?) => {
        $crate::command::FunctionalCommand::new(move || $on_init, || Ok(()), |_| Ok(()), || Ok(true), vec![$($requirement),+])
    };
}

#[macro_export]
macro_rules! run {
    ($on_execute:block) => {
        $crate::command::FunctionalCommand::new(
            || Ok(()),
            move || $on_execute,
            |_| Ok(()),
            || Ok(false),
            vec![],
        )
    };
    ($on_execute:block, $($requirement:expr),+ $(,)?) => {
        $crate::command::FunctionalCommand::new(
            || Ok(()),
            move || $on_execute,
            |_| Ok(()),
            || Ok(false),
            vec![$($requirement),+],
        )
    };
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    struct Forever {
        ended: Rc<RefCell<Vec<bool>>>,
    }

    impl Command for Forever {
        fn get_requirements(&self) -> &[SubsystemRef] {
            &[]
        }

        fn end(&mut self, interrupted: bool) -> Result {
            self.ended.borrow_mut().push(interrupted);
            Ok(())
        }
    }

    #[test]
    fn timeout_finishes_and_reports_interruption() {
        let ended = Rc::new(RefCell::new(Vec::new()));
        let mut command = Forever {
            ended: ended.clone(),
        }
        .with_timeout(Duration::ZERO);

        command.initialize().unwrap();
        assert!(command.is_finished().unwrap());
        command.end(false).unwrap();
        assert_eq!(*ended.borrow(), vec![true]);
    }

    #[test]
    fn timeout_does_not_fire_early() {
        let mut command = Forever {
            ended: Rc::default(),
        }
        .with_timeout(Duration::from_secs(3600));

        command.initialize().unwrap();
        command.execute().unwrap();
        assert!(!command.is_finished().unwrap());
    }

    #[test]
    fn run_once_finishes_after_init() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let mut command = run_once!({
            counter.set(counter.get() + 1);
            Ok(())
        });

        command.initialize().unwrap();
        assert_eq!(hits.get(), 1);
        assert!(command.is_finished().unwrap());
    }
}
