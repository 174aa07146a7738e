use std::{cell::RefCell, rc::Rc};

use super::CommandRefExt;
use crate::{
    controller::{Button, Controller},
    event::EventLoop,
    CommandRef, CommandScheduler, Result,
};

fn report(action: &str, command: &CommandRef, result: Result) {
    if let Err(err) = result {
        tracing::error!(command = command.0.borrow().name(), %err, "failed to {action} bound command");
    }
}

pub struct Trigger {
    event_loop: Rc<RefCell<EventLoop>>,
    condition: Rc<dyn Fn() -> bool>,
}

impl Trigger {
    pub fn new_with_loop(
        event_loop: Rc<RefCell<EventLoop>>,
        condition: impl Fn() -> bool + 'static,
    ) -> Self {
        Self {
            event_loop,
            condition: Rc::new(condition),
        }
    }

    pub fn new(condition: impl Fn() -> bool + 'static) -> Self {
        Self::new_with_loop(CommandScheduler::button_event_loop(), condition)
    }

    pub fn on_true(self, command: impl Into<CommandRef>) -> Self {
        let command = command.into();
        let condition = self.condition.clone();
        let mut pressed_last = condition();
        self.event_loop.borrow_mut().bind(move || {
            let pressed = condition();
            if !pressed_last && pressed {
                report("schedule", &command, command.schedule());
            }
            pressed_last = pressed;
        });
        self
    }

    pub fn on_false(self, command: impl Into<CommandRef>) -> Self {
        let command = command.into();
        let condition = self.condition.clone();
        let mut pressed_last = condition();
        self.event_loop.borrow_mut().bind(move || {
            let pressed = condition();
            if pressed_last && !pressed {
                report("schedule", &command, command.schedule());
            }
            pressed_last = pressed;
        });
        self
    }

    pub fn while_true(self, command: impl Into<CommandRef>) -> Self {
        let command = command.into();
        let condition = self.condition.clone();
        let mut pressed_last = condition();

        self.event_loop.borrow_mut().bind(move || {
            let pressed = condition();
            if !pressed_last && pressed {
                report("schedule", &command, command.schedule());
            } else if pressed_last && !pressed {
                report("cancel", &command, command.cancel());
            }
            pressed_last = pressed;
        });
        self
    }

    pub fn toggle_on_true(self, command: impl Into<CommandRef>) -> Self {
        let command = command.into();
        let condition = self.condition.clone();
        let mut pressed_last = condition();

        self.event_loop.borrow_mut().bind(move || {
            let pressed = condition();
            if !pressed_last && pressed {
                if command.is_scheduled() {
                    report("cancel", &command, command.cancel());
                } else {
                    report("schedule", &command, command.schedule());
                }
            }
            pressed_last = pressed;
        });
        self
    }

    pub fn is_active(&self) -> bool {
        (self.condition)()
    }

    pub fn and(&self, other: &Self) -> Self {
        let condition = self.condition.clone();
        let other_condition = other.condition.clone();
        Self::new_with_loop(self.event_loop.clone(), move || {
            condition() && other_condition()
        })
    }

    pub fn or(&self, other: &Self) -> Self {
        let condition = self.condition.clone();
        let other_condition = other.condition.clone();
        Self::new_with_loop(self.event_loop.clone(), move || {
            condition() || other_condition()
        })
    }

    pub fn negate(&self) -> Self {
        let condition = self.condition.clone();
        Self::new_with_loop(self.event_loop.clone(), move || !condition())
    }

    pub fn button(controller: Controller, button: Button) -> Self {
        Self::new(move || controller.button(button))
    }
}
