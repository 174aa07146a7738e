//! Key/value telemetry sink. Publishing is fire-and-forget.

use std::cell::RefCell;

use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Boolean(bool),
    Number(f64),
}

thread_local! {
    static TABLE: RefCell<HashMap<String, Value>> = RefCell::default();
}

fn put(key: &str, value: Value) {
    tracing::trace!(key, ?value, "dashboard publish");
    TABLE.with(|table| {
        table.borrow_mut().insert(key.to_owned(), value);
    });
}

fn get(key: &str) -> Option<Value> {
    TABLE.with(|table| table.borrow().get(key).copied())
}

pub fn put_boolean(key: &str, value: bool) {
    put(key, Value::Boolean(value));
}

pub fn put_number(key: &str, value: f64) {
    put(key, Value::Number(value));
}

pub fn get_boolean(key: &str) -> Option<bool> {
    match get(key)? {
        Value::Boolean(value) => Some(value),
        Value::Number(_) => None,
    }
}

pub fn get_number(key: &str) -> Option<f64> {
    match get(key)? {
        Value::Number(value) => Some(value),
        Value::Boolean(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_typed() {
        put_boolean("relativityMode", true);
        put_number("pose/x", 1.5);

        assert_eq!(get_boolean("relativityMode"), Some(true));
        assert_eq!(get_number("relativityMode"), None);
        assert_eq!(get_number("pose/x"), Some(1.5));
        assert_eq!(get_boolean("missing"), None);
    }
}
