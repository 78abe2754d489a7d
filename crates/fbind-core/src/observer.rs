#![forbid(unsafe_code)]

//! Observed objects: key-value maps whose every property is an intercepted
//! accessor backed by its own [`Dep`].
//!
//! # Design
//!
//! [`ObservedObject`] wraps an ordered map in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). Each entry (a *slot*) pairs the current value
//! with the dependency registry created when the slot was first defined.
//! Reads go through [`get`](ObservedObject::get), which subscribes the active
//! evaluator; writes go through [`set`](ObservedObject::set), which
//! re-observes the new value and notifies every subscriber of that slot.
//!
//! The recursive observer lives in [`observe_json`]: it converts nested
//! objects before defining the outer slot, so each slot captures a fully
//! observed value.
//!
//! # Invariants
//!
//! 1. Every property of every reachable object is a slot with exactly one
//!    `Dep`; defining a slot never wraps an existing one.
//! 2. Cloning an `ObservedObject` shares identity. Writes never clone
//!    subtrees.
//! 3. Every write to an existing slot notifies, even when the new value equals
//!    the old one.
//! 4. No borrow of the object is held while subscribers run, so callbacks may
//!    freely read and write the same object.
//!
//! # Failure Modes
//!
//! - **Cyclic data**: storing an object inside itself makes snapshots and
//!   `Debug` recurse without bound. Observed data must form a tree.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dep::{Dep, NotifyReport};
use crate::value::Value;

struct Slot {
    value: Value,
    dep: Dep,
}

struct ObjectInner {
    slots: IndexMap<String, Slot>,
}

/// A shared, observed key-value object.
///
/// Properties keep their insertion order.
#[derive(Clone)]
pub struct ObservedObject {
    inner: Rc<RefCell<ObjectInner>>,
}

impl fmt::Debug for ObservedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut map = f.debug_map();
        for (key, slot) in &inner.slots {
            map.entry(key, &slot.value);
        }
        map.finish()
    }
}

impl Default for ObservedObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservedObject {
    /// Create an empty observed object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObjectInner {
                slots: IndexMap::new(),
            })),
        }
    }

    /// Intercepted read.
    ///
    /// Returns `None` when the property does not exist. Otherwise, if an
    /// evaluation is being tracked, its watcher is registered with this
    /// property's `Dep` before the value is returned.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let (value, dep) = {
            let inner = self.inner.borrow();
            let slot = inner.slots.get(key)?;
            (slot.value.clone(), slot.dep.clone())
        };
        dep.depend();
        Some(value)
    }

    /// Intercepted write.
    ///
    /// Replaces the property's value, observes the new value and notifies
    /// every subscriber in registration order before returning. Writing a key
    /// that does not exist defines a new slot; nothing can be subscribed to a
    /// fresh slot yet, so the returned report is empty.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> NotifyReport {
        let value = value.into();
        let dep = {
            let mut inner = self.inner.borrow_mut();
            match inner.slots.get_mut(key) {
                Some(slot) => {
                    slot.value = value;
                    Some(slot.dep.clone())
                }
                None => {
                    inner.slots.insert(
                        key.to_owned(),
                        Slot {
                            value,
                            dep: Dep::new(),
                        },
                    );
                    None
                }
            }
        };
        match dep {
            Some(dep) => dep.notify(),
            None => {
                tracing::trace!(key, "observer.define");
                NotifyReport::default()
            }
        }
    }

    /// Untracked read; does not subscribe the active evaluator.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.inner.borrow().slots.get(key).map(|slot| slot.value.clone())
    }

    /// Property names in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().slots.keys().cloned().collect()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().slots.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().slots.is_empty()
    }

    /// Number of registrations held by the property's registry (duplicates
    /// and disposed watchers not yet pruned included). `None` for a missing
    /// property.
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> Option<usize> {
        self.inner
            .borrow()
            .slots
            .get(key)
            .map(|slot| slot.dep.subscriber_count())
    }

    /// The registry backing `key`, for diagnostics.
    #[must_use]
    pub fn dep(&self, key: &str) -> Option<Dep> {
        self.inner.borrow().slots.get(key).map(|slot| slot.dep.clone())
    }

    /// True when both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Plain JSON copy of the object, read without tracking.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        let inner = self.inner.borrow();
        let map = inner
            .slots
            .iter()
            .map(|(key, slot)| (key.clone(), slot.value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    pub(crate) fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.inner))
    }

    /// Define a slot for a value that is already observed.
    fn define(&self, key: String, value: Value) {
        self.inner.borrow_mut().slots.insert(
            key,
            Slot {
                value,
                dep: Dep::new(),
            },
        );
    }
}

/// Non-owning handle to an observed object.
#[derive(Clone)]
pub(crate) struct WeakObject(std::rc::Weak<RefCell<ObjectInner>>);

impl WeakObject {
    pub(crate) fn upgrade(&self) -> Option<ObservedObject> {
        self.0.upgrade().map(|inner| ObservedObject { inner })
    }
}

/// Recursive observer: convert a plain JSON tree into observed values.
///
/// Primitives are returned as-is. For objects, each property's value is
/// observed first and only then defined as a slot on the new object.
pub(crate) fn observe_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(observe_json).collect())
        }
        serde_json::Value::Object(map) => {
            let obj = ObservedObject::new();
            for (key, child) in map {
                let child = observe_json(child);
                obj.define(key, child);
            }
            Value::Object(obj)
        }
    }
}

/// Observe a value.
///
/// Plain JSON input is converted by the recursive observer. A [`Value`] is
/// already observed all the way down, so observing it again returns it
/// unchanged: slots, registries and object identity are all kept.
pub fn observe(value: impl Into<Value>) -> Value {
    value.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn root(json: serde_json::Value) -> ObservedObject {
        observe(json).as_object().cloned().expect("object root")
    }

    #[test]
    fn every_nested_property_gets_a_registry() {
        let obj = root(json!({"a": {"b": {"c": 1}}, "d": 2}));
        assert_eq!(obj.subscriber_count("a"), Some(0));
        assert_eq!(obj.subscriber_count("d"), Some(0));
        let b = obj.peek("a").unwrap().as_object().cloned().unwrap();
        let c_parent = b.peek("b").unwrap().as_object().cloned().unwrap();
        assert_eq!(c_parent.subscriber_count("c"), Some(0));
        assert_eq!(obj.subscriber_count("missing"), None);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let obj = ObservedObject::new();
        obj.set("z", 1);
        obj.set("a", 2);
        obj.set("m", 3);
        assert_eq!(obj.keys(), vec!["z", "a", "m"]);
        assert_eq!(obj.len(), 3);
        assert!(!obj.is_empty());
    }

    #[test]
    fn read_after_write() {
        let obj = root(json!({"n": 0}));
        obj.set("n", 42);
        assert_eq!(obj.get("n"), Some(Value::from(42)));
        obj.set("n", "text");
        assert_eq!(obj.get("n").unwrap().as_str(), Some("text"));
    }

    #[test]
    fn write_keeps_registry() {
        let obj = root(json!({"n": 0}));
        let before = obj.dep("n").unwrap();
        obj.set("n", 1);
        let after = obj.dep("n").unwrap();
        assert_eq!(before.id(), after.id());
    }

    #[test]
    fn assigned_object_is_observed() {
        let obj = root(json!({"user": null}));
        obj.set("user", json!({"profile": {"age": 3}}));
        let user = obj.peek("user").unwrap().as_object().cloned().unwrap();
        let profile = user.peek("profile").unwrap().as_object().cloned().unwrap();
        assert_eq!(profile.subscriber_count("age"), Some(0));
    }

    #[test]
    fn observe_is_idempotent() {
        let first = observe(json!({"a": {"b": 1}}));
        let again = observe(first.clone());
        let (Value::Object(a), Value::Object(b)) = (&first, &again) else {
            panic!("expected objects");
        };
        assert!(a.ptr_eq(b));
        assert_eq!(
            a.dep("a").map(|d| d.id()),
            b.dep("a").map(|d| d.id()),
        );
    }

    #[test]
    fn clone_shares_identity() {
        let obj = root(json!({"x": 1}));
        let other = obj.clone();
        other.set("x", 2);
        assert_eq!(obj.peek("x"), Some(Value::from(2)));
        assert!(obj.ptr_eq(&other));
        assert!(!obj.ptr_eq(&ObservedObject::new()));
    }

    #[test]
    fn callback_may_read_object_during_notify() {
        let obj = root(json!({"x": 1, "y": 0}));
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let reader = obj.clone();
        let _binding = crate::create_binding(&obj, "x", move |_| {
            let y = reader.get("y").and_then(|v| v.as_i64()).unwrap_or(-1);
            seen_clone.set(y);
        })
        .unwrap();
        obj.set("y", 9);
        obj.set("x", 2);
        assert_eq!(seen.get(), 9);
    }

    #[test]
    fn snapshot_and_debug() {
        let obj = root(json!({"a": 1, "b": {"c": "d"}}));
        assert_eq!(obj.snapshot(), json!({"a": 1, "b": {"c": "d"}}));
        let dbg = format!("{obj:?}");
        assert!(dbg.contains("\"a\""));
        assert!(dbg.contains("\"c\""));
    }

    #[test]
    fn weak_handle_does_not_keep_object_alive() {
        let obj = ObservedObject::new();
        let weak = obj.downgrade();
        assert!(weak.upgrade().is_some());
        drop(obj);
        assert!(weak.upgrade().is_none());
    }
}
