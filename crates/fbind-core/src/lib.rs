#![forbid(unsafe_code)]

//! Dependency tracking and change propagation for path-based data bindings.
//!
//! # Role in FrankenBind
//! `fbind-core` observes a data tree, records which bindings read which
//! properties, and re-runs exactly those bindings when a property is written.
//! View adapters (see `fbind-view`) sit on top: they create a binding per
//! interpolation or input site and push user edits back through [`write`].
//!
//! # Primary responsibilities
//! - **[`ObservedObject`]**: key-value object whose properties are
//!   intercepted accessors, each backed by one [`Dep`].
//! - **[`Dep`]**: per-property subscriber list with ordered, synchronous,
//!   failure-isolated notification.
//! - **[`tracker`]**: thread-local slot naming the watcher currently
//!   evaluating, consulted by every read.
//! - **[`Watcher`] / [`Binding`]**: one dotted path bound to one callback.
//!
//! # Usage
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use fbind_core::{create_binding, observe_object, write};
//! use serde_json::json;
//!
//! let root = observe_object(json!({"user": {"name": "Ann"}})).unwrap();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let _binding = create_binding(&root, "user.name", move |v| {
//!     sink.borrow_mut().push(v.to_string());
//! })
//! .unwrap();
//! assert!(seen.borrow().is_empty());
//!
//! write(&root, "user.name", "Bo").unwrap();
//! assert_eq!(*seen.borrow(), vec!["Bo".to_string()]);
//! ```
//!
//! # Invariants
//!
//! 1. Every write notifies, in registration order, before it returns.
//! 2. A binding is notified once per write to any property it read at bind
//!    time, and never for unrelated siblings.
//! 3. A failing binding never prevents the others from being notified.
//! 4. The tracker slot is empty whenever no evaluation is running.
//!
//! # Preconditions
//!
//! Observed data must form a tree. Storing an object inside itself is not
//! detected and makes snapshots recurse without bound.

pub mod config;
pub mod dep;
pub mod error;
pub mod observer;
pub mod path;
pub mod tracker;
pub mod value;
pub mod watcher;

pub use config::{BindingOptions, ConfigError, ReactiveConfig, ReactiveConfigParse};
pub use dep::{Dep, DepId, NotifyReport};
pub use error::{LookupError, SubscriberError, SubscriberErrorKind};
pub use observer::{ObservedObject, observe};
pub use path::{Path, read, write, write_path};
pub use value::Value;
pub use watcher::{Binding, Watcher, WatcherId, create_binding, create_binding_with};

/// Observe a JSON document whose root must be an object.
pub fn observe_object(json: serde_json::Value) -> Result<ObservedObject, LookupError> {
    match observe(json) {
        Value::Object(obj) => Ok(obj),
        other => Err(LookupError::NotAnObject {
            path: String::new(),
            found: other.kind(),
        }),
    }
}
