#![forbid(unsafe_code)]

//! Path observers: one dotted path bound to one update callback.
//!
//! # Lifecycle
//!
//! A [`Watcher`] evaluates its path once while it is the active evaluator,
//! which subscribes it to every property read along the path. It then sits
//! idle until one of those properties is written, at which point the
//! property's registry calls [`Watcher::update`]: the path is re-read without
//! tracking and the callback receives the new value.
//!
//! Construction never invokes the callback.
//!
//! # Invariants
//!
//! 1. Subscriptions are made only during construction; updates do not
//!    re-subscribe, so the set of observed properties is fixed by the data
//!    shape at bind time.
//! 2. A watcher holds its root weakly. The registries own the watcher, the
//!    watcher never owns the data.
//! 3. Dropping a [`Binding`] does not unsubscribe. Only [`Binding::dispose`]
//!    stops delivery.

use std::cell::Cell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::BindingOptions;
use crate::error::{LookupError, SubscriberError, SubscriberErrorKind};
use crate::observer::{ObservedObject, WeakObject};
use crate::path::Path;
use crate::tracker;
use crate::value::Value;

static NEXT_WATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique watcher identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

impl WatcherId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Callback = Box<dyn Fn(&Value)>;

struct WatcherInner {
    id: WatcherId,
    root: WeakObject,
    path: Path,
    callback: Callback,
    options: BindingOptions,
    disposed: Cell<bool>,
}

/// Shared handle to a path observer.
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path.as_str())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl Watcher {
    /// Construct and subscribe. Fails if `path` does not resolve now.
    pub fn new(
        root: &ObservedObject,
        path: Path,
        options: BindingOptions,
        callback: impl Fn(&Value) + 'static,
    ) -> Result<Self, LookupError> {
        let watcher = Self {
            inner: Rc::new(WatcherInner {
                id: WatcherId(NEXT_WATCHER_ID.fetch_add(1, Ordering::Relaxed)),
                root: root.downgrade(),
                path,
                callback: Box::new(callback),
                options,
                disposed: Cell::new(false),
            }),
        };
        if let Err(err) = tracker::run_tracked(&watcher, || watcher.inner.path.evaluate(root)) {
            // Segments read before the failure already hold this watcher.
            watcher.dispose();
            return Err(err);
        }
        tracing::debug!(
            watcher = %watcher.inner.id,
            path = watcher.inner.path.as_str(),
            "binding.create"
        );
        Ok(watcher)
    }

    #[must_use]
    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    #[must_use]
    pub fn options(&self) -> BindingOptions {
        self.inner.options
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn dispose(&self) {
        if !self.inner.disposed.replace(true) {
            tracing::debug!(watcher = %self.inner.id, "binding.dispose");
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current value at the path, read without tracking.
    pub fn value(&self) -> Result<Value, SubscriberError> {
        let root = self
            .inner
            .root
            .upgrade()
            .ok_or_else(|| self.error(SubscriberErrorKind::Detached))?;
        tracker::run_untracked(|| self.inner.path.evaluate(&root))
            .map_err(|err| self.error(SubscriberErrorKind::Lookup(err)))
    }

    /// Re-evaluate the path and hand the result to the callback.
    ///
    /// With `isolate_panics`, a panicking callback is reported as
    /// [`SubscriberErrorKind::Panicked`]; otherwise the panic propagates.
    pub fn update(&self) -> Result<(), SubscriberError> {
        let value = self.value()?;
        if !self.inner.options.isolate_panics {
            (self.inner.callback)(&value);
            return Ok(());
        }
        catch_unwind(AssertUnwindSafe(|| (self.inner.callback)(&value))).map_err(|payload| {
            self.error(SubscriberErrorKind::Panicked(panic_message(&*payload)))
        })
    }

    fn error(&self, kind: SubscriberErrorKind) -> SubscriberError {
        SubscriberError {
            watcher: self.inner.id,
            path: self.inner.path.as_str().to_owned(),
            kind,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Handle returned by [`create_binding`].
///
/// The binding stays subscribed for as long as the data it observes exists,
/// whether or not this handle is kept.
#[derive(Debug, Clone)]
pub struct Binding {
    watcher: Watcher,
}

impl Binding {
    #[must_use]
    pub fn id(&self) -> WatcherId {
        self.watcher.id()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.watcher.path().as_str()
    }

    /// Current value at the bound path (untracked).
    pub fn value(&self) -> Result<Value, SubscriberError> {
        self.watcher.value()
    }

    /// Stop delivering updates. Registries drop the watcher on their next
    /// notify.
    pub fn dispose(&self) {
        self.watcher.dispose();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.watcher.is_disposed()
    }

    #[must_use]
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }
}

/// Bind `path` under `root` to `on_change` using the process defaults.
///
/// `on_change` is not called now; it is called with the recomputed value
/// after every write to a property read while evaluating `path`.
pub fn create_binding(
    root: &ObservedObject,
    path: &str,
    on_change: impl Fn(&Value) + 'static,
) -> Result<Binding, LookupError> {
    create_binding_with(root, path, BindingOptions::default(), on_change)
}

/// [`create_binding`] with explicit options.
pub fn create_binding_with(
    root: &ObservedObject,
    path: &str,
    options: BindingOptions,
    on_change: impl Fn(&Value) + 'static,
) -> Result<Binding, LookupError> {
    let path = Path::parse(path)?;
    let watcher = Watcher::new(root, path, options, on_change)?;
    Ok(Binding { watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{observe, write};
    use serde_json::json;
    use std::cell::RefCell;

    fn root(json: serde_json::Value) -> ObservedObject {
        observe(json).as_object().cloned().unwrap()
    }

    fn recorder() -> (Rc<RefCell<Vec<Value>>>, impl Fn(&Value) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |v: &Value| sink.borrow_mut().push(v.clone()))
    }

    #[test]
    fn construction_subscribes_every_segment_without_calling_back() {
        let obj = root(json!({"a": {"b": {"c": 1}}}));
        let (log, cb) = recorder();
        let _binding = create_binding(&obj, "a.b.c", cb).unwrap();
        assert!(log.borrow().is_empty());

        assert_eq!(obj.subscriber_count("a"), Some(1));
        let a = obj.peek("a").unwrap().as_object().cloned().unwrap();
        assert_eq!(a.subscriber_count("b"), Some(1));
        let b = a.peek("b").unwrap().as_object().cloned().unwrap();
        assert_eq!(b.subscriber_count("c"), Some(1));
    }

    #[test]
    fn update_does_not_resubscribe() {
        let obj = root(json!({"x": 1}));
        let binding = create_binding(&obj, "x", |_| {}).unwrap();
        binding.watcher().update().unwrap();
        binding.watcher().update().unwrap();
        assert_eq!(obj.subscriber_count("x"), Some(1));
    }

    #[test]
    fn intermediate_replacement_recomputes() {
        let obj = root(json!({"user": {"name": "Ann"}}));
        let (log, cb) = recorder();
        let _binding = create_binding(&obj, "user.name", cb).unwrap();
        obj.set("user", json!({"name": "Cy"}));
        assert_eq!(*log.borrow(), vec![Value::from("Cy")]);
    }

    #[test]
    fn bind_error_propagates() {
        let obj = root(json!({"a": 5}));
        let err = create_binding(&obj, "a.b", |_| {}).unwrap_err();
        assert!(matches!(err, LookupError::NotComposite { found: "number", .. }));
        let err = create_binding(&obj, "", |_| {}).unwrap_err();
        assert!(matches!(err, LookupError::InvalidPath { .. }));
    }

    #[test]
    fn failed_bind_disposes_partial_registrations() {
        let obj = root(json!({"a": {"b": 1}}));
        assert!(create_binding(&obj, "a.missing", |_| {}).is_err());
        assert!(crate::tracker::active().is_none());
        assert_eq!(obj.subscriber_count("a"), Some(1));

        let report = obj.set("a", json!({"missing": true}));
        assert_eq!(report, crate::NotifyReport::default());
        assert_eq!(obj.subscriber_count("a"), Some(0));
    }

    #[test]
    fn update_after_shape_change_reports_lookup_error() {
        let obj = root(json!({"user": {"name": "Ann"}}));
        let _binding = create_binding(&obj, "user.name", |_| {}).unwrap();
        let report = obj.set("user", 3);
        assert_eq!(report.delivered, 0);
        assert!(matches!(
            report.failed[0].kind,
            SubscriberErrorKind::Lookup(LookupError::NotComposite { .. })
        ));
    }

    #[test]
    fn panicking_callback_is_reported() {
        let obj = root(json!({"x": 1}));
        let binding = create_binding(&obj, "x", |_| panic!("render failed")).unwrap();
        let err = binding.watcher().update().unwrap_err();
        assert_eq!(err.kind, SubscriberErrorKind::Panicked("render failed".into()));
        assert_eq!(err.watcher, binding.id());
    }

    #[test]
    fn panics_propagate_when_isolation_disabled() {
        let obj = root(json!({"x": 1}));
        let options = BindingOptions {
            isolate_panics: false,
            dedup_subscribers: false,
        };
        let binding = create_binding_with(&obj, "x", options, |_| panic!("loud")).unwrap();
        let result = catch_unwind(AssertUnwindSafe(|| binding.watcher().update()));
        assert!(result.is_err());
    }

    #[test]
    fn dispose_stops_delivery() {
        let obj = root(json!({"x": 1}));
        let (log, cb) = recorder();
        let binding = create_binding(&obj, "x", cb).unwrap();
        write(&obj, "x", 2).unwrap();
        binding.dispose();
        binding.dispose();
        assert!(binding.is_disposed());
        write(&obj, "x", 3).unwrap();
        assert_eq!(*log.borrow(), vec![Value::from(2)]);
    }

    #[test]
    fn detached_root_is_reported() {
        let obj = root(json!({"inner": {"x": 1}}));
        let inner = obj.peek("inner").unwrap().as_object().cloned().unwrap();
        let binding = create_binding(&obj, "inner.x", |_| {}).unwrap();
        drop(obj);
        let report = inner.set("x", 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].kind, SubscriberErrorKind::Detached);
        assert!(binding.value().is_err());
    }

    #[test]
    fn binding_value_reads_current() {
        let obj = root(json!({"x": 1}));
        let binding = create_binding(&obj, " x ", |_| {}).unwrap();
        assert_eq!(binding.path(), "x");
        write(&obj, "x", 10).unwrap();
        assert_eq!(binding.value().unwrap(), Value::from(10));
        assert_eq!(obj.subscriber_count("x"), Some(1));
    }
}
