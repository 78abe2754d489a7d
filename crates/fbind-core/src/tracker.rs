#![forbid(unsafe_code)]

//! Active-evaluation tracker.
//!
//! A thread-local slot names the [`Watcher`] whose path is currently being
//! evaluated. Every intercepted read consults the slot and, when it is
//! occupied, subscribes that watcher to the property's registry.
//!
//! The slot is only ever changed through a [`TrackingScope`] guard. The guard
//! restores the previous occupant when dropped, including during unwinding,
//! so a failed evaluation can never leave a stale watcher behind to capture
//! unrelated reads.
//!
//! The slot is per thread and the core never suspends mid-evaluation. If
//! path evaluation ever becomes asynchronous, the watcher must be passed
//! down explicitly instead of living here.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::watcher::{Watcher, WatcherId};

thread_local! {
    static ACTIVE: RefCell<Option<Watcher>> = const { RefCell::new(None) };
}

/// RAII guard that occupies the tracker slot for its lifetime.
///
/// Scopes nest: dropping a scope puts back whatever the slot held when the
/// scope was entered.
#[must_use = "tracking ends as soon as the scope is dropped"]
pub struct TrackingScope {
    previous: Option<Watcher>,
    // The slot is thread-local; the guard must not leave its thread.
    _not_send: PhantomData<Rc<()>>,
}

impl TrackingScope {
    /// Occupy the slot with `watcher` (or clear it with `None`).
    pub fn enter(watcher: Option<Watcher>) -> Self {
        let previous = ACTIVE.with(|slot| slot.replace(watcher));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

impl std::fmt::Debug for TrackingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingScope")
            .field("previous", &self.previous.as_ref().map(Watcher::id))
            .finish()
    }
}

/// Run `f` with `watcher` as the active evaluator.
pub fn run_tracked<R>(watcher: &Watcher, f: impl FnOnce() -> R) -> R {
    let _scope = TrackingScope::enter(Some(watcher.clone()));
    f()
}

/// Run `f` with tracking suspended; reads inside `f` subscribe nothing.
pub fn run_untracked<R>(f: impl FnOnce() -> R) -> R {
    let _scope = TrackingScope::enter(None);
    f()
}

/// The watcher currently being evaluated on this thread.
#[must_use]
pub fn active() -> Option<Watcher> {
    ACTIVE.with(|slot| slot.borrow().clone())
}

#[must_use]
pub fn is_tracking() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

#[must_use]
pub fn current_watcher_id() -> Option<WatcherId> {
    ACTIVE.with(|slot| slot.borrow().as_ref().map(Watcher::id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ObservedObject, create_binding, observe};
    use serde_json::json;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn watcher() -> (ObservedObject, Watcher) {
        let obj = observe(json!({"x": 1})).as_object().cloned().unwrap();
        let binding = create_binding(&obj, "x", |_| {}).unwrap();
        (obj, binding.watcher().clone())
    }

    #[test]
    fn slot_is_empty_outside_evaluation() {
        assert!(!is_tracking());
        assert_eq!(current_watcher_id(), None);
    }

    #[test]
    fn run_tracked_sets_and_clears() {
        let (_obj, w) = watcher();
        let seen = run_tracked(&w, current_watcher_id);
        assert_eq!(seen, Some(w.id()));
        assert!(!is_tracking());
    }

    #[test]
    fn slot_cleared_after_panic() {
        let (_obj, w) = watcher();
        let result = catch_unwind(AssertUnwindSafe(|| {
            run_tracked::<()>(&w, || panic!("evaluation failed"));
        }));
        assert!(result.is_err());
        assert!(!is_tracking());
    }

    #[test]
    fn nested_scopes_restore_outer() {
        let (_a, outer) = watcher();
        let (_b, inner) = watcher();
        run_tracked(&outer, || {
            run_tracked(&inner, || {
                assert_eq!(current_watcher_id(), Some(inner.id()));
            });
            assert_eq!(current_watcher_id(), Some(outer.id()));
            run_untracked(|| assert!(!is_tracking()));
            assert_eq!(current_watcher_id(), Some(outer.id()));
        });
        assert!(!is_tracking());
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let (obj, w) = watcher();
        let before = obj.subscriber_count("x").unwrap();
        run_tracked(&w, || run_untracked(|| obj.get("x")));
        assert_eq!(obj.subscriber_count("x").unwrap(), before);
        run_tracked(&w, || obj.get("x"));
        assert_eq!(obj.subscriber_count("x").unwrap(), before + 1);
    }
}
