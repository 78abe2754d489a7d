#![forbid(unsafe_code)]

//! Per-property dependency registry.
//!
//! A [`Dep`] is created for each observed property and holds the watchers
//! that read the property while being tracked. Writing the property calls
//! [`Dep::notify`], which re-runs each watcher in registration order.
//!
//! # Performance
//!
//! | Operation          | Complexity                          |
//! |--------------------|-------------------------------------|
//! | `add_subscriber()` | O(1) amortized, O(S) with de-dup    |
//! | `notify()`         | O(S) plus the cost of each callback |
//!
//! # Failure Modes
//!
//! - **Failing subscriber**: a watcher whose path no longer resolves, or whose
//!   callback panics, is logged at `warn` and counted in the returned
//!   [`NotifyReport`]. The remaining subscribers are still notified.
//! - **Subscriber growth**: there is no unsubscribe. Registries only shrink
//!   when disposed watchers are pruned on the next notify.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SubscriberError;
use crate::tracker;
use crate::watcher::Watcher;

static NEXT_DEP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique registry identifier, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dep#{}", self.0)
    }
}

/// Outcome of one notification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Subscribers whose callback ran to completion.
    pub delivered: usize,
    /// Subscribers that failed, in notification order.
    pub failed: Vec<SubscriberError>,
}

impl NotifyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: NotifyReport) {
        self.delivered += other.delivered;
        self.failed.extend(other.failed);
    }
}

struct DepInner {
    id: DepId,
    subscribers: RefCell<Vec<Watcher>>,
}

/// Subscriber list for one observed property.
///
/// Cloning a `Dep` creates a new handle to the same registry.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl Dep {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId(NEXT_DEP_ID.fetch_add(1, Ordering::Relaxed)),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Append `watcher` to the subscriber list.
    ///
    /// Duplicates are kept (and notified twice) unless the watcher was
    /// created with `dedup_subscribers`.
    pub fn add_subscriber(&self, watcher: Watcher) {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        if watcher.options().dedup_subscribers && subscribers.iter().any(|w| w.ptr_eq(&watcher)) {
            return;
        }
        tracing::trace!(dep = %self.inner.id, watcher = %watcher.id(), "dep.subscribe");
        subscribers.push(watcher);
    }

    /// Register the currently tracked watcher, if any.
    pub fn depend(&self) {
        if let Some(watcher) = tracker::active() {
            self.add_subscriber(watcher);
        }
    }

    /// Number of registrations, including disposed watchers not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Re-run every live subscriber in registration order.
    pub fn notify(&self) -> NotifyReport {
        // Snapshot first: callbacks may subscribe to this same registry.
        let subscribers: Vec<Watcher> = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.retain(|w| !w.is_disposed());
            subscribers.clone()
        };
        tracing::debug!(
            dep = %self.inner.id,
            subscribers = subscribers.len(),
            "dep.notify"
        );

        let mut report = NotifyReport::default();
        for watcher in &subscribers {
            if watcher.is_disposed() {
                continue;
            }
            match watcher.update() {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(dep = %self.inner.id, error = %err, "subscriber failed");
                    report.failed.push(err);
                }
            }
        }
        report
    }
}
