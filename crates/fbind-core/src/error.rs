#![forbid(unsafe_code)]

//! Error types for path evaluation and subscriber delivery.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | [`LookupError`] | Dotted path does not match the data shape | Propagated to the caller of `read`/`write`/`create_binding` |
//! | [`SubscriberError`] | A binding's re-evaluation or callback failed during notify | Logged, counted in [`NotifyReport`](crate::NotifyReport), remaining subscribers still run |
//!
//! Re-observing an observed tree and writing a value of a different shape are
//! not errors.

use std::fmt;

use crate::watcher::WatcherId;

/// A dotted path failed to resolve against the current data shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The path string is empty or contains an empty segment (`"a..b"`).
    InvalidPath { path: String },
    /// An object along the path has no property named `segment`.
    MissingKey { path: String, segment: String },
    /// `segment` was applied to a primitive value (`found` names its kind).
    NotComposite {
        path: String,
        segment: String,
        found: &'static str,
    },
    /// `segment` indexes past the end of an array of `len` items.
    IndexOutOfBounds {
        path: String,
        segment: String,
        len: usize,
    },
    /// A write target's parent is an array, or a document root is not an
    /// object.
    NotAnObject { path: String, found: &'static str },
}

impl LookupError {
    /// The full path that failed to resolve.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::InvalidPath { path }
            | Self::MissingKey { path, .. }
            | Self::NotComposite { path, .. }
            | Self::IndexOutOfBounds { path, .. }
            | Self::NotAnObject { path, .. } => path,
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath { path } => write!(f, "invalid path '{path}'"),
            Self::MissingKey { path, segment } => {
                write!(f, "path '{path}': no property '{segment}'")
            }
            Self::NotComposite {
                path,
                segment,
                found,
            } => write!(
                f,
                "path '{path}': cannot read '{segment}' of a {found} value"
            ),
            Self::IndexOutOfBounds { path, segment, len } => write!(
                f,
                "path '{path}': index {segment} out of bounds (len {len})"
            ),
            Self::NotAnObject { path, found } => {
                write!(f, "path '{path}': write target parent is a {found}, not an object")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Why a single subscriber failed during notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberErrorKind {
    /// Re-evaluating the binding's path failed (the data changed shape).
    Lookup(LookupError),
    /// The binding's callback panicked; carries the panic message.
    Panicked(String),
    /// The root object the binding evaluates against no longer exists.
    Detached,
}

/// A subscriber failed while being notified of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberError {
    pub watcher: WatcherId,
    pub path: String,
    pub kind: SubscriberErrorKind,
}

impl fmt::Display for SubscriberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SubscriberErrorKind::Lookup(err) => {
                write!(f, "binding {} on '{}': {err}", self.watcher, self.path)
            }
            SubscriberErrorKind::Panicked(msg) => write!(
                f,
                "binding {} on '{}': callback panicked: {msg}",
                self.watcher, self.path
            ),
            SubscriberErrorKind::Detached => write!(
                f,
                "binding {} on '{}': root object dropped",
                self.watcher, self.path
            ),
        }
    }
}

impl std::error::Error for SubscriberError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SubscriberErrorKind::Lookup(err) => Some(err),
            _ => None,
        }
    }
}
