#![forbid(unsafe_code)]

//! Dotted-path parsing and path-based reads/writes.
//!
//! A path such as `"user.address.city"` is evaluated by folding over its
//! segments from the root object. Object segments go through the intercepted
//! accessor (and therefore subscribe the active watcher, if any); a decimal
//! segment applied to an array selects an element without tracking.
//!
//! Lookups never default: a missing property or a segment applied to a
//! primitive is a [`LookupError`].

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::dep::NotifyReport;
use crate::error::LookupError;
use crate::observer::ObservedObject;
use crate::value::Value;

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    raw: String,
    segments: SmallVec<[String; 4]>,
}

impl Path {
    /// Parse `"a.b.c"`. Surrounding whitespace is ignored; empty paths and
    /// empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let raw = raw.trim();
        let invalid = || LookupError::InvalidPath {
            path: raw.to_owned(),
        };
        if raw.is_empty() {
            return Err(invalid());
        }
        let segments = raw
            .split('.')
            .map(|seg| {
                if seg.is_empty() || seg.chars().any(char::is_whitespace) {
                    Err(invalid())
                } else {
                    Ok(seg.to_owned())
                }
            })
            .collect::<Result<SmallVec<[String; 4]>, _>>()?;
        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Everything but the last segment, and the last segment.
    #[must_use]
    pub fn split_last(&self) -> (&[String], &str) {
        match self.segments.split_last() {
            Some((last, parent)) => (parent, last.as_str()),
            // parse() guarantees at least one segment
            None => (&[], ""),
        }
    }

    /// Evaluate against `root`, subscribing the active watcher along the way.
    pub fn evaluate(&self, root: &ObservedObject) -> Result<Value, LookupError> {
        resolve(Value::Object(root.clone()), &self.segments, self)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Path {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn resolve(start: Value, segments: &[String], path: &Path) -> Result<Value, LookupError> {
    segments
        .iter()
        .try_fold(start, |current, segment| step(&current, segment, path))
}

fn step(current: &Value, segment: &str, path: &Path) -> Result<Value, LookupError> {
    match current {
        Value::Object(obj) => obj.get(segment).ok_or_else(|| LookupError::MissingKey {
            path: path.raw.clone(),
            segment: segment.to_owned(),
        }),
        Value::Array(items) => {
            let index: usize = segment.parse().map_err(|_| LookupError::MissingKey {
                path: path.raw.clone(),
                segment: segment.to_owned(),
            })?;
            items
                .get(index)
                .cloned()
                .ok_or_else(|| LookupError::IndexOutOfBounds {
                    path: path.raw.clone(),
                    segment: segment.to_owned(),
                    len: items.len(),
                })
        }
        other => Err(LookupError::NotComposite {
            path: path.raw.clone(),
            segment: segment.to_owned(),
            found: other.kind(),
        }),
    }
}

/// Read the value at `path`.
///
/// Tracked when called during a watcher's evaluation, plain otherwise.
pub fn read(root: &ObservedObject, path: &str) -> Result<Value, LookupError> {
    Path::parse(path)?.evaluate(root)
}

/// Write `value` at `path` through the intercepted accessor of the parent
/// object, notifying the property's subscribers before returning.
///
/// The parent must be an object; the final property is created if missing.
/// A primitive parent fails the same way [`read`] does, while an array parent
/// is [`LookupError::NotAnObject`] since array elements are not writable.
pub fn write(
    root: &ObservedObject,
    path: &str,
    value: impl Into<Value>,
) -> Result<NotifyReport, LookupError> {
    let path = Path::parse(path)?;
    write_path(root, &path, value)
}

/// [`write`] with a pre-parsed path.
pub fn write_path(
    root: &ObservedObject,
    path: &Path,
    value: impl Into<Value>,
) -> Result<NotifyReport, LookupError> {
    let (parent, last) = path.split_last();
    match resolve(Value::Object(root.clone()), parent, path)? {
        Value::Object(obj) => Ok(obj.set(last, value)),
        Value::Array(_) => Err(LookupError::NotAnObject {
            path: path.raw.clone(),
            found: "array",
        }),
        other => Err(LookupError::NotComposite {
            path: path.raw.clone(),
            segment: last.to_owned(),
            found: other.kind(),
        }),
    }
}
