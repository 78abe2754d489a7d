#![forbid(unsafe_code)]

//! Errors raised while mounting a fragment or routing input.

use std::error::Error;
use std::fmt;

use fbind_core::LookupError;

/// A binding site that could not be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountError {
    /// Path written at the site.
    pub path: String,
    /// The site itself: the text node's template or the input's tag.
    pub site: String,
    pub source: LookupError,
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot bind `{}` at {:?}: {}",
            self.path, self.site, self.source
        )
    }
}

impl Error for MountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// View data must be an object at the root.
    NotAnObject { found: &'static str },
    Mount(MountError),
    /// `input` was called with a node that no mount bound.
    UnboundInput,
    /// Writing an edit back into the data failed.
    Write { path: String, source: LookupError },
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => write!(f, "view data must be an object, got {found}"),
            Self::Mount(err) => write!(f, "mount failed: {err}"),
            Self::UnboundInput => write!(f, "node is not a bound input"),
            Self::Write { path, source } => write!(f, "cannot write `{path}`: {source}"),
        }
    }
}

impl Error for ViewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Mount(err) => Some(err),
            Self::Write { source, .. } => Some(source),
            Self::NotAnObject { .. } | Self::UnboundInput => None,
        }
    }
}

impl From<MountError> for ViewError {
    fn from(err: MountError) -> Self {
        Self::Mount(err)
    }
}
