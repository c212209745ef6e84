//! Opaque tokens exchanged between the marker wrappers and a backend.

use std::fmt::{Debug, Display, Formatter};
use std::num::NonZeroUsize;

/// Non-null reference to a foreign object, issued by one backend.
///
/// For the WebCore backend this is a `CFTypeRef` address, for the mock a table
/// key. The value is meaningless to anything but the backend that issued it
/// and is never handed out by [`crate::TextMarker`] or
/// [`crate::TextMarkerRange`]. Wrapping a value is harmless; every backend
/// method that accepts one is `unsafe`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawRef(NonZeroUsize);

impl RawRef {
    /// Wraps a token. Returns `None` for null.
    pub fn new(value: usize) -> Option<Self> {
        NonZeroUsize::new(value).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Debug for RawRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawRef({:#x})", self.0)
    }
}

/// Runtime type tag of the host object system (`CFTypeID`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForeignTypeId(pub u64);

impl Display for ForeignTypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rule under which a raw reference is adopted by a wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Result of a create/copy call: the caller already owns one reference.
    Create,
    /// Result of a get call: borrowed, so adoption retains it first.
    Get,
}
