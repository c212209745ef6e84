//! Typed access to accessibility text markers.
//!
//! A text marker is an opaque, reference-counted object from the macOS
//! accessibility service describing one caret position in an accessible
//! document. Its payload is a fixed 40-byte record ([`TextMarkerRecord`]) whose
//! layout is dictated by the private WebCore framework.
//!
//! All calls into a marker implementation go through a [`MarkerBackend`]. The
//! private WebCore primitives crash the process on the releases they were
//! tried on and offer no error channel, so no backend that reaches them is
//! ready unless explicitly enabled; by default the [`UNAVAILABLE_BACKEND`]
//! refuses every call.

pub mod backend;
pub mod config;
pub mod contract;
mod error;
pub mod handle;
mod marker;
pub mod record;

pub use backend::{
    Availability, BackendCapabilities, BackendDescriptor, BackendRegistry, MarkerBackend,
    UNAVAILABLE_BACKEND, marker_backends,
};
pub use config::MarkerConfig;
pub use error::{MarkerError, RecordError};
pub use handle::{ForeignTypeId, Ownership, RawRef};
pub use marker::{TextMarker, TextMarkerRange};
pub use record::{Affinity, AxId, NodeHandle, RECORD_SIZE, TextMarkerRecord};

/// Selects the backend configured through the environment.
pub fn default_backend() -> Result<&'static dyn MarkerBackend, MarkerError> {
    BackendRegistry::discover().select(&MarkerConfig::from_env())
}
