//! Deterministic in-process text marker backend.
//!
//! Simulates the marker service with a reference-counted object table so the
//! marker API can be exercised on any OS, and so tests can verify that every
//! owned reference is released exactly once.

mod backend;
mod ledger;

pub use backend::{MARKER_TYPE_ID, MOCK_BACKEND_ID, MockMarkerBackend, RANGE_TYPE_ID};
pub use ledger::{CallCounts, LedgerSnapshot};

use axmarker_core::MarkerBackend;
use axmarker_core::register_marker_backend;

pub static MOCK_BACKEND: MockMarkerBackend = MockMarkerBackend::new();

register_marker_backend!(&MOCK_BACKEND);

/// The registered mock instance as a backend trait object.
pub fn mock_backend() -> &'static dyn MarkerBackend {
    &MOCK_BACKEND
}
