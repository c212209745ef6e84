//! Text marker backend for the private WebCore symbols.
//!
//! `wkCreateAXTextMarker`, `wkGetBytesFromAXTextMarker` and the range
//! functions are not public API. They are resolved at runtime and only when
//! the crate is built with the `private-webcore` feature on macOS *and* the
//! `AXMARKER_ALLOW_PRIVATE_API` opt-in is set; otherwise the backend stays
//! registered but reports itself as disabled or unsupported.

mod backend;
#[cfg(all(target_os = "macos", feature = "private-webcore"))]
mod ffi;
#[cfg(not(all(target_os = "macos", feature = "private-webcore")))]
#[path = "ffi_stub.rs"]
mod ffi;

pub use backend::{WEBCORE_BACKEND_ID, WebCoreBackend};

use axmarker_core::register_marker_backend;

pub static WEBCORE_BACKEND: WebCoreBackend = WebCoreBackend::new();

register_marker_backend!(&WEBCORE_BACKEND);
