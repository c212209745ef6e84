mod descriptor;
mod marker_backend;
mod registration;
mod unavailable;

pub use descriptor::{Availability, BackendCapabilities, BackendDescriptor};
pub use marker_backend::MarkerBackend;
pub(crate) use marker_backend::same_backend;
pub use registration::{BackendRegistration, BackendRegistry, marker_backends};
pub use unavailable::{UNAVAILABLE_BACKEND, UNAVAILABLE_BACKEND_ID, UnavailableBackend};

pub use crate::register_marker_backend;
