//! Backend that refuses every primitive.
//!
//! This is the default disposition of the marker text API: the private
//! symbols crash the process on the releases they were tried on, so unless a
//! real backend is explicitly enabled every call ends here.

use crate::backend::{Availability, BackendCapabilities, BackendDescriptor, MarkerBackend};
use crate::error::MarkerError;
use crate::handle::{ForeignTypeId, RawRef};

pub const UNAVAILABLE_BACKEND_ID: &str = "unavailable";

const REASON: &str = "text marker primitives are disabled";

pub struct UnavailableBackend {
    descriptor: BackendDescriptor,
}

impl UnavailableBackend {
    pub const fn new() -> Self {
        Self {
            descriptor: BackendDescriptor::new(
                UNAVAILABLE_BACKEND_ID,
                "Unavailable",
                i32::MIN,
                BackendCapabilities::empty(),
            ),
        }
    }

    fn refuse<T>(&self) -> Result<T, MarkerError> {
        Err(MarkerError::unavailable(self.descriptor.id, REASON))
    }
}

impl Default for UnavailableBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(unsafe_code)]
impl MarkerBackend for UnavailableBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn availability(&self) -> Availability {
        Availability::Disabled(REASON.to_owned())
    }

    fn marker_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
        self.refuse()
    }

    fn range_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
        self.refuse()
    }

    unsafe fn type_id_of(&self, _object: RawRef) -> ForeignTypeId {
        ForeignTypeId(0)
    }

    fn create_marker(&self, _bytes: &[u8]) -> Result<RawRef, MarkerError> {
        self.refuse()
    }

    unsafe fn marker_bytes(&self, _marker: RawRef, _buffer: &mut [u8]) -> Result<(), MarkerError> {
        self.refuse()
    }

    unsafe fn create_range(&self, _start: RawRef, _end: RawRef) -> Result<RawRef, MarkerError> {
        self.refuse()
    }

    unsafe fn copy_range_start(&self, _range: RawRef) -> Result<RawRef, MarkerError> {
        self.refuse()
    }

    unsafe fn copy_range_end(&self, _range: RawRef) -> Result<RawRef, MarkerError> {
        self.refuse()
    }

    // Nothing is ever handed out, so there is nothing to count.
    unsafe fn retain(&self, _object: RawRef) {}

    unsafe fn release(&self, _object: RawRef) {}

    unsafe fn equal(&self, _a: RawRef, _b: RawRef) -> bool {
        false
    }

    fn live_references(&self) -> Option<usize> {
        Some(0)
    }
}

pub static UNAVAILABLE_BACKEND: UnavailableBackend = UnavailableBackend::new();

crate::register_marker_backend!(&UNAVAILABLE_BACKEND);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AxId, NodeHandle, TextMarkerRecord};
    use crate::TextMarker;
    use rstest::rstest;

    #[rstest]
    fn reports_disabled() {
        let availability = UNAVAILABLE_BACKEND.availability();
        assert!(!availability.is_ready());
        assert_eq!(availability.label(), "disabled");
    }

    #[rstest]
    fn every_primitive_is_refused() {
        let backend: &'static dyn MarkerBackend = &UNAVAILABLE_BACKEND;
        assert!(backend.marker_type_id().unwrap_err().is_unavailable());
        assert!(backend.range_type_id().unwrap_err().is_unavailable());
        assert!(backend.create_marker(&[0u8; 40]).unwrap_err().is_unavailable());

        let record = TextMarkerRecord::new(AxId(1), NodeHandle(2), 3);
        let err = TextMarker::new(backend, &record).err().expect("refused");
        assert_eq!(err, MarkerError::unavailable(UNAVAILABLE_BACKEND_ID, REASON));
    }
}
