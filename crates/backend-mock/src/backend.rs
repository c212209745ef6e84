use std::sync::{Mutex, MutexGuard, PoisonError};

use axmarker_core::backend::{Availability, BackendCapabilities, BackendDescriptor, MarkerBackend};
use axmarker_core::{ForeignTypeId, MarkerError, RECORD_SIZE, RawRef, RecordError, TextMarkerRecord};

use crate::ledger::{Ledger, LedgerSnapshot, MockObject, Payload};

pub const MOCK_BACKEND_ID: &str = "mock";
pub const MARKER_TYPE_ID: ForeignTypeId = ForeignTypeId(0x4d4b);
pub const RANGE_TYPE_ID: ForeignTypeId = ForeignTypeId(0x5247);
const UNKNOWN_TYPE_ID: ForeignTypeId = ForeignTypeId(0);

/// In-process text marker service.
///
/// Markers store their payload verbatim, ranges store copies of both endpoint
/// payloads, and every object carries a retain count. Equality is by decoded
/// record, so padding bytes do not matter; payloads that do not decode are
/// compared byte for byte.
pub struct MockMarkerBackend {
    descriptor: BackendDescriptor,
    ledger: Mutex<Ledger>,
}

impl MockMarkerBackend {
    pub const fn new() -> Self {
        Self {
            descriptor: BackendDescriptor::new(
                MOCK_BACKEND_ID,
                "Mock Text Markers",
                0,
                BackendCapabilities::all(),
            ),
            ledger: Mutex::new(Ledger::new()),
        }
    }

    /// A fresh backend with its own ledger, for tests that must not share
    /// counts with the registered instance. The allocation is leaked.
    pub fn isolated() -> &'static Self {
        Box::leak(Box::new(Self::new()))
    }

    pub fn ledger(&self) -> LedgerSnapshot {
        self.lock().snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn marker_payload(ledger: &Ledger, marker: RawRef, context: &'static str) -> Result<Payload, MarkerError> {
        match ledger.get(marker.get()).map(|entry| &entry.object) {
            Some(MockObject::Marker(payload)) => Ok(*payload),
            Some(MockObject::Range { .. }) => {
                Err(MarkerError::TypeMismatch { expected: MARKER_TYPE_ID, actual: RANGE_TYPE_ID })
            }
            None => Err(MarkerError::InvalidHandle(context)),
        }
    }

    fn range_payloads(ledger: &Ledger, range: RawRef, context: &'static str) -> Result<(Payload, Payload), MarkerError> {
        match ledger.get(range.get()).map(|entry| &entry.object) {
            Some(MockObject::Range { start, end }) => Ok((*start, *end)),
            Some(MockObject::Marker(_)) => {
                Err(MarkerError::TypeMismatch { expected: RANGE_TYPE_ID, actual: MARKER_TYPE_ID })
            }
            None => Err(MarkerError::InvalidHandle(context)),
        }
    }

    fn issue(ledger: &mut Ledger, object: MockObject) -> Result<RawRef, MarkerError> {
        RawRef::new(ledger.insert(object)).ok_or(MarkerError::InvalidHandle("mock token"))
    }
}

impl Default for MockMarkerBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(unsafe_code)]
impl MarkerBackend for MockMarkerBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn availability(&self) -> Availability {
        Availability::Ready
    }

    fn marker_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
        Ok(MARKER_TYPE_ID)
    }

    fn range_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
        Ok(RANGE_TYPE_ID)
    }

    unsafe fn type_id_of(&self, object: RawRef) -> ForeignTypeId {
        match self.lock().get(object.get()).map(|entry| &entry.object) {
            Some(MockObject::Marker(_)) => MARKER_TYPE_ID,
            Some(MockObject::Range { .. }) => RANGE_TYPE_ID,
            None => UNKNOWN_TYPE_ID,
        }
    }

    fn create_marker(&self, bytes: &[u8]) -> Result<RawRef, MarkerError> {
        let mut ledger = self.lock();
        ledger.calls.create_marker += 1;
        let payload: Payload = bytes
            .try_into()
            .map_err(|_| RecordError::Length { expected: RECORD_SIZE, actual: bytes.len() })?;
        let raw = Self::issue(&mut ledger, MockObject::Marker(payload))?;
        tracing::trace!(?raw, "mock marker created");
        Ok(raw)
    }

    unsafe fn marker_bytes(&self, marker: RawRef, buffer: &mut [u8]) -> Result<(), MarkerError> {
        let mut ledger = self.lock();
        ledger.calls.marker_bytes += 1;
        if buffer.len() < RECORD_SIZE {
            return Err(MarkerError::BufferTooSmall { required: RECORD_SIZE, actual: buffer.len() });
        }
        let payload = Self::marker_payload(&ledger, marker, "marker_bytes")?;
        buffer[..RECORD_SIZE].copy_from_slice(&payload);
        Ok(())
    }

    unsafe fn create_range(&self, start: RawRef, end: RawRef) -> Result<RawRef, MarkerError> {
        let mut ledger = self.lock();
        ledger.calls.create_range += 1;
        let start = Self::marker_payload(&ledger, start, "create_range")?;
        let end = Self::marker_payload(&ledger, end, "create_range")?;
        Self::issue(&mut ledger, MockObject::Range { start, end })
    }

    unsafe fn copy_range_start(&self, range: RawRef) -> Result<RawRef, MarkerError> {
        let mut ledger = self.lock();
        ledger.calls.copy_range_start += 1;
        let (start, _) = Self::range_payloads(&ledger, range, "copy_range_start")?;
        Self::issue(&mut ledger, MockObject::Marker(start))
    }

    unsafe fn copy_range_end(&self, range: RawRef) -> Result<RawRef, MarkerError> {
        let mut ledger = self.lock();
        ledger.calls.copy_range_end += 1;
        let (_, end) = Self::range_payloads(&ledger, range, "copy_range_end")?;
        Self::issue(&mut ledger, MockObject::Marker(end))
    }

    unsafe fn retain(&self, object: RawRef) {
        let mut ledger = self.lock();
        ledger.calls.retain += 1;
        if !ledger.retain(object.get()) {
            tracing::error!(?object, "retain of unknown mock object");
        }
    }

    unsafe fn release(&self, object: RawRef) {
        let mut ledger = self.lock();
        ledger.calls.release += 1;
        if !ledger.release(object.get()) {
            tracing::error!(?object, "release of unknown or freed mock object");
        }
    }

    unsafe fn equal(&self, a: RawRef, b: RawRef) -> bool {
        let ledger = self.lock();
        match (ledger.get(a.get()), ledger.get(b.get())) {
            (Some(a), Some(b)) => match (&a.object, &b.object) {
                (MockObject::Marker(x), MockObject::Marker(y)) => same_position(x, y),
                (
                    MockObject::Range { start: xs, end: xe },
                    MockObject::Range { start: ys, end: ye },
                ) => same_position(xs, ys) && same_position(xe, ye),
                _ => false,
            },
            _ => false,
        }
    }

    fn live_references(&self) -> Option<usize> {
        Some(self.lock().snapshot().live_references)
    }
}

fn same_position(a: &Payload, b: &Payload) -> bool {
    match (TextMarkerRecord::from_bytes(a), TextMarkerRecord::from_bytes(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
