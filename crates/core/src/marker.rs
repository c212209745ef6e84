//! Owned wrappers around marker and marker-range objects.
//!
//! Each wrapper holds exactly one reference to its foreign object: it is
//! released in `Drop`, `Clone` retains a second one. Raw tokens never leave
//! this module except towards the backend that issued them.
//!
//! Every `unsafe` block below relies on the same invariant: `self.raw` was
//! issued by `self.backend` and the wrapper owns one reference to it until
//! `Drop`.
#![allow(unsafe_code)]

use std::fmt::{Debug, Formatter};

use crate::backend::{MarkerBackend, same_backend};
use crate::error::MarkerError;
use crate::handle::{Ownership, RawRef};
use crate::record::{RECORD_SIZE, TextMarkerRecord};

/// An owned text marker: one position in an accessible document.
pub struct TextMarker {
    backend: &'static dyn MarkerBackend,
    raw: RawRef,
}

impl TextMarker {
    /// Creates a marker carrying `record`.
    pub fn new(
        backend: &'static dyn MarkerBackend,
        record: &TextMarkerRecord,
    ) -> Result<Self, MarkerError> {
        let raw = backend.create_marker(&record.to_bytes())?;
        tracing::debug!(backend = backend.descriptor().id, %record, "created text marker");
        Ok(Self { backend, raw })
    }

    /// Creates a marker from a raw payload. The payload is parsed before the
    /// backend sees it, so malformed bytes never reach foreign code.
    pub fn from_bytes(backend: &'static dyn MarkerBackend, bytes: &[u8]) -> Result<Self, MarkerError> {
        let record = TextMarkerRecord::from_bytes(bytes).inspect_err(|err| {
            tracing::warn!(%err, "refusing to create marker from invalid payload");
        })?;
        let raw = backend.create_marker(bytes)?;
        tracing::debug!(backend = backend.descriptor().id, %record, "created text marker from bytes");
        Ok(Self { backend, raw })
    }

    /// Takes over a reference obtained directly from `backend`.
    ///
    /// With [`Ownership::Create`] the caller's reference is transferred; with
    /// [`Ownership::Get`] the object is retained first. Objects that are not
    /// markers are rejected, and a transferred reference is released in that
    /// case.
    ///
    /// # Safety
    ///
    /// `raw` must be a live token issued by `backend`. With
    /// [`Ownership::Create`] the caller must own the reference it hands over
    /// and must not release it again.
    pub unsafe fn adopt(
        backend: &'static dyn MarkerBackend,
        raw: RawRef,
        ownership: Ownership,
    ) -> Result<Self, MarkerError> {
        let expected = match backend.marker_type_id() {
            Ok(expected) => expected,
            Err(err) => {
                unsafe { release_transferred(backend, raw, ownership) };
                return Err(err);
            }
        };
        // SAFETY: the caller guarantees `raw` is a live token of `backend`.
        let actual = unsafe { backend.type_id_of(raw) };
        if actual != expected {
            unsafe { release_transferred(backend, raw, ownership) };
            return Err(MarkerError::TypeMismatch { expected, actual });
        }
        if ownership == Ownership::Get {
            // SAFETY: as above.
            unsafe { backend.retain(raw) };
        }
        tracing::debug!(backend = backend.descriptor().id, ?ownership, "adopted text marker");
        Ok(Self { backend, raw })
    }

    pub(crate) fn from_owned(backend: &'static dyn MarkerBackend, raw: RawRef) -> Self {
        Self { backend, raw }
    }

    pub(crate) fn raw(&self) -> RawRef {
        self.raw
    }

    pub fn backend(&self) -> &'static dyn MarkerBackend {
        self.backend
    }

    /// Decodes the payload of this marker.
    pub fn record(&self) -> Result<TextMarkerRecord, MarkerError> {
        let mut buffer = [0u8; RECORD_SIZE];
        unsafe { self.backend.marker_bytes(self.raw, &mut buffer) }?;
        Ok(TextMarkerRecord::from_bytes(&buffer)?)
    }

    /// Copies the raw payload into `buffer` and returns the number of bytes
    /// written (always [`RECORD_SIZE`]).
    ///
    /// Buffers shorter than [`RECORD_SIZE`] are rejected without calling the
    /// backend. Longer buffers receive the payload at the front.
    pub fn read_into(&self, buffer: &mut [u8]) -> Result<usize, MarkerError> {
        if buffer.len() < RECORD_SIZE {
            tracing::warn!(len = buffer.len(), "marker payload buffer too small");
            return Err(MarkerError::BufferTooSmall { required: RECORD_SIZE, actual: buffer.len() });
        }
        unsafe { self.backend.marker_bytes(self.raw, &mut buffer[..RECORD_SIZE]) }?;
        Ok(RECORD_SIZE)
    }
}

impl Clone for TextMarker {
    fn clone(&self) -> Self {
        tracing::trace!(raw = ?self.raw, "retain text marker");
        unsafe { self.backend.retain(self.raw) };
        Self { backend: self.backend, raw: self.raw }
    }
}

impl Drop for TextMarker {
    fn drop(&mut self) {
        tracing::trace!(raw = ?self.raw, "release text marker");
        unsafe { self.backend.release(self.raw) };
    }
}

impl PartialEq for TextMarker {
    fn eq(&self, other: &Self) -> bool {
        same_backend(self.backend, other.backend) && unsafe { self.backend.equal(self.raw, other.raw) }
    }
}

impl Debug for TextMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextMarker").field("backend", &self.backend.descriptor().id).finish_non_exhaustive()
    }
}

/// An owned range between two text markers.
pub struct TextMarkerRange {
    backend: &'static dyn MarkerBackend,
    raw: RawRef,
}

impl TextMarkerRange {
    /// Creates a range from `start` to `end`. Both markers must come from the
    /// same backend. The range keeps its own copies; the markers stay owned
    /// by the caller.
    pub fn new(start: &TextMarker, end: &TextMarker) -> Result<Self, MarkerError> {
        if !same_backend(start.backend, end.backend) {
            return Err(MarkerError::BackendMismatch);
        }
        let backend = start.backend;
        // SAFETY: both markers belong to `backend` and stay alive for the call.
        let raw = unsafe { backend.create_range(start.raw(), end.raw()) }?;
        tracing::debug!(backend = backend.descriptor().id, "created text marker range");
        Ok(Self { backend, raw })
    }

    /// Takes over a range reference obtained directly from `backend`. Same
    /// rules as [`TextMarker::adopt`].
    ///
    /// # Safety
    ///
    /// Same contract as [`TextMarker::adopt`].
    pub unsafe fn adopt(
        backend: &'static dyn MarkerBackend,
        raw: RawRef,
        ownership: Ownership,
    ) -> Result<Self, MarkerError> {
        let expected = match backend.range_type_id() {
            Ok(expected) => expected,
            Err(err) => {
                unsafe { release_transferred(backend, raw, ownership) };
                return Err(err);
            }
        };
        // SAFETY: the caller guarantees `raw` is a live token of `backend`.
        let actual = unsafe { backend.type_id_of(raw) };
        if actual != expected {
            unsafe { release_transferred(backend, raw, ownership) };
            return Err(MarkerError::TypeMismatch { expected, actual });
        }
        if ownership == Ownership::Get {
            // SAFETY: as above.
            unsafe { backend.retain(raw) };
        }
        Ok(Self { backend, raw })
    }

    /// A fresh owned copy of the start marker.
    pub fn start(&self) -> Result<TextMarker, MarkerError> {
        let raw = unsafe { self.backend.copy_range_start(self.raw) }?;
        Ok(TextMarker::from_owned(self.backend, raw))
    }

    /// A fresh owned copy of the end marker.
    pub fn end(&self) -> Result<TextMarker, MarkerError> {
        let raw = unsafe { self.backend.copy_range_end(self.raw) }?;
        Ok(TextMarker::from_owned(self.backend, raw))
    }

    pub fn backend(&self) -> &'static dyn MarkerBackend {
        self.backend
    }
}

impl Clone for TextMarkerRange {
    fn clone(&self) -> Self {
        tracing::trace!(raw = ?self.raw, "retain text marker range");
        unsafe { self.backend.retain(self.raw) };
        Self { backend: self.backend, raw: self.raw }
    }
}

impl Drop for TextMarkerRange {
    fn drop(&mut self) {
        tracing::trace!(raw = ?self.raw, "release text marker range");
        unsafe { self.backend.release(self.raw) };
    }
}

impl PartialEq for TextMarkerRange {
    fn eq(&self, other: &Self) -> bool {
        same_backend(self.backend, other.backend) && unsafe { self.backend.equal(self.raw, other.raw) }
    }
}

impl Debug for TextMarkerRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextMarkerRange")
            .field("backend", &self.backend.descriptor().id)
            .finish_non_exhaustive()
    }
}

/// # Safety
///
/// Same contract as [`TextMarker::adopt`].
unsafe fn release_transferred(backend: &'static dyn MarkerBackend, raw: RawRef, ownership: Ownership) {
    if ownership == Ownership::Create {
        unsafe { backend.release(raw) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Availability, BackendCapabilities, BackendDescriptor};
    use crate::handle::ForeignTypeId;
    use crate::record::{Affinity, AxId, NodeHandle};
    use rstest::rstest;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MARKER_TYPE: ForeignTypeId = ForeignTypeId(7);
    const RANGE_TYPE: ForeignTypeId = ForeignTypeId(8);

    enum Object {
        Marker([u8; RECORD_SIZE]),
        Range([u8; RECORD_SIZE], [u8; RECORD_SIZE]),
    }

    // Minimal counting backend; the full simulation lives in the mock crate.
    struct CountingBackend {
        descriptor: BackendDescriptor,
        objects: Mutex<BTreeMap<usize, (Object, usize)>>,
        next: AtomicUsize,
        byte_reads: AtomicUsize,
    }

    impl CountingBackend {
        fn leaked() -> &'static Self {
            Box::leak(Box::new(Self {
                descriptor: BackendDescriptor::new("counting", "Counting", 0, BackendCapabilities::all()),
                objects: Mutex::new(BTreeMap::new()),
                next: AtomicUsize::new(1),
                byte_reads: AtomicUsize::new(0),
            }))
        }

        fn insert(&self, object: Object) -> RawRef {
            let key = self.next.fetch_add(1, Ordering::SeqCst);
            self.objects.lock().unwrap().insert(key, (object, 1));
            RawRef::new(key).unwrap()
        }

        fn payload(&self, raw: RawRef) -> [u8; RECORD_SIZE] {
            match &self.objects.lock().unwrap()[&raw.get()].0 {
                Object::Marker(bytes) => *bytes,
                Object::Range(..) => panic!("not a marker"),
            }
        }

        fn live(&self) -> usize {
            self.objects.lock().unwrap().values().map(|(_, count)| *count).sum()
        }
    }

    impl MarkerBackend for CountingBackend {
        fn descriptor(&self) -> &BackendDescriptor {
            &self.descriptor
        }

        fn availability(&self) -> Availability {
            Availability::Ready
        }

        fn marker_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
            Ok(MARKER_TYPE)
        }

        fn range_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
            Ok(RANGE_TYPE)
        }

        unsafe fn type_id_of(&self, object: RawRef) -> ForeignTypeId {
            match &self.objects.lock().unwrap()[&object.get()].0 {
                Object::Marker(_) => MARKER_TYPE,
                Object::Range(..) => RANGE_TYPE,
            }
        }

        fn create_marker(&self, bytes: &[u8]) -> Result<RawRef, MarkerError> {
            Ok(self.insert(Object::Marker(bytes.try_into().unwrap())))
        }

        unsafe fn marker_bytes(&self, marker: RawRef, buffer: &mut [u8]) -> Result<(), MarkerError> {
            self.byte_reads.fetch_add(1, Ordering::SeqCst);
            buffer.copy_from_slice(&self.payload(marker));
            Ok(())
        }

        unsafe fn create_range(&self, start: RawRef, end: RawRef) -> Result<RawRef, MarkerError> {
            Ok(self.insert(Object::Range(self.payload(start), self.payload(end))))
        }

        unsafe fn copy_range_start(&self, range: RawRef) -> Result<RawRef, MarkerError> {
            let start = match &self.objects.lock().unwrap()[&range.get()].0 {
                Object::Range(start, _) => *start,
                Object::Marker(_) => panic!("not a range"),
            };
            Ok(self.insert(Object::Marker(start)))
        }

        unsafe fn copy_range_end(&self, range: RawRef) -> Result<RawRef, MarkerError> {
            let end = match &self.objects.lock().unwrap()[&range.get()].0 {
                Object::Range(_, end) => *end,
                Object::Marker(_) => panic!("not a range"),
            };
            Ok(self.insert(Object::Marker(end)))
        }

        unsafe fn retain(&self, object: RawRef) {
            self.objects.lock().unwrap().get_mut(&object.get()).unwrap().1 += 1;
        }

        unsafe fn release(&self, object: RawRef) {
            let mut objects = self.objects.lock().unwrap();
            let entry = objects.get_mut(&object.get()).expect("release of live object");
            entry.1 -= 1;
            if entry.1 == 0 {
                objects.remove(&object.get());
            }
        }

        unsafe fn equal(&self, a: RawRef, b: RawRef) -> bool {
            let objects = self.objects.lock().unwrap();
            match (&objects[&a.get()].0, &objects[&b.get()].0) {
                (Object::Marker(x), Object::Marker(y)) => x == y,
                (Object::Range(xs, xe), Object::Range(ys, ye)) => xs == ys && xe == ye,
                _ => false,
            }
        }

        fn live_references(&self) -> Option<usize> {
            Some(self.live())
        }
    }

    fn record(offset: i32) -> TextMarkerRecord {
        TextMarkerRecord::new(AxId(9), NodeHandle(0x1000), offset).with_affinity(Affinity::Upstream)
    }

    #[rstest]
    fn marker_decodes_its_record() {
        let backend = CountingBackend::leaked();
        let marker = TextMarker::new(backend, &record(4)).unwrap();
        assert_eq!(marker.record().unwrap(), record(4));
        drop(marker);
        assert_eq!(backend.live(), 0);
    }

    #[rstest]
    fn clone_and_drop_keep_references_balanced() {
        let backend = CountingBackend::leaked();
        let marker = TextMarker::new(backend, &record(1)).unwrap();
        let copy = marker.clone();
        assert_eq!(backend.live(), 2);
        assert_eq!(copy, marker);
        drop(marker);
        assert_eq!(backend.live(), 1);
        drop(copy);
        assert_eq!(backend.live(), 0);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(RECORD_SIZE - 1)]
    fn small_buffer_is_rejected_before_backend_call(#[case] len: usize) {
        let backend = CountingBackend::leaked();
        let marker = TextMarker::new(backend, &record(2)).unwrap();
        let mut buffer = vec![0u8; len];
        let err = marker.read_into(&mut buffer).unwrap_err();
        assert_eq!(err, MarkerError::BufferTooSmall { required: RECORD_SIZE, actual: len });
        assert_eq!(backend.byte_reads.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn large_buffer_receives_payload_at_front() {
        let backend = CountingBackend::leaked();
        let marker = TextMarker::new(backend, &record(2)).unwrap();
        let mut buffer = vec![0xffu8; RECORD_SIZE + 8];
        assert_eq!(marker.read_into(&mut buffer).unwrap(), RECORD_SIZE);
        assert_eq!(&buffer[..RECORD_SIZE], &record(2).to_bytes());
        assert_eq!(&buffer[RECORD_SIZE..], &[0xff; 8]);
    }

    #[rstest]
    fn invalid_payload_never_reaches_backend() {
        let backend = CountingBackend::leaked();
        let mut bytes = record(0).to_bytes();
        let at = crate::record::layout::AFFINITY;
        bytes[at..at + 4].copy_from_slice(&5u32.to_ne_bytes());
        let err = TextMarker::from_bytes(backend, &bytes).unwrap_err();
        assert_eq!(err, MarkerError::Record(crate::RecordError::InvalidAffinity(5)));
        assert_eq!(backend.live(), 0);

        let err = TextMarker::from_bytes(backend, &bytes[..12]).unwrap_err();
        assert!(matches!(err, MarkerError::Record(crate::RecordError::Length { actual: 12, .. })));
    }

    #[rstest]
    fn range_start_equals_original_marker_by_value() {
        let backend = CountingBackend::leaked();
        let a = TextMarker::new(backend, &record(10)).unwrap();
        let b = TextMarker::new(backend, &record(20)).unwrap();
        let range = TextMarkerRange::new(&a, &b).unwrap();

        let start = range.start().unwrap();
        let end = range.end().unwrap();
        assert_ne!(start.raw(), a.raw());
        assert_eq!(start, a);
        assert_eq!(end, b);
        assert_eq!(start.record().unwrap(), record(10));

        drop((a, b, range, start, end));
        assert_eq!(backend.live(), 0);
    }

    #[rstest]
    fn range_rejects_markers_from_different_backends() {
        let first = CountingBackend::leaked();
        let second = CountingBackend::leaked();
        let a = TextMarker::new(first, &record(1)).unwrap();
        let b = TextMarker::new(second, &record(1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(TextMarkerRange::new(&a, &b).unwrap_err(), MarkerError::BackendMismatch);
    }

    #[rstest]
    fn adopt_follows_ownership_rule() {
        let backend = CountingBackend::leaked();
        let raw = backend.create_marker(&record(3).to_bytes()).unwrap();

        let borrowed = unsafe { TextMarker::adopt(backend, raw, Ownership::Get) }.unwrap();
        assert_eq!(backend.live(), 2);
        drop(borrowed);
        assert_eq!(backend.live(), 1);

        let owned = unsafe { TextMarker::adopt(backend, raw, Ownership::Create) }.unwrap();
        assert_eq!(backend.live(), 1);
        drop(owned);
        assert_eq!(backend.live(), 0);
    }

    #[rstest]
    fn adopt_rejects_wrong_type_and_releases_transfer() {
        let backend = CountingBackend::leaked();
        let a = TextMarker::new(backend, &record(1)).unwrap();
        let range_raw = unsafe { backend.create_range(a.raw(), a.raw()) }.unwrap();

        let err = unsafe { TextMarker::adopt(backend, range_raw, Ownership::Create) }.unwrap_err();
        assert_eq!(err, MarkerError::TypeMismatch { expected: MARKER_TYPE, actual: RANGE_TYPE });
        drop(a);
        assert_eq!(backend.live(), 0);
    }
}
