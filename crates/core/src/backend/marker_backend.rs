use crate::backend::{Availability, BackendDescriptor};
use crate::error::MarkerError;
use crate::handle::{ForeignTypeId, RawRef};

/// The single boundary through which text marker primitives are reached.
///
/// Implementations wrap one source of marker objects (the private WebCore
/// symbols, an in-process simulation, nothing at all). Ownership follows the
/// host framework: `create_*` and `copy_*` hand the caller one owned reference
/// which must be given back through [`MarkerBackend::release`] exactly once.
///
/// No method other than [`MarkerBackend::availability`] may be called on a
/// backend that is not [`Availability::Ready`]; implementations must still
/// check and return [`MarkerError::Unavailable`] instead of reaching foreign
/// code.
///
/// # Safety
///
/// Every method taking a [`RawRef`] is `unsafe`: the token must have been
/// issued by this same backend and the caller must hold at least one
/// reference to it for the duration of the call. For the WebCore backend a
/// token is a live `CFTypeRef`, so a forged or already released one is a
/// dangling pointer.
///
/// A token made up in safe code cannot reach a backend:
///
/// ```compile_fail,E0133
/// use axmarker_core::{MarkerBackend, RawRef, UNAVAILABLE_BACKEND};
///
/// let forged = RawRef::new(0xdead_beef).unwrap();
/// UNAVAILABLE_BACKEND.release(forged);
/// ```
#[allow(unsafe_code)]
pub trait MarkerBackend: Send + Sync {
    fn descriptor(&self) -> &BackendDescriptor;

    /// Must not touch any foreign primitive.
    fn availability(&self) -> Availability;

    fn marker_type_id(&self) -> Result<ForeignTypeId, MarkerError>;

    fn range_type_id(&self) -> Result<ForeignTypeId, MarkerError>;

    /// # Safety
    ///
    /// `object` must be a live token issued by this backend.
    unsafe fn type_id_of(&self, object: RawRef) -> ForeignTypeId;

    /// Creates a marker from a payload of exactly `RECORD_SIZE` bytes. Owned.
    /// Any other length is rejected before foreign code is reached.
    fn create_marker(&self, bytes: &[u8]) -> Result<RawRef, MarkerError>;

    /// Copies the payload of `marker` into the first `RECORD_SIZE` bytes of
    /// `buffer`. Shorter buffers are rejected with
    /// [`MarkerError::BufferTooSmall`].
    ///
    /// # Safety
    ///
    /// `marker` must be a live token issued by this backend.
    unsafe fn marker_bytes(&self, marker: RawRef, buffer: &mut [u8]) -> Result<(), MarkerError>;

    /// Owned.
    ///
    /// # Safety
    ///
    /// `start` and `end` must be live marker tokens issued by this backend.
    unsafe fn create_range(&self, start: RawRef, end: RawRef) -> Result<RawRef, MarkerError>;

    /// Owned.
    ///
    /// # Safety
    ///
    /// `range` must be a live range token issued by this backend.
    unsafe fn copy_range_start(&self, range: RawRef) -> Result<RawRef, MarkerError>;

    /// Owned.
    ///
    /// # Safety
    ///
    /// `range` must be a live range token issued by this backend.
    unsafe fn copy_range_end(&self, range: RawRef) -> Result<RawRef, MarkerError>;

    /// # Safety
    ///
    /// `object` must be a live token issued by this backend.
    unsafe fn retain(&self, object: RawRef);

    /// Gives back one owned reference.
    ///
    /// # Safety
    ///
    /// `object` must be a live token issued by this backend and the caller
    /// must own the reference being released. The token must not be used
    /// afterwards unless another reference is still held.
    unsafe fn release(&self, object: RawRef);

    /// Value equality of two objects issued by this backend.
    ///
    /// # Safety
    ///
    /// `a` and `b` must be live tokens issued by this backend.
    unsafe fn equal(&self, a: RawRef, b: RawRef) -> bool;

    /// Owned references currently outstanding, when the backend can tell.
    fn live_references(&self) -> Option<usize> {
        None
    }
}

pub(crate) fn same_backend(a: &'static dyn MarkerBackend, b: &'static dyn MarkerBackend) -> bool {
    std::ptr::addr_eq(a as *const dyn MarkerBackend, b as *const dyn MarkerBackend)
}
