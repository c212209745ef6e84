use once_cell::sync::OnceCell;

use axmarker_core::backend::{Availability, BackendCapabilities, BackendDescriptor, MarkerBackend};
use axmarker_core::config::ALLOW_PRIVATE_API_ENV;
use axmarker_core::{ForeignTypeId, MarkerConfig, MarkerError, RECORD_SIZE, RawRef, RecordError};

use crate::ffi::{self, Symbols};

pub const WEBCORE_BACKEND_ID: &str = "webcore";

/// Text markers backed by the private WebCore symbols.
///
/// Ready only when the bindings are compiled (macOS with the `private-webcore`
/// feature), the private API is allowed through [`MarkerConfig`], and every
/// symbol resolves. In any other state each primitive returns
/// [`MarkerError::Unavailable`] without touching WebCore.
///
/// The opt-in is consulted only until the symbols are loaded. From then on
/// the backend stays ready for the life of the process, so references handed
/// out earlier are always released through `CFRelease`.
pub struct WebCoreBackend {
    descriptor: BackendDescriptor,
    symbols: OnceCell<Result<Symbols, String>>,
    config: fn() -> MarkerConfig,
}

impl WebCoreBackend {
    pub const fn new() -> Self {
        Self::with_config(MarkerConfig::from_env)
    }

    /// Uses `config` instead of the process environment to decide the opt-in.
    pub const fn with_config(config: fn() -> MarkerConfig) -> Self {
        Self {
            descriptor: BackendDescriptor::new(
                WEBCORE_BACKEND_ID,
                "WebCore Text Markers (private)",
                100,
                BackendCapabilities::all(),
            ),
            symbols: OnceCell::new(),
            config,
        }
    }

    fn state(&self) -> Result<&Symbols, Availability> {
        if let Some(reason) = ffi::UNSUPPORTED {
            return Err(Availability::Unsupported(reason.to_owned()));
        }
        if let Some(loaded) = self.symbols.get() {
            return loaded.as_ref().map_err(|reason| Availability::Unsupported(reason.clone()));
        }
        if !(self.config)().allow_private_api {
            return Err(Availability::Disabled(format!(
                "private WebCore primitives may crash the process; set {ALLOW_PRIVATE_API_ENV}=1 to enable"
            )));
        }
        let loaded = self.symbols.get_or_init(|| {
            tracing::warn!("resolving private WebCore text marker symbols");
            Symbols::load()
        });
        loaded.as_ref().map_err(|reason| Availability::Unsupported(reason.clone()))
    }

    fn symbols(&self) -> Result<&Symbols, MarkerError> {
        self.state().map_err(|availability| {
            MarkerError::unavailable(WEBCORE_BACKEND_ID, availability.to_string())
        })
    }

    /// Symbols that are already resolved. Never loads them and never reads the
    /// configuration.
    fn loaded(&self) -> Option<&Symbols> {
        self.symbols.get().and_then(|loaded| loaded.as_ref().ok())
    }

    /// Maps the result of a create/copy primitive; null means it failed.
    fn owned(context: &'static str, token: usize) -> Result<RawRef, MarkerError> {
        RawRef::new(token).ok_or(MarkerError::InvalidHandle(context))
    }

    /// Maps the `BOOL` result of `wkGetBytesFromAXTextMarker`.
    fn copied(succeeded: bool) -> Result<(), MarkerError> {
        if succeeded {
            Ok(())
        } else {
            Err(MarkerError::foreign("wkGetBytesFromAXTextMarker", "returned NO"))
        }
    }
}

impl Default for WebCoreBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(unsafe_code)]
impl MarkerBackend for WebCoreBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn availability(&self) -> Availability {
        match self.state() {
            Ok(_) => Availability::Ready,
            Err(availability) => availability,
        }
    }

    fn marker_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
        Ok(ForeignTypeId(self.symbols()?.marker_type_id()))
    }

    fn range_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
        Ok(ForeignTypeId(self.symbols()?.range_type_id()))
    }

    unsafe fn type_id_of(&self, object: RawRef) -> ForeignTypeId {
        match self.loaded() {
            Some(symbols) => ForeignTypeId(symbols.type_id_of(object.get())),
            None => ForeignTypeId(0),
        }
    }

    fn create_marker(&self, bytes: &[u8]) -> Result<RawRef, MarkerError> {
        if bytes.len() != RECORD_SIZE {
            return Err(RecordError::Length { expected: RECORD_SIZE, actual: bytes.len() }.into());
        }
        let symbols = self.symbols()?;
        Self::owned("wkCreateAXTextMarker", symbols.create_marker(bytes))
    }

    unsafe fn marker_bytes(&self, marker: RawRef, buffer: &mut [u8]) -> Result<(), MarkerError> {
        if buffer.len() < RECORD_SIZE {
            return Err(MarkerError::BufferTooSmall { required: RECORD_SIZE, actual: buffer.len() });
        }
        let symbols = self.symbols()?;
        Self::copied(symbols.marker_bytes(marker.get(), &mut buffer[..RECORD_SIZE]))
    }

    unsafe fn create_range(&self, start: RawRef, end: RawRef) -> Result<RawRef, MarkerError> {
        let symbols = self.symbols()?;
        Self::owned("wkCreateAXTextMarkerRange", symbols.create_range(start.get(), end.get()))
    }

    unsafe fn copy_range_start(&self, range: RawRef) -> Result<RawRef, MarkerError> {
        let symbols = self.symbols()?;
        Self::owned("wkCopyAXTextMarkerRangeStart", symbols.copy_range_start(range.get()))
    }

    unsafe fn copy_range_end(&self, range: RawRef) -> Result<RawRef, MarkerError> {
        let symbols = self.symbols()?;
        Self::owned("wkCopyAXTextMarkerRangeEnd", symbols.copy_range_end(range.get()))
    }

    // A live token implies the symbols were loaded, so these never consult
    // the opt-in again.
    unsafe fn retain(&self, object: RawRef) {
        match self.loaded() {
            Some(symbols) => symbols.retain(object.get()),
            None => tracing::error!(?object, "retain without loaded WebCore symbols"),
        }
    }

    unsafe fn release(&self, object: RawRef) {
        match self.loaded() {
            Some(symbols) => symbols.release(object.get()),
            None => tracing::error!(?object, "release without loaded WebCore symbols"),
        }
    }

    unsafe fn equal(&self, a: RawRef, b: RawRef) -> bool {
        self.loaded().is_some_and(|symbols| symbols.equal(a.get(), b.get()))
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use axmarker_core::contract::testkit::{ContractIssue, verify_backend};
    use axmarker_core::{AxId, BackendRegistry, NodeHandle, TextMarker, TextMarkerRecord};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn denied() -> MarkerConfig {
        MarkerConfig::default()
    }

    static DENIED: WebCoreBackend = WebCoreBackend::with_config(denied);

    #[rstest]
    fn is_never_ready_without_opt_in() {
        let availability = DENIED.availability();
        assert!(!availability.is_ready(), "{availability}");
        // Nothing was resolved, let alone called.
        assert!(DENIED.symbols.get().is_none());
    }

    #[rstest]
    fn primitives_are_refused_when_not_ready() {
        let record = TextMarkerRecord::new(AxId(1), NodeHandle(1), 0);
        let err = TextMarker::new(&DENIED, &record).err().expect("refused");
        assert!(err.is_unavailable(), "{err}");
        assert!(DENIED.marker_type_id().unwrap_err().is_unavailable());
        assert!(DENIED.range_type_id().unwrap_err().is_unavailable());
    }

    #[rstest]
    fn contract_reports_not_ready() {
        let samples = [TextMarkerRecord::default()];
        let issues = verify_backend(&DENIED, &samples);
        assert!(matches!(issues.as_slice(), [ContractIssue::NotReady { .. }]), "{issues:?}");
    }

    #[rstest]
    fn default_selection_never_picks_disabled_webcore() {
        let registry = BackendRegistry::from_backends([
            &DENIED as &'static dyn MarkerBackend,
            &axmarker_core::UNAVAILABLE_BACKEND,
        ]);
        let selected = registry.select(&MarkerConfig::default()).expect("fallback");
        assert_eq!(selected.descriptor().id, "unavailable");
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(RECORD_SIZE + 1)]
    fn wrong_payload_length_is_rejected_first(#[case] len: usize) {
        let err = DENIED.create_marker(&vec![0u8; len]).unwrap_err();
        assert_eq!(err, MarkerError::Record(RecordError::Length { expected: RECORD_SIZE, actual: len }));
        assert!(DENIED.symbols.get().is_none());
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(RECORD_SIZE - 1)]
    fn short_buffer_is_rejected_first(#[case] len: usize) {
        let token = RawRef::new(0x1000).expect("non-null");
        let mut buffer = vec![0u8; len];
        // The length check returns before the token is looked at.
        let err = unsafe { DENIED.marker_bytes(token, &mut buffer) }.unwrap_err();
        assert_eq!(err, MarkerError::BufferTooSmall { required: RECORD_SIZE, actual: len });
        assert!(DENIED.symbols.get().is_none());
    }

    #[rstest]
    fn null_result_is_an_invalid_handle() {
        assert_eq!(
            WebCoreBackend::owned("wkCreateAXTextMarker", 0),
            Err(MarkerError::InvalidHandle("wkCreateAXTextMarker"))
        );
        assert_eq!(
            WebCoreBackend::owned("wkCopyAXTextMarkerRangeEnd", 0x7000).map(RawRef::get),
            Ok(0x7000)
        );
    }

    #[rstest]
    fn bytes_returning_no_is_a_foreign_error() {
        assert_eq!(WebCoreBackend::copied(true), Ok(()));
        let err = WebCoreBackend::copied(false).unwrap_err();
        assert_eq!(err, MarkerError::foreign("wkGetBytesFromAXTextMarker", "returned NO"));
    }

    static CONFIG_READS: AtomicUsize = AtomicUsize::new(0);

    fn counted_opt_in() -> MarkerConfig {
        CONFIG_READS.fetch_add(1, Ordering::SeqCst);
        MarkerConfig { allow_private_api: true, ..MarkerConfig::default() }
    }

    #[rstest]
    fn reference_calls_never_read_the_opt_in() {
        static COUNTED: WebCoreBackend = WebCoreBackend::with_config(counted_opt_in);
        let token = RawRef::new(0x2000).expect("non-null");

        // No symbols are loaded, so the token is never dereferenced.
        unsafe {
            COUNTED.retain(token);
            COUNTED.release(token);
            assert!(!COUNTED.equal(token, token));
            assert_eq!(COUNTED.type_id_of(token), ForeignTypeId(0));
        }
        assert_eq!(CONFIG_READS.load(Ordering::SeqCst), 0);
        assert!(COUNTED.symbols.get().is_none());
    }

    #[cfg(not(all(target_os = "macos", feature = "private-webcore")))]
    #[rstest]
    fn uncompiled_bindings_report_unsupported_even_with_opt_in() {
        fn allowed() -> MarkerConfig {
            MarkerConfig { allow_private_api: true, ..MarkerConfig::default() }
        }
        static ALLOWED: WebCoreBackend = WebCoreBackend::with_config(allowed);

        let availability = ALLOWED.availability();
        assert_eq!(availability.label(), "unsupported", "{availability}");
    }
}
