use crate::backend::MarkerBackend;
use crate::config::MarkerConfig;
use crate::error::MarkerError;

/// Inventory registration entry for [`MarkerBackend`].
pub struct BackendRegistration {
    pub backend: &'static dyn MarkerBackend,
}

inventory::collect!(BackendRegistration);

/// Iterate over all registered [`MarkerBackend`] implementations.
pub fn marker_backends() -> impl Iterator<Item = &'static dyn MarkerBackend> {
    inventory::iter::<BackendRegistration>.into_iter().map(|entry| entry.backend)
}

/// Registered backends ordered by descending priority.
pub struct BackendRegistry {
    entries: Vec<&'static dyn MarkerBackend>,
}

impl BackendRegistry {
    /// Collects all backends submitted through [`crate::register_marker_backend!`].
    pub fn discover() -> Self {
        Self::from_backends(marker_backends())
    }

    pub fn from_backends(backends: impl IntoIterator<Item = &'static dyn MarkerBackend>) -> Self {
        let mut entries: Vec<_> = backends.into_iter().collect();
        entries.sort_by(|a, b| {
            b.descriptor()
                .priority
                .cmp(&a.descriptor().priority)
                .then_with(|| a.descriptor().id.cmp(b.descriptor().id))
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[&'static dyn MarkerBackend] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&'static dyn MarkerBackend> {
        self.entries.iter().copied().find(|backend| backend.descriptor().id == id)
    }

    /// Picks the backend to use.
    ///
    /// An explicitly configured backend must exist and be ready. Otherwise the
    /// highest-priority ready backend wins, falling back to the lowest-priority
    /// entry (the always-registered `unavailable` backend) when nothing is
    /// ready.
    pub fn select(&self, config: &MarkerConfig) -> Result<&'static dyn MarkerBackend, MarkerError> {
        if let Some(id) = config.backend.as_deref() {
            let backend = self.get(id).ok_or_else(|| MarkerError::BackendNotFound(id.to_owned()))?;
            let availability = backend.availability();
            if !availability.is_ready() {
                return Err(MarkerError::unavailable(
                    backend.descriptor().id,
                    availability.reason().unwrap_or("not ready"),
                ));
            }
            tracing::debug!(backend = id, "using configured text marker backend");
            return Ok(backend);
        }

        if let Some(backend) = self.entries.iter().copied().find(|b| b.availability().is_ready()) {
            tracing::debug!(backend = backend.descriptor().id, "selected text marker backend");
            return Ok(backend);
        }

        let fallback = self
            .entries
            .last()
            .copied()
            .ok_or_else(|| MarkerError::BackendNotFound("<any>".to_owned()))?;
        tracing::debug!(
            backend = fallback.descriptor().id,
            "no text marker backend ready, using fallback"
        );
        Ok(fallback)
    }
}

#[macro_export]
macro_rules! register_marker_backend {
    ($backend:expr) => {
        inventory::submit! {
            $crate::backend::BackendRegistration { backend: $backend }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Availability, BackendCapabilities, BackendDescriptor, UNAVAILABLE_BACKEND};
    use crate::handle::{ForeignTypeId, RawRef};
    use rstest::rstest;

    struct StubBackend {
        descriptor: BackendDescriptor,
        ready: bool,
    }

    #[allow(unsafe_code)]
    impl MarkerBackend for StubBackend {
        fn descriptor(&self) -> &BackendDescriptor {
            &self.descriptor
        }

        fn availability(&self) -> Availability {
            if self.ready { Availability::Ready } else { Availability::Disabled("stub".into()) }
        }

        fn marker_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
            Ok(ForeignTypeId(1))
        }

        fn range_type_id(&self) -> Result<ForeignTypeId, MarkerError> {
            Ok(ForeignTypeId(2))
        }

        unsafe fn type_id_of(&self, _object: RawRef) -> ForeignTypeId {
            ForeignTypeId(1)
        }

        fn create_marker(&self, _bytes: &[u8]) -> Result<RawRef, MarkerError> {
            Err(MarkerError::unavailable(self.descriptor.id, "stub"))
        }

        unsafe fn marker_bytes(&self, _marker: RawRef, _buffer: &mut [u8]) -> Result<(), MarkerError> {
            Err(MarkerError::unavailable(self.descriptor.id, "stub"))
        }

        unsafe fn create_range(&self, _start: RawRef, _end: RawRef) -> Result<RawRef, MarkerError> {
            Err(MarkerError::unavailable(self.descriptor.id, "stub"))
        }

        unsafe fn copy_range_start(&self, _range: RawRef) -> Result<RawRef, MarkerError> {
            Err(MarkerError::unavailable(self.descriptor.id, "stub"))
        }

        unsafe fn copy_range_end(&self, _range: RawRef) -> Result<RawRef, MarkerError> {
            Err(MarkerError::unavailable(self.descriptor.id, "stub"))
        }

        unsafe fn retain(&self, _object: RawRef) {}

        unsafe fn release(&self, _object: RawRef) {}

        unsafe fn equal(&self, a: RawRef, b: RawRef) -> bool {
            a == b
        }
    }

    static READY_LOW: StubBackend = StubBackend {
        descriptor: BackendDescriptor::new("ready-low", "Ready Low", 10, BackendCapabilities::all()),
        ready: true,
    };

    static READY_HIGH: StubBackend = StubBackend {
        descriptor: BackendDescriptor::new("ready-high", "Ready High", 50, BackendCapabilities::all()),
        ready: true,
    };

    static DISABLED_TOP: StubBackend = StubBackend {
        descriptor: BackendDescriptor::new("disabled-top", "Disabled", 90, BackendCapabilities::all()),
        ready: false,
    };

    register_marker_backend!(&READY_LOW);

    fn registry() -> BackendRegistry {
        BackendRegistry::from_backends([
            &READY_LOW as &'static dyn MarkerBackend,
            &UNAVAILABLE_BACKEND,
            &DISABLED_TOP,
            &READY_HIGH,
        ])
    }

    #[rstest]
    fn registration_exposes_backends() {
        let ids: Vec<_> = marker_backends().map(|backend| backend.descriptor().id).collect();
        assert!(ids.contains(&"ready-low"));
        assert!(ids.contains(&"unavailable"));
    }

    #[rstest]
    fn entries_are_ordered_by_priority() {
        let ids: Vec<_> = registry().entries().iter().map(|b| b.descriptor().id).collect();
        assert_eq!(ids, ["disabled-top", "ready-high", "ready-low", "unavailable"]);
    }

    #[rstest]
    fn default_selection_skips_disabled_backends() {
        let selected = registry().select(&MarkerConfig::default()).expect("selection");
        assert_eq!(selected.descriptor().id, "ready-high");
    }

    #[rstest]
    fn explicit_selection_wins_over_priority() {
        let config = MarkerConfig { backend: Some("ready-low".into()), ..MarkerConfig::default() };
        let selected = registry().select(&config).expect("selection");
        assert_eq!(selected.descriptor().id, "ready-low");
    }

    #[rstest]
    fn explicit_selection_of_disabled_backend_fails() {
        let config = MarkerConfig { backend: Some("disabled-top".into()), ..MarkerConfig::default() };
        let err = registry().select(&config).err().expect("disabled backend rejected");
        assert!(err.is_unavailable(), "{err}");
    }

    #[rstest]
    fn unknown_backend_is_reported() {
        let config = MarkerConfig { backend: Some("nope".into()), ..MarkerConfig::default() };
        let err = registry().select(&config).err().expect("unknown backend rejected");
        assert_eq!(err, MarkerError::BackendNotFound("nope".into()));
    }

    #[rstest]
    fn fallback_is_unavailable_backend() {
        let registry = BackendRegistry::from_backends([
            &DISABLED_TOP as &'static dyn MarkerBackend,
            &UNAVAILABLE_BACKEND,
        ]);
        let selected = registry.select(&MarkerConfig::default()).expect("fallback");
        assert_eq!(selected.descriptor().id, "unavailable");
    }
}
