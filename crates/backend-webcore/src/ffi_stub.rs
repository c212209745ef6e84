//! Stand-in used when the private bindings are not compiled.

#[cfg(target_os = "macos")]
const REASON: &str = "built without the private-webcore feature";
#[cfg(not(target_os = "macos"))]
const REASON: &str = "WebCore text markers exist only on macOS";

pub(crate) const UNSUPPORTED: Option<&str> = Some(REASON);

/// Uninhabited: no symbols can ever be loaded.
pub(crate) enum Symbols {}

impl Symbols {
    pub(crate) fn load() -> Result<Self, String> {
        Err(REASON.to_owned())
    }

    pub(crate) fn marker_type_id(&self) -> u64 {
        match *self {}
    }

    pub(crate) fn range_type_id(&self) -> u64 {
        match *self {}
    }

    pub(crate) fn type_id_of(&self, _object: usize) -> u64 {
        match *self {}
    }

    pub(crate) fn create_marker(&self, _bytes: &[u8]) -> usize {
        match *self {}
    }

    pub(crate) fn marker_bytes(&self, _marker: usize, _buffer: &mut [u8]) -> bool {
        match *self {}
    }

    pub(crate) fn create_range(&self, _start: usize, _end: usize) -> usize {
        match *self {}
    }

    pub(crate) fn copy_range_start(&self, _range: usize) -> usize {
        match *self {}
    }

    pub(crate) fn copy_range_end(&self, _range: usize) -> usize {
        match *self {}
    }

    pub(crate) fn retain(&self, _object: usize) {
        match *self {}
    }

    pub(crate) fn release(&self, _object: usize) {
        match *self {}
    }

    pub(crate) fn equal(&self, _a: usize, _b: usize) -> bool {
        match *self {}
    }
}
