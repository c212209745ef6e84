//! Runtime-resolved bindings to the private WebCore text marker symbols.
//!
//! The symbols are looked up with `dlopen`/`dlsym` instead of being linked so
//! that a system without them fails with an error instead of at load time.
//! Nothing here can catch a crash inside the symbols themselves: on the release
//! they were last tried on, calling `wkGetAXTextMarkerTypeID` died with
//! `EXC_BAD_ACCESS (SIGBUS)` at its first instruction even though the symbol
//! resolved to a non-null address.
#![allow(unsafe_code)]

use std::ffi::{c_uchar, c_ulong, c_void};

use libloading::Library;

pub(crate) const UNSUPPORTED: Option<&str> = None;

type CFTypeRef = *const c_void;
type CFTypeID = c_ulong;
// Objective-C BOOL is `signed char` on x86_64 and `bool` on arm64; both
// return in the low byte.
type ObjcBool = c_uchar;

type TypeIdFn = unsafe extern "C" fn() -> CFTypeID;
type CreateRangeFn = unsafe extern "C" fn(CFTypeRef, CFTypeRef) -> CFTypeRef;
type CopyEndpointFn = unsafe extern "C" fn(CFTypeRef) -> CFTypeRef;
type CreateMarkerFn = unsafe extern "C" fn(*const c_void, usize) -> CFTypeRef;
type GetBytesFn = unsafe extern "C" fn(CFTypeRef, *mut c_void, usize) -> ObjcBool;
type RetainFn = unsafe extern "C" fn(CFTypeRef) -> CFTypeRef;
type ReleaseFn = unsafe extern "C" fn(CFTypeRef);
type GetTypeIdFn = unsafe extern "C" fn(CFTypeRef) -> CFTypeID;
type EqualFn = unsafe extern "C" fn(CFTypeRef, CFTypeRef) -> c_uchar;

const WEBCORE_PATHS: [&str; 2] = [
    "/System/Library/Frameworks/WebKit.framework/Versions/A/Frameworks/WebCore.framework/Versions/A/WebCore",
    "/System/Library/PrivateFrameworks/WebCore.framework/WebCore",
];
const CORE_FOUNDATION_PATH: &str =
    "/System/Library/Frameworks/CoreFoundation.framework/CoreFoundation";

/// Resolved function pointers. The libraries are kept open for as long as the
/// pointers live.
pub(crate) struct Symbols {
    _webcore: Library,
    _core_foundation: Library,
    marker_type_id: TypeIdFn,
    range_type_id: TypeIdFn,
    create_range: CreateRangeFn,
    copy_range_start: CopyEndpointFn,
    copy_range_end: CopyEndpointFn,
    create_marker: CreateMarkerFn,
    get_bytes: GetBytesFn,
    retain: RetainFn,
    release: ReleaseFn,
    get_type_id: GetTypeIdFn,
    equal: EqualFn,
}

impl Symbols {
    pub(crate) fn load() -> Result<Self, String> {
        let webcore = open_first(&WEBCORE_PATHS)?;
        let core_foundation = open_first(&[CORE_FOUNDATION_PATH])?;

        let symbols = Self {
            marker_type_id: resolve(&webcore, b"wkGetAXTextMarkerTypeID\0")?,
            range_type_id: resolve(&webcore, b"wkGetAXTextMarkerRangeTypeID\0")?,
            create_range: resolve(&webcore, b"wkCreateAXTextMarkerRange\0")?,
            copy_range_start: resolve(&webcore, b"wkCopyAXTextMarkerRangeStart\0")?,
            copy_range_end: resolve(&webcore, b"wkCopyAXTextMarkerRangeEnd\0")?,
            create_marker: resolve(&webcore, b"wkCreateAXTextMarker\0")?,
            get_bytes: resolve(&webcore, b"wkGetBytesFromAXTextMarker\0")?,
            retain: resolve(&core_foundation, b"CFRetain\0")?,
            release: resolve(&core_foundation, b"CFRelease\0")?,
            get_type_id: resolve(&core_foundation, b"CFGetTypeID\0")?,
            equal: resolve(&core_foundation, b"CFEqual\0")?,
            _webcore: webcore,
            _core_foundation: core_foundation,
        };
        Ok(symbols)
    }

    pub(crate) fn marker_type_id(&self) -> u64 {
        u64::from(unsafe { (self.marker_type_id)() })
    }

    pub(crate) fn range_type_id(&self) -> u64 {
        u64::from(unsafe { (self.range_type_id)() })
    }

    pub(crate) fn type_id_of(&self, object: usize) -> u64 {
        u64::from(unsafe { (self.get_type_id)(object as CFTypeRef) })
    }

    /// Owned, or 0 on failure.
    pub(crate) fn create_marker(&self, bytes: &[u8]) -> usize {
        unsafe { (self.create_marker)(bytes.as_ptr().cast(), bytes.len()) as usize }
    }

    pub(crate) fn marker_bytes(&self, marker: usize, buffer: &mut [u8]) -> bool {
        unsafe {
            (self.get_bytes)(marker as CFTypeRef, buffer.as_mut_ptr().cast(), buffer.len()) != 0
        }
    }

    /// Owned, or 0 on failure.
    pub(crate) fn create_range(&self, start: usize, end: usize) -> usize {
        unsafe { (self.create_range)(start as CFTypeRef, end as CFTypeRef) as usize }
    }

    /// Owned, or 0 on failure.
    pub(crate) fn copy_range_start(&self, range: usize) -> usize {
        unsafe { (self.copy_range_start)(range as CFTypeRef) as usize }
    }

    /// Owned, or 0 on failure.
    pub(crate) fn copy_range_end(&self, range: usize) -> usize {
        unsafe { (self.copy_range_end)(range as CFTypeRef) as usize }
    }

    pub(crate) fn retain(&self, object: usize) {
        unsafe {
            (self.retain)(object as CFTypeRef);
        }
    }

    pub(crate) fn release(&self, object: usize) {
        unsafe { (self.release)(object as CFTypeRef) }
    }

    pub(crate) fn equal(&self, a: usize, b: usize) -> bool {
        unsafe { (self.equal)(a as CFTypeRef, b as CFTypeRef) != 0 }
    }
}

fn open_first(paths: &[&str]) -> Result<Library, String> {
    let mut last_error = String::from("no candidate paths");
    for path in paths {
        match unsafe { Library::new(path) } {
            Ok(library) => {
                tracing::debug!(path, "opened framework");
                return Ok(library);
            }
            Err(err) => last_error = format!("{path}: {err}"),
        }
    }
    Err(last_error)
}

fn resolve<T: Copy>(library: &Library, name: &[u8]) -> Result<T, String> {
    let symbol = unsafe { library.get::<T>(name) }.map_err(|err| {
        let printable = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned();
        format!("symbol {printable}: {err}")
    })?;
    Ok(*symbol)
}
