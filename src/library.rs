//! Owned library handles.
//!
//! [`Library`] pairs every successful open with exactly one close by
//! closing on drop, and turns the host's null/nonzero results into
//! [`Error`] values carrying the host message.

use std::ffi::{c_void, CStr, CString, OsStr};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::os::unix::ffi::OsStrExt;

use camino::Utf8PathBuf;
use tracing::{debug, trace, warn};

use crate::error::NO_MESSAGE;
use crate::mode::Mode;
use crate::options::OpenOptions;
use crate::raw::{self, Address, Handle};
use crate::Error;

/// A dynamic library opened through the host loader.
///
/// The handle is closed when the value is dropped. Symbols obtained with
/// [`Library::get`] borrow the library and cannot outlive it.
pub struct Library {
    handle: Handle,
}

// SAFETY: the handle is an opaque token; dlsym and dlclose on it are
// thread-safe on the supported hosts, and glibc keeps dlerror per thread.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    /// Open `path` with the default options (lazy binding, local scope).
    ///
    /// # Safety
    ///
    /// The library's initialisers run during the call.
    pub unsafe fn open<P: AsRef<OsStr>>(path: P) -> Result<Self, Error> {
        OpenOptions::default().open(path)
    }

    /// Open the main program itself.
    ///
    /// # Safety
    ///
    /// Same contract as [`Library::open`].
    pub unsafe fn this() -> Result<Self, Error> {
        OpenOptions::default().open_self()
    }

    pub(crate) unsafe fn open_with(path: Option<&OsStr>, mode: Mode) -> Result<Self, Error> {
        let shown = path.map_or_else(
            || "<main program>".to_string(),
            |p| p.to_string_lossy().into_owned(),
        );
        let cpath = path.map(|p| CString::new(p.as_bytes())).transpose()?;

        debug!("Opening {} with {}", shown, mode);

        match raw::open(cpath.as_deref(), mode) {
            Some(handle) => Ok(Self { handle }),
            None => Err(Error::Open {
                path: shown,
                message: raw::last_error().unwrap_or_else(|| NO_MESSAGE.to_string()),
            }),
        }
    }

    /// Resolve `name` to its opaque address.
    ///
    /// Any stale error is cleared first, so the message in a failure
    /// belongs to this lookup. A symbol whose value is genuinely null is
    /// still reported as [`Error::NullSymbol`]; the host gives no way to
    /// tell it apart from a lookup that failed without a message.
    ///
    /// # Safety
    ///
    /// Lazy binding may run deferred relocation code in the library.
    pub unsafe fn address<S: Into<Vec<u8>>>(&self, name: S) -> Result<Address, Error> {
        let name = CString::new(name)?;
        let _ = raw::last_error();

        trace!("Resolving {:?}", name);

        match raw::resolve_symbol(self.handle, &name) {
            Some(address) => Ok(address),
            None => {
                let name = name.to_string_lossy().into_owned();
                match raw::last_error() {
                    Some(message) => Err(Error::Symbol { name, message }),
                    None => Err(Error::NullSymbol { name }),
                }
            }
        }
    }

    /// Resolve `name` as a value of type `T`, usually an `extern "C" fn`
    /// pointer or a `*mut` to data.
    ///
    /// # Safety
    ///
    /// `T` must match the real type of the symbol. Calling a function
    /// through the wrong signature is undefined behaviour.
    pub unsafe fn get<T: Copy, S: Into<Vec<u8>>>(&self, name: S) -> Result<Symbol<'_, T>, Error> {
        let size = mem::size_of::<T>();
        if size != mem::size_of::<*mut c_void>() {
            return Err(Error::SymbolSize { size });
        }

        let address = self.address(name)?;
        Ok(Symbol {
            value: mem::transmute_copy::<*mut c_void, T>(&address.as_ptr()),
            _library: PhantomData,
        })
    }

    /// The underlying opaque handle, still owned by `self`.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// File the host mapped for this library, taken from its link map.
    ///
    /// `None` for the main program, whose link-map name is empty, and on
    /// hosts without `dlinfo`.
    pub fn path(&self) -> Option<Utf8PathBuf> {
        // SAFETY: the handle is open for as long as `self` lives.
        let name = unsafe { link_map_name(self.handle)? };
        let name = name.to_str().ok()?;
        (!name.is_empty()).then(|| Utf8PathBuf::from(name))
    }

    /// Give up ownership without closing.
    pub fn into_raw(self) -> Handle {
        let handle = self.handle;
        mem::forget(self);
        handle
    }

    /// Take ownership of a handle from [`raw::open`].
    ///
    /// # Safety
    ///
    /// `handle` must be open and must not be closed by anyone else.
    pub unsafe fn from_raw(handle: Handle) -> Self {
        Self { handle }
    }

    /// Close now and report the host status instead of ignoring it on drop.
    pub fn close(self) -> Result<(), Error> {
        let handle = self.into_raw();
        // SAFETY: ownership guarantees the handle is open and closed once.
        let status = unsafe { raw::close(handle) };
        debug!("Closed {:?} with status {}", handle, status);

        if status == 0 {
            Ok(())
        } else {
            Err(Error::Close {
                status,
                message: raw::last_error().unwrap_or_else(|| NO_MESSAGE.to_string()),
            })
        }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        // SAFETY: see `close`.
        let status = unsafe { raw::close(self.handle) };
        if status != 0 {
            warn!(
                "Closing {:?} failed: {}",
                self.handle,
                raw::last_error().unwrap_or_else(|| NO_MESSAGE.to_string())
            );
        }
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library").field("handle", &self.handle).finish()
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
const RTLD_DI_LINKMAP: libc::c_int = 2;

/// Leading fields of glibc's `struct link_map`.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[repr(C)]
struct LinkMap {
    #[allow(dead_code)]
    l_addr: usize,
    l_name: *const libc::c_char,
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
extern "C" {
    fn dlinfo(handle: *mut c_void, request: libc::c_int, info: *mut c_void) -> libc::c_int;
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
unsafe fn link_map_name<'a>(handle: Handle) -> Option<&'a CStr> {
    let mut map: *const LinkMap = std::ptr::null();
    let status = dlinfo(
        handle.as_ptr(),
        RTLD_DI_LINKMAP,
        (&mut map as *mut *const LinkMap).cast(),
    );
    if status != 0 || map.is_null() {
        let _ = raw::last_error();
        return None;
    }

    let name = (*map).l_name;
    (!name.is_null()).then(|| CStr::from_ptr(name))
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
unsafe fn link_map_name<'a>(_handle: Handle) -> Option<&'a CStr> {
    None
}

/// A resolved symbol, valid while its [`Library`] is open.
pub struct Symbol<'lib, T> {
    value: T,
    _library: PhantomData<&'lib Library>,
}

impl<T> Deref for Symbol<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> fmt::Debug for Symbol<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pointer-sized by construction
        let address: *const c_void = unsafe { mem::transmute_copy(&self.value) };
        f.debug_tuple("Symbol").field(&address).finish()
    }
}
