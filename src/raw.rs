//! Direct pass-through to the host loader.
//!
//! These four calls forward to `dlopen`, `dlsym`, `dlerror` and
//! `dlclose` without adding state, locking or validation. Failures come
//! back exactly as the host produces them: an absent handle or address,
//! or a nonzero status. [`last_error`] is the only way to learn why.
//!
//! # Caveats
//!
//! The pending error is process- or thread-scoped state owned by the
//! host (glibc keeps it per thread). Reading it clears it, and any other
//! loader call may replace it, so read it immediately after the failing
//! call. A symbol whose value really is null is indistinguishable from a
//! missing one unless the error state was empty before the lookup and
//! is still empty after it.

use std::ffi::{c_void, CStr};
use std::ptr::{self, NonNull};

use libc::c_int;

use crate::mode::Mode;

/// Opaque token for a library the host has opened.
///
/// The bit pattern means nothing to the caller. A handle must not be
/// used after it has been passed to [`close`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonNull<c_void>);

impl Handle {
    pub(crate) fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Opaque address of a resolved function or data symbol.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(NonNull<c_void>);

impl Address {
    /// The address as an untyped pointer, for the final cast by the caller.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Open `path` with `mode`, or the main program when `path` is `None`.
///
/// # Safety
///
/// Loading a library runs its initialisers, which can do anything.
pub unsafe fn open(path: Option<&CStr>, mode: Mode) -> Option<Handle> {
    let name = path.map_or(ptr::null(), CStr::as_ptr);
    NonNull::new(libc::dlopen(name, mode.bits())).map(Handle)
}

/// Look up `name` in the library behind `handle`.
///
/// # Safety
///
/// `handle` must come from [`open`] and must not have been closed.
pub unsafe fn resolve_symbol(handle: Handle, name: &CStr) -> Option<Address> {
    NonNull::new(libc::dlsym(handle.as_ptr(), name.as_ptr())).map(Address)
}

/// Take the host's pending error message, if there is one.
pub fn last_error() -> Option<String> {
    // SAFETY: dlerror returns null or a NUL-terminated string that stays
    // valid until the next dl* call on this thread; it is copied out here.
    unsafe {
        let message = libc::dlerror();
        if message.is_null() {
            None
        } else {
            Some(CStr::from_ptr(message).to_string_lossy().into_owned())
        }
    }
}

/// Close `handle`, returning the host status (zero on success).
///
/// # Safety
///
/// `handle` must come from [`open`] and must not have been closed. The
/// host may run the library's finalisers.
pub unsafe fn close(handle: Handle) -> c_int {
    libc::dlclose(handle.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_leaves_a_message() {
        let path = c"libdlhandle-raw-missing.so";
        let handle = unsafe { open(Some(path), Mode::LAZY) };
        assert!(handle.is_none());

        let message = last_error().expect("pending error after failed open");
        assert!(!message.is_empty());
        assert!(last_error().is_none(), "reading the error clears it");
    }

    #[test]
    fn main_program_resolves_libc_symbols() {
        let handle = unsafe { open(None, Mode::LAZY) }.expect("main program handle");
        let address = unsafe { resolve_symbol(handle, c"getpid") };
        assert!(address.is_some());

        let missing = unsafe { resolve_symbol(handle, c"dlhandle_no_such_symbol") };
        assert!(missing.is_none());
        assert!(last_error().is_some());

        assert_eq!(unsafe { close(handle) }, 0);
    }
}
