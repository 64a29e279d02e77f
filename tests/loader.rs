//! Loader behaviour through both the raw calls and `Library`.

use dlhandle::{raw, Error, Library, Mode, OpenOptions};

const LIBC: &std::ffi::CStr = c"libc.so.6";

#[test]
fn valid_library_opens_and_closes() {
    let handle = unsafe { raw::open(Some(LIBC), Mode::NOW) }.expect("libc handle");
    assert_eq!(unsafe { raw::close(handle) }, 0);
}

#[test]
fn nonexistent_library_fails_with_message() {
    let handle = unsafe { raw::open(Some(c"/nonexistent/libdlhandle.so"), Mode::LAZY) };
    assert!(handle.is_none());

    let message = raw::last_error().expect("message after failed open");
    assert!(message.contains("/nonexistent/libdlhandle.so"));
}

#[test]
fn known_symbol_resolves_and_unknown_does_not() {
    let handle = unsafe { raw::open(Some(LIBC), Mode::LAZY) }.unwrap();

    let strlen = unsafe { raw::resolve_symbol(handle, c"strlen") };
    assert!(strlen.is_some());
    assert!(!strlen.unwrap().as_ptr().is_null());

    let missing = unsafe { raw::resolve_symbol(handle, c"dlhandle_not_exported") };
    assert!(missing.is_none());

    assert_eq!(unsafe { raw::close(handle) }, 0);
}

#[test]
fn opening_twice_gives_two_usable_handles() {
    let first = unsafe { raw::open(Some(LIBC), Mode::LAZY) }.unwrap();
    let second = unsafe { raw::open(Some(LIBC), Mode::LAZY) }.unwrap();

    assert!(unsafe { raw::resolve_symbol(first, c"getpid") }.is_some());
    assert!(unsafe { raw::resolve_symbol(second, c"getpid") }.is_some());

    assert_eq!(unsafe { raw::close(first) }, 0);
    // Still referenced by the second open
    assert!(unsafe { raw::resolve_symbol(second, c"getpid") }.is_some());
    assert_eq!(unsafe { raw::close(second) }, 0);
}

#[test]
fn no_pending_error_reads_empty() {
    // Drain anything left on this thread first
    let _ = raw::last_error();
    assert!(raw::last_error().is_none());

    let handle = unsafe { raw::open(Some(LIBC), Mode::LAZY) }.unwrap();
    assert!(raw::last_error().is_none());
    assert_eq!(unsafe { raw::close(handle) }, 0);
}

#[test]
fn library_wraps_the_same_contract() {
    let lib = unsafe { Library::open("libc.so.6") }.unwrap();

    let strlen = unsafe { lib.get::<unsafe extern "C" fn(*const libc::c_char) -> usize, _>("strlen") }
        .unwrap();
    assert_eq!(unsafe { strlen(c"dlhandle".as_ptr()) }, 8);

    let err = unsafe { lib.address("dlhandle_not_exported") }.unwrap_err();
    assert!(matches!(err, Error::Symbol { .. }));

    lib.close().unwrap();
}

#[test]
fn library_opened_twice_shares_the_host_handle() {
    let first = unsafe { Library::open("libc.so.6") }.unwrap();
    let second = unsafe { OpenOptions::default().open("libc.so.6") }.unwrap();

    // glibc reference-counts and hands back the same handle
    assert_eq!(first.handle(), second.handle());

    drop(first);
    assert!(unsafe { second.address("getpid") }.is_ok());
}

#[test]
fn library_is_usable_from_other_threads() {
    let lib = std::sync::Arc::new(unsafe { Library::open("libc.so.6") }.unwrap());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let lib = lib.clone();
            std::thread::spawn(move || unsafe { lib.address("getpid") }.is_ok())
        })
        .collect();

    for worker in workers {
        assert!(worker.join().unwrap());
    }
}
