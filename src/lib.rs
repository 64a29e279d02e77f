// dlhandle - Host dynamic loader access
// MIT, 2025

//! Thin access to the host dynamic loader (`dlopen`, `dlsym`, `dlerror`,
//! `dlclose`).
//!
//! Two layers are provided:
//! - [`raw`]: the four loader calls passed through unchanged, with opaque
//!   [`Handle`] and [`Address`] tokens and host status values
//! - [`Library`]/[`OpenOptions`]: an owned handle that closes on drop and
//!   reports failures as [`Error`] with the host message
//!
//! [`elf`] inspects a library file on disk without loading it.
//!
//! # Example: Call a function from libm
//!
//! ```no_run
//! use dlhandle::{Binding, OpenOptions};
//!
//! let libm = unsafe { OpenOptions::builder().binding(Binding::Now).build().open("libm.so.6")? };
//! let cos = unsafe { libm.get::<unsafe extern "C" fn(f64) -> f64, _>("cos")? };
//! assert_eq!(unsafe { cos(0.0) }, 1.0);
//! # Ok::<(), dlhandle::Error>(())
//! ```
//!
//! # Example: Raw calls
//!
//! ```no_run
//! use dlhandle::{raw, Mode};
//!
//! match unsafe { raw::open(Some(c"libz.so.1"), Mode::LAZY) } {
//!     Some(handle) => assert_eq!(unsafe { raw::close(handle) }, 0),
//!     None => eprintln!("{}", raw::last_error().unwrap_or_default()),
//! }
//! ```

pub mod elf;
pub mod error;
pub mod library;
pub mod mode;
pub mod options;
pub mod raw;

pub use elf::{inspect, LibraryInfo};
pub use error::Error;
pub use library::{Library, Symbol};
pub use mode::Mode;
pub use options::{Binding, OpenOptions};
pub use raw::{Address, Handle};
