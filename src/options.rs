//! Open options.
//!
//! Collects the loader behaviour a caller wants and folds it into a
//! host [`Mode`] when the library is opened:
//!
//! ```no_run
//! use dlhandle::{Binding, OpenOptions};
//!
//! let lib = unsafe {
//!     OpenOptions::builder()
//!         .binding(Binding::Now)
//!         .global(true)
//!         .build()
//!         .open("libm.so.6")?
//! };
//! # Ok::<(), dlhandle::Error>(())
//! ```

use std::ffi::OsStr;

use crate::library::Library;
use crate::mode::Mode;
use crate::Error;

/// When undefined symbols get resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    /// `RTLD_LAZY`
    #[default]
    Lazy,
    /// `RTLD_NOW`
    Now,
}

#[derive(Debug, Clone, bon::Builder)]
pub struct OpenOptions {
    #[builder(default)]
    binding: Binding,
    /// `RTLD_GLOBAL` instead of `RTLD_LOCAL`
    #[builder(default)]
    global: bool,
    /// `RTLD_NODELETE`
    #[builder(default)]
    nodelete: bool,
    /// `RTLD_NOLOAD`
    #[builder(default)]
    noload: bool,
    /// `RTLD_DEEPBIND`, only available on glibc
    #[builder(default)]
    deepbind: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl OpenOptions {
    /// The host mode these options stand for.
    pub fn mode(&self) -> Result<Mode, Error> {
        let mut mode = match self.binding {
            Binding::Lazy => Mode::LAZY,
            Binding::Now => Mode::NOW,
        };

        mode |= if self.global { Mode::GLOBAL } else { Mode::LOCAL };

        if self.nodelete {
            mode |= Mode::NODELETE;
        }
        if self.noload {
            mode |= Mode::NOLOAD;
        }
        if self.deepbind {
            mode |= deepbind()?;
        }

        Ok(mode)
    }

    /// Open `path`. Name resolution (absolute path, search path,
    /// versioned name) is left to the host loader.
    ///
    /// # Safety
    ///
    /// The library's initialisers run during the call.
    pub unsafe fn open<P: AsRef<OsStr>>(&self, path: P) -> Result<Library, Error> {
        Library::open_with(Some(path.as_ref()), self.mode()?)
    }

    /// Open the main program.
    ///
    /// # Safety
    ///
    /// Same contract as [`OpenOptions::open`].
    pub unsafe fn open_self(&self) -> Result<Library, Error> {
        Library::open_with(None, self.mode()?)
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn deepbind() -> Result<Mode, Error> {
    Ok(Mode::DEEPBIND)
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn deepbind() -> Result<Mode, Error> {
    Err(Error::Unsupported("RTLD_DEEPBIND"))
}
