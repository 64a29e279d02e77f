//! Loader mode flags.
//!
//! The bits and their numeric values belong to the host loader. Every
//! constant here is taken from the platform headers (through `libc`), so
//! the same name can carry different values on different systems and
//! some names may not exist at all.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use libc::c_int;

/// A set of `dlopen` mode bits.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mode(c_int);

impl Mode {
    /// Resolve function symbols as the code referencing them runs.
    pub const LAZY: Mode = Mode(libc::RTLD_LAZY);
    /// Resolve every undefined symbol before `open` returns.
    pub const NOW: Mode = Mode(libc::RTLD_NOW);
    /// Make the library's symbols available to libraries loaded later.
    pub const GLOBAL: Mode = Mode(libc::RTLD_GLOBAL);
    /// Keep the library's symbols out of the global scope.
    pub const LOCAL: Mode = Mode(libc::RTLD_LOCAL);
    /// Never unmap the library, even after the last close.
    pub const NODELETE: Mode = Mode(libc::RTLD_NODELETE);
    /// Only succeed if the library is already resident.
    pub const NOLOAD: Mode = Mode(libc::RTLD_NOLOAD);
    /// Prefer the library's own symbols over the global scope.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    pub const DEEPBIND: Mode = Mode(libc::RTLD_DEEPBIND);

    /// Every constant the host defines, with its C name.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    pub const NAMED: &'static [(&'static str, Mode)] = &[
        ("RTLD_LAZY", Mode::LAZY),
        ("RTLD_NOW", Mode::NOW),
        ("RTLD_GLOBAL", Mode::GLOBAL),
        ("RTLD_LOCAL", Mode::LOCAL),
        ("RTLD_NODELETE", Mode::NODELETE),
        ("RTLD_NOLOAD", Mode::NOLOAD),
        ("RTLD_DEEPBIND", Mode::DEEPBIND),
    ];

    /// Every constant the host defines, with its C name.
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    pub const NAMED: &'static [(&'static str, Mode)] = &[
        ("RTLD_LAZY", Mode::LAZY),
        ("RTLD_NOW", Mode::NOW),
        ("RTLD_GLOBAL", Mode::GLOBAL),
        ("RTLD_LOCAL", Mode::LOCAL),
        ("RTLD_NODELETE", Mode::NODELETE),
        ("RTLD_NOLOAD", Mode::NOLOAD),
    ];

    /// Wrap raw bits without checking them; the host decides what they mean.
    pub const fn from_bits(bits: c_int) -> Mode {
        Mode(bits)
    }

    pub const fn bits(self) -> c_int {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    ///
    /// A zero-valued constant such as `LOCAL` on glibc is contained in
    /// every mode.
    pub const fn contains(self, other: Mode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Mode {
    type Output = Mode;

    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mode {
    fn bitor_assign(&mut self, rhs: Mode) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Mode {
    type Output = Mode;

    fn bitand(self, rhs: Mode) -> Mode {
        Mode(self.0 & rhs.0)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        let mut first = true;

        for (name, flag) in Mode::NAMED {
            // Zero-valued flags would match everything
            if flag.0 == 0 || !self.contains(*flag) {
                continue;
            }
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            rest &= !flag.0;
            first = false;
        }

        if rest != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{:#x}", rest)?;
        } else if first {
            // Nothing named matched; fall back to the zero-valued name if any
            match Mode::NAMED.iter().find(|(_, flag)| flag.0 == 0) {
                Some((name, _)) => f.write_str(name)?,
                None => f.write_str("0")?,
            }
        }

        Ok(())
    }
}
