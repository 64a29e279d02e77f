//! Static inspection of a shared object on disk.
//!
//! Reads what the loader would see (SONAME, dependencies, exported
//! dynamic symbols) without loading anything, which helps explain why
//! an open or a lookup fails.

use camino::{Utf8Path, Utf8PathBuf};
use goblin::elf::header::ET_DYN;
use goblin::elf::section_header::SHN_UNDEF;
use goblin::elf::sym::{STB_GLOBAL, STB_GNU_UNIQUE, STB_WEAK};
use goblin::elf::Elf;
use memmap2::Mmap;
use std::fs::File;

use crate::Error;

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub path: Utf8PathBuf,
    pub soname: Option<String>,
    /// DT_NEEDED entries, in file order
    pub needed: Vec<String>,
    /// Defined global and weak dynamic symbols, sorted
    pub exports: Vec<String>,
    pub is_64bit: bool,
}

impl LibraryInfo {
    pub fn exports_symbol(&self, name: &str) -> bool {
        self.exports
            .binary_search_by(|s| s.as_str().cmp(name))
            .is_ok()
    }
}

pub fn inspect(path: &Utf8Path) -> Result<LibraryInfo, Error> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let elf = Elf::parse(&mmap)?;

    // Must be a shared object (ET_DYN)
    if elf.header.e_type != ET_DYN {
        return Err(Error::NotElf);
    }

    let mut exports: Vec<String> = elf
        .dynsyms
        .iter()
        .filter(|sym| sym.st_shndx != SHN_UNDEF as usize)
        .filter(|sym| matches!(sym.st_bind(), STB_GLOBAL | STB_WEAK | STB_GNU_UNIQUE))
        .filter_map(|sym| elf.dynstrtab.get_at(sym.st_name))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    exports.sort();
    exports.dedup();

    Ok(LibraryInfo {
        path: path.to_path_buf(),
        soname: elf.soname.map(str::to_string),
        needed: elf.libraries.iter().map(|s| s.to_string()).collect(),
        exports,
        is_64bit: elf.is_64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Path of the libc mapped into this process.
    fn resident_libc() -> Utf8PathBuf {
        let maps = std::fs::read_to_string("/proc/self/maps").unwrap();
        maps.lines()
            .filter_map(|line| line.split_whitespace().nth(5))
            .find(|path| {
                Utf8Path::new(path)
                    .file_name()
                    .is_some_and(|name| name.starts_with("libc.so") || name.starts_with("libc-"))
            })
            .map(Utf8PathBuf::from)
            .expect("libc mapped into the test process")
    }

    #[test]
    fn libc_exports_and_soname() {
        let info = inspect(&resident_libc()).unwrap();
        assert_eq!(info.soname.as_deref(), Some("libc.so.6"));
        assert!(info.exports_symbol("strlen"));
        assert!(info.exports_symbol("getpid"));
        assert!(!info.exports_symbol("dlhandle_missing_symbol"));
        assert!(info.exports.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn non_elf_file_is_rejected() {
        let path = Utf8PathBuf::try_from(std::env::temp_dir())
            .unwrap()
            .join(format!("dlhandle-not-elf-{}", std::process::id()));
        std::fs::write(&path, b"definitely not an ELF object").unwrap();

        let result = inspect(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = inspect(Utf8Path::new("/nonexistent/libdlhandle.so")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
