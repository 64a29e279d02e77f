// Error types for dlhandle
use std::ffi::NulError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Null byte was found in name: {0}")]
    InteriorNul(#[from] NulError),

    #[error("Failed to open {path}: {message}")]
    Open { path: String, message: String },

    #[error("Failed to resolve symbol {name}: {message}")]
    Symbol { name: String, message: String },

    #[error("Symbol {name} resolved to a null address")]
    NullSymbol { name: String },

    #[error("Symbol type must be pointer-sized, got {size} bytes")]
    SymbolSize { size: usize },

    #[error("Failed to close library (status {status}): {message}")]
    Close { status: i32, message: String },

    #[error("{0} is not supported by this host loader")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ELF parsing error: {0}")]
    Goblin(#[from] goblin::error::Error),

    #[error("Not an ELF shared object")]
    NotElf,
}

/// Message used when the host reports a failure but leaves no description.
pub(crate) const NO_MESSAGE: &str = "no error message reported by the loader";
