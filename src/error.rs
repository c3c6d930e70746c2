use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::memory::TypeAddr;

/// Failures while building a machine from a ROM image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM not found: {}", path.display())]
    RomNotFound { path: PathBuf },

    #[error("ROM {} could not be read: {source}", path.display())]
    RomUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },
}

/// Faults raised by a single `step`. None of them is retried internally.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("memory access out of bounds at address {addr:#06X}")]
    OutOfBounds { addr: usize },

    #[error("stack overflow: call depth exceeds 16")]
    StackOverflow,

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("illegal instruction {0:#06X}")]
    IllegalInstruction(u16),
}

impl Fault {
    pub(crate) fn out_of_bounds(addr: TypeAddr) -> Self {
        Fault::OutOfBounds {
            addr: addr as usize,
        }
    }
}
