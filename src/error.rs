//! Error types for the pageflash CLI

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    /// Board file could not be loaded
    #[error(transparent)]
    Board(#[from] pageflash_core::BoardError),

    /// Flash store rejected or failed an operation
    #[error("Flash error: {0}")]
    Flash(#[from] pageflash_core::Error),

    /// Image file could not be read or written
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Existing image file does not match its bank
    #[error("Image '{}' has {actual} bytes, bank '{bank}' needs {expected}", .path.display())]
    ImageSize {
        path: PathBuf,
        bank: String,
        expected: usize,
        actual: usize,
    },

    /// `--data` is not valid hex
    #[error("Invalid hex data: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Neither `--data` nor `--input` was given
    #[error("Nothing to write: pass --data or --input")]
    NoData,

    /// Address is beyond the last bank
    #[error("Address {0:#x} is outside the board")]
    OutOfRange(u32),

    /// Read back data differs from what was written
    #[error("Verification failed for {length} bytes at {start:#x}")]
    VerifyFailed { start: u32, length: usize },
}

impl CliError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
