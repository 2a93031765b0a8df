//! Error types for pageflash-core
//!
//! This module provides a no_std compatible error type shared by the raw
//! drivers, the generic driver and the JBOD driver.

use core::fmt;

/// Why a configuration was rejected at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The sector table contains no sectors
    EmptySectorTable,
    /// The sector table has more entries than fit in a [`SectorTable`](crate::SectorTable)
    TooManySectors,
    /// A sector has a size of zero
    ZeroSizedSector {
        /// Position of the sector in the table
        index: usize,
    },
    /// A sector starts at address zero
    ZeroStartAddress {
        /// Position of the sector in the table
        index: usize,
    },
    /// A sector's size differs from the first sector's size
    MixedPageSizes {
        /// Position of the sector in the table
        index: usize,
    },
    /// A sector does not start where the previous one ends
    NonContiguous {
        /// Position of the sector in the table
        index: usize,
    },
    /// No backing memory was supplied
    MissingBacking,
    /// The backing memory is smaller than the sector table
    BackingTooSmall {
        /// Bytes needed to cover the sector table
        required: usize,
        /// Bytes supplied
        actual: usize,
    },
    /// A JBOD was built without any backend
    NoBackends,
    /// The combined size of all JBOD backends does not fit the address type
    AddressSpaceOverflow,
    /// A caller page buffer is shorter than one page
    PageBufferTooSmall {
        /// Page size of the driver
        required: usize,
        /// Length of the supplied buffer
        actual: usize,
    },
}

/// Details about a failed operation on the physical medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumFailure {
    /// Erase failed
    EraseFailed {
        /// Address where the erase was attempted
        address: u32,
        /// Hardware status word reported by the controller
        code: u32,
    },
    /// Program failed
    ProgramFailed {
        /// First address that was not programmed
        address: u32,
        /// Hardware status word reported by the controller
        code: u32,
    },
    /// Reading back page content returned fewer bytes than requested
    ReadFailed {
        /// Address of the read
        address: u32,
    },
    /// The address is not the start of a sector known to the raw driver
    UnknownSector {
        /// Address that was looked up
        address: u32,
    },
}

/// Core error type - no_std compatible, Copy so it can be recorded on drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid driver configuration
    Config(ConfigError),
    /// Address or address + length is beyond the store
    AddressOutOfBounds,
    /// Erase request is not page aligned or not a whole number of pages
    InvalidAlignment,
    /// Erase, program or read failed on the medium
    Medium(MediumFailure),
    /// Fewer bytes were transferred than requested
    ShortTransfer {
        /// Bytes transferred
        done: usize,
        /// Bytes requested
        requested: usize,
    },
    /// Restoring data on unaligned writes needs a page buffer that is not available
    RestoreUnsupported,
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<MediumFailure> for Error {
    fn from(failure: MediumFailure) -> Self {
        Self::Medium(failure)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySectorTable => write!(f, "sector table is empty"),
            Self::TooManySectors => write!(f, "sector table has too many entries"),
            Self::ZeroSizedSector { index } => write!(f, "sector #{} has size zero", index),
            Self::ZeroStartAddress { index } => {
                write!(f, "sector #{} starts at address zero", index)
            }
            Self::MixedPageSizes { index } => write!(
                f,
                "sector #{} has a different size than sector #0; use one driver per page size",
                index
            ),
            Self::NonContiguous { index } => {
                write!(f, "sector #{} does not follow the previous sector", index)
            }
            Self::MissingBacking => write!(f, "no backing memory supplied"),
            Self::BackingTooSmall { required, actual } => write!(
                f,
                "backing memory too small: {} bytes needed, {} supplied",
                required, actual
            ),
            Self::NoBackends => write!(f, "no backends configured"),
            Self::AddressSpaceOverflow => {
                write!(f, "combined backend size exceeds the 32-bit address space")
            }
            Self::PageBufferTooSmall { required, actual } => write!(
                f,
                "page buffer too small: {} bytes needed, {} supplied",
                required, actual
            ),
        }
    }
}

impl fmt::Display for MediumFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EraseFailed { address, code } => {
                write!(f, "erase failed at 0x{:08X} (status 0x{:08X})", address, code)
            }
            Self::ProgramFailed { address, code } => {
                write!(f, "program failed at 0x{:08X} (status 0x{:08X})", address, code)
            }
            Self::ReadFailed { address } => write!(f, "short read at 0x{:08X}", address),
            Self::UnknownSector { address } => {
                write!(f, "0x{:08X} is not the start of a configured sector", address)
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {}", err),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::Medium(failure) => write!(f, "{}", failure),
            Self::ShortTransfer { done, requested } => {
                write!(f, "short transfer: {} of {} bytes", done, requested)
            }
            Self::RestoreUnsupported => {
                write!(f, "restoring data on unaligned writes is not supported")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn test_display() {
        assert_eq!(Error::AddressOutOfBounds.to_string(), "address out of bounds");
        assert_eq!(
            Error::Medium(MediumFailure::EraseFailed {
                address: 0x4000,
                code: 0x10
            })
            .to_string(),
            "erase failed at 0x00004000 (status 0x00000010)"
        );
        assert_eq!(
            Error::from(ConfigError::EmptySectorTable).to_string(),
            "configuration error: sector table is empty"
        );
    }
}
