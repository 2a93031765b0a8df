//! Raw page driver trait
//!
//! A raw page driver talks to the flash controller. It knows the sector
//! table and nothing about unaligned access: erases are per sector, programs
//! are expected to cover erased memory. Hardware crates and
//! `pageflash-sim` implement this trait; [`GenericFlashDriver`] consumes it.
//!
//! All addresses are relative to the start of the driver's region.
//!
//! [`GenericFlashDriver`]: crate::GenericFlashDriver

use crate::error::{Error, Result};

/// Page-granular access to one physically contiguous flash region
///
/// Drivers are constructed from a validated [`SectorTable`](crate::SectorTable)
/// and reject inconsistent configurations in their constructor.
pub trait RawPageDriver {
    /// Size of the region in bytes
    fn size(&self) -> u32;

    /// Page (sector) size in bytes, identical for every sector of the region
    fn page_size(&self) -> u32;

    /// Erase the pages covering `size` bytes starting at `address`
    ///
    /// `address` must be the start of a sector. At least one page is erased.
    fn erase_page(&mut self, address: u32, size: u32) -> Result<()>;

    /// Program `data` at `address`
    ///
    /// The target must be erased. Returns the number of bytes programmed.
    fn write_page(&mut self, address: u32, data: &[u8]) -> Result<usize>;

    /// Copy region content at `address` into `buf`
    ///
    /// Never fails; returns fewer bytes than `buf.len()` when the region ends
    /// first.
    fn read_page(&mut self, address: u32, buf: &mut [u8]) -> usize;

    /// Error recorded by the last failing operation
    fn last_error(&self) -> Option<Error> {
        None
    }

    /// Forget the recorded error
    fn clear_error(&mut self) {}
}

impl<T: RawPageDriver + ?Sized> RawPageDriver for &mut T {
    fn size(&self) -> u32 {
        (**self).size()
    }

    fn page_size(&self) -> u32 {
        (**self).page_size()
    }

    fn erase_page(&mut self, address: u32, size: u32) -> Result<()> {
        (**self).erase_page(address, size)
    }

    fn write_page(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        (**self).write_page(address, data)
    }

    fn read_page(&mut self, address: u32, buf: &mut [u8]) -> usize {
        (**self).read_page(address, buf)
    }

    fn last_error(&self) -> Option<Error> {
        (**self).last_error()
    }

    fn clear_error(&mut self) {
        (**self).clear_error()
    }
}
