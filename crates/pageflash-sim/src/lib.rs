//! pageflash-sim - In-memory internal-flash controller emulation
//!
//! [`SimPageDriver`] behaves like the embedded flash controller of an
//! STM32F4: sectors are erased by number, programming can only clear bits
//! and is done in word, half-word or byte units, and every operation leaves
//! its outcome in a status register. Faults can be injected at chosen
//! addresses to exercise the failure paths of the drivers built on top.
//!
//! The emulated region is backed by any `AsRef<[u8]> + AsMut<[u8]>`, so a
//! static array works as well as a `Vec` or a memory-mapped image file.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use bitflags::bitflags;
use pageflash_core::{ConfigError, Error, MediumFailure, RawPageDriver, Result, SectorTable};

/// Value of every byte after an erase
pub const ERASED_BYTE: u8 = 0xFF;

/// Maximum number of faults that can be armed at once
pub const MAX_FAULTS: usize = 8;

bitflags! {
    /// Flash status register
    ///
    /// Bit positions follow the STM32F4 `FLASH_SR` register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlashStatus: u32 {
        /// End of operation
        const EOP    = 1 << 0;
        /// Operation error
        const OPERR  = 1 << 1;
        /// Write protection error
        const WRPERR = 1 << 4;
        /// Programming alignment error
        const PGAERR = 1 << 5;
        /// Programming parallelism error
        const PGPERR = 1 << 6;
        /// Programming sequence error
        const PGSERR = 1 << 7;
        /// Read protection error
        const RDERR  = 1 << 8;
        /// Operation in progress
        const BSY    = 1 << 16;

        /// Any error flag
        const ERRORS = Self::OPERR.bits()
            | Self::WRPERR.bits()
            | Self::PGAERR.bits()
            | Self::PGPERR.bits()
            | Self::PGSERR.bits()
            | Self::RDERR.bits();
    }
}

/// Unit used to program a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramWidth {
    /// 8 bit
    Byte,
    /// 16 bit
    HalfWord,
    /// 32 bit
    Word,
}

impl ProgramWidth {
    /// Widest unit dividing both the address and the length
    pub fn for_transfer(address: u32, len: usize) -> Self {
        if address % 4 == 0 && len % 4 == 0 {
            Self::Word
        } else if address % 2 == 0 && len % 2 == 0 {
            Self::HalfWord
        } else {
            Self::Byte
        }
    }

    /// Unit size in bytes
    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::HalfWord => 2,
            Self::Word => 4,
        }
    }
}

/// Operation a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Fails an erase of the sector containing the address
    Erase,
    /// Fails programming of the unit containing the address
    Program,
}

/// An armed fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// Operation that fails
    pub kind: FaultKind,
    /// Address relative to the start of the region
    pub address: u32,
    /// Flags reported in the status register when the fault fires
    pub status: FlashStatus,
}

impl Fault {
    /// Fail erasing the sector containing `address` with an operation error
    pub fn erase(address: u32) -> Self {
        Self {
            kind: FaultKind::Erase,
            address,
            status: FlashStatus::OPERR,
        }
    }

    /// Fail programming at `address` with a programming sequence error
    pub fn program(address: u32) -> Self {
        Self {
            kind: FaultKind::Program,
            address,
            status: FlashStatus::PGSERR,
        }
    }
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Number of `erase_page` calls
    pub erase_calls: usize,
    /// Number of sectors erased
    pub sectors_erased: usize,
    /// Number of `write_page` calls
    pub program_calls: usize,
    /// Number of bytes programmed
    pub bytes_programmed: usize,
    /// Number of `read_page` calls
    pub read_calls: usize,
    /// Number of bytes read
    pub bytes_read: usize,
}

/// Simulated flash controller over one sector table
pub struct SimPageDriver<B> {
    table: SectorTable,
    backing: B,
    status: FlashStatus,
    write_protected: bool,
    faults: heapless::Vec<Fault, MAX_FAULTS>,
    stats: OpStats,
    last_error: Option<Error>,
}

#[cfg(feature = "alloc")]
impl SimPageDriver<Vec<u8>> {
    /// Create a controller over freshly erased memory
    pub fn erased(table: SectorTable) -> Self {
        let backing = vec![ERASED_BYTE; table.total_size() as usize];
        Self::from_parts(table, backing)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SimPageDriver<B> {
    /// Create a controller emulating `table` in `backing`
    ///
    /// `backing[0]` holds the first byte of the first sector.
    ///
    /// # Errors
    /// * `MissingBacking` - If `backing` is empty
    /// * `BackingTooSmall` - If `backing` does not cover the whole table
    pub fn new(table: SectorTable, backing: B) -> Result<Self> {
        let actual = backing.as_ref().len();
        if actual == 0 {
            return Err(ConfigError::MissingBacking.into());
        }

        let required = table.total_size() as usize;
        if actual < required {
            return Err(ConfigError::BackingTooSmall { required, actual }.into());
        }

        Ok(Self::from_parts(table, backing))
    }

    fn from_parts(table: SectorTable, backing: B) -> Self {
        log::debug!(
            "simulated flash: {} sectors of {} bytes at 0x{:08X}",
            table.len(),
            table.page_size(),
            table.base_address()
        );

        Self {
            table,
            backing,
            status: FlashStatus::empty(),
            write_protected: false,
            faults: heapless::Vec::new(),
            stats: OpStats::default(),
            last_error: None,
        }
    }

    /// The emulated sector table
    pub fn sector_table(&self) -> &SectorTable {
        &self.table
    }

    /// Status register after the last operation
    pub fn status(&self) -> FlashStatus {
        self.status
    }

    /// Operation counters
    pub fn stats(&self) -> OpStats {
        self.stats
    }

    /// Reset the operation counters
    pub fn reset_stats(&mut self) {
        self.stats = OpStats::default();
    }

    /// Reject all erases and programs with a write protection error
    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    /// Whether erases and programs are rejected
    pub fn is_write_protected(&self) -> bool {
        self.write_protected
    }

    /// Arm a fault
    ///
    /// Faults stay armed until [`clear_faults`](Self::clear_faults). Returns
    /// the fault back if [`MAX_FAULTS`] are already armed.
    pub fn inject_fault(&mut self, fault: Fault) -> core::result::Result<(), Fault> {
        self.faults.push(fault)
    }

    /// Disarm all faults
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// The whole emulated region
    pub fn backing(&self) -> &[u8] {
        self.region()
    }

    /// Give back the backing memory
    pub fn into_backing(self) -> B {
        self.backing
    }

    /// Physical address of a region-relative address
    pub fn physical_address(&self, address: u32) -> u32 {
        self.table.base_address().wrapping_add(address)
    }

    fn region(&self) -> &[u8] {
        &self.backing.as_ref()[..self.table.total_size() as usize]
    }

    fn region_mut(&mut self) -> &mut [u8] {
        let size = self.table.total_size() as usize;
        &mut self.backing.as_mut()[..size]
    }

    fn fault_at(&self, kind: FaultKind, range: core::ops::Range<u32>) -> Option<Fault> {
        self.faults
            .iter()
            .find(|f| f.kind == kind && range.contains(&f.address))
            .copied()
    }

    fn fail(&mut self, status: FlashStatus, failure: MediumFailure) -> Error {
        self.status = status;
        let err = Error::Medium(failure);
        log::warn!("simulated flash: {} ({:?})", err, status);
        self.last_error = Some(err);
        err
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> RawPageDriver for SimPageDriver<B> {
    fn size(&self) -> u32 {
        self.table.total_size()
    }

    fn page_size(&self) -> u32 {
        self.table.page_size()
    }

    fn erase_page(&mut self, address: u32, size: u32) -> Result<()> {
        self.status = FlashStatus::empty();
        self.stats.erase_calls += 1;

        let physical = self.physical_address(address);
        let Some((index, sector)) = self.table.sector_starting_at(physical) else {
            return Err(self.fail(
                FlashStatus::PGSERR,
                MediumFailure::UnknownSector { address: physical },
            ));
        };

        let sector_size = sector.size;
        let count = (size / sector_size).max(1) as usize;
        if index + count > self.table.len() {
            let end = physical.wrapping_add(count as u32 * sector_size);
            return Err(self.fail(
                FlashStatus::PGSERR,
                MediumFailure::UnknownSector { address: end },
            ));
        }

        if self.write_protected {
            let code = FlashStatus::WRPERR.bits();
            return Err(self.fail(FlashStatus::WRPERR, MediumFailure::EraseFailed { address, code }));
        }

        for n in 0..count {
            let start = address + (n as u32) * sector_size;
            if let Some(fault) = self.fault_at(FaultKind::Erase, start..start + sector_size) {
                let code = fault.status.bits();
                return Err(self.fail(
                    fault.status,
                    MediumFailure::EraseFailed { address: start, code },
                ));
            }

            log::trace!(
                "simulated flash: erasing sector {} at 0x{:08X}",
                self.table.sectors()[index + n].id,
                self.physical_address(start)
            );
            let range = start as usize..(start + sector_size) as usize;
            self.region_mut()[range].fill(ERASED_BYTE);
            self.stats.sectors_erased += 1;
        }

        self.status = FlashStatus::EOP;
        Ok(())
    }

    /// Program `data` at `address`, clearing bits only
    ///
    /// A fault stops programming at the failing unit; the units programmed
    /// before it are returned as `Ok(n)` with the failure recorded.
    fn write_page(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        self.status = FlashStatus::empty();
        self.stats.program_calls += 1;

        if address as u64 + data.len() as u64 > self.size() as u64 {
            return Err(Error::AddressOutOfBounds);
        }

        if self.write_protected {
            let code = FlashStatus::WRPERR.bits();
            return Err(self.fail(
                FlashStatus::WRPERR,
                MediumFailure::ProgramFailed { address, code },
            ));
        }

        let width = ProgramWidth::for_transfer(address, data.len()).bytes();
        let mut written = 0usize;

        for unit in data.chunks(width) {
            let at = address + written as u32;
            if let Some(fault) = self.fault_at(FaultKind::Program, at..at + width as u32) {
                let code = fault.status.bits();
                self.fail(fault.status, MediumFailure::ProgramFailed { address: at, code });
                self.stats.bytes_programmed += written;
                return Ok(written);
            }

            let target = &mut self.region_mut()[at as usize..at as usize + unit.len()];
            for (cell, byte) in target.iter_mut().zip(unit) {
                *cell &= byte;
            }
            written += unit.len();
        }

        self.stats.bytes_programmed += written;
        self.status = FlashStatus::EOP;
        Ok(written)
    }

    fn read_page(&mut self, address: u32, buf: &mut [u8]) -> usize {
        self.stats.read_calls += 1;

        let region = self.region();
        let start = (address as usize).min(region.len());
        let len = buf.len().min(region.len() - start);
        buf[..len].copy_from_slice(&region[start..start + len]);

        self.stats.bytes_read += len;
        len
    }

    fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    fn clear_error(&mut self) {
        self.last_error = None;
        self.status = FlashStatus::empty();
    }
}
