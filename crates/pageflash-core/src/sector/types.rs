//! Sector table types
//!
//! Core types for sector tables that work in no_std environments.

use crate::error::{ConfigError, Result};

/// Maximum number of sectors in one table
pub const MAX_SECTORS: usize = 32;

/// One physically erasable sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Sector {
    /// Controller sector number (used by erase commands)
    pub id: u32,
    /// Size in bytes
    pub size: u32,
    /// Physical start address
    pub start: u32,
}

impl Sector {
    /// Create a new sector
    pub const fn new(id: u32, size: u32, start: u32) -> Self {
        Self { id, size, start }
    }

    /// Physical address one past the last byte
    pub fn end(&self) -> u64 {
        self.start as u64 + self.size as u64
    }

    /// Check if a physical address is within this sector
    pub fn contains(&self, address: u32) -> bool {
        address >= self.start && (address as u64) < self.end()
    }
}

/// Validated, immutable list of same-sized, contiguous sectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorTable {
    sectors: heapless::Vec<Sector, MAX_SECTORS>,
}

impl SectorTable {
    /// Validate `sectors` and build a table from them
    ///
    /// # Errors
    /// * `EmptySectorTable` - No sectors given
    /// * `TooManySectors` - More than [`MAX_SECTORS`] sectors
    /// * `ZeroSizedSector`, `ZeroStartAddress` - Degenerate entries
    /// * `MixedPageSizes` - Sectors differ in size
    /// * `NonContiguous` - A sector does not start where the previous ends
    pub fn new(sectors: &[Sector]) -> Result<Self> {
        let first = sectors.first().ok_or(ConfigError::EmptySectorTable)?;

        for (index, sector) in sectors.iter().enumerate() {
            if sector.size == 0 {
                return Err(ConfigError::ZeroSizedSector { index }.into());
            }
            if sector.start == 0 {
                return Err(ConfigError::ZeroStartAddress { index }.into());
            }
            if sector.size != first.size {
                return Err(ConfigError::MixedPageSizes { index }.into());
            }
            if index > 0 && sectors[index - 1].end() != sector.start as u64 {
                return Err(ConfigError::NonContiguous { index }.into());
            }
        }

        // Total size must stay addressable with u32 offsets
        let last = sectors[sectors.len() - 1];
        if last.end() - first.start as u64 > u32::MAX as u64 {
            return Err(ConfigError::NonContiguous {
                index: sectors.len() - 1,
            }
            .into());
        }

        let sectors =
            heapless::Vec::from_slice(sectors).map_err(|_| ConfigError::TooManySectors)?;
        Ok(Self { sectors })
    }

    /// Page size (the size shared by every sector)
    pub fn page_size(&self) -> u32 {
        self.sectors[0].size
    }

    /// Sum of all sector sizes
    pub fn total_size(&self) -> u32 {
        self.page_size() * self.sectors.len() as u32
    }

    /// Physical address of the first sector
    pub fn base_address(&self) -> u32 {
        self.sectors[0].start
    }

    /// Number of sectors
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Always false; an empty table cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// All sectors in address order
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Iterate over the sectors
    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.iter()
    }

    /// Find the sector whose start is exactly `address` (physical)
    ///
    /// Returns the sector and its position in the table.
    pub fn sector_starting_at(&self, address: u32) -> Option<(usize, &Sector)> {
        self.sectors
            .iter()
            .enumerate()
            .find(|(_, sector)| sector.start == address)
    }

    /// Find the sector containing `address` (physical)
    pub fn sector_containing(&self, address: u32) -> Option<&Sector> {
        self.sectors.iter().find(|sector| sector.contains(address))
    }
}
