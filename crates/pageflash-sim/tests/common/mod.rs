//! Shared helpers for the integration tests

#![allow(dead_code)]

use pageflash_core::{GenericFlashDriver, Sector, SectorTable};
use pageflash_sim::SimPageDriver;

pub const KIB16: u32 = 16 * 1024;
pub const KIB64: u32 = 64 * 1024;

pub type SimDriver = GenericFlashDriver<'static, SimPageDriver<Vec<u8>>>;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// STM32F401 sectors 1.. (16 KiB each, starting at 0x0800_4000)
pub fn table_16k(count: u32) -> SectorTable {
    let sectors: Vec<Sector> = (0..count)
        .map(|n| Sector::new(n + 1, KIB16, 0x0800_4000 + n * KIB16))
        .collect();
    SectorTable::new(&sectors).unwrap()
}

/// STM32F401 sector 4
pub fn table_64k() -> SectorTable {
    SectorTable::new(&[Sector::new(4, KIB64, 0x0801_0000)]).unwrap()
}

/// `count` sectors of `size` bytes at 0x0800_0000
pub fn table_small(count: u32, size: u32) -> SectorTable {
    let sectors: Vec<Sector> = (0..count)
        .map(|n| Sector::new(n, size, 0x0800_0000 + n * size))
        .collect();
    SectorTable::new(&sectors).unwrap()
}

/// Deterministic non-erased content
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) & 0x7F)
        .collect()
}

/// Generic driver over a simulated bank prefilled with `content`
pub fn driver_with(table: SectorTable, content: Vec<u8>) -> SimDriver {
    GenericFlashDriver::new(SimPageDriver::new(table, content).unwrap())
}

/// Generic driver over an erased simulated bank
pub fn erased_driver(table: SectorTable) -> SimDriver {
    GenericFlashDriver::new(SimPageDriver::erased(table))
}
