//! Board information commands

use super::format_size;
use crate::board::Board;
use crate::error::CliError;
use pageflash_core::FlashStore;

/// Print the board layout, or the board as TOML
pub fn run_info(board: &mut Board, toml: bool) -> Result<(), CliError> {
    if toml {
        print!("{}", board.config.to_toml_string());
        return Ok(());
    }

    let config = board.config.clone();
    let store = board.store()?;

    println!("Board: {}", config.name.as_deref().unwrap_or("(unnamed)"));
    println!(
        "Logical size: {} bytes ({}), page size {}",
        store.size(),
        format_size(store.size() as u64),
        format_size(store.page_size() as u64)
    );
    println!(
        "Options: restore_data_on_unaligned_writes={}, auto_erase_page={}",
        config.options.restore_data_on_unaligned_writes, config.options.auto_erase_page
    );
    println!();
    println!(
        "{:<12} {:<25} {:<10} {:<12} Image",
        "Bank", "Logical range", "Page", "Sectors"
    );

    let mut offset = 0u32;
    for (bank, image) in config.banks.iter().zip(board.images()) {
        let size = bank.sectors.total_size();
        let ids: Vec<String> = bank.sectors.iter().map(|s| s.id.to_string()).collect();
        println!(
            "{:<12} 0x{:08X} - 0x{:08X}  {:<10} {:<12} {}",
            bank.name,
            offset,
            offset + size - 1,
            format_size(bank.sectors.page_size() as u64),
            ids.join(", "),
            image.display()
        );
        offset += size;
    }

    Ok(())
}

/// Print which bank, sector and physical address a logical address maps to
pub fn run_locate(board: &mut Board, address: u32) -> Result<(), CliError> {
    let location = board
        .store()?
        .locate(address)
        .ok_or(CliError::OutOfRange(address))?;

    let bank = &board.config.banks[location.index];
    let physical = bank.sectors.base_address() + location.local_address;

    println!("Logical address:  {:#010x}", address);
    println!(
        "Bank:             {} (#{}, starts at logical {:#010x})",
        bank.name, location.index, location.offset
    );
    println!("Bank offset:      {:#010x}", location.local_address);
    println!("Physical address: {:#010x}", physical);
    if let Some(sector) = bank.sectors.sector_containing(physical) {
        println!(
            "Sector:           {} ({:#010x}, {})",
            sector.id,
            sector.start,
            format_size(sector.size as u64)
        );
    }

    Ok(())
}
