//! Erase command

use crate::error::CliError;
use pageflash_core::{FlashStore, FlashStoreExt};

/// Erase `(start, length)`, or everything when no region is given
pub fn run_erase<S: FlashStore + ?Sized>(
    store: &mut S,
    region: Option<(u32, u32)>,
) -> Result<(), CliError> {
    match region {
        Some((start, length)) => {
            println!("Erasing {} bytes at {:#010x}", length, start);
            store.erase(start, length)?;
        }
        None => {
            println!("Erasing all {} bytes", store.size());
            store.erase_all()?;
        }
    }
    println!("Erase complete");
    Ok(())
}
