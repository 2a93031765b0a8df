//! Write command

use super::{create_progress_bar, page_chunks};
use crate::error::CliError;
use pageflash_core::{FlashStore, FlashStoreExt};
use std::fs;
use std::path::Path;

/// Get the bytes to write from `--data` (hex) or `--input` (file)
pub fn load_data(data: Option<&str>, input: Option<&Path>) -> Result<Vec<u8>, CliError> {
    match (data, input) {
        (Some(hex), _) => {
            let hex: String = hex.split_whitespace().collect();
            let hex = hex
                .strip_prefix("0x")
                .or_else(|| hex.strip_prefix("0X"))
                .unwrap_or(&hex);
            Ok(hex::decode(hex)?)
        }
        (None, Some(path)) => {
            let data = fs::read(path).map_err(|e| CliError::io(path, e))?;
            println!("Read {} bytes from {:?}", data.len(), path);
            Ok(data)
        }
        (None, None) => Err(CliError::NoData),
    }
}

/// Write `data` at `start`, one page-bounded piece at a time
///
/// Pieces are bounded by the store's page size so each partial page is merged
/// once. Stops at the first piece that is not fully committed.
pub fn run_write<S: FlashStore + ?Sized>(
    store: &mut S,
    start: u32,
    data: &[u8],
    verify: bool,
) -> Result<(), CliError> {
    if !store.is_valid_range(start, data.len()) {
        return Err(CliError::OutOfRange(
            start.saturating_add(data.len() as u32),
        ));
    }

    let options = store.options();
    println!("Writing {} bytes at {:#010x}", data.len(), start);
    log::debug!(
        "page size {}, restore {}, auto erase {}",
        store.page_size(),
        options.restore_data_on_unaligned_writes,
        options.auto_erase_page
    );

    let pb = create_progress_bar(data.len() as u64);
    for (address, range) in page_chunks(start, data.len(), store.page_size()) {
        let len = range.len();
        if let Err(e) = store.write_all(address, &data[range]) {
            pb.abandon_with_message("Write failed");
            return Err(e.into());
        }
        pb.inc(len as u64);
    }
    pb.finish_with_message("Write complete");

    if verify {
        if !store.verify(start, data)? {
            return Err(CliError::VerifyFailed {
                start,
                length: data.len(),
            });
        }
        println!("Verified {} bytes", data.len());
    }

    Ok(())
}
