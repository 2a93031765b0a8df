//! Read command

use super::create_progress_bar;
use crate::error::CliError;
use pageflash_core::{FlashStore, FlashStoreExt};
use std::fs;
use std::path::Path;

const READ_CHUNK_SIZE: usize = 4096;
const DUMP_WIDTH: usize = 16;

/// Read `length` bytes at `start` into a file, or dump them as hex
pub fn run_read<S: FlashStore + ?Sized>(
    store: &mut S,
    start: u32,
    length: Option<u32>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let size = store.size();
    if start >= size {
        return Err(CliError::OutOfRange(start));
    }

    let available = size - start;
    let length = match length {
        Some(length) if length > available => {
            log::warn!(
                "Read clipped to {} bytes, the board ends at {:#010x}",
                available,
                size
            );
            available
        }
        Some(length) => length,
        None => available,
    } as usize;

    let mut data = vec![0u8; length];

    match output {
        Some(path) => {
            let pb = create_progress_bar(length as u64);
            let mut offset = 0usize;
            while offset < length {
                let chunk_size = READ_CHUNK_SIZE.min(length - offset);
                store.read_exact(start + offset as u32, &mut data[offset..offset + chunk_size])?;
                offset += chunk_size;
                pb.set_position(offset as u64);
            }
            pb.finish_with_message("Read complete");

            fs::write(path, &data).map_err(|e| CliError::io(path, e))?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => {
            store.read_exact(start, &mut data)?;
            for line in hex_dump(start, &data) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Format `data` as hex dump lines labeled with their address
fn hex_dump(start: u32, data: &[u8]) -> Vec<String> {
    data.chunks(DUMP_WIDTH)
        .enumerate()
        .map(|(n, chunk)| {
            let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!(
                "{:08x}  {:<width$}  |{}|",
                start as usize + n * DUMP_WIDTH,
                bytes.join(" "),
                ascii,
                width = DUMP_WIDTH * 3 - 1
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        let lines = hex_dump(0xBFF6, b"pageflash\xff");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("0000bff6  70 61 67 65"));
        assert!(lines[0].ends_with("|pageflash.|"));

        assert_eq!(hex_dump(0, &[0u8; 33]).len(), 3);
    }
}
