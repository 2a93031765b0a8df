//! CLI command implementations
//!
//! Read, write and erase work on any `FlashStore`; `main` hands them the
//! JBOD spanning all banks of the board. Info and locate need the board
//! itself to name banks and sectors.

mod erase;
mod info;
mod read;
mod write;

pub use erase::run_erase;
pub use info::{run_info, run_locate};
pub use read::run_read;
pub use write::{load_data, run_write};

use indicatif::{ProgressBar, ProgressStyle};
use std::ops::Range;

/// Create a byte progress bar
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Format a size as KiB/MiB when it divides evenly
fn format_size(size: u64) -> String {
    if size >= 1024 * 1024 && size % (1024 * 1024) == 0 {
        format!("{} MiB", size / (1024 * 1024))
    } else if size >= 1024 && size % 1024 == 0 {
        format!("{} KiB", size / 1024)
    } else {
        format!("{} bytes", size)
    }
}

/// Split `len` bytes at `start` into pieces that never cross a multiple of
/// `page_size`
///
/// Yields the address of each piece and its range within the request.
fn page_chunks(start: u32, len: usize, page_size: u32) -> impl Iterator<Item = (u32, Range<usize>)> {
    let page_size = page_size.max(1) as usize;
    let mut done = 0usize;
    std::iter::from_fn(move || {
        if done >= len {
            return None;
        }
        let address = start as usize + done;
        let room = page_size - address % page_size;
        let step = room.min(len - done);
        let range = done..done + step;
        done += step;
        Some((address as u32, range))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_chunks() {
        let chunks: Vec<_> = page_chunks(10, 50, 16).collect();
        assert_eq!(
            chunks,
            vec![(10, 0..6), (16, 6..22), (32, 22..38), (48, 38..50)]
        );

        let aligned: Vec<_> = page_chunks(32, 32, 16).collect();
        assert_eq!(aligned, vec![(32, 0..16), (48, 16..32)]);

        assert_eq!(page_chunks(5, 0, 16).count(), 0);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(64 * 1024), "64 KiB");
        assert_eq!(format_size(2 * 1024 * 1024), "2 MiB");
        assert_eq!(format_size(1000), "1000 bytes");
    }
}
