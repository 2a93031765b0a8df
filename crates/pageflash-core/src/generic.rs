//! Generic flash driver
//!
//! [`GenericFlashDriver`] turns arbitrary reads and writes into the
//! page-aligned operations a [`RawPageDriver`] supports.
//!
//! # Write decomposition
//!
//! A write is split into at most three steps:
//!
//! 1. a leading partial page, if `address` is not page aligned
//! 2. a run of full pages, erased and programmed straight from the caller's
//!    buffer
//! 3. a trailing partial page, if less than a page remains
//!
//! Partial pages are merged: the old page content is read into a page
//! buffer, the new bytes are copied over it, the page is erased and the whole
//! buffer is programmed back. When restoring is disabled the page is erased
//! and only the new bytes are programmed, leaving the rest of the page at the
//! erase value.

use crate::error::{ConfigError, Error, MediumFailure, Result};
use crate::raw::RawPageDriver;
use crate::store::{FlashStore, StoreOptions};

/// Byte-addressable store on top of one raw page driver
///
/// The page buffer used for partial-page merges is either supplied by the
/// caller ([`with_page_buffer`](Self::with_page_buffer)) or, with the
/// `alloc` feature, allocated for the duration of a single write. Without
/// either, the driver cannot restore data on unaligned writes.
///
/// # Example
///
/// ```ignore
/// use pageflash_core::{FlashStore, GenericFlashDriver};
///
/// static mut PAGE: [u8; 16 * 1024] = [0; 16 * 1024];
///
/// let mut driver = GenericFlashDriver::with_page_buffer(raw, unsafe { &mut PAGE })?;
/// driver.write(16 * 1024 - 10, b"crosses a page boundary")?;
/// ```
pub struct GenericFlashDriver<'buf, R> {
    raw: R,
    page_buffer: Option<&'buf mut [u8]>,
    options: StoreOptions,
    last_error: Option<Error>,
}

impl<R: RawPageDriver> GenericFlashDriver<'static, R> {
    /// Create a driver without a caller page buffer
    ///
    /// Restoring on unaligned writes is enabled when the `alloc` feature is,
    /// and disabled otherwise.
    pub fn new(raw: R) -> Self {
        let mut driver = Self {
            raw,
            page_buffer: None,
            options: StoreOptions::default(),
            last_error: None,
        };
        driver.options.restore_data_on_unaligned_writes = driver.can_restore();
        driver
    }
}

impl<'buf, R: RawPageDriver> GenericFlashDriver<'buf, R> {
    /// Create a driver merging partial pages in `page_buffer`
    ///
    /// The buffer is used exclusively by this driver for as long as it lives.
    ///
    /// # Errors
    /// * `PageBufferTooSmall` - If `page_buffer` is shorter than one page
    pub fn with_page_buffer(raw: R, page_buffer: &'buf mut [u8]) -> Result<Self> {
        let required = raw.page_size() as usize;
        if page_buffer.len() < required {
            return Err(ConfigError::PageBufferTooSmall {
                required,
                actual: page_buffer.len(),
            }
            .into());
        }

        Ok(Self {
            raw,
            page_buffer: Some(page_buffer),
            options: StoreOptions::default(),
            last_error: None,
        })
    }

    /// Get a reference to the raw driver
    pub fn raw(&self) -> &R {
        &self.raw
    }

    /// Get a mutable reference to the raw driver
    pub fn raw_mut(&mut self) -> &mut R {
        &mut self.raw
    }

    /// Give back the raw driver
    pub fn into_raw(self) -> R {
        self.raw
    }

    fn can_restore(&self) -> bool {
        self.page_buffer.is_some() || cfg!(feature = "alloc")
    }

    fn record(&mut self, address: u32, err: Error) {
        log::warn!("flash operation at 0x{:08X} failed: {}", address, err);
        self.last_error = Some(err);
    }

    /// Write `chunk` into the page containing `address`
    ///
    /// `chunk` must not cross the end of that page. Returns the number of
    /// bytes of `chunk` committed.
    fn write_within_page(&mut self, address: u32, chunk: &[u8]) -> Result<usize> {
        let page_size = self.raw.page_size();
        let offset = (address % page_size) as usize;
        let page_start = address - offset as u32;
        debug_assert!(offset + chunk.len() <= page_size as usize);

        if !self.options.restore_data_on_unaligned_writes {
            if self.options.auto_erase_page {
                self.raw.erase_page(page_start, page_size)?;
            }
            return self.raw.write_page(address, chunk);
        }

        let erase = self.options.auto_erase_page;
        match self.page_buffer.as_deref_mut() {
            Some(buf) => merge_page(
                &mut self.raw,
                &mut buf[..page_size as usize],
                page_start,
                offset,
                chunk,
                erase,
            ),
            #[cfg(feature = "alloc")]
            None => {
                let mut buf = alloc::vec![0u8; page_size as usize];
                merge_page(&mut self.raw, &mut buf, page_start, offset, chunk, erase)
            }
            #[cfg(not(feature = "alloc"))]
            None => Err(Error::RestoreUnsupported),
        }
    }

    /// Write whole pages at a page-aligned `address`, no merge needed
    fn write_full_pages(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        if self.options.auto_erase_page {
            self.raw.erase_page(address, data.len() as u32)?;
        }
        self.raw.write_page(address, data)
    }
}

/// Read-modify-write of one page
///
/// After the call, `page[offset..offset + chunk.len()]` holds `chunk` and the
/// rest of `page` holds the content the page had before.
fn merge_page<R: RawPageDriver + ?Sized>(
    raw: &mut R,
    page: &mut [u8],
    page_start: u32,
    offset: usize,
    chunk: &[u8],
    erase: bool,
) -> Result<usize> {
    let read = raw.read_page(page_start, page);
    if read < page.len() {
        return Err(MediumFailure::ReadFailed {
            address: page_start + read as u32,
        }
        .into());
    }

    page[offset..offset + chunk.len()].copy_from_slice(chunk);

    if erase {
        raw.erase_page(page_start, page.len() as u32)?;
    }

    let programmed = raw.write_page(page_start, page)?;
    if programmed < page.len() {
        // The new bytes only count once the whole page is back
        return Err(raw.last_error().unwrap_or(Error::Medium(
            MediumFailure::ProgramFailed {
                address: page_start + programmed as u32,
                code: 0,
            },
        )));
    }

    Ok(chunk.len())
}

impl<R: RawPageDriver> FlashStore for GenericFlashDriver<'_, R> {
    fn size(&self) -> u32 {
        self.raw.size()
    }

    fn page_size(&self) -> u32 {
        self.raw.page_size()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let size = self.raw.size();
        if address >= size {
            return Err(Error::AddressOutOfBounds);
        }

        let len = buf.len().min((size - address) as usize);
        let read = self.raw.read_page(address, &mut buf[..len]);
        if read < len {
            self.record(
                address,
                Error::Medium(MediumFailure::ReadFailed {
                    address: address + read as u32,
                }),
            );
        }
        Ok(read)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        if !self.is_valid_range(address, data.len()) {
            log::debug!(
                "rejecting write of {} bytes at 0x{:08X}, store has {} bytes",
                data.len(),
                address,
                self.size()
            );
            return Err(Error::AddressOutOfBounds);
        }

        let page_size = self.raw.page_size();
        let mut written = 0usize;

        while written < data.len() {
            let addr = address + written as u32;
            let remaining = &data[written..];
            let offset_in_page = addr % page_size;

            let (step, result) = if offset_in_page != 0 || remaining.len() < page_size as usize {
                let room = (page_size - offset_in_page) as usize;
                let chunk = &remaining[..room.min(remaining.len())];
                log::trace!(
                    "partial page write: {} bytes at 0x{:08X} (offset {} in page)",
                    chunk.len(),
                    addr,
                    offset_in_page
                );
                (chunk.len(), self.write_within_page(addr, chunk))
            } else {
                let run = remaining.len() - remaining.len() % page_size as usize;
                log::trace!(
                    "full page write: {} pages at 0x{:08X}",
                    run / page_size as usize,
                    addr
                );
                (run, self.write_full_pages(addr, &remaining[..run]))
            };

            match result {
                Ok(done) if done >= step => written += step,
                Ok(done) => {
                    written += done;
                    let err = self.raw.last_error().unwrap_or(Error::Medium(
                        MediumFailure::ProgramFailed {
                            address: addr + done as u32,
                            code: 0,
                        },
                    ));
                    self.record(addr, err);
                    break;
                }
                Err(err) => {
                    self.record(addr, err);
                    break;
                }
            }
        }

        log::debug!(
            "wrote {} of {} bytes at 0x{:08X}",
            written,
            data.len(),
            address
        );
        Ok(written)
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        if !self.is_valid_range(address, size as usize) {
            return Err(Error::AddressOutOfBounds);
        }

        let page_size = self.raw.page_size();
        if address % page_size != 0 || size % page_size != 0 {
            return Err(Error::InvalidAlignment);
        }

        if size == 0 {
            return Ok(());
        }

        log::debug!("erasing {} bytes at 0x{:08X}", size, address);
        if let Err(err) = self.raw.erase_page(address, size) {
            self.record(address, err);
            return Err(err);
        }
        Ok(())
    }

    fn options(&self) -> StoreOptions {
        self.options
    }

    fn set_options(&mut self, mut options: StoreOptions) {
        if options.restore_data_on_unaligned_writes && !self.can_restore() {
            log::warn!("no page buffer available, not restoring data on unaligned writes");
            options.restore_data_on_unaligned_writes = false;
        }
        self.options = options;
    }

    fn can_restore_data_on_unaligned_writes(&self) -> bool {
        self.can_restore()
    }

    fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    fn clear_error(&mut self) {
        self.last_error = None;
        self.raw.clear_error();
    }
}
