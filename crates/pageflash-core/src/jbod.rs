//! JBOD composition driver
//!
//! [`JbodFlashDriver`] concatenates several [`FlashStore`]s into one logical
//! address space. Backend `k` covers `[offset_k, offset_k + size_k)` where
//! `offset_k` is the sum of the sizes of all backends before it. Offsets are
//! derived from the backend sizes on every lookup and never stored.
//!
//! Requests crossing a backend boundary are split: the starting backend gets
//! as much of the request as it can hold, the following backends continue at
//! their local address 0. A short result from any backend ends the request.

use core::ops::Range;

use crate::error::{ConfigError, Error, Result};
use crate::store::{FlashStore, StoreOptions};

/// Where a logical address lands in a JBOD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendLocation {
    /// Position of the backend in the table
    pub index: usize,
    /// Address relative to the backend start
    pub local_address: u32,
    /// Logical address of the backend start
    pub offset: u32,
}

/// Several stores presented as one
///
/// The page size reported to callers is the largest backend page size.
/// A request aligned to it may still be unaligned for a backend with smaller
/// pages; that backend's own driver handles the merge.
///
/// Backends are borrowed for the lifetime of the JBOD. Any [`FlashStore`]
/// works, including `&mut dyn FlashStore`, boxed stores and other JBODs.
pub struct JbodFlashDriver<'a, B> {
    backends: &'a mut [B],
    last_error: Option<Error>,
}

impl<'a, B: FlashStore> JbodFlashDriver<'a, B> {
    /// Create a JBOD over `backends`, in address order
    ///
    /// # Errors
    /// * `NoBackends` - If `backends` is empty
    /// * `AddressSpaceOverflow` - If the backends add up to more than 4 GiB
    pub fn new(backends: &'a mut [B]) -> Result<Self> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends.into());
        }

        let total: u64 = backends.iter().map(|b| b.size() as u64).sum();
        if total > u32::MAX as u64 {
            return Err(ConfigError::AddressSpaceOverflow.into());
        }

        log::debug!(
            "JBOD over {} backends, {} bytes total",
            backends.len(),
            total
        );

        Ok(Self {
            backends,
            last_error: None,
        })
    }

    /// Number of backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Always false; a JBOD cannot be built without backends
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// The backends in address order
    pub fn backends(&self) -> &[B] {
        self.backends
    }

    /// Get mutable access to one backend
    pub fn backend_mut(&mut self, index: usize) -> Option<&mut B> {
        self.backends.get_mut(index)
    }

    /// Release the backends
    pub fn into_backends(self) -> &'a mut [B] {
        self.backends
    }

    /// Map a logical address to a backend
    ///
    /// Returns `None` if `address` is at or beyond the end of the last
    /// backend.
    pub fn locate(&self, address: u32) -> Option<BackendLocation> {
        let mut offset = 0u32;
        for (index, backend) in self.backends.iter().enumerate() {
            let size = backend.size();
            if address - offset < size {
                return Some(BackendLocation {
                    index,
                    local_address: address - offset,
                    offset,
                });
            }
            offset += size;
        }
        None
    }

    /// Check that every backend slice of an erase is made of whole pages
    ///
    /// Runs before any backend is erased so that a misaligned request leaves
    /// all backends untouched.
    fn check_erase_alignment(&self, address: u32, size: u32) -> Result<()> {
        let start = self.locate(address).ok_or(Error::AddressOutOfBounds)?;

        let mut local = start.local_address;
        let mut remaining = size;
        for (index, backend) in self.backends.iter().enumerate().skip(start.index) {
            if remaining == 0 {
                break;
            }
            let step = (backend.size() - local).min(remaining);
            if step > 0 {
                let page = backend.page_size().max(1);
                if local % page != 0 || step % page != 0 {
                    log::warn!(
                        "JBOD: erase of {} bytes at 0x{:08X} is not page-aligned on backend {} (page size {})",
                        step,
                        local,
                        index,
                        page
                    );
                    return Err(Error::InvalidAlignment);
                }
            }
            remaining -= step;
            local = 0;
        }
        Ok(())
    }

    /// Run `op` over every backend slice of `len` bytes at `address`
    ///
    /// `op` receives the backend, the local address and the range of the
    /// request handled by that backend, and returns the bytes it handled.
    /// Stops at the first short or failed slice and returns the bytes handled
    /// so far.
    fn for_each_span<F>(&mut self, address: u32, len: usize, mut op: F) -> Result<usize>
    where
        F: FnMut(&mut B, u32, Range<usize>) -> Result<usize>,
    {
        let start = self.locate(address).ok_or(Error::AddressOutOfBounds)?;

        let mut index = start.index;
        let mut local = start.local_address;
        let mut done = 0usize;

        while done < len {
            let Some(backend) = self.backends.get_mut(index) else {
                break;
            };

            let room = (backend.size() - local) as usize;
            let step = room.min(len - done);
            if step > 0 {
                log::trace!(
                    "JBOD: {} bytes on backend {} at 0x{:08X}",
                    step,
                    index,
                    local
                );

                match op(backend, local, done..done + step) {
                    Ok(n) if n >= step => done += step,
                    Ok(n) => {
                        done += n;
                        let err = backend.last_error().unwrap_or(Error::ShortTransfer {
                            done: n,
                            requested: step,
                        });
                        log::warn!("JBOD: backend {} stopped after {} bytes: {}", index, n, err);
                        self.last_error = Some(err);
                        break;
                    }
                    Err(err) => {
                        log::warn!("JBOD: backend {} failed: {}", index, err);
                        self.last_error = Some(err);
                        break;
                    }
                }
            }

            index += 1;
            local = 0;
        }

        Ok(done)
    }
}

impl<B: FlashStore> FlashStore for JbodFlashDriver<'_, B> {
    fn size(&self) -> u32 {
        self.backends
            .iter()
            .fold(0u32, |total, b| total.saturating_add(b.size()))
    }

    fn page_size(&self) -> u32 {
        self.backends
            .iter()
            .map(|b| b.page_size())
            .max()
            .unwrap_or(0)
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let size = self.size();
        if address >= size {
            return Err(Error::AddressOutOfBounds);
        }

        let len = buf.len().min((size - address) as usize);
        self.for_each_span(address, len, |backend, local, range| {
            backend.read(local, &mut buf[range])
        })
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        if !self.is_valid_range(address, data.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        if data.is_empty() {
            return Ok(0);
        }

        self.for_each_span(address, data.len(), |backend, local, range| {
            backend.write(local, &data[range])
        })
    }

    /// Erase across backends
    ///
    /// Alignment is checked against the page size of each touched backend,
    /// so any range made of whole backend pages is accepted even when it is
    /// not aligned to [`page_size`](FlashStore::page_size). All slices are
    /// checked before the first backend is erased.
    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        if !self.is_valid_range(address, size as usize) {
            return Err(Error::AddressOutOfBounds);
        }
        if size == 0 {
            return Ok(());
        }
        self.check_erase_alignment(address, size)?;

        let done = self.for_each_span(address, size as usize, |backend, local, range| {
            backend.erase(local, range.len() as u32)?;
            Ok(range.len())
        })?;

        if done < size as usize {
            return Err(self.last_error.unwrap_or(Error::ShortTransfer {
                done,
                requested: size as usize,
            }));
        }
        Ok(())
    }

    /// Options in effect on every backend
    ///
    /// A flag reads as set only if it is set on all backends.
    fn options(&self) -> StoreOptions {
        self.backends.iter().fold(StoreOptions::default(), |acc, b| {
            let options = b.options();
            StoreOptions {
                restore_data_on_unaligned_writes: acc.restore_data_on_unaligned_writes
                    && options.restore_data_on_unaligned_writes,
                auto_erase_page: acc.auto_erase_page && options.auto_erase_page,
            }
        })
    }

    fn set_options(&mut self, options: StoreOptions) {
        for backend in self.backends.iter_mut() {
            backend.set_options(options);
        }
    }

    fn can_restore_data_on_unaligned_writes(&self) -> bool {
        self.backends
            .iter()
            .all(|b| b.can_restore_data_on_unaligned_writes())
    }

    fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    fn clear_error(&mut self) {
        self.last_error = None;
        for backend in self.backends.iter_mut() {
            backend.clear_error();
        }
    }
}
