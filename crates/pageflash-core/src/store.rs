//! Byte-addressable store trait
//!
//! [`FlashStore`] is the interface shared by [`GenericFlashDriver`] and
//! [`JbodFlashDriver`]. A JBOD consumes the same trait it implements, so
//! stores can be freely stacked.
//!
//! [`GenericFlashDriver`]: crate::GenericFlashDriver
//! [`JbodFlashDriver`]: crate::JbodFlashDriver

use crate::error::{Error, Result};

/// Behavior switches of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct StoreOptions {
    /// Keep the untouched part of a page on partial-page writes
    ///
    /// Needs one page of RAM. When disabled, the untouched part of the page
    /// is left at the erase value.
    pub restore_data_on_unaligned_writes: bool,
    /// Erase pages before programming them
    ///
    /// When disabled the caller must erase pages beforehand. Programming a
    /// page that was not erased is not detected.
    pub auto_erase_page: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            restore_data_on_unaligned_writes: true,
            auto_erase_page: true,
        }
    }
}

/// Byte-addressable flash store
///
/// # Short results
///
/// `read` and `write` return `Err` only for requests that are rejected
/// before the medium is touched (out of bounds). Once the medium is touched,
/// a failure stops the operation and the number of bytes already committed
/// is returned as `Ok(n)`. Any `n` smaller than the request is a failure;
/// the cause is available from [`last_error`](FlashStore::last_error) until
/// [`clear_error`](FlashStore::clear_error) is called.
///
/// There is no rollback: after a failed partial-page write the page may be
/// left erased.
pub trait FlashStore {
    /// Total size in bytes
    fn size(&self) -> u32;

    /// Erase/program granularity in bytes
    fn page_size(&self) -> u32;

    /// Read into `buf` starting at `address`
    ///
    /// Reads are not page constrained. A read running past the end of the
    /// store is clipped and returns the number of bytes copied.
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If `address` is beyond the store and `buf` is not empty
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<usize>;

    /// Write `data` at `address`, any alignment, any length
    ///
    /// Returns the number of bytes committed.
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If the write extends beyond the store
    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize>;

    /// Erase `size` bytes at `address`
    ///
    /// Both must be multiples of [`page_size`](FlashStore::page_size).
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If the erase extends beyond the store
    /// * `InvalidAlignment` - If address or size is not page aligned
    /// * `Medium` - If the medium failed (also recorded in `last_error`)
    fn erase(&mut self, address: u32, size: u32) -> Result<()>;

    /// Current behavior switches
    fn options(&self) -> StoreOptions;

    /// Replace the behavior switches
    fn set_options(&mut self, options: StoreOptions);

    /// Whether this store is able to restore data on unaligned writes at all
    fn can_restore_data_on_unaligned_writes(&self) -> bool {
        false
    }

    /// Error recorded by the last failing operation
    fn last_error(&self) -> Option<Error>;

    /// Forget the recorded error
    fn clear_error(&mut self);

    /// Check if a range is valid for this store
    fn is_valid_range(&self, address: u32, len: usize) -> bool {
        // u64 so that address + len cannot wrap
        address as u64 + len as u64 <= self.size() as u64
    }

    /// Toggle restoring of untouched page content on partial-page writes
    fn set_restore_data_on_unaligned_writes(&mut self, enabled: bool) {
        let mut options = self.options();
        options.restore_data_on_unaligned_writes = enabled;
        self.set_options(options);
    }

    /// Toggle the implicit erase before programming
    fn set_auto_erase_page(&mut self, enabled: bool) {
        let mut options = self.options();
        options.auto_erase_page = enabled;
        self.set_options(options);
    }
}

impl<T: FlashStore + ?Sized> FlashStore for &mut T {
    fn size(&self) -> u32 {
        (**self).size()
    }

    fn page_size(&self) -> u32 {
        (**self).page_size()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<usize> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        (**self).write(address, data)
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        (**self).erase(address, size)
    }

    fn options(&self) -> StoreOptions {
        (**self).options()
    }

    fn set_options(&mut self, options: StoreOptions) {
        (**self).set_options(options)
    }

    fn can_restore_data_on_unaligned_writes(&self) -> bool {
        (**self).can_restore_data_on_unaligned_writes()
    }

    fn last_error(&self) -> Option<Error> {
        (**self).last_error()
    }

    fn clear_error(&mut self) {
        (**self).clear_error()
    }
}

#[cfg(feature = "alloc")]
impl<T: FlashStore + ?Sized> FlashStore for alloc::boxed::Box<T> {
    fn size(&self) -> u32 {
        (**self).size()
    }

    fn page_size(&self) -> u32 {
        (**self).page_size()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<usize> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        (**self).write(address, data)
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        (**self).erase(address, size)
    }

    fn options(&self) -> StoreOptions {
        (**self).options()
    }

    fn set_options(&mut self, options: StoreOptions) {
        (**self).set_options(options)
    }

    fn can_restore_data_on_unaligned_writes(&self) -> bool {
        (**self).can_restore_data_on_unaligned_writes()
    }

    fn last_error(&self) -> Option<Error> {
        (**self).last_error()
    }

    fn clear_error(&mut self) {
        (**self).clear_error()
    }
}

/// Extension trait turning short results into errors
///
/// Kept separate from [`FlashStore`] so that implementors only deal with the
/// partial-count protocol.
pub trait FlashStoreExt: FlashStore {
    /// Write all of `data` or fail
    ///
    /// On a short write the recorded error is returned, or
    /// `ShortTransfer` if none was recorded.
    fn write_all(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let done = self.write(address, data)?;
        if done < data.len() {
            return Err(self.last_error().unwrap_or(Error::ShortTransfer {
                done,
                requested: data.len(),
            }));
        }
        Ok(())
    }

    /// Fill all of `buf` or fail
    fn read_exact(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        let done = self.read(address, buf)?;
        if done < buf.len() {
            return Err(self.last_error().unwrap_or(Error::ShortTransfer {
                done,
                requested: buf.len(),
            }));
        }
        Ok(())
    }

    /// Erase the whole store
    fn erase_all(&mut self) -> Result<()> {
        let size = self.size();
        self.erase(0, size)
    }

    /// Compare the store content at `address` with `expected`
    ///
    /// Reads back in small chunks, so no buffer of `expected.len()` is needed.
    fn verify(&mut self, address: u32, expected: &[u8]) -> Result<bool> {
        let mut chunk = [0u8; 256];
        let mut offset = 0usize;
        while offset < expected.len() {
            let len = chunk.len().min(expected.len() - offset);
            self.read_exact(address + offset as u32, &mut chunk[..len])?;
            if chunk[..len] != expected[offset..offset + len] {
                return Ok(false);
            }
            offset += len;
        }
        Ok(true)
    }

    /// Read the entire store
    #[cfg(feature = "alloc")]
    fn read_all(&mut self) -> Result<alloc::vec::Vec<u8>> {
        let mut buf = alloc::vec![0u8; self.size() as usize];
        self.read_exact(0, &mut buf)?;
        Ok(buf)
    }
}

impl<S: FlashStore + ?Sized> FlashStoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store that accepts at most `limit` bytes per call
    struct Stingy {
        data: [u8; 64],
        limit: usize,
        options: StoreOptions,
    }

    impl Stingy {
        fn new(limit: usize) -> Self {
            Self {
                data: [0xFF; 64],
                limit,
                options: StoreOptions::default(),
            }
        }
    }

    impl FlashStore for Stingy {
        fn size(&self) -> u32 {
            self.data.len() as u32
        }

        fn page_size(&self) -> u32 {
            16
        }

        fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<usize> {
            let start = address as usize;
            let len = buf.len().min(self.limit).min(self.data.len() - start);
            buf[..len].copy_from_slice(&self.data[start..start + len]);
            Ok(len)
        }

        fn write(&mut self, address: u32, data: &[u8]) -> Result<usize> {
            if !self.is_valid_range(address, data.len()) {
                return Err(Error::AddressOutOfBounds);
            }
            let start = address as usize;
            let len = data.len().min(self.limit);
            self.data[start..start + len].copy_from_slice(&data[..len]);
            Ok(len)
        }

        fn erase(&mut self, _address: u32, _size: u32) -> Result<()> {
            self.data.fill(0xFF);
            Ok(())
        }

        fn options(&self) -> StoreOptions {
            self.options
        }

        fn set_options(&mut self, options: StoreOptions) {
            self.options = options;
        }

        fn last_error(&self) -> Option<Error> {
            None
        }

        fn clear_error(&mut self) {}
    }

    #[test]
    fn test_default_options() {
        let options = StoreOptions::default();
        assert!(options.restore_data_on_unaligned_writes);
        assert!(options.auto_erase_page);
    }

    #[test]
    fn test_write_all_short() {
        let mut store = Stingy::new(8);
        assert_eq!(
            store.write_all(0, &[0u8; 12]),
            Err(Error::ShortTransfer {
                done: 8,
                requested: 12
            })
        );
        assert_eq!(store.write_all(60, &[0u8; 8]), Err(Error::AddressOutOfBounds));
        assert!(store.write_all(0, &[1u8; 8]).is_ok());
    }

    #[test]
    fn test_verify_in_chunks() {
        let mut store = Stingy::new(usize::MAX);
        store.write_all(4, b"hello").unwrap();
        assert!(store.verify(4, b"hello").unwrap());
        assert!(!store.verify(4, b"help!").unwrap());
    }

    #[test]
    fn test_option_setters() {
        let mut store = Stingy::new(usize::MAX);
        store.set_auto_erase_page(false);
        store.set_restore_data_on_unaligned_writes(false);
        assert_eq!(
            store.options(),
            StoreOptions {
                restore_data_on_unaligned_writes: false,
                auto_erase_page: false,
            }
        );
    }
}
