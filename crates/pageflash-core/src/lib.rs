//! pageflash-core - Byte-addressable storage over page-erasable flash
//!
//! Flash that can only be erased in whole pages and programmed page by page
//! is awkward to use directly. This crate layers a byte-addressable,
//! arbitrarily aligned read/write/erase interface on top of it.
//!
//! # Layers
//!
//! - [`raw::RawPageDriver`] - page-aligned erase/program/read over one
//!   physically contiguous region. Implemented by hardware or simulation
//!   crates, not by this crate.
//! - [`GenericFlashDriver`] - wraps one raw driver and splits any request
//!   into a leading partial page, a run of full pages and a trailing partial
//!   page, merging partial pages with their old content.
//! - [`JbodFlashDriver`] - concatenates several [`FlashStore`]s, possibly
//!   with different page sizes, into one address space.
//!
//! # Features
//!
//! - `alloc` - Partial-page merges may allocate a page-sized buffer when no
//!   caller buffer was supplied
//! - `std` - Board configuration files (TOML) and `std::error::Error` impls
//!
//! # Example
//!
//! ```ignore
//! use pageflash_core::{FlashStore, GenericFlashDriver, JbodFlashDriver};
//!
//! let mut small = GenericFlashDriver::new(raw_16k);
//! let mut large = GenericFlashDriver::new(raw_64k);
//! let mut backends: [&mut dyn FlashStore; 2] = [&mut small, &mut large];
//! let mut jbod = JbodFlashDriver::new(&mut backends)?;
//!
//! // Straddles the boundary between both banks
//! let written = jbod.write(3 * 16 * 1024 - 10, b"hello across banks")?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod generic;
pub mod jbod;
pub mod raw;
pub mod sector;
pub mod store;

pub use error::{ConfigError, Error, MediumFailure, Result};
pub use generic::GenericFlashDriver;
pub use jbod::{BackendLocation, JbodFlashDriver};
pub use raw::RawPageDriver;
pub use sector::{Sector, SectorTable};
#[cfg(feature = "std")]
pub use sector::{BankConfig, BoardConfig, BoardError};
pub use store::{FlashStore, FlashStoreExt, StoreOptions};
