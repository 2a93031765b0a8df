//! Sector tables and board configuration
//!
//! A [`SectorTable`] describes the physical sectors handled by one raw
//! driver. All sectors of a table share one size; boards with mixed sector
//! sizes use one table per size and combine the resulting stores with a
//! [`JbodFlashDriver`](crate::JbodFlashDriver).
//!
//! With the `std` feature, whole boards (several tables plus
//! [`StoreOptions`](crate::StoreOptions)) can be loaded from TOML:
//!
//! ```ignore
//! let board = BoardConfig::from_toml_file("board.toml")?;
//! for bank in &board.banks {
//!     println!("{}: {} bytes", bank.name, bank.sectors.total_size());
//! }
//! ```

mod types;

#[cfg(feature = "std")]
mod toml;

pub use types::*;

#[cfg(feature = "std")]
pub use self::toml::{
    BankConfig, BoardConfig, BoardError, STM32F401_FS16K_SECTORS, STM32F401_FS64K_SECTORS,
};
