//! TOML board file parsing
//!
//! Parses board files in TOML format. Each `[[bank]]` becomes one sector
//! table (and later one raw driver); banks are concatenated in file order.
//!
//! ```toml
//! name = "STM32F401 flash fs"
//!
//! [options]
//! restore_data_on_unaligned_writes = true
//! auto_erase_page = true
//!
//! [[bank]]
//! name = "fs16k"
//! image = "fs16k.bin"
//!
//! [[bank.sector]]
//! id = 1
//! size = "16 KiB"
//! start = 0x08004000
//!
//! [[bank.sector]]
//! id = 2
//! size = "16 KiB"
//! start = 0x08008000
//! ```

use std::fmt::Write as _;
use std::format;
use std::fs;
use std::path::{Path, PathBuf};
use std::string::{String, ToString};
use std::vec::Vec;

use super::{Sector, SectorTable};
use crate::store::StoreOptions;

/// Errors while loading a board file
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Board file could not be read
    #[error("failed to read board file {}: {source}", .path.display())]
    Io {
        /// Path of the board file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Board file is not valid TOML or misses fields
    #[error("failed to parse board file: {0}")]
    Parse(#[from] ::toml::de::Error),

    /// Board file defines no bank
    #[error("board file defines no bank")]
    NoBanks,

    /// A bank's sector table was rejected
    #[error("bank '{name}': {source}")]
    InvalidBank {
        /// Name of the bank
        name: String,
        /// Validation error
        #[source]
        source: crate::Error,
    },
}

/// One bank: a sector table handled by one raw driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankConfig {
    /// Name of the bank
    pub name: String,
    /// Image file backing this bank (used by host tools)
    pub image: Option<PathBuf>,
    /// Validated sectors
    pub sectors: SectorTable,
}

impl BankConfig {
    /// Validate `sectors` into a bank without an image
    pub fn new(name: &str, sectors: &[Sector]) -> Result<Self, BoardError> {
        let sectors = SectorTable::new(sectors).map_err(|source| BoardError::InvalidBank {
            name: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            image: None,
            sectors,
        })
    }
}

const STM32F401_SECTOR_1: u32 = 0x0800_4000;
const KIB16: u32 = 16 * 1024;

/// STM32F401 sectors 1-3
pub const STM32F401_FS16K_SECTORS: [Sector; 3] = [
    Sector::new(1, KIB16, STM32F401_SECTOR_1),
    Sector::new(2, KIB16, STM32F401_SECTOR_1 + KIB16),
    Sector::new(3, KIB16, STM32F401_SECTOR_1 + 2 * KIB16),
];

/// STM32F401 sector 4
pub const STM32F401_FS64K_SECTORS: [Sector; 1] =
    [Sector::new(4, 64 * 1024, STM32F401_SECTOR_1 + 3 * KIB16)];

/// A whole board: banks in address order plus behavior switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Optional board name
    pub name: Option<String>,
    /// Behavior switches applied to every bank
    pub options: StoreOptions,
    /// Banks in logical address order
    pub banks: Vec<BankConfig>,
}

/// TOML board file structure
#[derive(Debug, serde::Deserialize)]
struct TomlBoardFile {
    name: Option<String>,
    #[serde(default)]
    options: StoreOptions,
    #[serde(default)]
    bank: Vec<TomlBank>,
}

/// Bank definition in TOML
#[derive(Debug, serde::Deserialize)]
struct TomlBank {
    name: String,
    image: Option<PathBuf>,
    #[serde(default)]
    sector: Vec<TomlSector>,
}

/// Sector definition in TOML
#[derive(Debug, serde::Deserialize)]
struct TomlSector {
    id: u32,
    #[serde(deserialize_with = "deserialize_size")]
    size: u32,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    start: u32,
}

/// Integer or string, for fields accepting both `0x4000` and `"16 KiB"`
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Deserialize a size that can be a number or a string like "16 KiB"
fn deserialize_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// Parse a size string like "16 KiB" or "4096"
fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = parse_number(s) {
        return Ok(n);
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("k") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("b") {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

/// Format a size as human-readable string
fn format_size(size: u32) -> String {
    if size >= 1024 * 1024 && size % (1024 * 1024) == 0 {
        format!("{} MiB", size / (1024 * 1024))
    } else if size >= 1024 && size % 1024 == 0 {
        format!("{} KiB", size / 1024)
    } else {
        format!("{}", size)
    }
}

impl BoardConfig {
    /// Load a board from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, BoardError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| BoardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a board from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, BoardError> {
        let file: TomlBoardFile = ::toml::from_str(content)?;

        if file.bank.is_empty() {
            return Err(BoardError::NoBanks);
        }

        let mut banks = Vec::with_capacity(file.bank.len());
        for bank in file.bank {
            let sectors: Vec<Sector> = bank
                .sector
                .iter()
                .map(|s| Sector::new(s.id, s.size, s.start))
                .collect();
            let mut config = BankConfig::new(&bank.name, &sectors)?;
            config.image = bank.image;
            banks.push(config);
        }

        Ok(Self {
            name: file.name,
            options: file.options,
            banks,
        })
    }

    /// Flash file system area of an STM32F401
    ///
    /// Sectors 1-3 (16 KiB each) form the first bank, sector 4 (64 KiB) the
    /// second. Sector 0 holds the vector table and is left out.
    pub fn stm32f401_flash_fs() -> Result<Self, BoardError> {
        let banks = [
            ("fs16k", &STM32F401_FS16K_SECTORS[..]),
            ("fs64k", &STM32F401_FS64K_SECTORS[..]),
        ]
        .into_iter()
        .map(|(name, sectors)| BankConfig::new(name, sectors))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: Some("STM32F401 flash fs".to_string()),
            options: StoreOptions::default(),
            banks,
        })
    }

    /// Sum of all bank sizes
    pub fn total_size(&self) -> u64 {
        self.banks
            .iter()
            .map(|bank| bank.sectors.total_size() as u64)
            .sum()
    }

    /// Convert the board to a TOML string
    pub fn to_toml_string(&self) -> String {
        let mut output = String::new();

        if let Some(name) = &self.name {
            let _ = writeln!(output, "name = \"{}\"\n", name);
        }

        output.push_str("[options]\n");
        let _ = writeln!(
            output,
            "restore_data_on_unaligned_writes = {}",
            self.options.restore_data_on_unaligned_writes
        );
        let _ = writeln!(output, "auto_erase_page = {}\n", self.options.auto_erase_page);

        for bank in &self.banks {
            output.push_str("[[bank]]\n");
            let _ = writeln!(output, "name = \"{}\"", bank.name);
            if let Some(image) = &bank.image {
                let _ = writeln!(output, "image = \"{}\"", image.display());
            }
            output.push('\n');
            for sector in bank.sectors.iter() {
                output.push_str("[[bank.sector]]\n");
                let _ = writeln!(output, "id = {}", sector.id);
                let _ = writeln!(output, "size = \"{}\"", format_size(sector.size));
                let _ = writeln!(output, "start = 0x{:08X}\n", sector.start);
            }
        }

        output
    }
}
