//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "pageflash")]
#[command(author, version, about = "Byte-addressable access to page-erasable flash images", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Board description (TOML format)
    /// Defaults to the built-in STM32F401 file system layout
    #[arg(short, long, global = true)]
    pub board: Option<PathBuf>,

    /// Directory for bank images that have no explicit path in the board file
    #[arg(long, global = true, default_value = ".")]
    pub image_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Store behavior overrides shared by mutating commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Leave the untouched part of partially written pages erased
    #[arg(long)]
    pub no_restore: bool,

    /// Don't erase pages before programming them
    #[arg(long)]
    pub no_auto_erase: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the board layout
    Info {
        /// Print the board as TOML instead of a table
        #[arg(long)]
        toml: bool,
    },

    /// Read from the logical address space
    Read {
        /// Start address (hex, e.g., 0xBFF6)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (defaults to the rest of the board)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        /// Output file path (prints a hex dump if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write bytes at any address
    Write {
        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        start: u32,

        /// Data as hex string (e.g., "deadbeef")
        #[arg(long, conflicts_with = "input")]
        data: Option<String>,

        /// Input file path
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Verify after writing
        #[arg(long)]
        verify: bool,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Erase whole pages
    Erase {
        /// Start address for partial erase (hex, e.g., 0x8000)
        #[arg(long, value_parser = parse_hex_u32, requires = "length")]
        start: Option<u32>,

        /// Length of region to erase (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, requires = "start")]
        length: Option<u32>,
    },

    /// Show which bank a logical address belongs to
    Locate {
        /// Logical address (hex or decimal)
        #[arg(value_parser = parse_hex_u32)]
        address: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x8000"), Ok(0x8000));
        assert_eq!(parse_hex_u32("0XBFF6"), Ok(0xBFF6));
        assert_eq!(parse_hex_u32("49142"), Ok(49142));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("-1").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_write() {
        let cli = Cli::try_parse_from([
            "pageflash",
            "write",
            "--start",
            "0xBFF6",
            "--data",
            "cafe",
            "--no-restore",
        ])
        .unwrap();

        match cli.command {
            Commands::Write {
                start, data, store, ..
            } => {
                assert_eq!(start, 0xBFF6);
                assert_eq!(data.as_deref(), Some("cafe"));
                assert!(store.no_restore);
                assert!(!store.no_auto_erase);
            }
            _ => panic!("expected write command"),
        }
    }

    #[test]
    fn test_erase_needs_both_bounds() {
        assert!(Cli::try_parse_from(["pageflash", "erase", "--start", "0x4000"]).is_err());
        assert!(Cli::try_parse_from(["pageflash", "erase"]).is_ok());
    }
}
