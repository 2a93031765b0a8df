//! pageflash - Byte-addressable access to page-erasable flash
//!
//! Operates on flash images described by a board file. Each bank of the
//! board is emulated by a simulated flash controller and wrapped in a
//! `GenericFlashDriver`; all banks together form one logical address space
//! through a `JbodFlashDriver`. Commands address that logical space with any
//! alignment and length, exactly like firmware using the drivers would.

mod board;
mod cli;
mod commands;
mod error;

use board::Board;
use clap::Parser;
use cli::{Cli, Commands};
use pageflash_core::BoardConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match &cli.board {
        Some(path) => BoardConfig::from_toml_file(path)?,
        None => BoardConfig::stm32f401_flash_fs()?,
    };

    log::info!(
        "Board '{}' with {} bank(s), {} bytes",
        config.name.as_deref().unwrap_or("unnamed"),
        config.banks.len(),
        config.total_size()
    );

    let mut board = Board::open(config, &cli.image_dir)?;

    match cli.command {
        Commands::Info { toml } => commands::run_info(&mut board, toml)?,
        Commands::Read {
            start,
            length,
            output,
        } => commands::run_read(&mut board.store()?, start, length, output.as_deref())?,
        Commands::Write {
            start,
            data,
            input,
            verify,
            store,
        } => {
            let bytes = commands::load_data(data.as_deref(), input.as_deref())?;

            let mut options = board.config.options;
            if store.no_restore {
                options.restore_data_on_unaligned_writes = false;
            }
            if store.no_auto_erase {
                options.auto_erase_page = false;
            }
            board.set_options(options);

            // Whatever was committed stays on flash, failure or not
            let result = commands::run_write(&mut board.store()?, start, &bytes, verify);
            board.save()?;
            result?;
        }
        Commands::Erase { start, length } => {
            let result = commands::run_erase(&mut board.store()?, start.zip(length));
            board.save()?;
            result?;
        }
        Commands::Locate { address } => commands::run_locate(&mut board, address)?,
    }

    Ok(())
}
