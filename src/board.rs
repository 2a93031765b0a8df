//! Board loading: one simulated bank per board entry, backed by an image file

use crate::error::CliError;
use pageflash_core::{BoardConfig, FlashStore, GenericFlashDriver, JbodFlashDriver, StoreOptions};
use pageflash_sim::{SimPageDriver, ERASED_BYTE};
use std::fs;
use std::path::{Path, PathBuf};

/// Store for one bank
pub type BankDriver = GenericFlashDriver<'static, SimPageDriver<Vec<u8>>>;

/// A board with its banks opened
pub struct Board {
    pub config: BoardConfig,
    images: Vec<PathBuf>,
    drivers: Vec<BankDriver>,
}

impl Board {
    /// Open every bank of `config`
    ///
    /// A bank's image is its configured path, or `<image_dir>/<name>.bin`.
    /// Missing images start out erased.
    pub fn open(config: BoardConfig, image_dir: &Path) -> Result<Self, CliError> {
        let mut images = Vec::with_capacity(config.banks.len());
        let mut drivers = Vec::with_capacity(config.banks.len());

        for bank in &config.banks {
            let path = bank
                .image
                .clone()
                .unwrap_or_else(|| image_dir.join(format!("{}.bin", bank.name)));
            let expected = bank.sectors.total_size() as usize;

            let content = if path.exists() {
                let content = fs::read(&path).map_err(|e| CliError::io(&path, e))?;
                if content.len() != expected {
                    return Err(CliError::ImageSize {
                        path,
                        bank: bank.name.clone(),
                        expected,
                        actual: content.len(),
                    });
                }
                log::debug!("Loaded {} bytes for bank '{}' from {:?}", expected, bank.name, path);
                content
            } else {
                log::info!("No image for bank '{}' at {:?}, starting erased", bank.name, path);
                vec![ERASED_BYTE; expected]
            };

            let sim = SimPageDriver::new(bank.sectors.clone(), content)?;
            let mut driver = GenericFlashDriver::new(sim);
            driver.set_options(config.options);

            images.push(path);
            drivers.push(driver);
        }

        Ok(Self {
            config,
            images,
            drivers,
        })
    }

    /// Override the store options of every bank
    pub fn set_options(&mut self, options: StoreOptions) {
        for driver in &mut self.drivers {
            driver.set_options(options);
        }
    }

    /// Image file of each bank, in bank order
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// All banks as one logical store
    pub fn store(&mut self) -> Result<JbodFlashDriver<'_, BankDriver>, CliError> {
        Ok(JbodFlashDriver::new(&mut self.drivers)?)
    }

    /// Write every bank back to its image file
    pub fn save(&self) -> Result<(), CliError> {
        for (path, driver) in self.images.iter().zip(&self.drivers) {
            fs::write(path, driver.raw().backing()).map_err(|e| CliError::io(path, e))?;
            log::debug!(
                "Saved {} bytes to {:?} ({} sectors erased, {} bytes programmed)",
                driver.size(),
                path,
                driver.raw().stats().sectors_erased,
                driver.raw().stats().bytes_programmed
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageflash_core::FlashStoreExt;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pageflash-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_open_write_save_reopen() {
        let dir = temp_dir("reopen");
        let config = BoardConfig::stm32f401_flash_fs().unwrap();

        let mut board = Board::open(config.clone(), &dir).unwrap();
        board
            .store()
            .unwrap()
            .write_all(3 * 16 * 1024 - 10, b"across both banks")
            .unwrap();
        board.save().unwrap();
        assert!(board.images().iter().all(|path| path.exists()));

        let mut board = Board::open(config, &dir).unwrap();
        assert!(board
            .store()
            .unwrap()
            .verify(3 * 16 * 1024 - 10, b"across both banks")
            .unwrap());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sample_board_matches_preset() {
        let sample = BoardConfig::from_toml_str(include_str!("../boards/stm32f401-fs.toml")).unwrap();
        let preset = BoardConfig::stm32f401_flash_fs().unwrap();

        assert_eq!(sample.name, preset.name);
        assert_eq!(sample.options, preset.options);
        assert_eq!(sample.banks.len(), preset.banks.len());
        for (ours, theirs) in sample.banks.iter().zip(&preset.banks) {
            assert_eq!(ours.name, theirs.name);
            assert_eq!(ours.sectors, theirs.sectors);
            assert!(ours.image.is_some());
        }
    }

    #[test]
    fn test_image_size_mismatch() {
        let dir = temp_dir("mismatch");
        fs::write(dir.join("fs16k.bin"), [0u8; 10]).unwrap();

        let result = Board::open(BoardConfig::stm32f401_flash_fs().unwrap(), &dir);
        assert!(matches!(
            result,
            Err(CliError::ImageSize {
                expected: 49152,
                actual: 10,
                ..
            })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
