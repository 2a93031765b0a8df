mod common;

use common::*;
use pageflash_core::{
    ConfigError, Error, FlashStore, FlashStoreExt, JbodFlashDriver, MediumFailure, Result,
    StoreOptions,
};
use pageflash_sim::{Fault, FlashStatus, ERASED_BYTE};

/// Store wrapper logging every write and erase it receives
struct Recording<S> {
    inner: S,
    writes: Vec<(u32, usize)>,
    erases: Vec<(u32, u32)>,
}

impl<S> Recording<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            writes: Vec::new(),
            erases: Vec::new(),
        }
    }
}

impl<S: FlashStore> FlashStore for Recording<S> {
    fn size(&self) -> u32 {
        self.inner.size()
    }

    fn page_size(&self) -> u32 {
        self.inner.page_size()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        let written = self.inner.write(address, data)?;
        self.writes.push((address, written));
        Ok(written)
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        self.erases.push((address, size));
        self.inner.erase(address, size)
    }

    fn options(&self) -> StoreOptions {
        self.inner.options()
    }

    fn set_options(&mut self, options: StoreOptions) {
        self.inner.set_options(options)
    }

    fn can_restore_data_on_unaligned_writes(&self) -> bool {
        self.inner.can_restore_data_on_unaligned_writes()
    }

    fn last_error(&self) -> Option<Error> {
        self.inner.last_error()
    }

    fn clear_error(&mut self) {
        self.inner.clear_error()
    }
}

/// The STM32F401 file system area: sectors 1-3 and sector 4
fn f401_banks() -> [Recording<SimDriver>; 2] {
    [
        Recording::new(erased_driver(table_16k(3))),
        Recording::new(erased_driver(table_64k())),
    ]
}

const BOUNDARY: u32 = 3 * KIB16;

#[test]
fn test_empty_jbod() {
    let mut backends: Vec<SimDriver> = Vec::new();
    assert!(matches!(
        JbodFlashDriver::new(&mut backends),
        Err(Error::Config(ConfigError::NoBackends))
    ));
}

#[test]
fn test_mixed_page_sizes() {
    init();
    let mut backends = f401_banks();
    let jbod = JbodFlashDriver::new(&mut backends).unwrap();

    assert_eq!(jbod.page_size(), KIB64);
    assert_eq!(jbod.size(), BOUNDARY + KIB64);
}

#[test]
fn test_locate() {
    init();
    let mut backends = f401_banks();
    let jbod = JbodFlashDriver::new(&mut backends).unwrap();

    for r in [0, 1, KIB16, BOUNDARY - 1] {
        let location = jbod.locate(r).unwrap();
        assert_eq!((location.index, location.local_address), (0, r));
    }
    for r in [0, 77, KIB64 - 1] {
        let location = jbod.locate(BOUNDARY + r).unwrap();
        assert_eq!((location.index, location.local_address), (1, r));
        assert_eq!(location.offset, BOUNDARY);
    }
    assert!(jbod.locate(BOUNDARY + KIB64).is_none());
}

#[test]
fn test_split_write_across_backends() {
    init();
    let mut backends = f401_banks();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();

    let data = pattern(60, 13);
    assert_eq!(jbod.write(BOUNDARY - 20, &data).unwrap(), 60);

    let mut back = [0u8; 60];
    assert_eq!(jbod.read(BOUNDARY - 20, &mut back).unwrap(), 60);
    assert_eq!(&back[..], &data[..]);

    let backends = jbod.into_backends();
    assert_eq!(backends[0].writes, vec![(BOUNDARY - 20, 20)]);
    assert_eq!(backends[1].writes, vec![(0, 40)]);

    let committed: usize = backends
        .iter()
        .flat_map(|b| b.writes.iter().map(|&(_, n)| n))
        .sum();
    assert_eq!(committed, 60);

    assert_eq!(
        &backends[0].inner.raw().backing()[BOUNDARY as usize - 20..],
        &data[..20]
    );
    assert_eq!(&backends[1].inner.raw().backing()[..40], &data[20..]);
}

#[test]
fn test_write_inside_one_backend() {
    init();
    let mut backends = f401_banks();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();

    jbod.write_all(BOUNDARY + 100, &pattern(500, 1)).unwrap();

    assert!(jbod.backends()[0].writes.is_empty());
    assert_eq!(jbod.backends()[1].writes, vec![(100, 500)]);
}

#[test]
fn test_write_out_of_bounds() {
    init();
    let mut backends = f401_banks();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();
    let size = jbod.size();

    assert_eq!(jbod.write(size - 10, &[0; 11]), Err(Error::AddressOutOfBounds));
    assert!(jbod.backends().iter().all(|b| b.writes.is_empty()));
}

#[test]
fn test_failure_in_second_backend() {
    init();
    let mut backends = f401_banks();
    backends[1]
        .inner
        .raw_mut()
        .inject_fault(Fault::program(10))
        .unwrap();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();

    let written = jbod.write(BOUNDARY - 20, &pattern(60, 2)).unwrap();

    assert_eq!(written, 20);
    assert_eq!(
        jbod.last_error(),
        Some(Error::Medium(MediumFailure::ProgramFailed {
            address: 8,
            code: FlashStatus::PGSERR.bits()
        }))
    );
    assert!(jbod.write_all(BOUNDARY - 20, &pattern(60, 2)).is_err());

    jbod.clear_error();
    assert!(jbod.last_error().is_none());
    assert!(jbod.backends()[1].last_error().is_none());
}

#[test]
fn test_erase_across_backends() {
    init();
    let mut backends = f401_banks();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();
    jbod.write_all(0, &pattern((BOUNDARY + KIB64) as usize, 3))
        .unwrap();

    jbod.erase(2 * KIB16, KIB16 + KIB64).unwrap();

    assert_eq!(jbod.backends()[0].erases, vec![(2 * KIB16, KIB16)]);
    assert_eq!(jbod.backends()[1].erases, vec![(0, KIB64)]);

    let image = jbod.read_all().unwrap();
    assert!(image[2 * KIB16 as usize..].iter().all(|&b| b == ERASED_BYTE));
    assert!(image[..2 * KIB16 as usize].iter().all(|&b| b != ERASED_BYTE));
}

#[test]
fn test_erase_misaligned_for_backend() {
    init();
    let mut backends = f401_banks();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();
    let data = pattern(KIB16 as usize, 3);
    jbod.write_all(2 * KIB16, &data).unwrap();

    // aligned for the 16 KiB bank, only part of a page on the 64 KiB bank
    assert_eq!(
        jbod.erase(2 * KIB16, 2 * KIB16),
        Err(Error::InvalidAlignment)
    );

    // rejected before either bank was erased
    assert!(jbod.backends().iter().all(|b| b.erases.is_empty()));
    assert!(jbod.verify(2 * KIB16, &data).unwrap());
}

#[test]
fn test_options_propagate_to_backends() {
    init();
    let mut backends = f401_banks();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();

    assert!(jbod.can_restore_data_on_unaligned_writes());
    assert_eq!(jbod.options(), StoreOptions::default());

    jbod.set_restore_data_on_unaligned_writes(false);
    jbod.set_auto_erase_page(false);

    for backend in jbod.backends() {
        assert_eq!(
            backend.options(),
            StoreOptions {
                restore_data_on_unaligned_writes: false,
                auto_erase_page: false,
            }
        );
    }
}

#[test]
fn test_restore_disabled_through_jbod() {
    init();
    let mut backends = f401_banks();
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();
    jbod.write_all(0, &pattern((BOUNDARY + KIB64) as usize, 5))
        .unwrap();

    jbod.set_restore_data_on_unaligned_writes(false);
    jbod.write_all(BOUNDARY - 4, &[0x11; 8]).unwrap();

    let image = jbod.read_all().unwrap();
    let last_small_page = &image[2 * KIB16 as usize..BOUNDARY as usize];
    assert!(last_small_page[..KIB16 as usize - 4]
        .iter()
        .all(|&b| b == ERASED_BYTE));
    assert_eq!(&image[BOUNDARY as usize - 4..BOUNDARY as usize + 4], &[0x11; 8]);
    assert!(image[BOUNDARY as usize + 4..]
        .iter()
        .all(|&b| b == ERASED_BYTE));
}

#[test]
fn test_heterogeneous_backends() {
    init();
    let mut small = erased_driver(table_16k(1));
    let mut large = Recording::new(erased_driver(table_64k()));
    let mut backends: [&mut dyn FlashStore; 2] = [&mut small, &mut large];
    let mut jbod = JbodFlashDriver::new(&mut backends).unwrap();

    jbod.write_all(KIB16 - 2, b"nested").unwrap();
    assert!(jbod.verify(KIB16 - 2, b"nested").unwrap());
    drop(jbod);

    assert_eq!(large.writes, vec![(0, 4)]);
}

#[test]
fn test_nested_jbod() {
    init();
    let mut inner_banks = [erased_driver(table_16k(1)), erased_driver(table_16k(1))];
    let mut inner = JbodFlashDriver::new(&mut inner_banks).unwrap();
    let mut large = erased_driver(table_64k());
    let mut outer_banks: [&mut dyn FlashStore; 2] = [&mut inner, &mut large];
    let mut outer = JbodFlashDriver::new(&mut outer_banks).unwrap();

    assert_eq!(outer.size(), 2 * KIB16 + KIB64);
    outer.write_all(2 * KIB16 - 8, &pattern(16, 0)).unwrap();
    assert!(outer.verify(2 * KIB16 - 8, &pattern(16, 0)).unwrap());
    assert_eq!(outer.locate(2 * KIB16).map(|l| l.index), Some(1));
}
