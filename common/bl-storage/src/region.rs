// Licensed under the Apache-2.0 license

//! Bounded, offset-based view of the provisioning region and the walker that
//! locates the variable-length parts inside it.

use crate::hil::OtpStorage;
use crate::layout::{
    key_entry_offset, HeaderField, COLLECTION_HEADER_SIZE, COLLECTION_NUM_COUNTERS_OFFSET,
    COLLECTION_TYPE_OFFSET, COUNTER_DESCRIPTION_OFFSET, COUNTER_HEADER_SIZE,
    COUNTER_NUM_SLOTS_OFFSET, TYPE_COUNTERS,
};
use crate::technology::StorageTechnology;
use crate::{BlStorageError, BlStorageResult};
use bl_config::MAX_NUM_PUBLIC_KEYS;
use core::fmt::Write;
use core::marker::PhantomData;
use romtime::HexWord;

/// Location of the counter collection inside the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterCollection {
    /// Offset of the collection header from the region start.
    pub offset: u32,
    pub num_counters: u16,
}

/// Location of one monotonic counter record inside the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterRecord {
    /// Offset of the record header from the region start.
    pub offset: u32,
    pub description: u16,
    /// Raw slot count; may be the technology's unprovisioned sentinel.
    pub num_slots: u16,
}

impl CounterRecord {
    /// Offset of slot `index` from the region start.
    pub fn slot_offset<T: StorageTechnology>(&self, index: u16) -> u32 {
        self.offset + COUNTER_HEADER_SIZE + u32::from(index) * T::SLOT_SIZE
    }
}

/// A view over `size` bytes of memory starting at `base`.
///
/// All accessors take offsets relative to `base` and refuse anything that
/// does not fit inside the view before touching the memory.
pub struct Region<'a, M: OtpStorage> {
    otp: &'a mut M,
    base: u32,
    size: u32,
}

impl<'a, M: OtpStorage> Region<'a, M> {
    pub fn new(otp: &'a mut M, base: u32, size: u32) -> Self {
        Region { otp, base, size }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn address(&self, offset: u32, len: u32) -> BlStorageResult<u32> {
        let out_of_bounds = BlStorageError::OutOfBounds { offset, len };
        let end = offset.checked_add(len).ok_or(out_of_bounds)?;
        if end > self.size {
            return Err(out_of_bounds);
        }
        self.base.checked_add(offset).ok_or(out_of_bounds)
    }

    pub fn read_word(&self, offset: u32) -> BlStorageResult<u32> {
        if offset % 4 != 0 {
            return Err(BlStorageError::UnalignedAccess { offset });
        }
        let address = self.address(offset, 4)?;
        self.otp.read_word(address)
    }

    pub fn read_halfword(&self, offset: u32) -> BlStorageResult<u16> {
        if offset % 2 != 0 {
            return Err(BlStorageError::UnalignedAccess { offset });
        }
        let address = self.address(offset, 2)?;
        self.otp.read_halfword(address)
    }

    pub fn copy_words(&self, offset: u32, buffer: &mut [u8]) -> BlStorageResult<()> {
        if offset % 4 != 0 || buffer.len() % 4 != 0 {
            return Err(BlStorageError::UnalignedAccess { offset });
        }
        let address = self.address(offset, buffer.len() as u32)?;
        self.otp.copy_words(buffer, address)
    }

    pub fn write_word(&mut self, offset: u32, value: u32) -> BlStorageResult<()> {
        if offset % 4 != 0 {
            return Err(BlStorageError::UnalignedAccess { offset });
        }
        let address = self.address(offset, 4)?;
        self.otp.write_word(address, value)
    }

    /// Reads a fixed-offset header word. No validation is applied.
    pub fn read_header_field(&self, field: HeaderField) -> BlStorageResult<u32> {
        self.read_word(field.offset())
    }

    /// Locates the counter collection that follows the key table.
    ///
    /// Returns `Ok(None)` when the type tag there is not the counter type,
    /// which is how a region provisioned without counters looks.
    pub fn locate_counter_collection(&self) -> BlStorageResult<Option<CounterCollection>> {
        let num_public_keys = self.read_header_field(HeaderField::NumPublicKeys)?;
        if num_public_keys > MAX_NUM_PUBLIC_KEYS {
            // The collection's position depends on this count.
            return Err(BlStorageError::TooManyPublicKeys(num_public_keys));
        }
        let offset = key_entry_offset(num_public_keys);
        if offset + COLLECTION_HEADER_SIZE > self.size {
            // The key table fills the region.
            return Ok(None);
        }
        let kind = self.read_halfword(offset + COLLECTION_TYPE_OFFSET)?;
        if kind != TYPE_COUNTERS {
            return Ok(None);
        }
        let num_counters = self.read_halfword(offset + COLLECTION_NUM_COUNTERS_OFFSET)?;
        Ok(Some(CounterCollection {
            offset,
            num_counters,
        }))
    }

    /// Iterates over the records of `collection` in storage order.
    pub fn counter_records<T: StorageTechnology>(
        &self,
        collection: &CounterCollection,
    ) -> CounterRecords<'_, 'a, M, T> {
        CounterRecords {
            region: self,
            cursor: collection.offset + COLLECTION_HEADER_SIZE,
            remaining: collection.num_counters,
            previous: None,
            _technology: PhantomData,
        }
    }

    /// Walks the records of `collection` looking for `description`.
    pub fn find_counter_record<T: StorageTechnology>(
        &self,
        collection: &CounterCollection,
        description: u16,
    ) -> BlStorageResult<Option<CounterRecord>> {
        for record in self.counter_records::<T>(collection) {
            let record = record?;
            if record.description == description {
                return Ok(Some(record));
            }
        }
        romtime::println!(
            "[bl-storage] Counter {} not found in collection at {}",
            description,
            HexWord(self.base + collection.offset)
        );
        Ok(None)
    }
}

/// Iterator over the records of a counter collection.
///
/// Records have no fixed size, so the start of each one is only known after
/// decoding the one before it. The iterator stops after the first error.
pub struct CounterRecords<'r, 'a, M: OtpStorage, T: StorageTechnology> {
    region: &'r Region<'a, M>,
    cursor: u32,
    remaining: u16,
    previous: Option<CounterRecord>,
    _technology: PhantomData<T>,
}

impl<M: OtpStorage, T: StorageTechnology> CounterRecords<'_, '_, M, T> {
    fn advance(&mut self) -> BlStorageResult<CounterRecord> {
        // The previous record's slot count is only trusted once something
        // past it is needed.
        if let Some(previous) = self.previous.take() {
            let record_size = COUNTER_HEADER_SIZE + u32::from(previous.num_slots) * T::SLOT_SIZE;
            self.cursor = previous
                .offset
                .checked_add(record_size)
                .filter(|next| *next <= self.region.size)
                .ok_or(BlStorageError::OutOfBounds {
                    offset: previous.offset,
                    len: record_size,
                })?;
        }
        let offset = self.cursor;
        let num_slots = self.region.read_halfword(offset + COUNTER_NUM_SLOTS_OFFSET)?;
        let description = self
            .region
            .read_halfword(offset + COUNTER_DESCRIPTION_OFFSET)?;
        Ok(CounterRecord {
            offset,
            description,
            num_slots,
        })
    }
}

impl<M: OtpStorage, T: StorageTechnology> Iterator for CounterRecords<'_, '_, M, T> {
    type Item = BlStorageResult<CounterRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let record = self.advance();
        match record {
            Ok(record) => self.previous = Some(record),
            Err(_) => self.remaining = 0,
        }
        Some(record)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::technology::{Nvmc, Rramc};
    use crate::test_util::{FakeOtp, ImageBuilder, TEST_BASE};

    #[test]
    fn test_bounds_are_enforced() {
        let mut otp = FakeOtp::new(TEST_BASE, vec![0xff; 16]);
        let mut region = Region::new(&mut otp, TEST_BASE, 16);
        assert_eq!(region.read_word(12), Ok(0xffff_ffff));
        assert_eq!(
            region.read_word(16),
            Err(BlStorageError::OutOfBounds { offset: 16, len: 4 })
        );
        assert_eq!(
            region.read_halfword(15),
            Err(BlStorageError::UnalignedAccess { offset: 15 })
        );
        assert_eq!(
            region.read_word(2),
            Err(BlStorageError::UnalignedAccess { offset: 2 })
        );
        assert_eq!(
            region.write_word(u32::MAX - 3, 0),
            Err(BlStorageError::OutOfBounds {
                offset: u32::MAX - 3,
                len: 4
            })
        );
        let mut buf = [0u8; 8];
        assert_eq!(
            region.copy_words(12, &mut buf),
            Err(BlStorageError::OutOfBounds { offset: 12, len: 8 })
        );
        assert_eq!(otp.reads(), 1);
    }

    #[test]
    fn test_read_header_fields() {
        let image = ImageBuilder::<Nvmc>::new(0x1000, 0x2_0000).build();
        let mut otp = FakeOtp::with_image(&image);
        let region = Region::new(&mut otp, TEST_BASE, image.len() as u32);
        assert_eq!(region.read_header_field(HeaderField::S0Address), Ok(0x1000));
        assert_eq!(
            region.read_header_field(HeaderField::S1Address),
            Ok(0x2_0000)
        );
        assert_eq!(region.read_header_field(HeaderField::NumPublicKeys), Ok(0));
    }

    #[test]
    fn test_collection_follows_key_table() {
        let image = ImageBuilder::<Nvmc>::new(0, 0)
            .valid_key([1; 16])
            .valid_key([2; 16])
            .counter(1, 2, &[])
            .build();
        let mut otp = FakeOtp::with_image(&image);
        let region = Region::new(&mut otp, TEST_BASE, image.len() as u32);
        assert_eq!(
            region.locate_counter_collection(),
            Ok(Some(CounterCollection {
                offset: 12 + 2 * 20,
                num_counters: 1
            }))
        );
    }

    #[test]
    fn test_collection_absent() {
        let mut image = ImageBuilder::<Nvmc>::new(0, 0).valid_key([1; 16]).build();
        // Erased memory after the key table
        image.extend_from_slice(&[0xff; 16]);
        let mut otp = FakeOtp::with_image(&image);
        let region = Region::new(&mut otp, TEST_BASE, image.len() as u32);
        assert_eq!(region.locate_counter_collection(), Ok(None));
    }

    #[test]
    fn test_collection_absent_when_region_ends_after_keys() {
        let image = ImageBuilder::<Nvmc>::new(0, 0).valid_key([1; 16]).build();
        let mut otp = FakeOtp::with_image(&image);
        let region = Region::new(&mut otp, TEST_BASE, image.len() as u32);
        assert_eq!(region.locate_counter_collection(), Ok(None));
        // Only the key count was read.
        assert_eq!(otp.reads(), 1);
    }

    #[test]
    fn test_collection_with_unprovisioned_key_count() {
        let mut otp = FakeOtp::new(TEST_BASE, vec![0xff; 64]);
        let region = Region::new(&mut otp, TEST_BASE, 64);
        assert_eq!(
            region.locate_counter_collection(),
            Err(BlStorageError::TooManyPublicKeys(0xffff_ffff))
        );
    }

    fn check_skips_variable_records<T: StorageTechnology>() {
        let image = ImageBuilder::<T>::new(0, 0)
            .valid_key([1; 16])
            .counter(7, 2, &[])
            .counter(8, 4, &[])
            .counter(9, 2, &[])
            .build();
        let mut otp = FakeOtp::with_image(&image);
        let region = Region::new(&mut otp, TEST_BASE, image.len() as u32);
        let collection = region.locate_counter_collection().unwrap().unwrap();
        let record = region
            .find_counter_record::<T>(&collection, 9)
            .unwrap()
            .unwrap();
        // Two record headers and 2 + 4 slots sit between the first record and the third.
        let first = collection.offset + COLLECTION_HEADER_SIZE;
        assert_eq!(
            record.offset,
            first + 2 * COUNTER_HEADER_SIZE + (2 + 4) * T::SLOT_SIZE
        );
        assert_eq!(record.num_slots, 2);
        assert_eq!(record.description, 9);
        assert_eq!(region.find_counter_record::<T>(&collection, 3), Ok(None));
    }

    #[test]
    fn test_find_counter_record_skips_variable_records() {
        check_skips_variable_records::<Nvmc>();
        check_skips_variable_records::<Rramc>();
    }

    #[test]
    fn test_find_counter_record_stops_at_region_end() {
        let mut image = ImageBuilder::<Nvmc>::new(0, 0).counter(7, 2, &[]).build();
        // Claim a second record that is not there.
        let num_counters_offset = 12 + COLLECTION_NUM_COUNTERS_OFFSET as usize;
        image[num_counters_offset] = 2;
        let mut otp = FakeOtp::with_image(&image);
        let region = Region::new(&mut otp, TEST_BASE, image.len() as u32);
        let collection = region.locate_counter_collection().unwrap().unwrap();
        assert!(matches!(
            region.find_counter_record::<Nvmc>(&collection, 8),
            Err(BlStorageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_counter_records_in_order() {
        let image = ImageBuilder::<Rramc>::new(0, 0)
            .counter(2, 3, &[1])
            .unprovisioned_counter(1)
            .build();
        let mut otp = FakeOtp::with_image(&image);
        let region = Region::new(&mut otp, TEST_BASE, image.len() as u32);
        let collection = region.locate_counter_collection().unwrap().unwrap();
        let records: Vec<_> = region
            .counter_records::<Rramc>(&collection)
            .map(|record| record.map(|r| (r.description, r.num_slots)))
            .collect();
        // The last record's slot count is never used to advance.
        assert_eq!(records, vec![Ok((2, 3)), Ok((1, 0xffff))]);
    }
}
