// Licensed under the Apache-2.0 license

//! In-memory OTP and image construction helpers for unit tests.

use crate::hil::OtpStorage;
use crate::layout::{
    invalid_token, CounterCollectionHeader, CounterHeader, KeyEntry, ProvisionHeader,
    TYPE_COUNTERS,
};
use crate::technology::StorageTechnology;
use crate::{BlStorageError, BlStorageResult};
use bl_config::PUBLIC_KEY_HASH_LEN;
use core::cell::Cell;
use core::marker::PhantomData;
use zerocopy::IntoBytes;

pub const TEST_BASE: u32 = 0x00ff_8100;

/// Vector backed memory with one-way programming and access counters.
pub struct FakeOtp {
    base: u32,
    data: Vec<u8>,
    reads: Cell<usize>,
    writes: usize,
}

impl FakeOtp {
    pub fn new(base: u32, data: Vec<u8>) -> Self {
        FakeOtp {
            base,
            data,
            reads: Cell::new(0),
            writes: 0,
        }
    }

    pub fn with_image(image: &[u8]) -> Self {
        Self::new(TEST_BASE, image.to_vec())
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite a word, ignoring programming rules.
    pub fn corrupt_word(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn index(&self, address: u32, len: usize) -> BlStorageResult<usize> {
        let index = address
            .checked_sub(self.base)
            .ok_or(BlStorageError::Memory(address))? as usize;
        if index + len > self.data.len() {
            return Err(BlStorageError::Memory(address));
        }
        Ok(index)
    }
}

impl OtpStorage for FakeOtp {
    fn read_word(&self, address: u32) -> BlStorageResult<u32> {
        let i = self.index(address, 4)?;
        self.reads.set(self.reads.get() + 1);
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.data[i..i + 4]);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_halfword(&self, address: u32) -> BlStorageResult<u16> {
        let i = self.index(address, 2)?;
        self.reads.set(self.reads.get() + 1);
        Ok(u16::from_le_bytes([self.data[i], self.data[i + 1]]))
    }

    fn write_word(&mut self, address: u32, value: u32) -> BlStorageResult<()> {
        let i = self.index(address, 4)?;
        self.writes += 1;
        for (byte, new) in self.data[i..i + 4].iter_mut().zip(value.to_le_bytes()) {
            *byte &= new;
        }
        Ok(())
    }
}

struct TestCounter {
    description: u16,
    num_slots: u32,
    programmed: Vec<u32>,
}

/// Builds raw provisioning images for a given slot technology.
pub struct ImageBuilder<T: StorageTechnology> {
    header: ProvisionHeader,
    keys: Vec<KeyEntry>,
    counters: Option<Vec<TestCounter>>,
    _technology: PhantomData<T>,
}

impl<T: StorageTechnology> ImageBuilder<T> {
    pub fn new(s0_address: u32, s1_address: u32) -> Self {
        ImageBuilder {
            header: ProvisionHeader {
                s0_address: s0_address.into(),
                s1_address: s1_address.into(),
                num_public_keys: 0u32.into(),
            },
            keys: Vec::new(),
            counters: None,
            _technology: PhantomData,
        }
    }

    pub fn key_with_token(mut self, token: u32, hash: [u8; PUBLIC_KEY_HASH_LEN]) -> Self {
        self.keys.push(KeyEntry {
            valid: token.into(),
            hash,
        });
        self
    }

    pub fn valid_key(self, hash: [u8; PUBLIC_KEY_HASH_LEN]) -> Self {
        let index = self.keys.len() as u32;
        self.key_with_token(crate::layout::valid_token(index), hash)
    }

    pub fn invalid_key(self, hash: [u8; PUBLIC_KEY_HASH_LEN]) -> Self {
        let index = self.keys.len() as u32;
        self.key_with_token(invalid_token(index), hash)
    }

    /// Adds a counter with `num_slots` slots, the first of which hold `programmed`.
    pub fn counter(mut self, description: u16, num_slots: u16, programmed: &[u32]) -> Self {
        assert!(programmed.len() <= num_slots as usize);
        self.counters.get_or_insert_with(Vec::new).push(TestCounter {
            description,
            num_slots: num_slots.into(),
            programmed: programmed.to_vec(),
        });
        self
    }

    /// Adds a counter whose slot count was never programmed.
    pub fn unprovisioned_counter(mut self, description: u16) -> Self {
        self.counters.get_or_insert_with(Vec::new).push(TestCounter {
            description,
            num_slots: 0xffff_ffff,
            programmed: Vec::new(),
        });
        self
    }

    /// Adds an empty counter collection header.
    pub fn empty_collection(mut self) -> Self {
        self.counters.get_or_insert_with(Vec::new);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.header.num_public_keys = (self.keys.len() as u32).into();
        let mut image = self.header.as_bytes().to_vec();
        for key in self.keys.iter() {
            image.extend_from_slice(key.as_bytes());
        }
        if let Some(counters) = self.counters {
            let collection = CounterCollectionHeader {
                kind: u32::from(TYPE_COUNTERS).into(),
                num_counters: (counters.len() as u32).into(),
            };
            image.extend_from_slice(collection.as_bytes());
            for counter in counters {
                let header = CounterHeader {
                    description: u32::from(counter.description).into(),
                    num_counter_slots: counter.num_slots.into(),
                };
                image.extend_from_slice(header.as_bytes());
                if counter.num_slots == 0xffff_ffff {
                    continue;
                }
                for slot in 0..counter.num_slots as usize {
                    let value = counter
                        .programmed
                        .get(slot)
                        .copied()
                        .unwrap_or(T::ERASED_SLOT);
                    let bytes = value.to_le_bytes();
                    image.extend_from_slice(&bytes[..T::SLOT_SIZE as usize]);
                }
            }
        }
        image
    }
}
