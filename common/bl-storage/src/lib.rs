/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Accessor for the bootloader provisioning region: image addresses, public
    key hashes guarded by validity tokens, and append-only monotonic counters.

--*/

#![cfg_attr(not(test), no_std)]

mod counters;
mod error;
pub mod hil;
mod keys;
pub mod layout;
pub mod region;
pub mod technology;
#[cfg(test)]
mod test_util;

pub use counters::{CounterState, COUNTER_MIN_VALUE};
pub use error::{BlStorageError, BlStorageResult};
pub use hil::OtpStorage;
pub use keys::KeyState;
pub use layout::{CounterDescription, HeaderField};
pub use region::{CounterCollection, CounterRecord, CounterRecords, Region};
pub use technology::{Nvmc, Rramc, StorageTechnology};

use bl_config::BlStorageMemoryMap;
use core::marker::PhantomData;

/// The provisioning region as seen by the bootloader.
///
/// `M` is the memory the region lives in and `T` the technology that decides
/// the counter slot width. Reads take `&self`; the two permitted mutations
/// (key invalidation and counter updates) take `&mut self`.
pub struct BlStorage<'a, M: OtpStorage, T: StorageTechnology> {
    region: Region<'a, M>,
    _technology: PhantomData<T>,
}

impl<'a, M: OtpStorage, T: StorageTechnology> BlStorage<'a, M, T> {
    pub fn new(otp: &'a mut M, memory_map: &BlStorageMemoryMap) -> Self {
        Self::with_region(otp, memory_map.provision_offset, memory_map.provision_size)
    }

    pub fn with_region(otp: &'a mut M, base: u32, size: u32) -> Self {
        BlStorage {
            region: Region::new(otp, base, size),
            _technology: PhantomData,
        }
    }

    pub fn region(&self) -> &Region<'a, M> {
        &self.region
    }

    /// Base address of the S0 firmware image.
    pub fn s0_address(&self) -> BlStorageResult<u32> {
        self.region.read_header_field(HeaderField::S0Address)
    }

    /// Base address of the S1 firmware image.
    pub fn s1_address(&self) -> BlStorageResult<u32> {
        self.region.read_header_field(HeaderField::S1Address)
    }

    /// Raw number of entries declared for the key table.
    pub fn num_public_keys(&self) -> BlStorageResult<u32> {
        self.region.read_header_field(HeaderField::NumPublicKeys)
    }
}
