// Licensed under the Apache-2.0 license

//! Binary layout of the provisioning region.
//!
//! ```text
//! +--------------------+ 0x00
//! | ProvisionHeader    |   s0_address, s1_address, num_public_keys
//! +--------------------+ 0x0c
//! | KeyEntry[n]        |   valid token + hash, n = num_public_keys
//! +--------------------+
//! | CounterCollection  |   type, num_counters
//! |   CounterHeader    |   description, num_counter_slots
//! |   slots[...]       |   u16 (NVMC) or u32 (RRAMC) each
//! |   CounterHeader    |
//! |   ...              |
//! +--------------------+
//! ```
//!
//! All fields are little-endian. The structs below describe the fixed-size
//! pieces; the variable-size parts are located by walking, see
//! [`crate::region`].

use bl_config::PUBLIC_KEY_HASH_LEN;
use core::mem::{offset_of, size_of};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Collection type tag for monotonic counters.
pub const TYPE_COUNTERS: u16 = 1;

/// Token value of a valid key, before the index is merged in.
pub const VALID_VAL: u32 = 0x50fa_ffff;
/// Token value of an invalidated key, before the index is merged in.
pub const INVALID_VAL: u32 = 0x50fa_0000;
/// Value programmed over a valid token to invalidate it.
pub const INVALID_WRITE_VAL: u32 = 0xffff_0000;
/// Bit position of the key index inside its token.
pub const TOKEN_IDX_OFFSET: u32 = 24;

/// Half-word value of erased memory.
pub const ERASED_HALFWORD: u16 = 0xffff;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ProvisionHeader {
    pub s0_address: U32<LittleEndian>,
    pub s1_address: U32<LittleEndian>,
    pub num_public_keys: U32<LittleEndian>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct KeyEntry {
    pub valid: U32<LittleEndian>,
    pub hash: [u8; PUBLIC_KEY_HASH_LEN],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CounterCollectionHeader {
    pub kind: U32<LittleEndian>,
    pub num_counters: U32<LittleEndian>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CounterHeader {
    pub description: U32<LittleEndian>,
    pub num_counter_slots: U32<LittleEndian>,
}

pub const S0_ADDRESS_OFFSET: u32 = offset_of!(ProvisionHeader, s0_address) as u32;
pub const S1_ADDRESS_OFFSET: u32 = offset_of!(ProvisionHeader, s1_address) as u32;
pub const NUM_PUBLIC_KEYS_OFFSET: u32 = offset_of!(ProvisionHeader, num_public_keys) as u32;
pub const KEY_DATA_OFFSET: u32 = size_of::<ProvisionHeader>() as u32;

pub const KEY_ENTRY_SIZE: u32 = size_of::<KeyEntry>() as u32;
pub const KEY_VALID_OFFSET: u32 = offset_of!(KeyEntry, valid) as u32;
pub const KEY_HASH_OFFSET: u32 = offset_of!(KeyEntry, hash) as u32;

pub const COLLECTION_TYPE_OFFSET: u32 = offset_of!(CounterCollectionHeader, kind) as u32;
pub const COLLECTION_NUM_COUNTERS_OFFSET: u32 =
    offset_of!(CounterCollectionHeader, num_counters) as u32;
pub const COLLECTION_HEADER_SIZE: u32 = size_of::<CounterCollectionHeader>() as u32;

pub const COUNTER_DESCRIPTION_OFFSET: u32 = offset_of!(CounterHeader, description) as u32;
pub const COUNTER_NUM_SLOTS_OFFSET: u32 = offset_of!(CounterHeader, num_counter_slots) as u32;
pub const COUNTER_HEADER_SIZE: u32 = size_of::<CounterHeader>() as u32;

// Hashes are read with word copies only, so every entry must keep word alignment.
const _: () = assert!(KEY_DATA_OFFSET % 4 == 0);
const _: () = assert!(KEY_ENTRY_SIZE % 4 == 0);
const _: () = assert!(KEY_HASH_OFFSET % 4 == 0);
const _: () = assert!(KEY_ENTRY_SIZE == 4 + PUBLIC_KEY_HASH_LEN as u32);

/// Fixed-offset fields of the region header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderField {
    S0Address,
    S1Address,
    NumPublicKeys,
}

impl HeaderField {
    pub const fn offset(self) -> u32 {
        match self {
            HeaderField::S0Address => S0_ADDRESS_OFFSET,
            HeaderField::S1Address => S1_ADDRESS_OFFSET,
            HeaderField::NumPublicKeys => NUM_PUBLIC_KEYS_OFFSET,
        }
    }
}

/// Token of a valid key at `index`.
pub const fn valid_token(index: u32) -> u32 {
    VALID_VAL | (index << TOKEN_IDX_OFFSET)
}

/// Token of an invalidated key at `index`.
pub const fn invalid_token(index: u32) -> u32 {
    INVALID_VAL | (index << TOKEN_IDX_OFFSET)
}

/// Offset of the key entry at `index` from the region start.
pub const fn key_entry_offset(index: u32) -> u32 {
    KEY_DATA_OFFSET + index * KEY_ENTRY_SIZE
}

impl KeyEntry {
    pub fn new(index: u32, hash: [u8; PUBLIC_KEY_HASH_LEN]) -> Self {
        KeyEntry {
            valid: valid_token(index).into(),
            hash,
        }
    }
}

/// Stable descriptions of the counters the bootloaders know about.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterDescription {
    /// Firmware version of the image booted by the immutable bootloader.
    FirmwareVersion = 1,
    /// MCUboot hardware downgrade prevention counter.
    McubootHwCounter = 2,
}

impl From<CounterDescription> for u16 {
    fn from(desc: CounterDescription) -> Self {
        desc as u16
    }
}

impl TryFrom<u16> for CounterDescription {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CounterDescription::FirmwareVersion),
            2 => Ok(CounterDescription::McubootHwCounter),
            _ => Err(value),
        }
    }
}
