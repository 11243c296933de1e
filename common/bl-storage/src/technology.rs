// Licensed under the Apache-2.0 license

//! Memory technologies backing the provisioning region.
//!
//! The technologies differ only in how wide a counter slot is. Everything
//! else in the layout is shared.

use crate::hil::OtpStorage;
use crate::region::Region;
use crate::BlStorageResult;

/// Per-technology properties of counter slots.
pub trait StorageTechnology {
    /// Human readable name, used in logs.
    const NAME: &'static str;

    /// Width in bytes of one counter slot.
    const SLOT_SIZE: u32;

    /// Value of a slot that has never been programmed.
    const ERASED_SLOT: u32;

    /// Slot count read back from a record whose slot count was never programmed.
    const UNPROVISIONED_SLOT_COUNT: u16;

    /// Read the slot at `offset` (relative to the region start).
    fn read_slot<M: OtpStorage>(region: &Region<'_, M>, offset: u32) -> BlStorageResult<u32>;

    /// Program `value` into the slot at `offset` without touching any other slot.
    fn write_slot<M: OtpStorage>(
        region: &mut Region<'_, M>,
        offset: u32,
        value: u32,
    ) -> BlStorageResult<()>;

    /// Largest value a slot can hold without reading back as erased.
    fn max_value() -> u32 {
        Self::ERASED_SLOT - 1
    }
}

/// UICR OTP behind the NVMC: half-word slots.
#[derive(Clone, Copy, Debug, Default)]
pub struct Nvmc;

impl StorageTechnology for Nvmc {
    const NAME: &'static str = "nvmc";
    const SLOT_SIZE: u32 = 2;
    const ERASED_SLOT: u32 = 0xffff;
    const UNPROVISIONED_SLOT_COUNT: u16 = 0xffff;

    fn read_slot<M: OtpStorage>(region: &Region<'_, M>, offset: u32) -> BlStorageResult<u32> {
        region.read_halfword(offset).map(u32::from)
    }

    fn write_slot<M: OtpStorage>(
        region: &mut Region<'_, M>,
        offset: u32,
        value: u32,
    ) -> BlStorageResult<()> {
        // Only words can be programmed; the other half stays all-ones so the
        // neighbouring slot keeps whatever it holds.
        let value = value & 0xffff;
        let word = if offset % 4 == 0 {
            0xffff_0000 | value
        } else {
            (value << 16) | 0xffff
        };
        region.write_word(offset & !3, word)
    }
}

/// RRAM behind the RRAMC: word slots.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rramc;

impl StorageTechnology for Rramc {
    const NAME: &'static str = "rramc";
    const SLOT_SIZE: u32 = 4;
    const ERASED_SLOT: u32 = 0xffff_ffff;
    // Record header fields are 32 bits wide on every technology and are read
    // through their low half-word, so an erased count reads 0xffff here too.
    const UNPROVISIONED_SLOT_COUNT: u16 = 0xffff;

    fn read_slot<M: OtpStorage>(region: &Region<'_, M>, offset: u32) -> BlStorageResult<u32> {
        region.read_word(offset)
    }

    fn write_slot<M: OtpStorage>(
        region: &mut Region<'_, M>,
        offset: u32,
        value: u32,
    ) -> BlStorageResult<()> {
        region.write_word(offset, value)
    }
}
