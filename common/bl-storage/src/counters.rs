// Licensed under the Apache-2.0 license

//! Append-only monotonic counters.
//!
//! A counter is a run of slots that start erased and are programmed in order,
//! each holding a raw value. The current value is whatever the last
//! programmed slot holds; the slot after it is where the next value goes.

use crate::region::CounterRecord;
use crate::{BlStorage, BlStorageError, BlStorageResult, OtpStorage, StorageTechnology};
use core::fmt::Write;
use romtime::HexWord;

/// Value reported by a counter that has no programmed slot yet.
pub const COUNTER_MIN_VALUE: u32 = 0;

/// Snapshot of a counter's slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterState {
    /// Value of the highest programmed slot, or [`COUNTER_MIN_VALUE`].
    pub value: u32,
    /// First slot after the highest programmed one, if any remain.
    pub free_slot: Option<u16>,
    pub num_slots: u16,
}

impl CounterState {
    pub fn is_exhausted(&self) -> bool {
        self.free_slot.is_none()
    }
}

impl<M: OtpStorage, T: StorageTechnology> BlStorage<'_, M, T> {
    /// Finds the record for `description`. Its slot count is returned raw.
    pub fn get_counter_record(
        &self,
        description: impl Into<u16>,
    ) -> BlStorageResult<CounterRecord> {
        let description = description.into();
        let collection = self
            .region
            .locate_counter_collection()?
            .ok_or(BlStorageError::CounterNotPresent(description))?;
        self.region
            .find_counter_record::<T>(&collection, description)?
            .ok_or(BlStorageError::CounterNotPresent(description))
    }

    fn provisioned_counter_record(&self, description: u16) -> BlStorageResult<CounterRecord> {
        let record = self.get_counter_record(description)?;
        if record.num_slots == T::UNPROVISIONED_SLOT_COUNT {
            return Err(BlStorageError::CounterNotProvisioned(description));
        }
        Ok(record)
    }

    /// Number of slots provisioned for the counter.
    pub fn counter_slot_count(&self, description: impl Into<u16>) -> BlStorageResult<u16> {
        Ok(self.provisioned_counter_record(description.into())?.num_slots)
    }

    /// Scans every slot of the counter and reports its current value and the
    /// next slot to program.
    pub fn counter_state(&self, description: impl Into<u16>) -> BlStorageResult<CounterState> {
        let record = self.provisioned_counter_record(description.into())?;
        let mut last = None;
        for index in 0..record.num_slots {
            let value = T::read_slot(&self.region, record.slot_offset::<T>(index))?;
            if value != T::ERASED_SLOT {
                last = Some((index, value));
            }
        }
        let (value, free_slot) = match last {
            None => (COUNTER_MIN_VALUE, (record.num_slots > 0).then_some(0)),
            Some((index, value)) => {
                let next = index + 1;
                (value, (next < record.num_slots).then_some(next))
            }
        };
        Ok(CounterState {
            value,
            free_slot,
            num_slots: record.num_slots,
        })
    }

    /// Current value of the counter.
    pub fn counter_value(&self, description: impl Into<u16>) -> BlStorageResult<u32> {
        Ok(self.counter_state(description)?.value)
    }

    /// Programs `value` into the next free slot and returns that slot's index.
    ///
    /// The value must be strictly greater than the current one and must not
    /// read back as an erased slot.
    pub fn set_counter(
        &mut self,
        description: impl Into<u16>,
        value: u32,
    ) -> BlStorageResult<u16> {
        let description = description.into();
        if value > T::max_value() {
            return Err(BlStorageError::CounterValueTooLarge(value));
        }
        let record = self.provisioned_counter_record(description)?;
        let state = self.counter_state(description)?;
        if value <= state.value {
            return Err(BlStorageError::CounterValueNotIncreasing {
                current: state.value,
                requested: value,
            });
        }
        let slot = state
            .free_slot
            .ok_or(BlStorageError::CounterExhausted(description))?;
        let offset = record.slot_offset::<T>(slot);
        romtime::println!(
            "[bl-storage] Counter {} slot {} <- {} ({})",
            description,
            slot,
            HexWord(value),
            T::NAME
        );
        T::write_slot(&mut self.region, offset, value)?;
        Ok(slot)
    }
}
