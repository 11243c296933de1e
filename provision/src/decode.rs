// Licensed under the Apache-2.0 license

use crate::{
    CounterConfig, Manifest, ManifestTechnology, ProvisionError, PublicKeyConfig, Technology,
};
use bl_config::{BlStorageMemoryMap, MAX_NUM_PUBLIC_KEYS, PUBLIC_KEY_HASH_LEN};
use bl_emulator_periph::EmulatedOtp;
use bl_storage::layout::{key_entry_offset, KEY_HASH_OFFSET};
use bl_storage::{BlStorage, BlStorageError, Nvmc, OtpStorage, Rramc};
use log::{debug, info};

/// Reads a provisioning region image back into a manifest.
pub fn decode_image(
    image: &[u8],
    technology: Technology,
    memory_map: &BlStorageMemoryMap,
) -> Result<Manifest, ProvisionError> {
    let mut otp = EmulatedOtp::from_image(
        memory_map.provision_offset,
        memory_map.provision_size,
        image,
    )?;
    match technology {
        Technology::Nvmc => decode_storage(&BlStorage::<_, Nvmc>::new(&mut otp, memory_map)),
        Technology::Rramc => decode_storage(&BlStorage::<_, Rramc>::new(&mut otp, memory_map)),
    }
}

/// Reads the provisioning region behind `storage` into a manifest.
///
/// Invalidated keys are listed along with their hashes. Corrupt tokens and
/// counters with an unprogrammed slot count have no manifest form and are
/// reported as errors.
pub fn decode_storage<M: OtpStorage, T: ManifestTechnology>(
    storage: &BlStorage<'_, M, T>,
) -> Result<Manifest, ProvisionError> {
    let num_public_keys = storage.num_public_keys()?;
    if num_public_keys > MAX_NUM_PUBLIC_KEYS {
        return Err(BlStorageError::TooManyPublicKeys(num_public_keys).into());
    }

    let mut public_keys = Vec::new();
    for index in 0..num_public_keys {
        let valid = storage.is_key_valid(index)?;
        let mut hash = [0u8; PUBLIC_KEY_HASH_LEN];
        // Read directly so invalidated keys can be listed too.
        storage
            .region()
            .copy_words(key_entry_offset(index) + KEY_HASH_OFFSET, &mut hash)?;
        public_keys.push(if valid {
            PublicKeyConfig::valid(&hash)
        } else {
            PublicKeyConfig::invalidated(&hash)
        });
    }

    let counters = match storage.region().locate_counter_collection()? {
        None => None,
        Some(collection) => {
            let mut counters = Vec::new();
            for record in storage.region().counter_records::<T>(&collection) {
                let record = record?;
                if record.num_slots == T::UNPROVISIONED_SLOT_COUNT {
                    return Err(ProvisionError::UnprovisionedCounter(record.description));
                }
                let mut values = Vec::new();
                for slot in 0..record.num_slots {
                    let value = T::read_slot(storage.region(), record.slot_offset::<T>(slot))?;
                    if value == T::ERASED_SLOT {
                        continue;
                    }
                    // Manifest values fill the leading slots.
                    if usize::from(slot) != values.len() {
                        return Err(ProvisionError::CounterSlotGap {
                            description: record.description,
                            slot,
                        });
                    }
                    values.push(value);
                }
                debug!(
                    "Counter {}: {} of {} slots programmed",
                    record.description,
                    values.len(),
                    record.num_slots
                );
                counters.push(CounterConfig {
                    description: record.description,
                    slots: record.num_slots,
                    values,
                });
            }
            Some(counters)
        }
    };

    info!(
        "Decoded {} provisioning data with {} keys",
        T::NAME,
        num_public_keys
    );
    Ok(Manifest {
        technology: T::TECHNOLOGY,
        s0_address: storage.s0_address()?,
        s1_address: storage.s1_address()?,
        public_keys,
        counters,
    })
}
