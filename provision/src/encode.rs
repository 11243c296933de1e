// Licensed under the Apache-2.0 license

use crate::{CounterConfig, Manifest, ProvisionError, Technology};
use bl_config::{BlStorageMemoryMap, MAX_NUM_PUBLIC_KEYS};
use bl_storage::layout::{
    invalid_token, valid_token, CounterCollectionHeader, CounterHeader, KeyEntry,
    ProvisionHeader, ERASED_HALFWORD, TYPE_COUNTERS,
};
use bl_storage::{Nvmc, Rramc, StorageTechnology};
use log::{debug, info, warn};
use std::collections::HashSet;
use zerocopy::IntoBytes;

/// Builds the provisioning region image described by `manifest`.
///
/// The image covers the header, the key table and the counters; the rest of
/// the region is left erased.
pub fn encode_image(
    manifest: &Manifest,
    memory_map: &BlStorageMemoryMap,
) -> Result<Vec<u8>, ProvisionError> {
    match manifest.technology {
        Technology::Nvmc => encode::<Nvmc>(manifest, memory_map),
        Technology::Rramc => encode::<Rramc>(manifest, memory_map),
    }
}

fn encode<T: StorageTechnology>(
    manifest: &Manifest,
    memory_map: &BlStorageMemoryMap,
) -> Result<Vec<u8>, ProvisionError> {
    if manifest.public_keys.len() > MAX_NUM_PUBLIC_KEYS as usize {
        return Err(ProvisionError::TooManyKeys(manifest.public_keys.len()));
    }

    let header = ProvisionHeader {
        s0_address: manifest.s0_address.into(),
        s1_address: manifest.s1_address.into(),
        num_public_keys: (manifest.public_keys.len() as u32).into(),
    };
    let mut image = header.as_bytes().to_vec();

    for (index, key) in manifest.public_keys.iter().enumerate() {
        let hash = key.hash_bytes(index)?;
        if hash
            .chunks_exact(2)
            .any(|half| u16::from_le_bytes([half[0], half[1]]) == ERASED_HALFWORD)
            && !key.invalidated
        {
            warn!(
                "Public key {} has an erased half-word and will fail verification",
                index
            );
        }
        let token = if key.invalidated {
            invalid_token(index as u32)
        } else {
            valid_token(index as u32)
        };
        let entry = KeyEntry {
            valid: token.into(),
            hash,
        };
        image.extend_from_slice(entry.as_bytes());
    }

    if let Some(counters) = &manifest.counters {
        let collection = CounterCollectionHeader {
            kind: u32::from(TYPE_COUNTERS).into(),
            num_counters: (counters.len() as u32).into(),
        };
        image.extend_from_slice(collection.as_bytes());
        let mut descriptions = HashSet::new();
        for counter in counters {
            if !descriptions.insert(counter.description) {
                return Err(ProvisionError::DuplicateCounter(counter.description));
            }
            encode_counter::<T>(counter, &mut image)?;
        }
    }

    if image.len() > memory_map.provision_size as usize {
        return Err(ProvisionError::ImageTooLarge {
            size: image.len(),
            capacity: memory_map.provision_size,
        });
    }
    info!(
        "Encoded {} byte {} provisioning image with {} keys",
        image.len(),
        T::NAME,
        manifest.public_keys.len()
    );
    Ok(image)
}

fn encode_counter<T: StorageTechnology>(
    counter: &CounterConfig,
    image: &mut Vec<u8>,
) -> Result<(), ProvisionError> {
    let CounterConfig {
        description,
        slots,
        ref values,
    } = *counter;
    if slots == T::UNPROVISIONED_SLOT_COUNT {
        return Err(ProvisionError::ReservedSlotCount { description, slots });
    }
    if (u32::from(slots) * T::SLOT_SIZE) % 4 != 0 {
        return Err(ProvisionError::OddSlotCount { description, slots });
    }
    if values.len() > slots as usize {
        return Err(ProvisionError::TooManyValues {
            description,
            values: values.len(),
            slots,
        });
    }
    let increasing = values.windows(2).all(|pair| pair[0] < pair[1]);
    if !increasing || values.iter().any(|value| *value > T::max_value()) {
        return Err(ProvisionError::InvalidCounterValues {
            description,
            max: T::max_value(),
        });
    }

    let header = CounterHeader {
        description: u32::from(description).into(),
        num_counter_slots: u32::from(slots).into(),
    };
    image.extend_from_slice(header.as_bytes());
    for slot in 0..slots as usize {
        let value = values.get(slot).copied().unwrap_or(T::ERASED_SLOT);
        image.extend_from_slice(&value.to_le_bytes()[..T::SLOT_SIZE as usize]);
    }
    debug!(
        "Counter {}: {} slots, {} programmed",
        description,
        slots,
        values.len()
    );
    Ok(())
}
