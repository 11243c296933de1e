/*++

Licensed under the Apache-2.0 license.

File Name:

    provisioning.rs

Abstract:

    Boot-time check of the provisioning region: validates the key table,
    selects the key to verify images with and reads the image addresses and
    the firmware version counter.

--*/

use crate::check_fatal;
use bl_config::PUBLIC_KEY_HASH_LEN;
use bl_error::{BlError, BlResult};
use bl_storage::{
    BlStorage, BlStorageError, CounterDescription, OtpStorage, StorageTechnology,
    COUNTER_MIN_VALUE,
};
use core::fmt::Write;
use romtime::{HexBytes, HexWord};

/// What the bootloader needs to know about the provisioned device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProvisionedState {
    pub s0_address: u32,
    pub s1_address: u32,
    /// Index of the first valid public key.
    pub key_index: u32,
    pub key_hash: [u8; PUBLIC_KEY_HASH_LEN],
    /// Current firmware version, if a firmware version counter is provisioned.
    pub firmware_version: Option<u32>,
}

impl ProvisionedState {
    /// Returns true if an image with `version` may be booted without rolling back.
    pub fn accepts_firmware_version(&self, version: u32) -> bool {
        version >= self.firmware_version.unwrap_or(COUNTER_MIN_VALUE)
    }
}

pub struct ProvisioningCheck;

impl ProvisioningCheck {
    /// Validates the provisioning region and summarizes it.
    ///
    /// Halts through [`crate::fatal_error`] if a key token is corrupt.
    pub fn run<M: OtpStorage, T: StorageTechnology>(
        storage: &BlStorage<'_, M, T>,
    ) -> BlResult<ProvisionedState> {
        romtime::println!("[bl-rom] Checking provisioning data ({})", T::NAME);
        check_fatal(storage.verify_all_keys())?;

        let (key_index, key_hash) = Self::first_valid_key(storage)?;
        let s0_address = check_fatal(storage.s0_address())?;
        let s1_address = check_fatal(storage.s1_address())?;
        let firmware_version = match storage.counter_value(CounterDescription::FirmwareVersion) {
            Ok(version) => Some(version),
            Err(
                BlStorageError::CounterNotPresent(_) | BlStorageError::CounterNotProvisioned(_),
            ) => {
                romtime::println!("[bl-rom] No firmware version counter");
                None
            }
            Err(err) => return check_fatal(Err(err)),
        };

        romtime::println!(
            "[bl-rom] Using key {} ({}), S0 at {}, S1 at {}",
            key_index,
            HexBytes(&key_hash),
            HexWord(s0_address),
            HexWord(s1_address)
        );
        Ok(ProvisionedState {
            s0_address,
            s1_address,
            key_index,
            key_hash,
            firmware_version,
        })
    }

    fn first_valid_key<M: OtpStorage, T: StorageTechnology>(
        storage: &BlStorage<'_, M, T>,
    ) -> BlResult<(u32, [u8; PUBLIC_KEY_HASH_LEN])> {
        let num_public_keys = check_fatal(storage.num_public_keys())?;
        for index in 0..num_public_keys {
            if check_fatal(storage.is_key_valid(index))? {
                let mut hash = [0u8; PUBLIC_KEY_HASH_LEN];
                check_fatal(storage.public_key_hash(index, &mut hash))?;
                return Ok((index, hash));
            }
        }
        romtime::println!("[bl-rom] All {} public keys are invalidated", num_public_keys);
        Err(BlError::ROM_NO_VALID_PUBLIC_KEY)
    }

    /// Records that firmware `version` has been booted.
    ///
    /// Returns the programmed slot, or `None` if the counter already holds
    /// `version`.
    pub fn update_firmware_version<M: OtpStorage, T: StorageTechnology>(
        storage: &mut BlStorage<'_, M, T>,
        version: u32,
    ) -> BlResult<Option<u16>> {
        let current = check_fatal(storage.counter_value(CounterDescription::FirmwareVersion))?;
        if current == version {
            return Ok(None);
        }
        let slot = check_fatal(storage.set_counter(CounterDescription::FirmwareVersion, version))?;
        romtime::println!(
            "[bl-rom] Firmware version {} -> {}",
            HexWord(current),
            HexWord(version)
        );
        Ok(Some(slot))
    }
}
