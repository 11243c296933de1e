// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{manifest, provision};
    use bl_config::BlStorageMemoryMap;
    use bl_error::BlError;
    use bl_provision::PublicKeyConfig;
    use bl_rom::{ProvisionedState, ProvisioningCheck};
    use bl_storage::{BlStorage, Nvmc, Rramc};

    #[test]
    fn test_boot_nvmc() {
        let manifest = manifest("provision.toml");
        let mut otp = provision(&manifest, None);
        let storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
        let state = ProvisioningCheck::run(&storage).unwrap();
        assert_eq!(
            state,
            ProvisionedState {
                s0_address: 0x8000,
                s1_address: 0x4_8000,
                key_index: 1,
                key_hash: manifest.public_keys[1].hash_bytes(1).unwrap(),
                firmware_version: Some(0),
            }
        );
    }

    #[test]
    fn test_boot_rramc_without_counters() {
        let manifest = manifest("rramc_no_counters.toml");
        let mut otp = provision(&manifest, None);
        let storage = BlStorage::<_, Rramc>::new(&mut otp, &BlStorageMemoryMap::default());
        let state = ProvisioningCheck::run(&storage).unwrap();
        assert_eq!(state.key_index, 0);
        assert_eq!(state.s0_address, 0x1_0000);
        assert_eq!(state.firmware_version, None);
    }

    #[test]
    fn test_boot_after_key_revocation() {
        let manifest = manifest("provision.toml");
        let mut otp = provision(&manifest, None);
        let mut storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
        storage.invalidate_public_key(1).unwrap();
        let state = ProvisioningCheck::run(&storage).unwrap();
        assert_eq!(state.key_index, 2);
        assert_eq!(
            state.key_hash,
            manifest.public_keys[2].hash_bytes(2).unwrap()
        );

        storage.invalidate_public_key(2).unwrap();
        assert_eq!(
            ProvisioningCheck::run(&storage),
            Err(BlError::ROM_NO_VALID_PUBLIC_KEY)
        );
    }

    #[test]
    fn test_boot_rejects_erased_hash() {
        let mut manifest = manifest("provision.toml");
        let mut hash = [0x42u8; 16];
        hash[6..8].copy_from_slice(&[0xff, 0xff]);
        manifest.public_keys.push(PublicKeyConfig::valid(&hash));
        let mut otp = provision(&manifest, None);
        let storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
        assert_eq!(
            ProvisioningCheck::run(&storage),
            Err(BlError::STORAGE_ERASED_KEY_HASH)
        );
    }
}
