// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{manifest, provision, reload};
    use bl_config::BlStorageMemoryMap;
    use bl_error::BlError;
    use bl_provision::CounterConfig;
    use bl_rom::ProvisioningCheck;
    use bl_storage::{BlStorage, BlStorageError, CounterDescription, Nvmc, Rramc};

    #[test]
    fn test_firmware_version_survives_reload() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        {
            let mut otp = provision(&manifest("provision.toml"), Some(temp_file.path()));
            let mut storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
            assert_eq!(
                ProvisioningCheck::update_firmware_version(&mut storage, 5),
                Ok(Some(0))
            );
            assert_eq!(
                ProvisioningCheck::update_firmware_version(&mut storage, 5),
                Ok(None)
            );
        }

        let mut otp = reload(temp_file.path());
        let mut storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
        let state = ProvisioningCheck::run(&storage).unwrap();
        assert_eq!(state.firmware_version, Some(5));
        assert!(!state.accepts_firmware_version(4));
        assert_eq!(
            ProvisioningCheck::update_firmware_version(&mut storage, 4),
            Err(BlError::COUNTER_VALUE_NOT_INCREASING)
        );
        assert_eq!(
            ProvisioningCheck::update_firmware_version(&mut storage, 6),
            Ok(Some(1))
        );
    }

    #[test]
    fn test_invalidated_key_survives_reload() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        {
            let mut otp = provision(&manifest("provision.toml"), Some(temp_file.path()));
            let mut storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
            storage.invalidate_public_key(1).unwrap();
        }

        let mut otp = reload(temp_file.path());
        let writes = otp.writes();
        let mut storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
        assert!(!storage.is_key_valid(1).unwrap());
        assert_eq!(ProvisioningCheck::run(&storage).unwrap().key_index, 2);
        // Already invalidated, nothing is programmed.
        storage.invalidate_public_key(1).unwrap();
        drop(storage);
        assert_eq!(otp.writes(), writes);
    }

    #[test]
    fn test_counter_exhaustion_survives_reload() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let mut manifest = manifest("rramc_no_counters.toml");
        manifest.counters = Some(vec![CounterConfig {
            description: CounterDescription::FirmwareVersion.into(),
            slots: 2,
            values: vec![0x1_0000],
        }]);
        {
            let mut otp = provision(&manifest, Some(temp_file.path()));
            let mut storage =
                BlStorage::<_, Rramc>::new(&mut otp, &BlStorageMemoryMap::default());
            assert_eq!(
                storage.set_counter(CounterDescription::FirmwareVersion, 0x2_0000),
                Ok(1)
            );
        }

        let mut otp = reload(temp_file.path());
        let mut storage = BlStorage::<_, Rramc>::new(&mut otp, &BlStorageMemoryMap::default());
        let counter = storage
            .counter_state(CounterDescription::FirmwareVersion)
            .unwrap();
        assert_eq!(counter.value, 0x2_0000);
        assert!(counter.is_exhausted());
        assert_eq!(
            storage.set_counter(CounterDescription::FirmwareVersion, 0x3_0000),
            Err(BlStorageError::CounterExhausted(
                CounterDescription::FirmwareVersion.into()
            ))
        );
    }
}
