// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{halt_code, manifest, provision};
    use bl_config::BlStorageMemoryMap;
    use bl_error::BlError;
    use bl_rom::ProvisioningCheck;
    use bl_storage::layout::{key_entry_offset, valid_token};
    use bl_storage::{BlStorage, Nvmc};

    #[test]
    fn test_corrupt_token_halts_boot() {
        let mut otp = provision(&manifest("provision.toml"), None);
        // Key 2 carries the token of key 0.
        otp.corrupt_word(key_entry_offset(2) as usize, valid_token(0))
            .unwrap();
        let code = halt_code(|| {
            let storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
            ProvisioningCheck::run(&storage)
        });
        assert_eq!(code, Some(u32::from(BlError::STORAGE_CORRUPT_KEY_TOKEN)));
    }

    #[test]
    fn test_partially_invalidated_token_halts_boot() {
        let mut otp = provision(&manifest("provision.toml"), None);
        // Invalidation interrupted half way through the low half-word.
        let token = valid_token(1) & 0xffff_ff00;
        otp.corrupt_word(key_entry_offset(1) as usize, token).unwrap();
        let code = halt_code(|| {
            let storage = BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
            ProvisioningCheck::run(&storage)
        });
        assert_eq!(code, Some(u32::from(BlError::STORAGE_CORRUPT_KEY_TOKEN)));
    }

    #[test]
    fn test_recoverable_errors_do_not_halt() {
        let mut otp = provision(&manifest("provision.toml"), None);
        let code = halt_code(|| {
            let mut storage =
                BlStorage::<_, Nvmc>::new(&mut otp, &BlStorageMemoryMap::default());
            ProvisioningCheck::update_firmware_version(&mut storage, 0xffff)
        });
        assert_eq!(code, None);
    }
}
