// Licensed under the Apache-2.0 license

#![cfg_attr(not(any(feature = "std", test)), no_std)]

/// Length in bytes of each provisioned public key hash.
pub const PUBLIC_KEY_HASH_LEN: usize = 16;

/// Maximum number of public key entries the key table may declare.
pub const MAX_NUM_PUBLIC_KEYS: u32 = 16;

/// Slots given to a provisioned counter unless the manifest says otherwise.
pub const NUM_VER_COUNTER_SLOTS: u16 = 240;

// Hashes are copied out with word reads only.
const _: () = assert!(PUBLIC_KEY_HASH_LEN % 4 == 0);
const _: () = assert!(PUBLIC_KEY_HASH_LEN > 0);
// Half-word slots must come in pairs to keep the next record word aligned.
const _: () = assert!(NUM_VER_COUNTER_SLOTS % 2 == 0);

/// Configures where the provisioning region lives.
/// These are the defaults that can be overridden and provided to the bootloader and tools.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlStorageMemoryMap {
    pub provision_offset: u32,
    pub provision_size: u32,
}

impl Default for BlStorageMemoryMap {
    fn default() -> Self {
        // UICR OTP area
        BlStorageMemoryMap {
            provision_offset: 0x00ff_8100,
            provision_size: 0x300,
        }
    }
}

impl BlStorageMemoryMap {
    #[cfg(feature = "std")]
    pub fn hash_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();
        map.insert(
            "PROVISION_OFFSET".to_string(),
            format!("0x{:x}", self.provision_offset),
        );
        map.insert(
            "PROVISION_SIZE".to_string(),
            format!("0x{:x}", self.provision_size),
        );
        map.insert(
            "PUBLIC_KEY_HASH_LEN".to_string(),
            format!("{}", PUBLIC_KEY_HASH_LEN),
        );
        map.insert(
            "MAX_NUM_PUBLIC_KEYS".to_string(),
            format!("{}", MAX_NUM_PUBLIC_KEYS),
        );
        map
    }

    /// Returns true if `[offset, offset + len)` lies within the provisioning region.
    pub fn contains(&self, offset: u32, len: u32) -> bool {
        offset >= self.provision_offset
            && offset
                .checked_add(len)
                .is_some_and(|end| end <= self.provision_offset + self.provision_size)
    }
}
