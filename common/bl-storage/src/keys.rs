// Licensed under the Apache-2.0 license

use crate::layout::{
    invalid_token, key_entry_offset, valid_token, ERASED_HALFWORD, INVALID_WRITE_VAL,
    KEY_HASH_OFFSET, KEY_VALID_OFFSET,
};
use crate::{BlStorage, BlStorageError, BlStorageResult, OtpStorage, StorageTechnology};
use bl_config::{MAX_NUM_PUBLIC_KEYS, PUBLIC_KEY_HASH_LEN};
use core::fmt::Write;
use romtime::HexWord;

/// Decoded validity token of a key table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyState {
    Valid,
    Invalidated,
}

impl<M: OtpStorage, T: StorageTechnology> BlStorage<'_, M, T> {
    /// Key count, rejecting tables that declare more than `MAX_NUM_PUBLIC_KEYS`.
    fn checked_num_public_keys(&self) -> BlStorageResult<u32> {
        let num_public_keys = self.num_public_keys()?;
        if num_public_keys > MAX_NUM_PUBLIC_KEYS {
            romtime::println!(
                "[bl-storage] Key table declares {} keys, rejecting",
                HexWord(num_public_keys)
            );
            return Err(BlStorageError::TooManyPublicKeys(num_public_keys));
        }
        Ok(num_public_keys)
    }

    fn check_key_index(&self, index: u32) -> BlStorageResult<()> {
        let num_public_keys = self.checked_num_public_keys()?;
        if index >= num_public_keys {
            return Err(BlStorageError::KeyIndexOutOfRange {
                index,
                num_public_keys,
            });
        }
        Ok(())
    }

    /// Decodes the validity token of an in-range key.
    ///
    /// A token that is neither the valid nor the invalid pattern for `index`
    /// yields [`BlStorageError::CorruptToken`], which is fatal.
    fn key_state(&self, index: u32) -> BlStorageResult<KeyState> {
        let token = self
            .region
            .read_word(key_entry_offset(index) + KEY_VALID_OFFSET)?;
        if token == valid_token(index) {
            Ok(KeyState::Valid)
        } else if token == invalid_token(index) {
            Ok(KeyState::Invalidated)
        } else {
            romtime::println!(
                "[bl-storage] Corrupt validity token {} for key {}",
                HexWord(token),
                index
            );
            Err(BlStorageError::CorruptToken { index, token })
        }
    }

    /// Returns whether the key at `index` is valid. Indices past the key
    /// table are simply not valid.
    pub fn is_key_valid(&self, index: u32) -> BlStorageResult<bool> {
        match self.check_key_index(index) {
            Err(BlStorageError::KeyIndexOutOfRange { .. }) => return Ok(false),
            result => result?,
        }
        Ok(self.key_state(index)? == KeyState::Valid)
    }

    /// Copies the hash of the valid key at `index` into `buf` and returns its length.
    pub fn public_key_hash(&self, index: u32, buf: &mut [u8]) -> BlStorageResult<usize> {
        if buf.len() < PUBLIC_KEY_HASH_LEN {
            return Err(BlStorageError::BufferTooSmall {
                needed: PUBLIC_KEY_HASH_LEN,
                actual: buf.len(),
            });
        }
        self.check_key_index(index)?;
        if self.key_state(index)? != KeyState::Valid {
            return Err(BlStorageError::KeyInvalidated(index));
        }
        self.check_key_index(index)?;

        let offset = key_entry_offset(index) + KEY_HASH_OFFSET;
        // Layout keeps this aligned at build time; the base comes from runtime config.
        if (self.region.base() + offset) % 4 != 0 {
            return Err(BlStorageError::UnalignedKeyAddress(index));
        }
        self.region
            .copy_words(offset, &mut buf[..PUBLIC_KEY_HASH_LEN])?;
        Ok(PUBLIC_KEY_HASH_LEN)
    }

    /// Invalidates the key at `index`. Invalidating an already invalid key is
    /// a no-op and performs no write.
    pub fn invalidate_public_key(&mut self, index: u32) -> BlStorageResult<()> {
        self.check_key_index(index)?;
        if self.key_state(index)? == KeyState::Valid {
            romtime::println!("[bl-storage] Invalidating public key {}", index);
            self.region
                .write_word(key_entry_offset(index) + KEY_VALID_OFFSET, INVALID_WRITE_VAL)?;
        }
        Ok(())
    }

    /// Checks that no valid key has an unprogrammed hash.
    ///
    /// Stops at the first valid key with an erased half-word and reports its
    /// index. Invalidated keys are skipped without reading their hash.
    pub fn verify_all_keys(&self) -> BlStorageResult<()> {
        let num_public_keys = self.checked_num_public_keys()?;
        for index in 0..num_public_keys {
            if self.key_state(index)? != KeyState::Valid {
                continue;
            }
            let hash_offset = key_entry_offset(index) + KEY_HASH_OFFSET;
            for halfword in (0..PUBLIC_KEY_HASH_LEN as u32).step_by(2) {
                if self.region.read_halfword(hash_offset + halfword)? == ERASED_HALFWORD {
                    romtime::println!("[bl-storage] Key {} has an erased hash", index);
                    return Err(BlStorageError::ErasedHash(index));
                }
            }
        }
        Ok(())
    }
}
