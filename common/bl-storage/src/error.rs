// Licensed under the Apache-2.0 license

use bl_error::BlError;

/// Errors returned by the provisioning storage accessors.
///
/// Every variant except [`BlStorageError::CorruptToken`] is recoverable: the
/// caller may reject a key, fall back to the other image slot, and so on.
/// `CorruptToken` means the trust store itself cannot be interpreted and the
/// boot flow must halt; see [`BlStorageError::is_fatal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlStorageError {
    /// Key index is not below the provisioned key count.
    KeyIndexOutOfRange { index: u32, num_public_keys: u32 },
    /// The key at this index has been invalidated.
    KeyInvalidated(u32),
    /// The key count exceeds `MAX_NUM_PUBLIC_KEYS` (or reads as erased).
    TooManyPublicKeys(u32),
    /// The valid key at this index has an erased half-word in its hash.
    ErasedHash(u32),
    /// The hash of the key at this index is not word aligned.
    UnalignedKeyAddress(u32),
    /// Validity token matches neither pattern for its index. Fatal.
    CorruptToken { index: u32, token: u32 },
    /// Access past the end of the provisioning region.
    OutOfBounds { offset: u32, len: u32 },
    /// Word access at an offset that is not word aligned.
    UnalignedAccess { offset: u32 },
    /// Output buffer cannot hold a public key hash.
    BufferTooSmall { needed: usize, actual: usize },
    /// Failure reported by the memory implementation.
    Memory(u32),
    /// No counter collection, or no counter with this description.
    CounterNotPresent(u16),
    /// The counter's slot count reads as erased.
    CounterNotProvisioned(u16),
    /// Every slot of the counter is programmed.
    CounterExhausted(u16),
    /// Counters only move forward.
    CounterValueNotIncreasing { current: u32, requested: u32 },
    /// The value collides with the erased slot pattern.
    CounterValueTooLarge(u32),
}

pub type BlStorageResult<T> = Result<T, BlStorageError>;

impl BlStorageError {
    /// Returns true if the provisioning data is corrupt and execution must not continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BlStorageError::CorruptToken { .. })
    }
}

impl From<BlStorageError> for BlError {
    fn from(err: BlStorageError) -> Self {
        match err {
            BlStorageError::KeyIndexOutOfRange { .. } => BlError::STORAGE_KEY_INDEX_OUT_OF_RANGE,
            BlStorageError::KeyInvalidated(_) => BlError::STORAGE_KEY_INVALIDATED,
            BlStorageError::TooManyPublicKeys(_) => BlError::STORAGE_TOO_MANY_PUBLIC_KEYS,
            BlStorageError::ErasedHash(_) => BlError::STORAGE_ERASED_KEY_HASH,
            BlStorageError::UnalignedKeyAddress(_) => BlError::STORAGE_UNALIGNED_KEY_ADDRESS,
            BlStorageError::CorruptToken { .. } => BlError::STORAGE_CORRUPT_KEY_TOKEN,
            BlStorageError::OutOfBounds { .. } => BlError::STORAGE_OUT_OF_BOUNDS,
            BlStorageError::UnalignedAccess { .. } => BlError::STORAGE_UNALIGNED_ACCESS,
            BlStorageError::BufferTooSmall { .. } => BlError::STORAGE_BUFFER_TOO_SMALL,
            BlStorageError::Memory(_) => BlError::STORAGE_MEMORY_FAULT,
            BlStorageError::CounterNotPresent(_) => BlError::COUNTER_NOT_PRESENT,
            BlStorageError::CounterNotProvisioned(_) => BlError::COUNTER_NOT_PROVISIONED,
            BlStorageError::CounterExhausted(_) => BlError::COUNTER_EXHAUSTED,
            BlStorageError::CounterValueNotIncreasing { .. } => {
                BlError::COUNTER_VALUE_NOT_INCREASING
            }
            BlStorageError::CounterValueTooLarge(_) => BlError::COUNTER_VALUE_TOO_LARGE,
        }
    }
}

impl From<BlStorageError> for u32 {
    fn from(err: BlStorageError) -> Self {
        BlError::from(err).into()
    }
}
