// Licensed under the Apache-2.0 license

use bl_config::{MAX_NUM_PUBLIC_KEYS, PUBLIC_KEY_HASH_LEN};
use bl_storage::BlStorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{0} public keys exceed the maximum of {max}", max = MAX_NUM_PUBLIC_KEYS)]
    TooManyKeys(usize),
    #[error("public key {index}: invalid hex hash")]
    InvalidHash {
        index: usize,
        #[source]
        source: hex::FromHexError,
    },
    #[error(
        "public key {index}: hash is {len} bytes, expected {expected}",
        expected = PUBLIC_KEY_HASH_LEN
    )]
    HashLength { index: usize, len: usize },
    #[error("counter description {0} is used more than once")]
    DuplicateCounter(u16),
    #[error("counter {description}: {slots} slots would leave the next record unaligned")]
    OddSlotCount { description: u16, slots: u16 },
    #[error("counter {description}: slot count {slots} reads as unprovisioned")]
    ReservedSlotCount { description: u16, slots: u16 },
    #[error("counter {description}: {values} values do not fit in {slots} slots")]
    TooManyValues {
        description: u16,
        values: usize,
        slots: u16,
    },
    #[error("counter {description}: values must increase and stay below {max:#x}")]
    InvalidCounterValues { description: u16, max: u32 },
    #[error("counter {description}: slot {slot} is programmed after an erased slot")]
    CounterSlotGap { description: u16, slot: u16 },
    #[error("counter {0}: slot count was never programmed")]
    UnprovisionedCounter(u16),
    #[error("image of {size} bytes does not fit the {capacity} byte provisioning region")]
    ImageTooLarge { size: usize, capacity: u32 },
    #[error("malformed provisioning data: {0:?}")]
    Storage(BlStorageError),
    #[error(transparent)]
    ManifestParse(#[from] toml::de::Error),
    #[error(transparent)]
    ManifestWrite(#[from] toml::ser::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<BlStorageError> for ProvisionError {
    fn from(err: BlStorageError) -> Self {
        ProvisionError::Storage(err)
    }
}
