/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Error codes reported by the bootloader storage crates. Codes are stable
    and are what ends up in the fatal error register when the ROM halts.

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Bootloader storage error code
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: BlError = BlError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl BlError {
    /// Create an error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. Use `BlError::try_from()` for runtime values.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("BlError cannot be 0"),
        }
    }

    define_error_constants![
        (
            STORAGE_KEY_INDEX_OUT_OF_RANGE,
            0xb100_0001,
            "Public key index is not below the provisioned key count"
        ),
        (
            STORAGE_KEY_INVALIDATED,
            0xb100_0002,
            "Public key has been invalidated"
        ),
        (
            STORAGE_TOO_MANY_PUBLIC_KEYS,
            0xb100_0003,
            "Provisioned key count exceeds the maximum; table rejected"
        ),
        (
            STORAGE_ERASED_KEY_HASH,
            0xb100_0004,
            "A valid public key hash contains an erased half-word"
        ),
        (
            STORAGE_UNALIGNED_KEY_ADDRESS,
            0xb100_0005,
            "Public key hash is not word aligned"
        ),
        (
            STORAGE_CORRUPT_KEY_TOKEN,
            0xb100_0006,
            "Key validity token matches neither the valid nor the invalid pattern"
        ),
        (
            STORAGE_OUT_OF_BOUNDS,
            0xb100_0007,
            "Access outside of the provisioning region"
        ),
        (
            STORAGE_BUFFER_TOO_SMALL,
            0xb100_0008,
            "Output buffer is smaller than the public key hash"
        ),
        (
            STORAGE_MEMORY_FAULT,
            0xb100_0009,
            "The underlying memory reported a failure"
        ),
        (
            STORAGE_UNALIGNED_ACCESS,
            0xb100_000a,
            "Word access to a provisioning region offset that is not word aligned"
        ),
        (
            COUNTER_NOT_PRESENT,
            0xb101_0001,
            "No counter collection or no counter with the requested description"
        ),
        (
            COUNTER_NOT_PROVISIONED,
            0xb101_0002,
            "Counter slot count reads as erased"
        ),
        (
            COUNTER_EXHAUSTED,
            0xb101_0003,
            "All counter slots are programmed"
        ),
        (
            COUNTER_VALUE_NOT_INCREASING,
            0xb101_0004,
            "New counter value is not above the current value"
        ),
        (
            COUNTER_VALUE_TOO_LARGE,
            0xb101_0005,
            "Counter value does not fit in a slot"
        ),
        (
            ROM_NO_VALID_PUBLIC_KEY,
            0xb102_0001,
            "No provisioned public key is valid"
        ),
    ];

    /// Returns true if the code denotes corrupt trust data that must halt the device.
    pub fn is_fatal(&self) -> bool {
        *self == Self::STORAGE_CORRUPT_KEY_TOKEN
    }
}

impl From<core::num::NonZeroU32> for crate::BlError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::BlError(val)
    }
}

impl From<BlError> for core::num::NonZeroU32 {
    fn from(val: BlError) -> Self {
        val.0
    }
}

impl From<BlError> for u32 {
    fn from(val: BlError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for BlError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(BlError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type BlResult<T> = Result<T, BlError>;
