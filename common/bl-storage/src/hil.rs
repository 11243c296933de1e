// Licensed under the Apache-2.0 license

//! Generic interface for the memory holding the provisioning region.

use crate::BlStorageResult;

/// Access primitives for one-time-programmable style memory. It is expected
/// that drivers for the memory technology (UICR OTP, RRAM, an emulator) would
/// implement this trait.
///
/// Addresses are absolute. Implementations only need to support the region
/// handed to [`crate::BlStorage`]; all bounds checks against that region are
/// done before any of these are called.
pub trait OtpStorage {
    /// Read the 32-bit word at the word aligned `address`.
    fn read_word(&self, address: u32) -> BlStorageResult<u32>;

    /// Read the 16-bit half-word at the half-word aligned `address`.
    fn read_halfword(&self, address: u32) -> BlStorageResult<u16>;

    /// Program the word at the word aligned `address`.
    ///
    /// Programming can only move bits from 1 to 0: the stored result is the
    /// bitwise AND of the old contents and `value`. Erasing is not possible.
    fn write_word(&mut self, address: u32, value: u32) -> BlStorageResult<()>;

    /// Fill `buffer` from consecutive words starting at the word aligned `address`.
    /// `buffer.len()` must be a multiple of 4.
    fn copy_words(&self, buffer: &mut [u8], address: u32) -> BlStorageResult<()> {
        for (i, chunk) in buffer.chunks_exact_mut(4).enumerate() {
            let word = self.read_word(address + (i as u32) * 4)?;
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }
}
