/*++

Licensed under the Apache-2.0 license.

File Name:

    otp.rs

Abstract:

    Emulated one-time-programmable memory backing the provisioning region.
    Programming can only clear bits; the contents can be persisted to a file
    so that counters and invalidated keys survive between runs.

--*/

use bl_config::BlStorageMemoryMap;
use bl_storage::{BlStorageError, BlStorageResult, OtpStorage};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fs::File;
use std::io::Seek;
use std::path::PathBuf;

/// Value of erased OTP bytes.
pub const ERASED_BYTE: u8 = 0xff;

/// Used to hold the state that is saved between emulator runs.
#[derive(Deserialize, Serialize)]
struct OtpState {
    base: u32,
    memory: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct OtpArgs {
    /// File to load the memory from and save it to.
    pub file_name: Option<PathBuf>,
    /// Initial contents, placed at the start of the memory.
    pub raw_memory: Option<Vec<u8>>,
    pub memory_map: BlStorageMemoryMap,
}

impl Default for OtpArgs {
    fn default() -> Self {
        OtpArgs {
            file_name: None,
            raw_memory: None,
            memory_map: BlStorageMemoryMap::default(),
        }
    }
}

pub struct EmulatedOtp {
    file: Option<File>,
    base: u32,
    memory: Vec<u8>,
    reads: Cell<usize>,
    writes: usize,
}

// Ensure that we save the state before we drop the OTP instance.
impl Drop for EmulatedOtp {
    fn drop(&mut self) {
        if let Err(err) = self.sync() {
            log::error!("Failed to save OTP state: {}", err);
        }
    }
}

impl EmulatedOtp {
    pub fn new(args: OtpArgs) -> Result<Self, std::io::Error> {
        let mut file = if let Some(path) = args.file_name {
            Some(
                std::fs::File::options()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)?,
            )
        } else {
            None
        };

        let base = args.memory_map.provision_offset;
        let size = args.memory_map.provision_size as usize;
        let mut memory = vec![ERASED_BYTE; size];
        if let Some(raw_memory) = args.raw_memory {
            if raw_memory.len() > size {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Raw memory is too large",
                ))?;
            }
            memory[..raw_memory.len()].copy_from_slice(&raw_memory);
        }
        // Saved state wins over the initial contents. Load it before the
        // instance exists so a rejected file is never overwritten on drop.
        if let Some(file) = &mut file {
            if let Some(state) = Self::read_state(file)? {
                Self::load_state(base, &mut memory, &state)?;
            }
        }

        Ok(Self {
            file,
            base,
            memory,
            reads: Cell::new(0),
            writes: 0,
        })
    }

    /// Volatile OTP holding `image` at `base`, padded with erased bytes up to `size`.
    pub fn from_image(base: u32, size: u32, image: &[u8]) -> Result<Self, std::io::Error> {
        Self::new(OtpArgs {
            raw_memory: Some(image.to_vec()),
            memory_map: BlStorageMemoryMap {
                provision_offset: base,
                provision_size: size,
            },
            ..Default::default()
        })
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Number of read accesses performed so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of word programming operations performed so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Overwrite a word at `offset` from the base, bypassing programming rules.
    /// Used to inject faults.
    pub fn corrupt_word(&mut self, offset: usize, value: u32) -> Result<(), std::io::Error> {
        let word = self
            .memory
            .get_mut(offset..offset + 4)
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "Offset out of range")
            })?;
        word.copy_from_slice(&value.to_le_bytes());
        log::warn!("OTP word at offset {:#x} forced to {:#010x}", offset, value);
        Ok(())
    }

    /// Write the current contents to the backing file, if any.
    pub fn sync(&mut self) -> Result<(), std::io::Error> {
        self.save_to_file()?;
        if let Some(file) = &mut self.file {
            file.sync_all()?;
        }
        Ok(())
    }

    fn get_state(&self) -> OtpState {
        OtpState {
            base: self.base,
            memory: self.memory.clone(),
        }
    }

    fn load_state(base: u32, memory: &mut [u8], state: &OtpState) -> Result<(), std::io::Error> {
        if state.base != base || state.memory.len() != memory.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Saved OTP state does not match the memory map",
            ));
        }
        memory.copy_from_slice(&state.memory);
        log::debug!("Loaded OTP state ({} bytes)", state.memory.len());
        Ok(())
    }

    fn read_state(file: &mut File) -> Result<Option<OtpState>, std::io::Error> {
        if file.metadata()?.len() == 0 {
            return Ok(None);
        }
        file.rewind()?;
        Ok(Some(serde_json::from_reader(file)?))
    }

    fn save_to_file(&mut self) -> Result<(), std::io::Error> {
        let state = self.get_state();
        if let Some(file) = &mut self.file {
            file.set_len(0)?;
            file.rewind()?;
            serde_json::to_writer(file, &state)?;
        }
        Ok(())
    }

    fn index(&self, address: u32, len: usize) -> BlStorageResult<usize> {
        if address as usize % len != 0 {
            log::error!("Unaligned OTP access of {} bytes at {:#x}", len, address);
            return Err(BlStorageError::Memory(address));
        }
        let index = address
            .checked_sub(self.base)
            .map(|offset| offset as usize)
            .filter(|offset| offset + len <= self.memory.len());
        index.ok_or_else(|| {
            log::error!("OTP access outside of memory at {:#x}", address);
            BlStorageError::Memory(address)
        })
    }
}

impl OtpStorage for EmulatedOtp {
    fn read_word(&self, address: u32) -> BlStorageResult<u32> {
        let i = self.index(address, 4)?;
        self.reads.set(self.reads.get() + 1);
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.memory[i..i + 4]);
        Ok(u32::from_le_bytes(word))
    }

    fn read_halfword(&self, address: u32) -> BlStorageResult<u16> {
        let i = self.index(address, 2)?;
        self.reads.set(self.reads.get() + 1);
        Ok(u16::from_le_bytes([self.memory[i], self.memory[i + 1]]))
    }

    fn write_word(&mut self, address: u32, value: u32) -> BlStorageResult<()> {
        let i = self.index(address, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.memory[i..i + 4]);
        let old = u32::from_le_bytes(word);
        if old & value != value {
            log::warn!(
                "OTP write of {:#010x} over {:#010x} at {:#x} cannot set bits",
                value,
                old,
                address
            );
        }
        self.memory[i..i + 4].copy_from_slice(&(old & value).to_le_bytes());
        self.writes += 1;
        Ok(())
    }
}
