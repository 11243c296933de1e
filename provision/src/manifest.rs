// Licensed under the Apache-2.0 license

//! TOML description of what gets provisioned.
//!
//! ```toml
//! technology = "nvmc"
//! s0_address = 0x8000
//! s1_address = 0x48000
//!
//! [[public_keys]]
//! hash = "00112233445566778899aabbccddeeff"
//!
//! [[counters]]
//! description = 1
//! slots = 240
//! ```

use crate::ProvisionError;
use bl_config::{NUM_VER_COUNTER_SLOTS, PUBLIC_KEY_HASH_LEN};
use bl_storage::{Nvmc, Rramc, StorageTechnology};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Memory technology the region is provisioned on. Decides the counter slot width.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    #[default]
    Nvmc,
    Rramc,
}

/// Links a slot technology type to its manifest name.
pub trait ManifestTechnology: StorageTechnology {
    const TECHNOLOGY: Technology;
}

impl ManifestTechnology for Nvmc {
    const TECHNOLOGY: Technology = Technology::Nvmc;
}

impl ManifestTechnology for Rramc {
    const TECHNOLOGY: Technology = Technology::Rramc;
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub technology: Technology,
    pub s0_address: u32,
    pub s1_address: u32,
    #[serde(default)]
    pub public_keys: Vec<PublicKeyConfig>,
    /// `None` leaves the area after the key table erased; an empty list
    /// still writes the collection header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<Vec<CounterConfig>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyConfig {
    /// Hex encoded hash of the public key.
    pub hash: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub invalidated: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    pub description: u16,
    #[serde(default = "default_slots")]
    pub slots: u16,
    /// Values already programmed into the first slots, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<u32>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_slots() -> u16 {
    NUM_VER_COUNTER_SLOTS
}

impl PublicKeyConfig {
    pub fn valid(hash: &[u8]) -> Self {
        PublicKeyConfig {
            hash: hex::encode(hash),
            invalidated: false,
        }
    }

    pub fn invalidated(hash: &[u8]) -> Self {
        PublicKeyConfig {
            hash: hex::encode(hash),
            invalidated: true,
        }
    }

    /// Decodes the hash of the key at `index`.
    pub fn hash_bytes(&self, index: usize) -> Result<[u8; PUBLIC_KEY_HASH_LEN], ProvisionError> {
        let bytes = hex::decode(self.hash.trim())
            .map_err(|source| ProvisionError::InvalidHash { index, source })?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| ProvisionError::HashLength {
                index,
                len: bytes.len(),
            })
    }
}

impl Manifest {
    pub fn parse_manifest_file(path: &Path) -> Result<Self, ProvisionError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ProvisionError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ProvisionError> {
        Ok(toml::to_string(self)?)
    }

    pub fn write_manifest_file(&self, path: &Path) -> Result<(), ProvisionError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
