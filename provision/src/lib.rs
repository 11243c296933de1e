/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Host side tooling for the bootloader provisioning region: builds region
    images from a TOML manifest and reads images back into one.

--*/

mod decode;
mod encode;
mod error;
pub mod manifest;

pub use decode::{decode_image, decode_storage};
pub use encode::encode_image;
pub use error::ProvisionError;
pub use manifest::{CounterConfig, Manifest, ManifestTechnology, PublicKeyConfig, Technology};
