/*++

Licensed under the Apache-2.0 license.

--*/

//! Bootloader provisioning tool
//!
//! Builds the image that is programmed into the provisioning region at
//! manufacturing time, and reads such images back.
//!
//! # Examples
//!
//! Encode a manifest file:
//! ```bash
//! bl-provision encode --manifest provision.toml --output provision.bin
//! ```
//!
//! Decode an image:
//! ```bash
//! bl-provision decode --image provision.bin --technology rramc
//! ```

use anyhow::{bail, Context, Result};
use bl_config::BlStorageMemoryMap;
use bl_emulator_periph::{EmulatedOtp, OtpArgs};
use bl_provision::{decode_image, encode_image, Manifest, Technology};
use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Encodes/decodes bootloader provisioning images", long_about = None)]
struct Cli {
    /// Print debug output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Address of the provisioning region
    #[arg(long, value_parser=maybe_hex::<u32>)]
    provision_offset: Option<u32>,

    /// Size of the provisioning region in bytes
    #[arg(long, value_parser=maybe_hex::<u32>)]
    provision_size: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encodes a manifest TOML file into a provisioning region image
    Encode {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output file for the raw image
        #[arg(short, long)]
        output: PathBuf,

        /// Also write an emulator OTP state file holding the image
        #[arg(long)]
        otp_file: Option<PathBuf>,
    },
    /// Decodes a provisioning region image into a manifest TOML file
    Decode {
        #[arg(short, long)]
        image: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Technology::Nvmc)]
        technology: Technology,

        /// Output file for the manifest; printed if not given
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Prints the provisioning region memory map
    MemoryMap,
}

impl Cli {
    fn memory_map(&self) -> BlStorageMemoryMap {
        let default = BlStorageMemoryMap::default();
        BlStorageMemoryMap {
            provision_offset: self.provision_offset.unwrap_or(default.provision_offset),
            provision_size: self.provision_size.unwrap_or(default.provision_size),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let memory_map = cli.memory_map();
    if memory_map.provision_offset % 4 != 0 {
        bail!(
            "Provisioning region address {:#x} is not word aligned",
            memory_map.provision_offset
        );
    }

    match &cli.command {
        Commands::Encode {
            manifest,
            output,
            otp_file,
        } => {
            let parsed = Manifest::parse_manifest_file(manifest)
                .with_context(|| format!("Failed to parse {}", manifest.display()))?;
            let image = encode_image(&parsed, &memory_map)?;
            std::fs::write(output, &image)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Encoded provisioning image to {}", output.display());

            if let Some(otp_file) = otp_file {
                // Start from a clean file so that stale state is not loaded.
                if otp_file.exists() {
                    std::fs::remove_file(otp_file)?;
                }
                let mut otp = EmulatedOtp::new(OtpArgs {
                    file_name: Some(otp_file.clone()),
                    raw_memory: Some(image),
                    memory_map,
                })?;
                otp.sync()?;
                info!("Wrote emulator OTP state to {}", otp_file.display());
            }
        }
        Commands::Decode {
            image,
            technology,
            output,
        } => {
            let data = std::fs::read(image)
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let decoded = decode_image(&data, *technology, &memory_map)
                .with_context(|| format!("Failed to decode {}", image.display()))?;
            match output {
                Some(output) => {
                    decoded.write_manifest_file(output)?;
                    info!("Decoded provisioning image to {}", output.display());
                }
                None => print!("{}", decoded.to_toml_string()?),
            }
        }
        Commands::MemoryMap => {
            let mut entries: Vec<_> = memory_map.hash_map().into_iter().collect();
            entries.sort();
            for (key, value) in entries {
                println!("{key} = {value}");
            }
        }
    }

    Ok(())
}
