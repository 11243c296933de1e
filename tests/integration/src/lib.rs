// Licensed under the Apache-2.0 license

mod test_boot;
mod test_fatal;
mod test_persistence;

#[cfg(test)]
mod test {
    use bl_config::BlStorageMemoryMap;
    use bl_emulator_periph::{EmulatedOtp, OtpArgs};
    use bl_provision::{encode_image, Manifest};
    use bl_rom::{set_fatal_error_handler, FatalErrorHandler};
    use std::path::{Path, PathBuf};
    use std::sync::{LazyLock, Once};

    static PROJECT_ROOT: LazyLock<PathBuf> = LazyLock::new(|| {
        Path::new(&env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .to_path_buf()
    });

    pub fn manifest(name: &str) -> Manifest {
        let path = PROJECT_ROOT
            .join("provision")
            .join("tests")
            .join("manifests")
            .join(name);
        Manifest::parse_manifest_file(&path).unwrap()
    }

    pub fn init_logger() {
        static LOGGER: Once = Once::new();
        LOGGER.call_once(|| {
            let _ = simple_logger::SimpleLogger::new()
                .with_level(log::LevelFilter::Debug)
                .init();
        });
    }

    /// Programs `manifest` into a fresh OTP, optionally backed by `file`.
    pub fn provision(manifest: &Manifest, file: Option<&Path>) -> EmulatedOtp {
        init_logger();
        let memory_map = BlStorageMemoryMap::default();
        let image = encode_image(manifest, &memory_map).unwrap();
        EmulatedOtp::new(OtpArgs {
            file_name: file.map(Path::to_path_buf),
            raw_memory: Some(image),
            memory_map,
        })
        .unwrap()
    }

    /// Reopens an OTP state file written by an earlier run.
    pub fn reload(file: &Path) -> EmulatedOtp {
        EmulatedOtp::new(OtpArgs {
            file_name: Some(file.to_path_buf()),
            ..Default::default()
        })
        .unwrap()
    }

    struct PanickingHandler;

    impl FatalErrorHandler for PanickingHandler {
        fn fatal_error(&mut self, code: u32) -> ! {
            panic!("halted with {code:#010x}");
        }
    }

    /// Runs `f` and returns the code it halted with, if it halted.
    pub fn halt_code<R>(f: impl FnOnce() -> R) -> Option<u32> {
        static HANDLER: Once = Once::new();
        HANDLER.call_once(|| set_fatal_error_handler(Box::leak(Box::new(PanickingHandler))));
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).err()?;
        let message = payload.downcast_ref::<String>()?;
        u32::from_str_radix(message.strip_prefix("halted with 0x")?, 16).ok()
    }
}
