/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Bootloader side of the provisioning region: the UICR memory driver, the
    boot-time provisioning check and the fatal error path.

--*/

#![cfg_attr(not(test), no_std)]

mod provisioning;
pub use provisioning::*;
mod uicr;
pub use uicr::*;

use bl_error::{BlError, BlResult};
use bl_storage::BlStorageResult;
use core::fmt::Write;
use romtime::HexWord;

pub trait FatalErrorHandler {
    fn fatal_error(&mut self, code: u32) -> !;
}

static mut FATAL_ERROR_HANDLER: Option<&'static mut dyn FatalErrorHandler> = None;

/// Set the fatal error handler.
///
/// SAFETY: it is important that the passed fatal handler is never used otherwise
/// and no other references exist to it. It is recommended to create a single instance
/// of the struct and pass it in immediately, and never use it otherwise.
pub fn set_fatal_error_handler(handler: &'static mut dyn FatalErrorHandler) {
    unsafe {
        FATAL_ERROR_HANDLER = Some(handler);
    }
}

#[no_mangle]
#[inline(never)]
#[cfg(all(target_arch = "arm", target_os = "none"))]
fn panic_is_possible() {
    core::hint::black_box(());
    // The existence of this symbol is used to detect that panics are
    // reachable. Do not remove or rename this symbol.
}

#[panic_handler]
#[inline(never)]
#[cfg(all(target_arch = "arm", target_os = "none"))]
fn rom_panic(_: &core::panic::PanicInfo) -> ! {
    panic_is_possible();
    fatal_error(0);
}

#[inline(never)]
#[allow(clippy::empty_loop)]
pub fn fatal_error(code: u32) -> ! {
    #[allow(static_mut_refs)]
    if let Some(handler) = unsafe { FATAL_ERROR_HANDLER.as_mut() } {
        handler.fatal_error(code);
    } else {
        // If no handler is set, just loop forever
        loop {}
    }
}

/// Converts a storage result into a ROM result, halting on errors that mean
/// the trust store cannot be interpreted.
///
/// Every storage access made during boot goes through here, so a corrupt key
/// token can never be mistaken for a merely invalid key.
pub fn check_fatal<T>(result: BlStorageResult<T>) -> BlResult<T> {
    result.map_err(|err| {
        let code = BlError::from(err);
        if err.is_fatal() {
            romtime::println!(
                "[bl-rom] Fatal provisioning error {:?}, halting with {}",
                err,
                HexWord(code.into())
            );
            fatal_error(code.into());
        }
        code
    })
}
