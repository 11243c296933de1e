/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated bootloader storage peripherals.

--*/

mod otp;

pub use otp::{EmulatedOtp, OtpArgs, ERASED_BYTE};
