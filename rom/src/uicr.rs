// Licensed under the Apache-2.0 license

//! Memory mapped access to the UICR OTP area through the NVMC.
//!
//! Reads are plain loads. Programming a word requires switching the NVMC to
//! write mode and waiting for it to report ready before and after the store.

use bl_config::BlStorageMemoryMap;
use bl_storage::{BlStorageError, BlStorageResult, OtpStorage};
use core::fmt::Write;
use romtime::{HexWord, StaticRef};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs};

/// Base address of the NVMC register block.
pub const NVMC_BASE: u32 = 0x4001_e000;

register_bitfields![u32,
    pub Ready [
        READY OFFSET(0) NUMBITS(1) [
            Busy = 0,
            Ready = 1,
        ],
    ],
    pub Config [
        WEN OFFSET(0) NUMBITS(2) [
            Ren = 0,
            Wen = 1,
            Een = 2,
        ],
    ],
];

register_structs! {
    pub NvmcRegisters {
        (0x000 => _reserved0),
        (0x400 => pub ready: ReadOnly<u32, Ready::Register>),
        (0x404 => _reserved1),
        (0x504 => pub config: ReadWrite<u32, Config::Register>),
        (0x508 => @END),
    }
}

pub struct UicrOtp {
    registers: StaticRef<NvmcRegisters>,
    memory_map: BlStorageMemoryMap,
}

impl UicrOtp {
    pub const fn new(
        registers: StaticRef<NvmcRegisters>,
        memory_map: BlStorageMemoryMap,
    ) -> Self {
        UicrOtp {
            registers,
            memory_map,
        }
    }

    fn wait_ready(&self) {
        while !self.registers.ready.is_set(Ready::READY) {}
    }

    /// Only aligned accesses inside the provisioning region reach the bus.
    fn check_access(&self, address: u32, len: u32) -> BlStorageResult<()> {
        if address % len != 0 || !self.memory_map.contains(address, len) {
            romtime::println!("[bl-rom] Rejected UICR access at {}", HexWord(address));
            return Err(BlStorageError::Memory(address));
        }
        Ok(())
    }
}

impl OtpStorage for UicrOtp {
    fn read_word(&self, address: u32) -> BlStorageResult<u32> {
        self.check_access(address, 4)?;
        // SAFETY: the address is aligned and lies inside the provisioning
        // region, and UICR is always mapped.
        Ok(unsafe { core::ptr::read_volatile(address as usize as *const u32) })
    }

    fn read_halfword(&self, address: u32) -> BlStorageResult<u16> {
        self.check_access(address, 2)?;
        // SAFETY: see read_word.
        Ok(unsafe { core::ptr::read_volatile(address as usize as *const u16) })
    }

    fn write_word(&mut self, address: u32, value: u32) -> BlStorageResult<()> {
        self.check_access(address, 4)?;
        self.wait_ready();
        self.registers.config.write(Config::WEN::Wen);
        self.wait_ready();
        // SAFETY: see read_word. The NVMC is in write mode.
        unsafe { core::ptr::write_volatile(address as usize as *mut u32, value) };
        self.wait_ready();
        self.registers.config.write(Config::WEN::Ren);
        self.wait_ready();
        Ok(())
    }
}
