// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Memory bus
//!
//! The bus owns main RAM, the BIOS ROM image handed over at boot, and an
//! optional expansion ROM buffer whose ownership is transferred in. Word
//! access is used by the executable side-load path; the CPU shell routes its
//! memory traffic through the same interface.

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::{EmulatorError, Result, StateError};
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::TickCount;

/// Serialized bus state
///
/// The BIOS and expansion ROM are immutable after boot and are re-supplied by
/// the boot path, so only RAM rides in the save-state stream.
#[derive(Encode, Decode)]
pub struct BusState {
    ram: Vec<u8>,
}

/// Memory region identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Main RAM (2MB)
    Ram,
    /// Expansion Region 1 (optional parallel-port ROM)
    Expansion,
    /// BIOS ROM
    Bios,
    /// Unmapped region
    Unmapped,
}

/// Memory bus managing RAM, BIOS, and the expansion ROM
///
/// # Example
///
/// ```
/// use corepsx::core::memory::Bus;
///
/// let mut bus = Bus::new();
/// bus.write_word(0x8000_1000, 0xDEAD_BEEF).unwrap();
/// assert_eq!(bus.read_word(0x8000_1000).unwrap(), 0xDEAD_BEEF);
/// ```
pub struct Bus {
    /// Main RAM (2MB), physical 0x00000000-0x001FFFFF
    ram: Vec<u8>,

    /// BIOS ROM (512KB), physical 0x1FC00000-0x1FC7FFFF
    bios: Vec<u8>,

    /// Expansion ROM, physical 0x1F000000 onward; empty when nothing mapped
    expansion_rom: Vec<u8>,
}

impl Bus {
    /// RAM size (2MB)
    pub const RAM_SIZE: usize = 2 * 1024 * 1024;

    /// BIOS size (512KB)
    pub const BIOS_SIZE: usize = 512 * 1024;

    const RAM_START: u32 = 0x0000_0000;
    const RAM_END: u32 = 0x001F_FFFF;

    const EXP1_START: u32 = 0x1F00_0000;
    const EXP1_END: u32 = 0x1F7F_FFFF;

    const BIOS_START: u32 = 0x1FC0_0000;
    const BIOS_END: u32 = 0x1FC7_FFFF;

    /// Create a new bus with zeroed RAM and an empty BIOS
    pub fn new() -> Self {
        Self {
            ram: vec![0u8; Self::RAM_SIZE],
            bios: vec![0u8; Self::BIOS_SIZE],
            expansion_rom: Vec::new(),
        }
    }

    /// Hand the (patched) BIOS image over to the bus
    ///
    /// # Errors
    ///
    /// Returns an error if the image is not exactly [`Self::BIOS_SIZE`] bytes.
    pub fn set_bios(&mut self, image: Vec<u8>) -> Result<()> {
        if image.len() != Self::BIOS_SIZE {
            return Err(EmulatorError::InvalidBiosSize {
                expected: Self::BIOS_SIZE,
                got: image.len(),
            });
        }
        self.bios = image;
        Ok(())
    }

    /// Take ownership of an expansion ROM buffer
    pub fn set_expansion_rom(&mut self, data: Vec<u8>) {
        log::info!("Mapped expansion ROM: {} bytes", data.len());
        self.expansion_rom = data;
    }

    /// true when an expansion ROM is mapped
    pub fn has_expansion_rom(&self) -> bool {
        !self.expansion_rom.is_empty()
    }

    /// Strip the KSEG segment bits from a virtual address
    ///
    /// KUSEG, KSEG0 and KSEG1 all mirror the same physical address space.
    fn translate_address(vaddr: u32) -> u32 {
        match vaddr >> 29 {
            // KUSEG (0x00000000-0x7FFFFFFF)
            0..=3 => vaddr,
            // KSEG0 (0x80000000-0x9FFFFFFF)
            4 => vaddr & 0x1FFF_FFFF,
            // KSEG1 (0xA0000000-0xBFFFFFFF)
            5 => vaddr & 0x1FFF_FFFF,
            // KSEG2 (0xC0000000-0xFFFFFFFF), not mapped by this bus
            _ => vaddr,
        }
    }

    /// Identify the memory region a virtual address falls into
    pub fn identify_region(&self, vaddr: u32) -> MemoryRegion {
        let paddr = Self::translate_address(vaddr);

        if (Self::RAM_START..=Self::RAM_END).contains(&paddr) {
            MemoryRegion::Ram
        } else if (Self::EXP1_START..=Self::EXP1_END).contains(&paddr) {
            MemoryRegion::Expansion
        } else if (Self::BIOS_START..=Self::BIOS_END).contains(&paddr) {
            MemoryRegion::Bios
        } else {
            MemoryRegion::Unmapped
        }
    }

    /// Read a 32-bit word
    ///
    /// # Errors
    ///
    /// Returns an error on unaligned or unmapped access.
    pub fn read_word(&self, vaddr: u32) -> Result<u32> {
        if vaddr % 4 != 0 {
            return Err(EmulatorError::UnalignedAccess {
                address: vaddr,
                size: 4,
            });
        }

        let paddr = Self::translate_address(vaddr);
        match self.identify_region(vaddr) {
            MemoryRegion::Ram => {
                let offset = paddr as usize;
                Ok(read_le_word(&self.ram, offset))
            }
            MemoryRegion::Bios => {
                let offset = (paddr - Self::BIOS_START) as usize;
                Ok(read_le_word(&self.bios, offset))
            }
            MemoryRegion::Expansion => {
                let offset = (paddr - Self::EXP1_START) as usize;
                if offset + 4 <= self.expansion_rom.len() {
                    Ok(read_le_word(&self.expansion_rom, offset))
                } else {
                    // Open bus; unmapped expansion reads float high
                    Ok(0xFFFF_FFFF)
                }
            }
            MemoryRegion::Unmapped => Err(EmulatorError::InvalidMemoryAccess { address: vaddr }),
        }
    }

    /// Write a 32-bit word
    ///
    /// ROM regions ignore writes; the side-load path only targets RAM.
    ///
    /// # Errors
    ///
    /// Returns an error on unaligned or unmapped access.
    pub fn write_word(&mut self, vaddr: u32, value: u32) -> Result<()> {
        if vaddr % 4 != 0 {
            return Err(EmulatorError::UnalignedAccess {
                address: vaddr,
                size: 4,
            });
        }

        let paddr = Self::translate_address(vaddr);
        match self.identify_region(vaddr) {
            MemoryRegion::Ram => {
                let offset = paddr as usize;
                self.ram[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
                Ok(())
            }
            MemoryRegion::Bios | MemoryRegion::Expansion => {
                log::trace!("Ignored write to ROM at 0x{vaddr:08X}");
                Ok(())
            }
            MemoryRegion::Unmapped => Err(EmulatorError::InvalidMemoryAccess { address: vaddr }),
        }
    }
}

fn read_le_word(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Bus {
    type State = BusState;

    fn to_state(&self) -> Self::State {
        BusState {
            ram: self.ram.clone(),
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.ram = state.ram.clone();
    }
}

impl Component for Bus {
    fn reset(&mut self) {
        // RAM contents survive a reset, as on real hardware; the kernel
        // scrubs what it needs. A side-loaded program placed in RAM before
        // the boot-concluding reset relies on this.
    }

    fn execute(&mut self, _ticks: TickCount) {
        // The bus has no time-dependent behavior.
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> std::result::Result<(), StateError> {
        do_state_payload(self, sw)
    }
}
