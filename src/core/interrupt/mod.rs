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

//! Interrupt controller
//!
//! The interrupt controller collects requests from all hardware components
//! and signals the CPU when an unmasked interrupt is pending.
//!
//! ## Registers
//!
//! - **I_STAT** (0x1F801070): Interrupt status register (R/W)
//! - **I_MASK** (0x1F801074): Interrupt mask register (R/W)
//!
//! ## Interrupt Sources (Bit Positions)
//!
//! ```text
//! Bit  | Source        | Description
//! -----|---------------|----------------------------------
//! 0    | VBLANK        | Vertical blank interrupt
//! 1    | GPU           | GPU command/transfer complete
//! 2    | CDROM         | CD-ROM controller
//! 3    | DMA           | DMA transfer complete
//! 4    | TIMER0        | Timer 0 interrupt
//! 5    | TIMER1        | Timer 1 interrupt
//! 6    | TIMER2        | Timer 2 interrupt
//! 7    | CONTROLLER    | Controller/memory card
//! 8    | SIO           | Serial I/O
//! 9    | SPU           | Sound processing unit
//! 10   | LIGHTPEN      | Lightpen/IRQ10 (PIO)
//! 11-15| -             | Not used
//! ```

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::StateError;
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::TickCount;

/// Interrupt source bit flags
///
/// Bit positions in I_STAT and I_MASK for each interrupt source.
pub mod interrupts {
    /// Vertical blank interrupt (bit 0)
    pub const VBLANK: u16 = 1 << 0;

    /// GPU command/transfer complete interrupt (bit 1)
    pub const GPU: u16 = 1 << 1;

    /// CD-ROM controller interrupt (bit 2)
    pub const CDROM: u16 = 1 << 2;

    /// DMA transfer complete interrupt (bit 3)
    pub const DMA: u16 = 1 << 3;

    /// Timer 0 interrupt (bit 4)
    pub const TIMER0: u16 = 1 << 4;

    /// Timer 1 interrupt (bit 5)
    pub const TIMER1: u16 = 1 << 5;

    /// Timer 2 interrupt (bit 6)
    pub const TIMER2: u16 = 1 << 6;

    /// Controller/memory card interrupt (bit 7)
    pub const CONTROLLER: u16 = 1 << 7;

    /// Serial I/O interrupt (bit 8)
    pub const SIO: u16 = 1 << 8;

    /// Sound processing unit interrupt (bit 9)
    pub const SPU: u16 = 1 << 9;

    /// Lightpen/IRQ10 (PIO) interrupt (bit 10)
    pub const LIGHTPEN: u16 = 1 << 10;
}

/// Serialized interrupt controller state
#[derive(Encode, Decode)]
pub struct InterruptControllerState {
    status: u16,
    mask: u16,
}

/// PlayStation interrupt controller
///
/// # Example
///
/// ```
/// use corepsx::core::interrupt::{interrupts, InterruptController};
///
/// let mut ic = InterruptController::new();
/// ic.request(interrupts::VBLANK);
/// ic.write_mask(interrupts::VBLANK as u32);
/// assert!(ic.is_pending());
///
/// // Acknowledge by writing 1 to the bit to clear
/// ic.write_status(interrupts::VBLANK as u32);
/// assert!(!ic.is_pending());
/// ```
pub struct InterruptController {
    /// I_STAT - pending interrupt flags; writing 1 to a bit acknowledges it
    status: u16,

    /// I_MASK - 1 = interrupt enabled, 0 = masked
    mask: u16,
}

impl InterruptController {
    /// Create a new interrupt controller with all interrupts cleared and masked
    pub fn new() -> Self {
        Self { status: 0, mask: 0 }
    }

    /// Request an interrupt
    ///
    /// Sets the specified interrupt bit(s) in the status register. Called by
    /// hardware components when they need to signal the CPU.
    pub fn request(&mut self, interrupt: u16) {
        self.status |= interrupt;
        log::trace!(
            "IRQ requested: 0x{:04X}, status=0x{:04X}",
            interrupt,
            self.status
        );
    }

    /// Acknowledge interrupts (write 1 to clear bits)
    pub fn acknowledge(&mut self, value: u16) {
        self.status &= !value;
        log::trace!("IRQ acknowledged, status=0x{:04X}", self.status);
    }

    /// true if any unmasked interrupt is currently active
    pub fn is_pending(&self) -> bool {
        (self.status & self.mask) != 0
    }

    /// Read I_STAT
    pub fn read_status(&self) -> u32 {
        self.status as u32
    }

    /// Write I_STAT (acknowledge; 1 bits clear the corresponding interrupts)
    pub fn write_status(&mut self, value: u32) {
        self.acknowledge(value as u16);
    }

    /// Read I_MASK
    pub fn read_mask(&self) -> u32 {
        self.mask as u32
    }

    /// Write I_MASK
    pub fn write_mask(&mut self, value: u32) {
        self.mask = value as u16;
        log::debug!("IRQ mask set: 0x{:04X}", self.mask);
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for InterruptController {
    type State = InterruptControllerState;

    fn to_state(&self) -> Self::State {
        InterruptControllerState {
            status: self.status,
            mask: self.mask,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.status = state.status;
        self.mask = state.mask;
    }
}

impl Component for InterruptController {
    fn reset(&mut self) {
        self.status = 0;
        self.mask = 0;
    }

    fn execute(&mut self, _ticks: TickCount) {
        // The controller is purely reactive; it consumes no ticks.
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}
