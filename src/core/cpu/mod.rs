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

//! CPU execution shell
//!
//! The core runs in bursts bounded by a downcount. Each burst accumulates
//! pending ticks; the orchestrator drains the pending-tick counter during a
//! synchronize pass and fans the same quantum out to every other component.
//! Instruction decode and execution semantics live outside this crate; the
//! shell owns only the tick budget and the memory access path the executable
//! side-load uses.

use std::cell::RefCell;
use std::rc::Rc;

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::{EmulatorError, Result, StateError};
use super::memory::Bus;
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::{GlobalTicks, TickCount};

/// Reset value of the program counter (BIOS entry point)
pub const RESET_PC: u32 = 0xBFC0_0000;

/// Burst length used when no component has a nearer deadline
pub const DEFAULT_SLICE: TickCount = 128;

/// Serialized CPU state
#[derive(Encode, Decode)]
pub struct CoreState {
    pc: u32,
    pending_ticks: TickCount,
    downcount: TickCount,
    executed_ticks: GlobalTicks,
}

/// CPU core
///
/// Owns the pending-tick/downcount budget that drives system-wide timing.
///
/// # Example
///
/// ```
/// use corepsx::core::cpu::Core;
///
/// let mut cpu = Core::new();
/// cpu.execute();
/// assert!(cpu.pending_ticks() > 0);
/// cpu.reset_pending_ticks();
/// assert_eq!(cpu.pending_ticks(), 0);
/// ```
pub struct Core {
    /// Memory bus, wired during component initialization
    bus: Option<Rc<RefCell<Bus>>>,

    /// Program counter
    pc: u32,

    /// Ticks accumulated since the last synchronize pass
    pending_ticks: TickCount,

    /// Ticks remaining in the current burst
    downcount: TickCount,

    /// Total ticks executed since reset
    executed_ticks: GlobalTicks,
}

impl Core {
    /// Create a new CPU core
    pub fn new() -> Self {
        Self {
            bus: None,
            pc: RESET_PC,
            pending_ticks: 0,
            downcount: DEFAULT_SLICE,
            executed_ticks: 0,
        }
    }

    /// Wire the memory bus
    ///
    /// Called once during component initialization.
    pub fn initialize(&mut self, bus: Rc<RefCell<Bus>>) {
        self.bus = Some(bus);
    }

    /// Execute one burst
    ///
    /// Burns the current downcount worth of cycles and accumulates them as
    /// pending ticks for the next synchronize pass.
    pub fn execute(&mut self) {
        let burst = self.downcount.max(1);
        self.pending_ticks += burst;
        self.executed_ticks += burst as GlobalTicks;
    }

    /// Current program counter
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Ticks accumulated since the last synchronize pass
    pub fn pending_ticks(&self) -> TickCount {
        self.pending_ticks
    }

    /// Total ticks executed since reset
    pub fn executed_ticks(&self) -> GlobalTicks {
        self.executed_ticks
    }

    /// Account extra ticks against the current burst (DMA/MDEC stalls)
    pub fn add_pending_ticks(&mut self, ticks: TickCount) {
        self.pending_ticks += ticks;
        self.executed_ticks += ticks as GlobalTicks;
    }

    /// Clear the pending-tick counter
    ///
    /// This is the commit point of a synchronize pass.
    pub fn reset_pending_ticks(&mut self) {
        self.pending_ticks = 0;
    }

    /// Current downcount
    pub fn downcount(&self) -> TickCount {
        self.downcount
    }

    /// Bound the next burst to the nearest component deadline
    ///
    /// A burst always makes progress, so the downcount never drops below
    /// one tick.
    pub fn set_downcount(&mut self, downcount: TickCount) {
        self.downcount = downcount.max(1);
    }

    /// Restore the default burst length
    pub fn reset_downcount(&mut self) {
        self.downcount = DEFAULT_SLICE;
    }

    /// Write one word to emulated memory, bypassing timing
    ///
    /// Used by the executable side-load path to fill RAM before execution
    /// starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus is not wired yet or the address is
    /// invalid.
    pub fn safe_write_memory_word(&mut self, address: u32, value: u32) -> Result<()> {
        let bus = self
            .bus
            .as_ref()
            .ok_or_else(|| EmulatorError::InvalidState("CPU bus not initialized".to_string()))?;
        bus.borrow_mut().write_word(address, value)
    }

    /// Read one word from emulated memory, bypassing timing
    ///
    /// # Errors
    ///
    /// Returns an error if the bus is not wired yet or the address is
    /// invalid.
    pub fn safe_read_memory_word(&self, address: u32) -> Result<u32> {
        let bus = self
            .bus
            .as_ref()
            .ok_or_else(|| EmulatorError::InvalidState("CPU bus not initialized".to_string()))?;
        bus.borrow().read_word(address)
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Core {
    type State = CoreState;

    fn to_state(&self) -> Self::State {
        CoreState {
            pc: self.pc,
            pending_ticks: self.pending_ticks,
            downcount: self.downcount,
            executed_ticks: self.executed_ticks,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.pc = state.pc;
        self.pending_ticks = state.pending_ticks;
        self.downcount = state.downcount;
        self.executed_ticks = state.executed_ticks;
    }
}

impl Component for Core {
    fn reset(&mut self) {
        self.pc = RESET_PC;
        self.pending_ticks = 0;
        self.downcount = DEFAULT_SLICE;
        self.executed_ticks = 0;
    }

    fn execute(&mut self, ticks: TickCount) {
        // Ticks fed from outside stall the CPU for that long.
        self.add_pending_ticks(ticks);
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> std::result::Result<(), StateError> {
        do_state_payload(self, sw)
    }
}
