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

//! DMA controller
//!
//! Seven channels move data between RAM and the peripherals. The shell
//! tracks per-channel transfer countdowns in ticks; when a countdown expires
//! the channel completes and the DMA interrupt is raised. Word-level data
//! movement belongs to the peripheral cores and is out of scope here.

use std::cell::RefCell;
use std::rc::Rc;

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::StateError;
use super::interrupt::{interrupts, InterruptController};
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::TickCount;

/// Number of DMA channels
pub const NUM_CHANNELS: usize = 7;

/// DMA channel assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Channel {
    /// Channel 0: MDEC input
    MdecIn = 0,
    /// Channel 1: MDEC output
    MdecOut = 1,
    /// Channel 2: GPU
    Gpu = 2,
    /// Channel 3: CD-ROM
    Cdrom = 3,
    /// Channel 4: SPU
    Spu = 4,
    /// Channel 5: Expansion port
    Pio = 5,
    /// Channel 6: Ordering table clear
    Otc = 6,
}

/// Serialized DMA state
#[derive(Encode, Decode)]
pub struct DmaState {
    remaining: [Option<TickCount>; NUM_CHANNELS],
    completed: u32,
}

/// DMA controller
///
/// # Example
///
/// ```
/// use corepsx::core::dma::{Channel, Dma};
///
/// let mut dma = Dma::new();
/// dma.start_transfer(Channel::Gpu, 500);
/// assert!(dma.is_transfer_active(Channel::Gpu));
/// ```
pub struct Dma {
    /// Interrupt controller handle, wired during initialization
    interrupt_controller: Option<Rc<RefCell<InterruptController>>>,

    /// Ticks remaining per channel; `None` when idle
    remaining: [Option<TickCount>; NUM_CHANNELS],

    /// Transfers completed since reset
    completed: u32,
}

impl Dma {
    /// Create a new DMA controller with all channels idle
    pub fn new() -> Self {
        Self {
            interrupt_controller: None,
            remaining: [None; NUM_CHANNELS],
            completed: 0,
        }
    }

    /// Wire the interrupt controller
    pub fn initialize(&mut self, interrupt_controller: Rc<RefCell<InterruptController>>) {
        self.interrupt_controller = Some(interrupt_controller);
    }

    /// Begin a transfer on a channel, completing after `ticks`
    pub fn start_transfer(&mut self, channel: Channel, ticks: TickCount) {
        log::debug!("DMA{} transfer started, {} ticks", channel as usize, ticks);
        self.remaining[channel as usize] = Some(ticks.max(1));
    }

    /// true while the channel has a transfer in flight
    pub fn is_transfer_active(&self, channel: Channel) -> bool {
        self.remaining[channel as usize].is_some()
    }

    /// Transfers completed since reset
    pub fn completed_transfers(&self) -> u32 {
        self.completed
    }
}

impl Default for Dma {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Dma {
    type State = DmaState;

    fn to_state(&self) -> Self::State {
        DmaState {
            remaining: self.remaining,
            completed: self.completed,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.remaining = state.remaining;
        self.completed = state.completed;
    }
}

impl Component for Dma {
    fn reset(&mut self) {
        self.remaining = [None; NUM_CHANNELS];
        self.completed = 0;
    }

    fn execute(&mut self, ticks: TickCount) {
        let mut finished = false;
        for slot in self.remaining.iter_mut() {
            if let Some(left) = slot {
                *left -= ticks;
                if *left <= 0 {
                    *slot = None;
                    self.completed += 1;
                    finished = true;
                }
            }
        }

        if finished {
            log::trace!("DMA transfer complete ({} total)", self.completed);
            if let Some(ic) = &self.interrupt_controller {
                ic.borrow_mut().request(interrupts::DMA);
            }
        }
    }

    fn ticks_until_event(&self) -> TickCount {
        self.remaining
            .iter()
            .flatten()
            .copied()
            .min()
            .unwrap_or(TickCount::MAX)
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}
