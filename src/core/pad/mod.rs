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

//! Pad (controller and memory card ports)
//!
//! The pad owns the two memory card slots and the serial transfer timing
//! toward controllers and cards. Button/analog protocol handling is the
//! input core's concern; the shell paces transfers and raises the
//! controller interrupt when one completes.

pub mod memcard;

use std::cell::RefCell;
use std::rc::Rc;

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::StateError;
use super::interrupt::{interrupts, InterruptController};
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::TickCount;

pub use self::memcard::MemoryCard;

/// Number of controller/memory card slots
pub const NUM_SLOTS: usize = 2;

/// Serialized pad state
///
/// Card images live on disk and are re-attached by configuration, so only
/// the transfer timing rides in the save-state stream.
#[derive(Encode, Decode)]
pub struct PadState {
    transfer_remaining: Option<TickCount>,
    transfers_completed: u32,
}

/// Pad (controller/memory card interface)
pub struct Pad {
    /// Interrupt controller handle, wired during initialization
    interrupt_controller: Option<Rc<RefCell<InterruptController>>>,

    /// Memory cards by slot; `None` is an empty slot
    memory_cards: [Option<MemoryCard>; NUM_SLOTS],

    /// Ticks until the in-flight transfer completes
    transfer_remaining: Option<TickCount>,

    /// Transfers completed since reset
    transfers_completed: u32,
}

impl Pad {
    /// Create a new pad with empty slots
    pub fn new() -> Self {
        Self {
            interrupt_controller: None,
            memory_cards: [None, None],
            transfer_remaining: None,
            transfers_completed: 0,
        }
    }

    /// Wire the interrupt controller
    pub fn initialize(&mut self, interrupt_controller: Rc<RefCell<InterruptController>>) {
        self.interrupt_controller = Some(interrupt_controller);
    }

    /// Attach or detach the memory card in a slot
    pub fn set_memory_card(&mut self, slot: usize, card: Option<MemoryCard>) {
        match &card {
            Some(card) => log::info!(
                "Memory card '{}' attached to slot {}",
                card.path().display(),
                slot
            ),
            None => log::debug!("Memory card slot {slot} detached"),
        }
        self.memory_cards[slot] = card;
    }

    /// Card currently in a slot
    pub fn memory_card(&self, slot: usize) -> Option<&MemoryCard> {
        self.memory_cards[slot].as_ref()
    }

    /// Begin a serial transfer completing after `ticks`
    pub fn start_transfer(&mut self, ticks: TickCount) {
        self.transfer_remaining = Some(ticks.max(1));
    }

    /// true while a transfer is in flight
    pub fn is_transfer_active(&self) -> bool {
        self.transfer_remaining.is_some()
    }
}

impl Default for Pad {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Pad {
    type State = PadState;

    fn to_state(&self) -> Self::State {
        PadState {
            transfer_remaining: self.transfer_remaining,
            transfers_completed: self.transfers_completed,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.transfer_remaining = state.transfer_remaining;
        self.transfers_completed = state.transfers_completed;
    }
}

impl Component for Pad {
    fn reset(&mut self) {
        // Cards stay attached across a reset, as on real hardware.
        self.transfer_remaining = None;
        self.transfers_completed = 0;
    }

    fn execute(&mut self, ticks: TickCount) {
        if let Some(left) = &mut self.transfer_remaining {
            *left -= ticks;
            if *left <= 0 {
                self.transfer_remaining = None;
                self.transfers_completed += 1;
                if let Some(ic) = &self.interrupt_controller {
                    ic.borrow_mut().request(interrupts::CONTROLLER);
                }
            }
        }
    }

    fn ticks_until_event(&self) -> TickCount {
        self.transfer_remaining.unwrap_or(TickCount::MAX)
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}
