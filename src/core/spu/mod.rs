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

//! SPU timing shell
//!
//! Audio synthesis and mixing are out of scope; the SPU here only runs the
//! 44.1 kHz sample clock off the shared tick quantum so sample-accurate
//! deadlines stay deterministic across save/load.

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::StateError;
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::{TickCount, TICKS_PER_SPU_SAMPLE};

/// Serialized SPU state
#[derive(Encode, Decode)]
pub struct SpuState {
    sample_counter: u64,
    tick_accumulator: TickCount,
}

/// SPU (Sound Processing Unit)
pub struct Spu {
    /// Samples generated since reset
    sample_counter: u64,

    /// Ticks carried over toward the next sample
    tick_accumulator: TickCount,
}

impl Spu {
    /// Create a new SPU
    pub fn new() -> Self {
        Self {
            sample_counter: 0,
            tick_accumulator: 0,
        }
    }

    /// Samples generated since reset
    pub fn sample_counter(&self) -> u64 {
        self.sample_counter
    }
}

impl Default for Spu {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Spu {
    type State = SpuState;

    fn to_state(&self) -> Self::State {
        SpuState {
            sample_counter: self.sample_counter,
            tick_accumulator: self.tick_accumulator,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.sample_counter = state.sample_counter;
        self.tick_accumulator = state.tick_accumulator;
    }
}

impl Component for Spu {
    fn reset(&mut self) {
        self.sample_counter = 0;
        self.tick_accumulator = 0;
    }

    fn execute(&mut self, ticks: TickCount) {
        self.tick_accumulator += ticks;
        self.sample_counter += (self.tick_accumulator / TICKS_PER_SPU_SAMPLE) as u64;
        self.tick_accumulator %= TICKS_PER_SPU_SAMPLE;
    }

    fn ticks_until_event(&self) -> TickCount {
        TICKS_PER_SPU_SAMPLE - self.tick_accumulator
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}
