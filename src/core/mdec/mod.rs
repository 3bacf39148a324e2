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

//! MDEC (motion decoder) timing shell
//!
//! Macroblock decoding is out of scope; the shell tracks the countdown of a
//! pending decode command so DMA pacing around the decoder stays accurate.

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::StateError;
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::TickCount;

/// Serialized MDEC state
#[derive(Encode, Decode)]
pub struct MdecState {
    remaining: Option<TickCount>,
    commands_completed: u32,
}

/// MDEC (motion decoder)
pub struct Mdec {
    /// Ticks until the pending command completes; `None` when idle
    remaining: Option<TickCount>,

    /// Commands completed since reset
    commands_completed: u32,
}

impl Mdec {
    /// Create a new MDEC
    pub fn new() -> Self {
        Self {
            remaining: None,
            commands_completed: 0,
        }
    }

    /// Begin a decode command completing after `ticks`
    pub fn start_command(&mut self, ticks: TickCount) {
        log::debug!("MDEC command started, {ticks} ticks");
        self.remaining = Some(ticks.max(1));
    }

    /// true while a command is in flight
    pub fn is_busy(&self) -> bool {
        self.remaining.is_some()
    }

    /// Commands completed since reset
    pub fn commands_completed(&self) -> u32 {
        self.commands_completed
    }
}

impl Default for Mdec {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Mdec {
    type State = MdecState;

    fn to_state(&self) -> Self::State {
        MdecState {
            remaining: self.remaining,
            commands_completed: self.commands_completed,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.remaining = state.remaining;
        self.commands_completed = state.commands_completed;
    }
}

impl Component for Mdec {
    fn reset(&mut self) {
        self.remaining = None;
        self.commands_completed = 0;
    }

    fn execute(&mut self, ticks: TickCount) {
        if let Some(left) = &mut self.remaining {
            *left -= ticks;
            if *left <= 0 {
                self.remaining = None;
                self.commands_completed += 1;
                log::trace!("MDEC command complete ({} total)", self.commands_completed);
            }
        }
    }

    fn ticks_until_event(&self) -> TickCount {
        self.remaining.unwrap_or(TickCount::MAX)
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_countdown() {
        let mut mdec = Mdec::new();
        mdec.start_command(100);
        assert!(mdec.is_busy());

        mdec.execute(60);
        assert!(mdec.is_busy());

        mdec.execute(40);
        assert!(!mdec.is_busy());
        assert_eq!(mdec.commands_completed(), 1);
    }

    #[test]
    fn test_idle_execution_is_noop() {
        let mut mdec = Mdec::new();
        mdec.execute(10_000);
        assert!(!mdec.is_busy());
        assert_eq!(mdec.commands_completed(), 0);
    }

    #[test]
    fn test_reset_aborts_pending_command() {
        let mut mdec = Mdec::new();
        mdec.start_command(500);
        mdec.reset();
        assert!(!mdec.is_busy());
        assert_eq!(mdec.ticks_until_event(), TickCount::MAX);
    }

    #[test]
    fn test_state_round_trip() {
        let mut mdec = Mdec::new();
        mdec.start_command(300);
        mdec.execute(100);

        let mut sw = StateWrapper::for_write();
        mdec.do_state(&mut sw).unwrap();

        let mut restored = Mdec::new();
        let mut sr = StateWrapper::for_read(sw.into_inner());
        restored.do_state(&mut sr).unwrap();

        assert!(restored.is_busy());
        assert_eq!(restored.ticks_until_event(), 200);
    }
}
