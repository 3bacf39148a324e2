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

//! Common hardware component capability surface
//!
//! Every scheduled hardware unit satisfies the same small contract: it can be
//! reset, it can consume a tick quantum, it can report how many ticks remain
//! until its next deadline, and it can serialize its state into the shared
//! save-state stream. The orchestrator drives components exclusively through
//! this surface during the synchronize fan-out.

use super::error::StateError;
use super::state::StateWrapper;
use super::timing::TickCount;

/// Capability set shared by all scheduled hardware components
pub trait Component {
    /// Reset the component to its power-on state.
    ///
    /// Components are reset, never recreated, across a system reset.
    fn reset(&mut self);

    /// Consume one tick quantum.
    ///
    /// Called once per synchronize pass with the exact number of ticks the
    /// CPU accumulated since the previous pass. Components later in the
    /// fan-out order may assume earlier components already observed the same
    /// quantum.
    fn execute(&mut self, ticks: TickCount);

    /// Ticks until this component next needs attention.
    ///
    /// The orchestrator uses the minimum across all components to bound the
    /// next CPU burst. Components with no pending deadline return
    /// `TickCount::MAX`.
    fn ticks_until_event(&self) -> TickCount {
        TickCount::MAX
    }

    /// Serialize or restore this component's state section payload.
    ///
    /// The surrounding section marker is written by the orchestrator; the
    /// component only encodes its own payload.
    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError>;
}
