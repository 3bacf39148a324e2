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

//! Shared timing units
//!
//! All component timing is expressed in CPU master-clock cycles ("ticks").
//! The system orchestrator maintains one global tick counter; the CPU
//! accumulates pending ticks between synchronize passes and every other
//! component consumes the identical tick quantum during the fan-out.

/// Tick count type (relative time in CPU cycles)
pub type TickCount = i32;

/// Global tick counter type (absolute time in CPU cycles since reset)
pub type GlobalTicks = u64;

/// Master clock of the console in Hz (~33.8688 MHz)
pub const MASTER_CLOCK: u32 = 33_868_800;

/// Ticks per frame for NTSC consoles (60 Hz video)
pub const NTSC_TICKS_PER_FRAME: TickCount = (MASTER_CLOCK / 60) as TickCount;

/// Ticks per frame for PAL consoles (50 Hz video)
pub const PAL_TICKS_PER_FRAME: TickCount = (MASTER_CLOCK / 50) as TickCount;

/// Disc sectors pass under the laser 75 times per second at single speed
pub const TICKS_PER_SECTOR_SINGLE_SPEED: TickCount = (MASTER_CLOCK / 75) as TickCount;

/// Ticks per generated audio sample (44.1 kHz)
pub const TICKS_PER_SPU_SAMPLE: TickCount = (MASTER_CLOCK / 44_100) as TickCount;
