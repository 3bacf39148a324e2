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

//! PlayStation 1 system orchestration core
//!
//! This library composes independently emulated hardware units (CPU, bus,
//! DMA, interrupt controller, GPU, CD-ROM, pad, timers, SPU, MDEC) into one
//! coherent virtual machine with deterministic timing and full-state
//! snapshot/restore. It also provides the disc image abstraction the CD-ROM
//! drive reads through, including a memory-preloaded variant with subchannel
//! repair.
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use corepsx::core::host::HostInterface;
//! use corepsx::core::system::System;
//!
//! # struct MyHost;
//! # impl HostInterface for MyHost {
//! #     fn settings(&self) -> &corepsx::core::settings::Settings { unimplemented!() }
//! #     fn bios_image(&self, _: corepsx::core::settings::ConsoleRegion) -> Option<Vec<u8>> { None }
//! # }
//! let host = Rc::new(MyHost);
//! let mut system = System::new(host).unwrap();
//! system.boot(Some("game.cue")).unwrap();
//! system.run_frame().unwrap();
//! ```

pub mod core;
