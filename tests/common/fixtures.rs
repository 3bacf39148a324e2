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

//! Test fixtures for common scenarios

use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;

use corepsx::core::bios::BIOS_SIZE;
use corepsx::core::host::HostInterface;
use corepsx::core::settings::{ConsoleRegion, Settings};
use corepsx::core::system::System;

/// Host with a blank BIOS image for every region
pub struct TestHost {
    settings: Settings,
}

impl TestHost {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
        }
    }

    #[allow(dead_code)]
    pub fn with_settings(settings: Settings) -> Self {
        Self { settings }
    }
}

impl HostInterface for TestHost {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn bios_image(&self, _region: ConsoleRegion) -> Option<Vec<u8>> {
        Some(vec![0u8; BIOS_SIZE])
    }
}

/// Create a system booted into the BIOS shell
#[allow(dead_code)]
pub fn create_booted_system() -> System {
    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    system.boot(None).unwrap();
    system
}

/// Create a system booted with specific settings
#[allow(dead_code)]
pub fn create_booted_system_with_settings(settings: Settings) -> System {
    let mut system = System::new(Rc::new(TestHost::with_settings(settings))).unwrap();
    system.boot(None).unwrap();
    system
}

/// Write a single-track cue/bin pair and return the cue path
#[allow(dead_code)]
pub fn write_cue_bin(dir: &TempDir, sectors: usize) -> PathBuf {
    const RAW_SECTOR_SIZE: usize = 2352;

    let bin_path = dir.path().join("game.bin");
    let mut data = vec![0u8; sectors * RAW_SECTOR_SIZE];
    for (i, sector) in data.chunks_mut(RAW_SECTOR_SIZE).enumerate() {
        sector.fill(i as u8);
    }
    std::fs::write(&bin_path, data).unwrap();

    let cue_path = dir.path().join("game.cue");
    std::fs::write(
        &cue_path,
        "FILE \"game.bin\" BINARY\n  TRACK 01 MODE2/2352\n    INDEX 01 00:00:00\n",
    )
    .unwrap();
    cue_path
}
