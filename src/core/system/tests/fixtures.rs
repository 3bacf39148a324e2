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

//! Host and media fixtures for orchestrator tests

use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;

use super::super::super::bios::BIOS_SIZE;
use super::super::super::cdrom::disc::RAW_SECTOR_SIZE;
use super::super::super::exe;
use super::super::super::host::HostInterface;
use super::super::super::settings::{ConsoleRegion, Settings};
use super::super::System;

/// Host supplying a 0xFF-filled BIOS so in-memory patches are observable
pub struct TestHost {
    settings: Settings,
    bios: Option<Vec<u8>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            bios: Some(vec![0xFF; BIOS_SIZE]),
        }
    }

    pub fn without_bios() -> Self {
        Self {
            settings: Settings::default(),
            bios: None,
        }
    }
}

impl HostInterface for TestHost {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn bios_image(&self, _region: ConsoleRegion) -> Option<Vec<u8>> {
        self.bios.clone()
    }
}

/// A system booted into the BIOS shell with default settings
pub fn boot_default() -> System {
    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    system.boot(None).unwrap();
    system
}

/// A system booted with specific settings
pub fn boot_with_settings(settings: Settings) -> System {
    let mut system = System::new(Rc::new(TestHost::with_settings(settings))).unwrap();
    system.boot(None).unwrap();
    system
}

/// Write a single-track cue/bin pair and return the cue path
pub fn write_cue_bin(dir: &TempDir, sectors: usize) -> PathBuf {
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

/// Write an executable with the given register setup and body
pub fn write_exe(
    dir: &TempDir,
    pc: u32,
    gp: u32,
    load_address: u32,
    body: &[u32],
    sp_base: u32,
    sp_offset: u32,
) -> PathBuf {
    let mut data = vec![0u8; exe::HEADER_SIZE + body.len() * 4];
    data[0..8].copy_from_slice(exe::MAGIC);
    data[0x10..0x14].copy_from_slice(&pc.to_le_bytes());
    data[0x14..0x18].copy_from_slice(&gp.to_le_bytes());
    data[0x18..0x1C].copy_from_slice(&load_address.to_le_bytes());
    data[0x1C..0x20].copy_from_slice(&((body.len() * 4) as u32).to_le_bytes());
    data[0x30..0x34].copy_from_slice(&sp_base.to_le_bytes());
    data[0x34..0x38].copy_from_slice(&sp_offset.to_le_bytes());
    for (i, word) in body.iter().enumerate() {
        let offset = exe::HEADER_SIZE + i * 4;
        data[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
    }

    let path = dir.path().join("program.exe");
    std::fs::write(&path, data).unwrap();
    path
}
