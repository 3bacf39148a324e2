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

//! Boot protocol: classification, region resolution, patches, side-load

use std::rc::Rc;

use tempfile::TempDir;

use super::super::super::component::Component;
use super::super::super::error::EmulatorError;
use super::super::super::settings::{ConsoleRegion, RegionSelection, Settings};
use super::super::super::timing::TICKS_PER_SECTOR_SINGLE_SPEED;
use super::super::{System, SystemState, TickTarget, TICK_FAN_OUT};
use super::fixtures::{write_cue_bin, write_exe, TestHost};

fn bios_word(system: &System, offset: u32) -> u32 {
    system.bus.borrow().read_word(0xBFC0_0000 + offset).unwrap()
}

fn ram_word(system: &System, address: u32) -> u32 {
    system.bus.borrow().read_word(address).unwrap()
}

#[test]
fn test_boot_twice_is_rejected() {
    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    system.boot(None).unwrap();
    assert!(matches!(
        system.boot(None),
        Err(EmulatorError::InvalidState(_))
    ));
}

#[test]
fn test_bios_boot_defaults_region() {
    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    system.boot(None).unwrap();
    assert_eq!(system.region(), Some(ConsoleRegion::NtscU));
}

#[test]
fn test_missing_bios_is_fatal() {
    let mut system = System::new(Rc::new(TestHost::without_bios())).unwrap();
    assert!(matches!(
        system.boot(None),
        Err(EmulatorError::BiosNotFound(_))
    ));
    assert_eq!(system.state(), SystemState::Uninitialized);
}

#[test]
fn test_disc_open_failure_aborts_boot() {
    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    let result = system.boot(Some("/nonexistent/path/game.cue"));
    assert!(result.is_err());
    assert_eq!(system.state(), SystemState::Uninitialized);
    assert!(!system.has_media());
}

#[test]
fn test_disc_boot_inserts_media_and_detects_region() {
    let dir = TempDir::new().unwrap();
    let cue_path = write_cue_bin(&dir, 400);

    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    system.boot(Some(cue_path.to_str().unwrap())).unwrap();

    assert_eq!(system.state(), SystemState::Running);
    assert!(system.has_media());
    assert_eq!(system.region(), Some(ConsoleRegion::NtscU));
}

#[test]
fn test_explicit_region_is_never_overridden() {
    let dir = TempDir::new().unwrap();
    let cue_path = write_cue_bin(&dir, 400);

    let settings = Settings {
        region: RegionSelection::Pal,
        ..Settings::default()
    };
    let mut system = System::new(Rc::new(TestHost::with_settings(settings))).unwrap();
    system.boot(Some(cue_path.to_str().unwrap())).unwrap();

    assert_eq!(system.region(), Some(ConsoleRegion::Pal));
}

#[test]
fn test_tty_patch_applied_when_configured() {
    let settings = Settings {
        bios_patch_tty_enable: true,
        ..Settings::default()
    };
    let mut system = System::new(Rc::new(TestHost::with_settings(settings))).unwrap();
    system.boot(None).unwrap();

    assert_eq!(bios_word(&system, 0x6F0C), 0x2401_0001);
    assert_eq!(bios_word(&system, 0x6F14), 0xAF81_A9C0);
}

#[test]
fn test_tty_patch_skipped_by_default() {
    let system = super::fixtures::boot_default();
    // The fixture BIOS is 0xFF-filled; an unpatched word stays that way
    assert_eq!(bios_word(&system, 0x6F0C), 0xFFFF_FFFF);
}

#[test]
fn test_fast_boot_patch_requires_media() {
    let settings = Settings {
        bios_patch_fast_boot: true,
        ..Settings::default()
    };

    // No media: the intro stays in place
    let mut without_media =
        System::new(Rc::new(TestHost::with_settings(settings.clone()))).unwrap();
    without_media.boot(None).unwrap();
    assert_eq!(bios_word(&without_media, 0x18000), 0xFFFF_FFFF);

    // With media: the intro branch is patched out
    let dir = TempDir::new().unwrap();
    let cue_path = write_cue_bin(&dir, 400);
    let mut with_media = System::new(Rc::new(TestHost::with_settings(settings))).unwrap();
    with_media.boot(Some(cue_path.to_str().unwrap())).unwrap();
    assert_eq!(bios_word(&with_media, 0x18000), 0x0000_0000);
}

#[test]
fn test_exe_boot_side_loads_program() {
    let dir = TempDir::new().unwrap();
    let body = [0x3C08_8001, 0x3508_2000, 0x0100_0008, 0x0000_0000];
    let exe_path = write_exe(
        &dir,
        0x8001_0000,
        0x8002_ABCD,
        0x8001_0000,
        &body,
        0x801F_FF00,
        0x100,
    );

    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    system.boot(Some(exe_path.to_str().unwrap())).unwrap();

    // Body copied verbatim to the load address
    for (i, &word) in body.iter().enumerate() {
        assert_eq!(ram_word(&system, 0x8001_0000 + i as u32 * 4), word);
    }

    // BIOS entry rewritten from the header's register values
    assert_eq!(bios_word(&system, 0x6990), 0x3C08_8001); // lui $t0, hi(pc)
    assert_eq!(bios_word(&system, 0x6994), 0x3508_0000); // ori $t0, lo(pc)
    assert_eq!(bios_word(&system, 0x6998), 0x3C1C_8002); // lui $gp
    assert_eq!(bios_word(&system, 0x699C), 0x379C_ABCD); // ori $gp
    assert_eq!(bios_word(&system, 0x69B0), 0x0100_0008); // jr $t0

    assert_eq!(system.region(), Some(ConsoleRegion::NtscU));
    assert!(!system.has_media());
}

#[test]
fn test_exe_with_empty_body_still_patches_entry() {
    let dir = TempDir::new().unwrap();
    let exe_path = write_exe(&dir, 0x8003_0000, 0x8004_0000, 0x8001_0000, &[], 0, 0);

    let mut system = System::new(Rc::new(TestHost::new())).unwrap();
    system.boot(Some(exe_path.to_str().unwrap())).unwrap();

    // No body copy happened (RAM still zeroed)
    assert_eq!(ram_word(&system, 0x8001_0000), 0);

    // Entry patch still uses the header's program counter
    assert_eq!(bios_word(&system, 0x6990), 0x3C08_8003);
    assert_eq!(bios_word(&system, 0x6994), 0x3508_0000);
    // Zero stack pointer nops out the stack setup
    assert_eq!(bios_word(&system, 0x69A0), 0x0000_0000);
}

#[test]
fn test_memory_cards_attach_from_settings() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        memory_card_a_path: Some(dir.path().join("a.mcd")),
        memory_card_b_path: Some(dir.path().join("b.mcd")),
        ..Settings::default()
    };
    let system = super::fixtures::boot_with_settings(settings);

    let pad = system.pad();
    let pad = pad.borrow();
    assert!(pad.memory_card(0).is_some());
    assert!(pad.memory_card(1).is_some());
}

#[test]
fn test_failed_card_leaves_slot_empty() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        // A directory cannot be opened as a card image
        memory_card_a_path: Some(dir.path().to_path_buf()),
        memory_card_b_path: Some(dir.path().join("b.mcd")),
        ..Settings::default()
    };

    // The whole update survives the bad slot
    let system = super::fixtures::boot_with_settings(settings);
    let pad = system.pad();
    let pad = pad.borrow();
    assert!(pad.memory_card(0).is_none());
    assert!(pad.memory_card(1).is_some());
}

#[test]
fn test_preload_setting_copies_image_to_ram() {
    let dir = TempDir::new().unwrap();
    let cue_path = write_cue_bin(&dir, 64);

    let settings = Settings {
        cdrom_load_image_to_ram: true,
        ..Settings::default()
    };
    let mut system = System::new(Rc::new(TestHost::with_settings(settings))).unwrap();
    system.boot(Some(cue_path.to_str().unwrap())).unwrap();

    // Delete the backing files; a preloaded image keeps reading
    drop(dir);

    let cdrom = system.cdrom();
    let mut cdrom = cdrom.borrow_mut();
    cdrom.start_reading().unwrap();
    cdrom.execute(TICKS_PER_SECTOR_SINGLE_SPEED * 3);
    assert_eq!(cdrom.sectors_delivered(), 3);
    assert_eq!(cdrom.sector_buffer()[0], 2);
}

#[test]
fn test_expansion_rom_failure_leaves_bus_unmodified() {
    let mut system = super::fixtures::boot_default();
    assert!(system.set_expansion_rom("/nonexistent/rom.bin").is_err());
    assert!(!system.bus.borrow().has_expansion_rom());

    let dir = TempDir::new().unwrap();
    let rom_path = dir.path().join("rom.bin");
    std::fs::write(&rom_path, vec![0x42u8; 1024]).unwrap();
    system.set_expansion_rom(rom_path.to_str().unwrap()).unwrap();
    assert!(system.bus.borrow().has_expansion_rom());
}

#[test]
fn test_media_insert_and_remove_after_boot() {
    let dir = TempDir::new().unwrap();
    let cue_path = write_cue_bin(&dir, 100);

    let mut system = super::fixtures::boot_default();
    assert!(!system.has_media());

    system.insert_media(cue_path.to_str().unwrap()).unwrap();
    assert!(system.has_media());

    system.remove_media();
    assert!(!system.has_media());
}

#[test]
fn test_fan_out_order_is_fixed() {
    assert_eq!(
        TICK_FAN_OUT,
        [
            TickTarget::Gpu,
            TickTarget::Timers,
            TickTarget::Cdrom,
            TickTarget::Pad,
            TickTarget::Spu,
            TickTarget::Mdec,
            TickTarget::Dma,
        ]
    );
}
