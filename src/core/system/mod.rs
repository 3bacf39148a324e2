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

//! System orchestrator
//!
//! The system exclusively owns every hardware component and drives the
//! shared tick clock. Booting sequences BIOS acquisition, region
//! resolution, executable side-load and media insertion; afterwards
//! [`System::run_frame`] runs the CPU in bursts and fans each accumulated
//! tick quantum out to the other components in one fixed order. Save and
//! load walk an identical sequence of named state sections, so a stream
//! from a structurally different build fails loudly instead of corrupting
//! silently.
//!
//! Everything here runs on one logical thread: a synchronize pass is
//! strictly sequential and has no partial-cancellation semantics.

use std::cell::RefCell;
use std::rc::Rc;

use bincode::{Decode, Encode};

use super::bios;
use super::cdrom::disc::{self, CdImage, MemoryImage};
use super::cdrom::Cdrom;
use super::component::Component;
use super::cpu::Core;
use super::dma::Dma;
use super::error::{EmulatorError, Result, StateError};
use super::exe::{self, ExeHeader};
use super::gpu::{Gpu, GpuRenderer};
use super::host::HostInterface;
use super::interrupt::InterruptController;
use super::mdec::Mdec;
use super::memory::Bus;
use super::pad::{MemoryCard, Pad};
use super::settings::ConsoleRegion;
use super::spu::Spu;
use super::state::{Mode, StateWrapper};
use super::timer::Timers;
use super::timing::{GlobalTicks, TickCount};

/// Lifecycle of a system instance
///
/// Boot is the only transition out of `Uninitialized`; `ShuttingDown` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Uninitialized,
    Booted,
    Running,
    Paused,
    ShuttingDown,
}

/// Components receiving the tick quantum during a synchronize pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickTarget {
    Gpu,
    Timers,
    Cdrom,
    Pad,
    Spu,
    Mdec,
    Dma,
}

/// The fixed fan-out order of a synchronize pass
///
/// Later components may assume earlier ones already observed the current
/// quantum within the same pass; reordering this list changes emulation
/// behavior.
pub const TICK_FAN_OUT: [TickTarget; 7] = [
    TickTarget::Gpu,
    TickTarget::Timers,
    TickTarget::Cdrom,
    TickTarget::Pad,
    TickTarget::Spu,
    TickTarget::Mdec,
    TickTarget::Dma,
];

/// Top-level counters, serialized ahead of any component section
#[derive(Encode, Decode)]
struct SystemCounters {
    frame_number: u32,
    internal_frame_number: u32,
    global_tick_counter: GlobalTicks,
}

/// PlayStation system
///
/// # Example
///
/// ```no_run
/// use std::rc::Rc;
/// use corepsx::core::host::HostInterface;
/// use corepsx::core::system::System;
///
/// # struct MyHost;
/// # impl HostInterface for MyHost {
/// #     fn settings(&self) -> &corepsx::core::settings::Settings { unimplemented!() }
/// #     fn bios_image(&self, _: corepsx::core::settings::ConsoleRegion) -> Option<Vec<u8>> { None }
/// # }
/// let host = Rc::new(MyHost);
/// let mut system = System::new(host).unwrap();
/// system.boot(None).unwrap();
/// system.run_frame().unwrap();
/// ```
pub struct System {
    host: Rc<dyn HostInterface>,
    state: SystemState,

    /// Resolved console region; never left unresolved after boot
    region: Option<ConsoleRegion>,

    cpu: Rc<RefCell<Core>>,
    bus: Rc<RefCell<Bus>>,
    dma: Rc<RefCell<Dma>>,
    interrupt_controller: Rc<RefCell<InterruptController>>,
    gpu: Rc<RefCell<Gpu>>,
    cdrom: Rc<RefCell<Cdrom>>,
    pad: Rc<RefCell<Pad>>,
    timers: Rc<RefCell<Timers>>,
    spu: Rc<RefCell<Spu>>,
    mdec: Rc<RefCell<Mdec>>,

    frame_number: u32,
    internal_frame_number: u32,
    global_tick_counter: GlobalTicks,
}

impl System {
    /// Create a system with all components in their power-on state
    ///
    /// The GPU is created immediately so renderer problems surface before
    /// boot; all other wiring waits for [`System::boot`].
    ///
    /// # Errors
    ///
    /// Fails when no renderer, not even the software fallback, can be
    /// created.
    pub fn new(host: Rc<dyn HostInterface>) -> Result<Self> {
        let gpu = Self::create_gpu(host.as_ref())?;

        Ok(Self {
            host,
            state: SystemState::Uninitialized,
            region: None,
            cpu: Rc::new(RefCell::new(Core::new())),
            bus: Rc::new(RefCell::new(Bus::new())),
            dma: Rc::new(RefCell::new(Dma::new())),
            interrupt_controller: Rc::new(RefCell::new(InterruptController::new())),
            gpu: Rc::new(RefCell::new(gpu)),
            cdrom: Rc::new(RefCell::new(Cdrom::new())),
            pad: Rc::new(RefCell::new(Pad::new())),
            timers: Rc::new(RefCell::new(Timers::new())),
            spu: Rc::new(RefCell::new(Spu::new())),
            mdec: Rc::new(RefCell::new(Mdec::new())),
            frame_number: 0,
            internal_frame_number: 0,
            global_tick_counter: 0,
        })
    }

    /// Build a GPU for the configured renderer, falling back to software
    fn create_gpu(host: &dyn HostInterface) -> Result<Gpu> {
        let renderer = host.settings().gpu_renderer;
        match host
            .render_backend(renderer)
            .and_then(|backend| Gpu::new(renderer, backend))
        {
            Ok(gpu) => Ok(gpu),
            Err(e) => {
                log::error!("Failed to create {renderer:?} renderer, falling back to software: {e}");
                let backend = host.render_backend(GpuRenderer::Software)?;
                Ok(Gpu::new(GpuRenderer::Software, backend)?)
            }
        }
    }

    /// Lifecycle state
    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Resolved console region; `None` before boot
    pub fn region(&self) -> Option<ConsoleRegion> {
        self.region
    }

    /// Frame counter (starts at 1 after reset)
    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    /// Frames actually presented since reset
    pub fn internal_frame_number(&self) -> u32 {
        self.internal_frame_number
    }

    /// Global tick counter
    pub fn global_tick_counter(&self) -> GlobalTicks {
        self.global_tick_counter
    }

    /// CD-ROM drive handle
    pub fn cdrom(&self) -> Rc<RefCell<Cdrom>> {
        self.cdrom.clone()
    }

    /// Pad handle
    pub fn pad(&self) -> Rc<RefCell<Pad>> {
        self.pad.clone()
    }

    /// Interrupt controller handle
    pub fn interrupt_controller(&self) -> Rc<RefCell<InterruptController>> {
        self.interrupt_controller.clone()
    }

    /// Classify a boot target as a directly bootable executable
    pub fn is_ps_exe(path: &str) -> bool {
        exe::is_ps_exe(path)
    }

    /// Region auto-detection for a disc image
    // TODO: sniff the license string from the image's system area; until
    // then every disc detects as North America
    fn detect_region_for_image(_image: &dyn CdImage) -> Option<ConsoleRegion> {
        Some(ConsoleRegion::NtscU)
    }

    /// Boot the system
    ///
    /// `filename` selects the boot target: `None` boots into the BIOS
    /// shell, a recognized executable path side-loads that program, and
    /// anything else is opened as a disc image. Boot is the only
    /// transition out of [`SystemState::Uninitialized`] and concludes with
    /// a full reset into a fresh running state.
    ///
    /// # Errors
    ///
    /// Open, BIOS and side-load failures abort the boot with a
    /// user-visible error and no partial state.
    pub fn boot(&mut self, filename: Option<&str>) -> Result<()> {
        if self.state != SystemState::Uninitialized {
            return Err(EmulatorError::InvalidState(format!(
                "boot requested in {:?} state",
                self.state
            )));
        }

        // Classify the boot target and open media up front
        let mut media: Option<Box<dyn CdImage>> = None;
        let mut exe_path: Option<&str> = None;
        if let Some(path) = filename {
            if Self::is_ps_exe(path) {
                exe_path = Some(path);
            } else {
                log::info!("Loading CD image '{path}'...");
                match disc::open_image(path) {
                    Ok(image) => media = Some(image),
                    Err(e) => {
                        self.host
                            .report_error(&format!("Failed to load CD image '{path}': {e}"));
                        return Err(e.into());
                    }
                }
            }
        }

        // Collapse the region selection to a concrete value before any
        // component sees it
        let region = match self.host.settings().region.fixed() {
            Some(region) => region,
            None => match media.as_deref() {
                Some(image) => match Self::detect_region_for_image(image) {
                    Some(detected) => {
                        log::info!("Auto-detected {detected} region");
                        detected
                    }
                    None => {
                        log::warn!("Could not determine region for CD. Defaulting to NTSC-U.");
                        ConsoleRegion::NtscU
                    }
                },
                None => {
                    log::info!("Defaulting to NTSC-U region");
                    ConsoleRegion::NtscU
                }
            },
        };
        self.region = Some(region);

        // BIOS comes from the host, keyed by the resolved region
        let mut bios_image = match self.host.bios_image(region) {
            Some(image) => image,
            None => {
                self.host
                    .report_error(&format!("Failed to load {region} BIOS"));
                return Err(EmulatorError::BiosNotFound(region.name().to_string()));
            }
        };
        bios::validate(&bios_image)?;

        self.initialize_components(region);
        self.update_memory_cards();

        let bios_hash = bios::hash(&bios_image);
        if self.host.settings().bios_patch_tty_enable {
            bios::patch_bios_enable_tty(&mut bios_image, &bios_hash)?;
        }

        // Side-load after BIOS patching so the entry patch lands last
        if let Some(path) = exe_path {
            if let Err(e) = self.load_exe(path, &mut bios_image) {
                self.host
                    .report_error(&format!("Failed to load EXE file '{path}': {e}"));
                return Err(e);
            }
        }

        // Insert the media, then decide on the fast-boot patch: skipping
        // the disc-boot delay only makes sense with a disc present
        if let Some(image) = media {
            let image = self.maybe_preload(image);
            self.cdrom.borrow_mut().insert_media(image);
        }
        if self.cdrom.borrow().has_media() && self.host.settings().bios_patch_fast_boot {
            bios::patch_bios_fast_boot(&mut bios_image, &bios_hash)?;
        }

        self.bus.borrow_mut().set_bios(bios_image)?;

        self.state = SystemState::Booted;
        self.reset();
        log::info!("System booted ({region})");
        Ok(())
    }

    /// One-time dependency-injection pass
    ///
    /// Every component receives handles to the siblings it keeps; ordering
    /// only matters insofar as each initializer can resolve what it stores.
    fn initialize_components(&mut self, region: ConsoleRegion) {
        self.cpu.borrow_mut().initialize(self.bus.clone());
        self.dma
            .borrow_mut()
            .initialize(self.interrupt_controller.clone());
        self.gpu
            .borrow_mut()
            .initialize(self.interrupt_controller.clone(), region);
        self.cdrom
            .borrow_mut()
            .initialize(self.interrupt_controller.clone());
        self.pad
            .borrow_mut()
            .initialize(self.interrupt_controller.clone());
        self.timers
            .borrow_mut()
            .initialize(self.interrupt_controller.clone());
        log::debug!("Components wired");
    }

    /// Reset into a fresh running state
    ///
    /// Components are reset, never recreated; calling this twice in a row
    /// is equivalent to calling it once.
    pub fn reset(&mut self) {
        self.cpu.borrow_mut().reset();
        self.bus.borrow_mut().reset();
        self.dma.borrow_mut().reset();
        self.interrupt_controller.borrow_mut().reset();
        self.gpu.borrow_mut().reset();
        self.cdrom.borrow_mut().reset();
        self.pad.borrow_mut().reset();
        self.timers.borrow_mut().reset();
        self.spu.borrow_mut().reset();
        self.mdec.borrow_mut().reset();

        self.frame_number = 1;
        self.internal_frame_number = 0;
        self.global_tick_counter = 0;

        if self.state != SystemState::Uninitialized {
            self.state = SystemState::Running;
        }
        log::info!("System reset");
    }

    /// Pause emulated-time progress
    ///
    /// # Errors
    ///
    /// Only a running system can pause.
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            SystemState::Running | SystemState::Booted => {
                self.state = SystemState::Paused;
                Ok(())
            }
            other => Err(EmulatorError::InvalidState(format!(
                "pause requested in {other:?} state"
            ))),
        }
    }

    /// Resume from pause
    ///
    /// # Errors
    ///
    /// Only a paused system can resume.
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            SystemState::Paused => {
                self.state = SystemState::Running;
                Ok(())
            }
            other => Err(EmulatorError::InvalidState(format!(
                "resume requested in {other:?} state"
            ))),
        }
    }

    /// Enter the terminal shutting-down state
    pub fn shutdown(&mut self) {
        self.state = SystemState::ShuttingDown;
        log::info!("System shutting down");
    }

    /// Run the CPU until the frame counter advances
    ///
    /// Each CPU burst is followed by a synchronize pass; the GPU's
    /// frame-completion signal advances the frame counter.
    ///
    /// # Errors
    ///
    /// The system must be booted and not paused or shut down.
    pub fn run_frame(&mut self) -> Result<()> {
        match self.state {
            SystemState::Booted | SystemState::Running => {}
            other => {
                return Err(EmulatorError::InvalidState(format!(
                    "run requested in {other:?} state"
                )))
            }
        }
        self.state = SystemState::Running;

        let frame = self.frame_number;
        while self.frame_number == frame {
            self.cpu.borrow_mut().execute();
            self.synchronize();

            if self.gpu.borrow_mut().take_frame_done() {
                self.frame_number += 1;
                self.internal_frame_number += 1;
            }
        }
        Ok(())
    }

    fn fan_out_handle(&self, target: TickTarget) -> Rc<RefCell<dyn Component>> {
        match target {
            TickTarget::Gpu => self.gpu.clone(),
            TickTarget::Timers => self.timers.clone(),
            TickTarget::Cdrom => self.cdrom.clone(),
            TickTarget::Pad => self.pad.clone(),
            TickTarget::Spu => self.spu.clone(),
            TickTarget::Mdec => self.mdec.clone(),
            TickTarget::Dma => self.dma.clone(),
        }
    }

    /// Drain the CPU's pending ticks and fan the quantum out
    ///
    /// With zero pending ticks this is a complete no-op. Otherwise every
    /// component in [`TICK_FAN_OUT`] observes the identical quantum, in
    /// order, and clearing the CPU's pending/downcount state afterwards is
    /// the single commit point of the pass.
    pub fn synchronize(&mut self) {
        let pending_ticks = self.cpu.borrow().pending_ticks();
        if pending_ticks == 0 {
            return;
        }

        self.global_tick_counter += pending_ticks as GlobalTicks;

        for target in TICK_FAN_OUT {
            self.fan_out_handle(target).borrow_mut().execute(pending_ticks);
        }

        let mut cpu = self.cpu.borrow_mut();
        cpu.reset_pending_ticks();
        cpu.reset_downcount();

        // Bound the next burst to the nearest component deadline
        let next_event = TICK_FAN_OUT
            .iter()
            .map(|&target| self.fan_out_handle(target).borrow().ticks_until_event())
            .min()
            .unwrap_or(TickCount::MAX);
        cpu.set_downcount(next_event);
    }

    /// Account extra ticks against the CPU's current burst
    pub fn stall_cpu(&mut self, ticks: TickCount) {
        self.cpu.borrow_mut().add_pending_ticks(ticks);
    }

    /// Bound the CPU's current burst
    pub fn set_downcount(&mut self, downcount: TickCount) {
        self.cpu.borrow_mut().set_downcount(downcount);
    }

    /// Serialize or restore the whole system through one marker sequence
    ///
    /// Top-level counters ride first, then one named section per component
    /// in a fixed order shared by save and load. Any marker mismatch or
    /// section failure aborts the operation.
    ///
    /// # Errors
    ///
    /// Forwards the first section failure; nothing is rolled back, so a
    /// failed load leaves the system in need of a reset.
    pub fn do_state(&mut self, sw: &mut StateWrapper) -> std::result::Result<(), StateError> {
        sw.marker("System")?;
        match sw.mode() {
            Mode::Write => {
                sw.write_payload(&SystemCounters {
                    frame_number: self.frame_number,
                    internal_frame_number: self.internal_frame_number,
                    global_tick_counter: self.global_tick_counter,
                })?;
            }
            Mode::Read => {
                let counters: SystemCounters = sw.read_payload()?;
                self.frame_number = counters.frame_number;
                self.internal_frame_number = counters.internal_frame_number;
                self.global_tick_counter = counters.global_tick_counter;
            }
        }

        sw.marker("CPU")?;
        self.cpu.borrow_mut().do_state(sw)?;

        sw.marker("Bus")?;
        self.bus.borrow_mut().do_state(sw)?;

        sw.marker("DMA")?;
        self.dma.borrow_mut().do_state(sw)?;

        sw.marker("InterruptController")?;
        self.interrupt_controller.borrow_mut().do_state(sw)?;

        sw.marker("GPU")?;
        self.gpu.borrow_mut().do_state(sw)?;

        sw.marker("CDROM")?;
        self.cdrom.borrow_mut().do_state(sw)?;

        sw.marker("Pad")?;
        self.pad.borrow_mut().do_state(sw)?;

        sw.marker("Timers")?;
        self.timers.borrow_mut().do_state(sw)?;

        sw.marker("SPU")?;
        self.spu.borrow_mut().do_state(sw)?;

        sw.marker("MDEC")?;
        self.mdec.borrow_mut().do_state(sw)?;

        Ok(())
    }

    /// Serialize the system into a fresh state stream
    ///
    /// # Errors
    ///
    /// A failure in any single component section aborts the save.
    pub fn save_state(&mut self) -> Result<Vec<u8>> {
        let mut sw = StateWrapper::for_write();
        self.do_state(&mut sw)?;
        Ok(sw.into_inner())
    }

    /// Restore the system from a state stream
    ///
    /// # Errors
    ///
    /// A marker mismatch or section failure aborts the load; no partial
    /// restore is accepted.
    pub fn load_state(&mut self, data: Vec<u8>) -> Result<()> {
        let mut sw = StateWrapper::for_read(data);
        self.do_state(&mut sw)?;
        Ok(())
    }

    /// Side-load an executable into emulated memory
    ///
    /// Writes the zero-fill region, copies the body word by word to the
    /// load address, then patches the BIOS entry points to jump straight
    /// into the program. A zero-length body still patches the entry.
    fn load_exe(&mut self, path: &str, bios_image: &mut [u8]) -> Result<()> {
        let data = std::fs::read(path)?;
        let header = ExeHeader::parse(&data)?;
        log::info!(
            "Side-loading '{path}': {} bytes at 0x{:08X}, entry 0x{:08X}",
            header.file_size,
            header.load_address,
            header.initial_pc
        );

        if header.memfill_size > 0 {
            let words = header.memfill_size / 4;
            let mut address = header.memfill_start & !3;
            let mut cpu = self.cpu.borrow_mut();
            for _ in 0..words {
                cpu.safe_write_memory_word(address, 0)?;
                address = address.wrapping_add(4);
            }
        }

        if header.file_size >= 4 {
            let body_end = exe::HEADER_SIZE + header.file_size as usize;
            if data.len() < body_end {
                return Err(EmulatorError::Loader(format!(
                    "'{path}' is shorter than its declared body size"
                )));
            }

            let mut address = header.load_address;
            let mut cpu = self.cpu.borrow_mut();
            for chunk in data[exe::HEADER_SIZE..body_end].chunks_exact(4) {
                let word = u32::from_le_bytes(chunk.try_into().unwrap());
                cpu.safe_write_memory_word(address, word)?;
                address = address.wrapping_add(4);
            }
        }

        let r_sp = header.initial_sp_base;
        let r_fp = header.initial_sp_base.wrapping_add(header.initial_sp_offset);
        bios::patch_bios_for_exe(
            bios_image,
            header.initial_pc,
            header.initial_gp,
            r_sp,
            r_fp,
        )
    }

    /// Preload an image into RAM when the configuration asks for it
    ///
    /// Preload failure is recoverable: the file-backed image keeps
    /// working.
    fn maybe_preload(&self, mut image: Box<dyn CdImage>) -> Box<dyn CdImage> {
        if !self.host.settings().cdrom_load_image_to_ram {
            return image;
        }

        let mut progress = self.host.progress();
        match MemoryImage::copy_image(image.as_mut(), progress.as_mut()) {
            Ok(preloaded) => Box::new(preloaded),
            Err(e) => {
                log::warn!("Failed to preload image to RAM, using file reads: {e}");
                image
            }
        }
    }

    /// true when the drive holds media
    pub fn has_media(&self) -> bool {
        self.cdrom.borrow().has_media()
    }

    /// Open an image by path and insert it into the drive
    ///
    /// # Errors
    ///
    /// Open failure leaves the drive untouched.
    pub fn insert_media(&mut self, path: &str) -> Result<()> {
        let image = disc::open_image(path)?;
        let image = self.maybe_preload(image);
        self.cdrom.borrow_mut().insert_media(image);
        Ok(())
    }

    /// Remove the media from the drive
    pub fn remove_media(&mut self) {
        self.cdrom.borrow_mut().remove_media();
    }

    /// Read an expansion ROM and hand the buffer to the bus
    ///
    /// # Errors
    ///
    /// A read failure is reported and leaves the bus unmodified.
    pub fn set_expansion_rom(&mut self, path: &str) -> Result<()> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                self.host
                    .report_error(&format!("Failed to read expansion ROM '{path}': {e}"));
                return Err(e.into());
            }
        };

        log::info!("Loaded expansion ROM from '{path}': {} bytes", data.len());
        self.bus.borrow_mut().set_expansion_rom(data);
        Ok(())
    }

    /// Re-attach the memory cards from the current configuration
    ///
    /// Both slots detach first; a single card failing to open leaves that
    /// slot empty rather than failing the whole update.
    pub fn update_memory_cards(&mut self) {
        let mut pad = self.pad.borrow_mut();
        pad.set_memory_card(0, None);
        pad.set_memory_card(1, None);

        let settings = self.host.settings();
        let slots = [
            (0, settings.memory_card_a_path.clone()),
            (1, settings.memory_card_b_path.clone()),
        ];
        for (slot, path) in slots {
            let Some(path) = path else { continue };
            match MemoryCard::open(&path) {
                Ok(card) => pad.set_memory_card(slot, Some(card)),
                Err(e) => {
                    log::warn!(
                        "Leaving memory card slot {slot} empty: '{}' failed to open: {e}",
                        path.display()
                    );
                }
            }
        }
    }

    /// Rebuild the GPU for the currently configured renderer
    ///
    /// The GPU's state is snapshotted through the state stream, the
    /// component is recreated, and the snapshot restored, so switching
    /// renderers does not disturb timing.
    ///
    /// # Errors
    ///
    /// Fails when no renderer can be created or the snapshot cannot be
    /// restored.
    pub fn recreate_gpu(&mut self) -> Result<()> {
        let mut sw = StateWrapper::for_write();
        let snapshot = match self.gpu.borrow_mut().do_state(&mut sw) {
            Ok(()) => Some(sw.into_inner()),
            Err(e) => {
                log::error!("Failed to save GPU state when switching renderers: {e}");
                None
            }
        };

        let gpu = Self::create_gpu(self.host.as_ref())?;
        self.gpu = Rc::new(RefCell::new(gpu));
        if let Some(region) = self.region {
            self.gpu
                .borrow_mut()
                .initialize(self.interrupt_controller.clone(), region);
        }

        if let Some(data) = snapshot {
            let mut sr = StateWrapper::for_read(data);
            self.gpu.borrow_mut().do_state(&mut sr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
