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

//! GPU frame timing and renderer capability surface
//!
//! Rasterization belongs to the renderer backends; this core only drives
//! frame pacing. The GPU consumes the shared tick quantum, derives frame
//! length from the resolved console region, raises the vblank interrupt at
//! each frame boundary, and signals frame completion to the orchestrator.
//!
//! A backend's whole contract is creating a device and swapping buffers.
//! The software backend always works and is the fallback whenever a
//! hardware backend cannot be created.

use std::cell::RefCell;
use std::rc::Rc;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::component::Component;
use super::error::{GpuError, StateError};
use super::interrupt::{interrupts, InterruptController};
use super::settings::ConsoleRegion;
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::{TickCount, NTSC_TICKS_PER_FRAME, PAL_TICKS_PER_FRAME};

/// Renderer backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GpuRenderer {
    /// Portable software rasterizer (always available)
    #[default]
    Software,
    /// OpenGL hardware renderer
    HardwareOpenGL,
    /// Direct3D 11 hardware renderer
    HardwareD3D11,
}

/// Render surface/device supplied by the display collaborator
///
/// The core never looks inside a backend; it only creates a device up front
/// and swaps buffers once per completed frame.
pub trait RenderBackend {
    /// Create the rendering device
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be brought up; the caller
    /// falls back to the software renderer.
    fn create_device(&mut self) -> Result<(), GpuError>;

    /// Present the completed frame
    fn swap_buffers(&mut self);

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Software rasterizer backend
///
/// Creation never fails; buffer swaps only count frames.
pub struct SoftwareBackend {
    frames_presented: u64,
}

impl SoftwareBackend {
    /// Create a new software backend
    pub fn new() -> Self {
        Self {
            frames_presented: 0,
        }
    }

    /// Frames presented since creation
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for SoftwareBackend {
    fn create_device(&mut self) -> Result<(), GpuError> {
        Ok(())
    }

    fn swap_buffers(&mut self) {
        self.frames_presented += 1;
    }

    fn name(&self) -> &'static str {
        "software"
    }
}

/// Serialized GPU state
#[derive(Encode, Decode)]
pub struct GpuState {
    ticks_this_frame: TickCount,
    frame_done: bool,
    frames_completed: u32,
}

/// GPU
///
/// # Example
///
/// ```
/// use corepsx::core::component::Component;
/// use corepsx::core::gpu::{Gpu, GpuRenderer, SoftwareBackend};
/// use corepsx::core::timing::NTSC_TICKS_PER_FRAME;
///
/// let mut gpu = Gpu::new(GpuRenderer::Software, Box::new(SoftwareBackend::new())).unwrap();
/// gpu.execute(NTSC_TICKS_PER_FRAME);
/// assert!(gpu.take_frame_done());
/// ```
pub struct Gpu {
    /// Selected renderer (may differ from settings after fallback)
    renderer: GpuRenderer,

    /// Render backend from the display collaborator
    backend: Box<dyn RenderBackend>,

    /// Interrupt controller handle, wired during initialization
    interrupt_controller: Option<Rc<RefCell<InterruptController>>>,

    /// Frame length in ticks, derived from the resolved region
    ticks_per_frame: TickCount,

    /// Ticks consumed in the current frame
    ticks_this_frame: TickCount,

    /// Frame boundary crossed since the last poll
    frame_done: bool,

    /// Frames completed since reset
    frames_completed: u32,
}

impl Gpu {
    /// Create a GPU bound to a backend, creating the render device
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create its device; the caller
    /// decides whether to fall back to the software renderer.
    pub fn new(renderer: GpuRenderer, mut backend: Box<dyn RenderBackend>) -> Result<Self, GpuError> {
        backend.create_device()?;
        log::info!("GPU using {} backend", backend.name());

        Ok(Self {
            renderer,
            backend,
            interrupt_controller: None,
            ticks_per_frame: NTSC_TICKS_PER_FRAME,
            ticks_this_frame: 0,
            frame_done: false,
            frames_completed: 0,
        })
    }

    /// Wire the interrupt controller and derive frame timing from the region
    pub fn initialize(
        &mut self,
        interrupt_controller: Rc<RefCell<InterruptController>>,
        region: ConsoleRegion,
    ) {
        self.interrupt_controller = Some(interrupt_controller);
        self.ticks_per_frame = match region {
            ConsoleRegion::NtscJ | ConsoleRegion::NtscU => NTSC_TICKS_PER_FRAME,
            ConsoleRegion::Pal => PAL_TICKS_PER_FRAME,
        };
        log::debug!(
            "GPU frame timing: {} ticks per frame ({region})",
            self.ticks_per_frame
        );
    }

    /// Active renderer
    pub fn renderer(&self) -> GpuRenderer {
        self.renderer
    }

    /// Frame length in ticks
    pub fn ticks_per_frame(&self) -> TickCount {
        self.ticks_per_frame
    }

    /// Frames completed since reset
    pub fn frames_completed(&self) -> u32 {
        self.frames_completed
    }

    /// Consume the frame-completion signal
    ///
    /// Returns true exactly once per completed frame.
    pub fn take_frame_done(&mut self) -> bool {
        std::mem::take(&mut self.frame_done)
    }
}

impl StateSave for Gpu {
    type State = GpuState;

    fn to_state(&self) -> Self::State {
        GpuState {
            ticks_this_frame: self.ticks_this_frame,
            frame_done: self.frame_done,
            frames_completed: self.frames_completed,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.ticks_this_frame = state.ticks_this_frame;
        self.frame_done = state.frame_done;
        self.frames_completed = state.frames_completed;
    }
}

impl Component for Gpu {
    fn reset(&mut self) {
        self.ticks_this_frame = 0;
        self.frame_done = false;
        self.frames_completed = 0;
    }

    fn execute(&mut self, ticks: TickCount) {
        self.ticks_this_frame += ticks;

        while self.ticks_this_frame >= self.ticks_per_frame {
            self.ticks_this_frame -= self.ticks_per_frame;
            self.frames_completed += 1;
            self.frame_done = true;
            self.backend.swap_buffers();

            if let Some(ic) = &self.interrupt_controller {
                ic.borrow_mut().request(interrupts::VBLANK);
            }
        }
    }

    fn ticks_until_event(&self) -> TickCount {
        self.ticks_per_frame - self.ticks_this_frame
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu_with_irq(region: ConsoleRegion) -> (Gpu, Rc<RefCell<InterruptController>>) {
        let ic = Rc::new(RefCell::new(InterruptController::new()));
        ic.borrow_mut().write_mask(interrupts::VBLANK as u32);
        let mut gpu = Gpu::new(GpuRenderer::Software, Box::new(SoftwareBackend::new())).unwrap();
        gpu.initialize(ic.clone(), region);
        (gpu, ic)
    }

    #[test]
    fn test_frame_boundary_raises_vblank() {
        let (mut gpu, ic) = gpu_with_irq(ConsoleRegion::NtscU);

        gpu.execute(NTSC_TICKS_PER_FRAME - 1);
        assert!(!gpu.take_frame_done());
        assert!(!ic.borrow().is_pending());

        gpu.execute(1);
        assert!(gpu.take_frame_done());
        assert!(ic.borrow().is_pending());
        assert_eq!(gpu.frames_completed(), 1);
    }

    #[test]
    fn test_frame_done_signal_is_one_shot() {
        let (mut gpu, _ic) = gpu_with_irq(ConsoleRegion::NtscU);
        gpu.execute(NTSC_TICKS_PER_FRAME);
        assert!(gpu.take_frame_done());
        assert!(!gpu.take_frame_done());
    }

    #[test]
    fn test_pal_frame_is_longer() {
        let (gpu_pal, _) = gpu_with_irq(ConsoleRegion::Pal);
        let (gpu_ntsc, _) = gpu_with_irq(ConsoleRegion::NtscJ);
        assert!(gpu_pal.ticks_per_frame() > gpu_ntsc.ticks_per_frame());
    }

    #[test]
    fn test_large_quantum_completes_multiple_frames() {
        let (mut gpu, _ic) = gpu_with_irq(ConsoleRegion::NtscU);
        gpu.execute(NTSC_TICKS_PER_FRAME * 3);
        assert_eq!(gpu.frames_completed(), 3);
    }

    #[test]
    fn test_ticks_until_event_tracks_frame_boundary() {
        let (mut gpu, _ic) = gpu_with_irq(ConsoleRegion::NtscU);
        assert_eq!(gpu.ticks_until_event(), NTSC_TICKS_PER_FRAME);
        gpu.execute(100);
        assert_eq!(gpu.ticks_until_event(), NTSC_TICKS_PER_FRAME - 100);
    }

    #[test]
    fn test_state_round_trip() {
        let (mut gpu, _ic) = gpu_with_irq(ConsoleRegion::NtscU);
        gpu.execute(12_345);

        let mut sw = StateWrapper::for_write();
        gpu.do_state(&mut sw).unwrap();

        let (mut restored, _) = gpu_with_irq(ConsoleRegion::NtscU);
        let mut sr = StateWrapper::for_read(sw.into_inner());
        restored.do_state(&mut sr).unwrap();

        assert_eq!(restored.ticks_until_event(), NTSC_TICKS_PER_FRAME - 12_345);
    }
}
