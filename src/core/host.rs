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

//! Host collaborator interfaces
//!
//! The host supplies configuration, BIOS images keyed by console region, and
//! error/progress reporting sinks. Long boot steps (image open, preload,
//! subchannel scan) run synchronously on the calling thread and report coarse
//! progress through the host's [`ProgressCallback`]; they never spawn
//! background work themselves.

use super::error::GpuError;
use super::gpu::{GpuRenderer, RenderBackend, SoftwareBackend};
use super::settings::{ConsoleRegion, Settings};

/// Host environment the system orchestrator runs inside
pub trait HostInterface {
    /// Current configuration
    fn settings(&self) -> &Settings;

    /// Fetch the BIOS image for a resolved region
    ///
    /// Returning `None` is a fatal boot error.
    fn bios_image(&self, region: ConsoleRegion) -> Option<Vec<u8>>;

    /// Report a user-visible error
    fn report_error(&self, message: &str) {
        log::error!("{message}");
    }

    /// Create a progress sink for a long-running boot step
    fn progress(&self) -> Box<dyn ProgressCallback> {
        Box::new(NullProgressCallback)
    }

    /// Create a render backend for the requested renderer
    ///
    /// The backend's only contract with this core is creating a device and
    /// swapping buffers. Hosts without a display keep the default, which only
    /// supports the software renderer.
    fn render_backend(
        &self,
        renderer: GpuRenderer,
    ) -> std::result::Result<Box<dyn RenderBackend>, GpuError> {
        match renderer {
            GpuRenderer::Software => Ok(Box::new(SoftwareBackend::new())),
            other => Err(GpuError::BackendError(format!(
                "{other:?} renderer is not available without a display"
            ))),
        }
    }
}

/// Coarse progress sink for long synchronous operations
///
/// All methods default to no-ops so hosts only override what they surface.
pub trait ProgressCallback {
    /// Describe the current step
    fn set_status_text(&mut self, _text: &str) {}

    /// Set the upper bound for subsequent progress values
    fn set_progress_range(&mut self, _range: u32) {}

    /// Report progress within the current range
    fn set_progress_value(&mut self, _value: u32) {}

    /// Surface an error from within the operation
    fn display_error(&mut self, message: &str) {
        log::error!("{message}");
    }
}

/// Progress sink that discards everything
pub struct NullProgressCallback;

impl ProgressCallback for NullProgressCallback {}
