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

//! Host configuration
//!
//! Settings are supplied by the host collaborator and read once at boot.
//! The console region is configured as a tagged selection: `Auto` defers to
//! disc detection, while a concrete region is never overridden. After boot
//! the system always holds a concrete [`ConsoleRegion`]; the unresolved form
//! never reaches any hardware component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{EmulatorError, Result};
use super::gpu::GpuRenderer;

/// Concrete console region, resolved at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleRegion {
    /// Japan (NTSC, 60 Hz)
    NtscJ,
    /// North America (NTSC, 60 Hz)
    NtscU,
    /// Europe (PAL, 50 Hz)
    Pal,
}

impl ConsoleRegion {
    /// Human-readable region name
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleRegion::NtscJ => "NTSC-J",
            ConsoleRegion::NtscU => "NTSC-U",
            ConsoleRegion::Pal => "PAL",
        }
    }
}

impl std::fmt::Display for ConsoleRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Region selection as configured by the user
///
/// `Auto` is a boot-time sentinel only; it collapses to a concrete value
/// during boot, before component initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RegionSelection {
    #[default]
    Auto,
    NtscJ,
    NtscU,
    Pal,
}

impl RegionSelection {
    /// The concrete region, if one was explicitly selected
    pub fn fixed(&self) -> Option<ConsoleRegion> {
        match self {
            RegionSelection::Auto => None,
            RegionSelection::NtscJ => Some(ConsoleRegion::NtscJ),
            RegionSelection::NtscU => Some(ConsoleRegion::NtscU),
            RegionSelection::Pal => Some(ConsoleRegion::Pal),
        }
    }
}

/// Host-supplied configuration
///
/// # Example
///
/// ```
/// use corepsx::core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.bios_patch_fast_boot);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Console region selection (auto-detect by default)
    pub region: RegionSelection,

    /// GPU renderer backend selection
    pub gpu_renderer: GpuRenderer,

    /// Patch the BIOS to enable TTY/diagnostic output
    pub bios_patch_tty_enable: bool,

    /// Patch the BIOS to skip the disc-boot delay
    pub bios_patch_fast_boot: bool,

    /// Preload inserted disc images into RAM
    pub cdrom_load_image_to_ram: bool,

    /// Memory card path for slot A (empty slot when unset)
    pub memory_card_a_path: Option<PathBuf>,

    /// Memory card path for slot B (empty slot when unset)
    pub memory_card_b_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: RegionSelection::Auto,
            gpu_renderer: GpuRenderer::Software,
            bios_patch_tty_enable: false,
            bios_patch_fast_boot: false,
            cdrom_load_image_to_ram: false,
            memory_card_a_path: None,
            memory_card_b_path: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| EmulatorError::Loader(format!("Invalid settings: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_region_is_auto() {
        let settings = Settings::default();
        assert_eq!(settings.region, RegionSelection::Auto);
        assert_eq!(settings.region.fixed(), None);
    }

    #[test]
    fn test_fixed_region_selection() {
        assert_eq!(RegionSelection::Pal.fixed(), Some(ConsoleRegion::Pal));
        assert_eq!(RegionSelection::NtscJ.fixed(), Some(ConsoleRegion::NtscJ));
    }

    #[test]
    fn test_settings_from_toml() {
        let text = r#"
            region = "pal"
            bios_patch_fast_boot = true
            cdrom_load_image_to_ram = true
        "#;
        let settings: Settings = toml::from_str(text).unwrap();
        assert_eq!(settings.region, RegionSelection::Pal);
        assert!(settings.bios_patch_fast_boot);
        assert!(settings.cdrom_load_image_to_ram);
        // Unspecified keys keep their defaults
        assert!(!settings.bios_patch_tty_enable);
        assert!(settings.memory_card_a_path.is_none());
    }
}
