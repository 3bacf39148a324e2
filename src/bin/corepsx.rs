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

use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use log::{error, info};

use corepsx::core::error::Result;
use corepsx::core::host::HostInterface;
use corepsx::core::settings::{ConsoleRegion, Settings};
use corepsx::core::state::SaveStateFile;
use corepsx::core::system::System;

/// PlayStation (PSX) system core
#[derive(Parser)]
#[command(name = "corepsx")]
#[command(about = "PlayStation system core", long_about = None)]
struct Args {
    /// Path to a PlayStation BIOS image (e.g., SCPH1001.BIN)
    #[arg(short = 'b', long)]
    bios: PathBuf,

    /// Boot target: a disc image (.cue/.bin) or executable (.exe/.psexe);
    /// boots into the BIOS shell when omitted
    target: Option<String>,

    /// Settings file (TOML); defaults apply when omitted
    #[arg(short = 's', long)]
    settings: Option<PathBuf>,

    /// Number of frames to run
    #[arg(short = 'n', long, default_value = "600")]
    frames: u32,

    /// Write a save state here after the run
    #[arg(long)]
    save_state: Option<PathBuf>,
}

/// Host backed by the local filesystem
///
/// One BIOS file serves every region; region-keyed BIOS sets are a frontend
/// concern.
struct CliHost {
    settings: Settings,
    bios_path: PathBuf,
}

impl HostInterface for CliHost {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn bios_image(&self, region: ConsoleRegion) -> Option<Vec<u8>> {
        match std::fs::read(&self.bios_path) {
            Ok(image) => Some(image),
            Err(e) => {
                error!(
                    "Failed to read {region} BIOS from '{}': {e}",
                    self.bios_path.display()
                );
                None
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("corepsx v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::load(path)?
        }
        None => Settings::default(),
    };

    let host = Rc::new(CliHost {
        settings,
        bios_path: args.bios.clone(),
    });

    let mut system = System::new(host)?;

    match &args.target {
        Some(target) => info!("Booting '{target}'"),
        None => info!("Booting into the BIOS shell"),
    }
    if let Err(e) = system.boot(args.target.as_deref()) {
        error!("Boot failed: {e}");
        return Err(e);
    }

    info!(
        "Running {} frames ({} region)...",
        args.frames,
        system.region().map(|r| r.name()).unwrap_or("unknown")
    );

    let log_interval = (args.frames / 10).max(1);
    for i in 0..args.frames {
        if i % log_interval == 0 && i > 0 {
            info!(
                "Progress: {}/{} frames | ticks: {}",
                i,
                args.frames,
                system.global_tick_counter()
            );
        }

        if let Err(e) = system.run_frame() {
            error!("Execution failed at frame {}: {e}", system.frame_number());
            return Err(e);
        }
    }

    info!("Done: {} frames, {} ticks", args.frames, system.global_tick_counter());

    if let Some(path) = &args.save_state {
        let stream = system.save_state()?;
        SaveStateFile::new(system.frame_number(), stream)
            .save_to_file(path)
            .map_err(corepsx::core::error::EmulatorError::State)?;
        info!("Save state written to '{}'", path.display());
    }

    Ok(())
}
