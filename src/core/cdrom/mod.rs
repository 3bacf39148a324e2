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

//! CD-ROM drive
//!
//! The drive owns the media slot and pumps sectors out of the disc image at
//! single- or double-speed intervals while a read is in progress. Each
//! delivered sector comes with its Q subchannel frame and raises the CD-ROM
//! data-ready interrupt. Command/response FIFO protocol belongs to the drive
//! firmware core and is out of scope here.

pub mod disc;

use std::cell::RefCell;
use std::rc::Rc;

use bincode::{Decode, Encode};

use self::disc::subq::SubChannelQ;
use self::disc::{CdImage, Lba, Position, RAW_SECTOR_SIZE};
use super::component::Component;
use super::error::{DiscError, StateError};
use super::interrupt::{interrupts, InterruptController};
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::{TickCount, TICKS_PER_SECTOR_SINGLE_SPEED};

/// Serialized drive state
///
/// Media content stays outside the stream; the drive re-seeks the inserted
/// image to the saved position on restore.
#[derive(Encode, Decode)]
pub struct CdromState {
    position: Lba,
    reading: bool,
    double_speed: bool,
    read_countdown: TickCount,
    sectors_delivered: u64,
}

/// CD-ROM drive
///
/// # Example
///
/// ```no_run
/// use corepsx::core::cdrom::{disc::open_image, Cdrom};
///
/// let mut drive = Cdrom::new();
/// drive.insert_media(open_image("game.cue").unwrap());
/// assert!(drive.has_media());
/// ```
pub struct Cdrom {
    /// Interrupt controller handle, wired during initialization
    interrupt_controller: Option<Rc<RefCell<InterruptController>>>,

    /// Inserted media, exclusively owned by the drive
    media: Option<Box<dyn CdImage>>,

    /// Sector pump active
    reading: bool,

    /// Double-speed read mode
    double_speed: bool,

    /// Ticks until the next sector passes under the laser
    read_countdown: TickCount,

    /// Last sector delivered by the pump
    sector_buffer: Vec<u8>,

    /// Q frame accompanying the last delivered sector
    last_subq: Option<SubChannelQ>,

    /// Sectors delivered since reset
    sectors_delivered: u64,
}

impl Cdrom {
    /// Create a drive with an empty tray
    pub fn new() -> Self {
        Self {
            interrupt_controller: None,
            media: None,
            reading: false,
            double_speed: false,
            read_countdown: 0,
            sector_buffer: vec![0u8; RAW_SECTOR_SIZE],
            last_subq: None,
            sectors_delivered: 0,
        }
    }

    /// Wire the interrupt controller
    pub fn initialize(&mut self, interrupt_controller: Rc<RefCell<InterruptController>>) {
        self.interrupt_controller = Some(interrupt_controller);
    }

    /// Insert media, replacing whatever was in the tray
    pub fn insert_media(&mut self, image: Box<dyn CdImage>) {
        log::info!("Inserted media '{}'", image.file_name());
        self.media = Some(image);
        self.stop_reading();
    }

    /// Remove the media, returning it to the caller
    pub fn remove_media(&mut self) -> Option<Box<dyn CdImage>> {
        if let Some(image) = &self.media {
            log::info!("Removed media '{}'", image.file_name());
        }
        self.stop_reading();
        self.media.take()
    }

    /// true when media is inserted
    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }

    /// Inserted media, if any
    pub fn media(&self) -> Option<&dyn CdImage> {
        self.media.as_deref()
    }

    /// Seek the drive to a position within a track
    ///
    /// # Errors
    ///
    /// Fails with [`DiscError::NoDisc`] on an empty tray or a normal seek
    /// failure from the disc layer.
    pub fn seek(&mut self, track: u8, position: Position) -> Result<(), DiscError> {
        let media = self.media.as_deref_mut().ok_or(DiscError::NoDisc)?;
        media.seek(track, position)
    }

    /// Start the sector pump from the current position
    ///
    /// # Errors
    ///
    /// Fails with [`DiscError::NoDisc`] on an empty tray.
    pub fn start_reading(&mut self) -> Result<(), DiscError> {
        if self.media.is_none() {
            return Err(DiscError::NoDisc);
        }
        self.reading = true;
        self.read_countdown = self.sector_interval();
        log::debug!(
            "Read started at {} speed",
            if self.double_speed { "2x" } else { "1x" }
        );
        Ok(())
    }

    /// Stop the sector pump
    pub fn stop_reading(&mut self) {
        self.reading = false;
        self.read_countdown = 0;
    }

    /// true while the sector pump runs
    pub fn is_reading(&self) -> bool {
        self.reading
    }

    /// Select single- or double-speed reads
    pub fn set_double_speed(&mut self, double_speed: bool) {
        self.double_speed = double_speed;
    }

    /// Sectors delivered since reset
    pub fn sectors_delivered(&self) -> u64 {
        self.sectors_delivered
    }

    /// Last sector delivered by the pump
    pub fn sector_buffer(&self) -> &[u8] {
        &self.sector_buffer
    }

    /// Q frame of the last delivered sector
    pub fn last_subq(&self) -> Option<&SubChannelQ> {
        self.last_subq.as_ref()
    }

    fn sector_interval(&self) -> TickCount {
        if self.double_speed {
            TICKS_PER_SECTOR_SINGLE_SPEED / 2
        } else {
            TICKS_PER_SECTOR_SINGLE_SPEED
        }
    }

    /// Deliver one sector and its subchannel frame
    fn pump_sector(&mut self) {
        let Some(media) = self.media.as_deref_mut() else {
            self.stop_reading();
            return;
        };

        // Subchannel first: it describes the sector about to be read
        match media.read_sub_channel_q() {
            Ok(subq) => self.last_subq = Some(subq),
            Err(e) => log::warn!("Subchannel read failed: {e}"),
        }

        match media.read_raw_sector(&mut self.sector_buffer) {
            Ok(()) => {
                self.sectors_delivered += 1;
                if let Some(ic) = &self.interrupt_controller {
                    ic.borrow_mut().request(interrupts::CDROM);
                }
            }
            Err(e) => {
                log::warn!("Sector read failed, stopping drive: {e}");
                self.stop_reading();
            }
        }
    }
}

impl Default for Cdrom {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Cdrom {
    type State = CdromState;

    fn to_state(&self) -> Self::State {
        CdromState {
            position: self.media.as_deref().map(|m| m.position()).unwrap_or(0),
            reading: self.reading,
            double_speed: self.double_speed,
            read_countdown: self.read_countdown,
            sectors_delivered: self.sectors_delivered,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.reading = state.reading;
        self.double_speed = state.double_speed;
        self.read_countdown = state.read_countdown;
        self.sectors_delivered = state.sectors_delivered;

        if let Some(media) = self.media.as_deref_mut() {
            if let Err(e) = media.seek_lba(state.position) {
                log::warn!("Could not restore drive position {}: {e}", state.position);
                self.stop_reading();
            }
        } else if self.reading {
            // The stream expects media the tray does not hold
            log::warn!("Restored a reading drive with no media; stopping");
            self.stop_reading();
        }
    }
}

impl Component for Cdrom {
    fn reset(&mut self) {
        // Media stays in the tray; the drive itself returns to idle
        self.stop_reading();
        self.double_speed = false;
        self.sector_buffer.fill(0);
        self.last_subq = None;
        self.sectors_delivered = 0;

        if let Some(media) = self.media.as_deref_mut() {
            if let Err(e) = media.seek(1, Position::ZERO) {
                log::warn!("Could not park drive at track 1: {e}");
            }
        }
    }

    fn execute(&mut self, ticks: TickCount) {
        if !self.reading {
            return;
        }

        self.read_countdown -= ticks;
        while self.read_countdown <= 0 && self.reading {
            self.pump_sector();
            self.read_countdown += self.sector_interval();
        }
    }

    fn ticks_until_event(&self) -> TickCount {
        if self.reading {
            self.read_countdown.max(1)
        } else {
            TickCount::MAX
        }
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}
