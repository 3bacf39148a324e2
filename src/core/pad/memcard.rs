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

//! Memory card images
//!
//! A card is a 128 KiB flash image. Opening a card either loads an existing
//! image file (which must be exactly card-sized) or formats a fresh one and
//! writes it out. A single card failing to open is a soft degradation: the
//! caller leaves that slot empty instead of failing the whole update.

use std::path::{Path, PathBuf};

use super::super::error::{EmulatorError, Result};

/// Memory card image size (128 KiB)
pub const CARD_SIZE: usize = 128 * 1024;

/// Sector (frame) size within the card
pub const FRAME_SIZE: usize = 128;

/// One memory card image
///
/// # Example
///
/// ```no_run
/// use corepsx::core::pad::memcard::MemoryCard;
///
/// let card = MemoryCard::open("slot_a.mcd").unwrap();
/// assert!(card.is_formatted());
/// ```
pub struct MemoryCard {
    path: PathBuf,
    data: Vec<u8>,
}

impl MemoryCard {
    /// Open a card image, formatting a fresh one if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file has the wrong size or cannot be
    /// read, or if a fresh image cannot be written.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let data = std::fs::read(&path)?;
            if data.len() != CARD_SIZE {
                return Err(EmulatorError::MemoryCard(format!(
                    "'{}' is {} bytes, expected {}",
                    path.display(),
                    data.len(),
                    CARD_SIZE
                )));
            }
            log::info!("Loaded memory card '{}'", path.display());
            return Ok(Self { path, data });
        }

        let data = Self::format_image();
        std::fs::write(&path, &data)?;
        log::info!("Formatted new memory card '{}'", path.display());
        Ok(Self { path, data })
    }

    /// Build a freshly formatted card image
    ///
    /// The header frame carries the "MC" tag and its XOR checksum in the
    /// last byte; data frames stay zeroed.
    fn format_image() -> Vec<u8> {
        let mut data = vec![0u8; CARD_SIZE];
        data[0] = b'M';
        data[1] = b'C';
        data[FRAME_SIZE - 1] = Self::frame_checksum(&data[..FRAME_SIZE - 1]);
        data
    }

    /// XOR checksum over a frame's payload bytes
    fn frame_checksum(payload: &[u8]) -> u8 {
        payload.iter().fold(0, |acc, b| acc ^ b)
    }

    /// true when the header frame carries a valid tag and checksum
    pub fn is_formatted(&self) -> bool {
        self.data[0] == b'M'
            && self.data[1] == b'C'
            && self.data[FRAME_SIZE - 1] == Self::frame_checksum(&self.data[..FRAME_SIZE - 1])
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Card image contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Write the image back to its backing file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn flush(&self) -> Result<()> {
        std::fs::write(&self.path, &self.data)?;
        Ok(())
    }
}
