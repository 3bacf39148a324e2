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

//! Memory-preloaded disc image
//!
//! [`MemoryImage::copy_image`] eagerly copies every real sector of a source
//! image into one flat buffer, rebuilds the index list against that single
//! backing store, and scans the whole disc for corrupt subchannel data once,
//! recording corrected frames in the replacement table. The build is
//! all-or-nothing: any single failure aborts it and no partially valid image
//! is ever handed out. After the build the sector buffer is immutable; only
//! the replacement table can grow, through externally supplied corrections.

use super::super::super::error::DiscError;
use super::super::super::host::ProgressCallback;
use super::subq::{SubChannelQ, SubChannelReplacement};
use super::{CdImage, ImageLayout, Index, Lba, Track, RAW_SECTOR_SIZE};

/// Disc image held entirely in memory
///
/// # Example
///
/// ```no_run
/// use corepsx::core::cdrom::disc::{open_image, CdImage, MemoryImage};
/// use corepsx::core::host::NullProgressCallback;
///
/// let mut source = open_image("game.cue").unwrap();
/// let preloaded =
///     MemoryImage::copy_image(source.as_mut(), &mut NullProgressCallback).unwrap();
/// assert_eq!(preloaded.lba_count(), source.lba_count());
/// ```
pub struct MemoryImage {
    layout: ImageLayout,

    /// One contiguous buffer of raw sectors, immutable after the build
    sectors: Vec<u8>,

    /// Number of real sectors in the buffer
    memory_sectors: u32,

    /// Corrected subchannel frames, consulted before synthesis
    replacement: SubChannelReplacement,
}

impl MemoryImage {
    /// Build a memory image from a source image
    ///
    /// Blank pregap indices contribute no sectors and keep their zero size;
    /// real indices are re-based onto the flat buffer with monotonically
    /// increasing offsets. The cursor ends at the start of the first track.
    ///
    /// # Errors
    ///
    /// - address-space overflow while sizing the buffer and allocation
    ///   failure are resource-exhaustion errors, reported before any copy;
    /// - any single sector read failure aborts the whole build.
    pub fn copy_image(
        source: &mut dyn CdImage,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Self, DiscError> {
        let source_indices: Vec<Index> = (0..source.index_count())
            .filter_map(|i| source.index(i).copied())
            .collect();

        // Total real sectors; blank pregaps contribute nothing
        let memory_sectors: u32 = source_indices
            .iter()
            .filter(|index| !index.is_blank_pregap())
            .map(|index| index.length)
            .sum();

        let total_bytes = (RAW_SECTOR_SIZE as u64)
            .checked_mul(memory_sectors as u64)
            .filter(|&bytes| bytes < usize::MAX as u64)
            .ok_or(DiscError::AddressSpaceExceeded {
                sectors: memory_sectors,
            })?;

        progress.set_status_text(&format!(
            "Allocating memory for {memory_sectors} sectors..."
        ));

        let mut sectors = Vec::new();
        if sectors.try_reserve_exact(total_bytes as usize).is_err() {
            progress.display_error(&format!(
                "Failed to allocate memory for {memory_sectors} sectors"
            ));
            return Err(DiscError::OutOfMemory {
                sectors: memory_sectors,
            });
        }
        sectors.resize(total_bytes as usize, 0);

        progress.set_status_text("Preloading CD image to RAM...");
        progress.set_progress_range(memory_sectors);
        progress.set_progress_value(0);

        let mut sectors_read: u32 = 0;
        for (index_id, index) in source_indices.iter().enumerate() {
            if index.is_blank_pregap() {
                continue;
            }

            for lba_in_index in 0..index.length {
                let offset = sectors_read as usize * RAW_SECTOR_SIZE;
                source.read_sector_from_index(
                    &mut sectors[offset..offset + RAW_SECTOR_SIZE],
                    index_id as u32,
                    lba_in_index,
                )?;
                sectors_read += 1;
                progress.set_progress_value(sectors_read);
            }
        }

        let tracks: Vec<Track> = (1..=source.track_count())
            .filter_map(|number| source.track(number).copied())
            .collect();

        // Re-base every index onto the flat buffer (file 0); blank indices
        // keep their zero size
        let mut current_offset: u32 = 0;
        let indices: Vec<Index> = source_indices
            .iter()
            .map(|source_index| {
                let mut index = *source_index;
                index.file_index = 0;
                if !index.is_blank_pregap() {
                    index.file_offset = current_offset as u64;
                    current_offset += index.length;
                }
                index
            })
            .collect();

        assert_eq!(
            current_offset, memory_sectors,
            "rebuilt index offsets must end exactly at the copied sector count"
        );

        progress.set_status_text("Looking for invalid subchannel data...");

        let lba_count = source.lba_count();
        let mut replacement = SubChannelReplacement::new();
        for lba in 0..lba_count {
            if source.seek_lba(lba).is_err() {
                continue;
            }
            if let Ok(subq) = source.read_sub_channel_q() {
                if !subq.is_crc_valid() {
                    replacement.add_replacement(lba, subq);
                }
            }
        }
        if !replacement.is_empty() {
            log::info!(
                "Replaced invalid subchannel data for {} sectors",
                replacement.len()
            );
        }

        let layout = ImageLayout::new(
            source.file_name().to_string(),
            tracks,
            indices,
            lba_count,
        )?;

        Ok(Self {
            layout,
            sectors,
            memory_sectors,
            replacement,
        })
    }

    /// Number of real sectors held in memory
    pub fn memory_sectors(&self) -> u32 {
        self.memory_sectors
    }

    /// Number of sectors with corrected subchannel data
    pub fn replacement_count(&self) -> usize {
        self.replacement.len()
    }

    /// Record an externally supplied subchannel correction
    ///
    /// Used for corrections shipped alongside an image (e.g. sbi data).
    /// Entries take precedence over synthesized frames for the life of the
    /// image.
    pub fn add_subchannel_replacement(&mut self, lba: Lba, subq: SubChannelQ) {
        self.replacement.add_replacement(lba, subq);
    }
}

impl CdImage for MemoryImage {
    fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    fn layout_mut(&mut self) -> &mut ImageLayout {
        &mut self.layout
    }

    fn read_sector_from_index(
        &mut self,
        buffer: &mut [u8],
        index_id: u32,
        lba_in_index: Lba,
    ) -> Result<(), DiscError> {
        let index = self
            .layout
            .index(index_id)
            .ok_or(DiscError::ReadError {
                lba: lba_in_index,
                index: index_id,
            })?;

        let sector_number = index.file_offset + lba_in_index as u64;
        if sector_number >= self.memory_sectors as u64 {
            return Err(DiscError::OutOfRange {
                sector: sector_number,
            });
        }

        let offset = sector_number as usize * RAW_SECTOR_SIZE;
        buffer[..RAW_SECTOR_SIZE].copy_from_slice(&self.sectors[offset..offset + RAW_SECTOR_SIZE]);
        Ok(())
    }

    fn read_sub_channel_q(&mut self) -> Result<SubChannelQ, DiscError> {
        // A replacement entry always wins over synthesized data
        if let Some(subq) = self.replacement.lookup(self.layout.position()) {
            return Ok(subq);
        }
        self.layout.subq_for_position()
    }
}
