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

//! Disc image abstraction
//!
//! Removable media is modeled as tracks subdivided into indices. An index
//! names the file that backs it, the sector offset inside that file, and a
//! per-sector byte size; a size of zero marks a virtual blank pregap with no
//! backing bytes. Concrete containers supply random sector access through
//! [`CdImage::read_sector_from_index`]; positioning, sequential reads and
//! subchannel synthesis are shared across containers.
//!
//! Two containers live here: the lazy file-backed cue/bin reader and the
//! memory-preloaded variant in [`memory`], which eagerly copies every real
//! sector and repairs corrupt subchannel data up front.

pub mod memory;
pub mod subq;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use self::subq::SubChannelQ;
use super::super::error::DiscError;

pub use self::memory::MemoryImage;

/// Logical block address: sequential sector index from the start of the disc
pub type Lba = u32;

/// Raw sector size in bytes
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Sectors per second at single speed
pub const FRAMES_PER_SECOND: u32 = 75;

/// Lead-in offset between absolute timecode and LBA 0 (two seconds)
pub const LEAD_IN_SECTORS: u32 = 2 * FRAMES_PER_SECOND;

/// Minutes/seconds/frames disc timecode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
}

impl Position {
    /// Timecode zero
    pub const ZERO: Position = Position {
        minute: 0,
        second: 0,
        frame: 0,
    };

    /// Build a timecode from a frame count
    pub fn from_frames(frames: u32) -> Self {
        let minute = frames / (60 * FRAMES_PER_SECOND);
        let remainder = frames % (60 * FRAMES_PER_SECOND);
        Self {
            minute: minute as u8,
            second: (remainder / FRAMES_PER_SECOND) as u8,
            frame: (remainder % FRAMES_PER_SECOND) as u8,
        }
    }

    /// Total frame count of this timecode
    pub fn total_frames(&self) -> u32 {
        (self.minute as u32) * 60 * FRAMES_PER_SECOND
            + (self.second as u32) * FRAMES_PER_SECOND
            + self.frame as u32
    }

    /// Absolute timecode for a disc LBA (includes the two-second lead-in)
    pub fn from_disc_lba(lba: Lba) -> Self {
        Self::from_frames(lba + LEAD_IN_SECTORS)
    }

    /// Disc LBA for an absolute timecode
    ///
    /// Returns `None` for timecodes inside the lead-in.
    pub fn to_disc_lba(&self) -> Option<Lba> {
        self.total_frames().checked_sub(LEAD_IN_SECTORS)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minute, self.second, self.frame)
    }
}

/// Track data mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    /// CD-DA audio
    Audio,
    /// Mode 1 data
    Mode1,
    /// Mode 2 data (XA)
    Mode2,
}

impl TrackMode {
    /// true for data tracks
    pub fn is_data(&self) -> bool {
        !matches!(self, TrackMode::Audio)
    }
}

/// One logical CD track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track {
    /// Track number (1-99)
    pub number: u8,

    /// Data mode
    pub mode: TrackMode,

    /// Disc LBA of the track's index 1
    pub start_lba: Lba,

    /// Length in sectors from index 1 to the end of the track
    pub length: u32,
}

/// A sub-range of a track backed by one stretch of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    /// Owning track number
    pub track_number: u8,

    /// Index number within the track (0 = pregap)
    pub index_number: u8,

    /// Identifier of the backing file
    pub file_index: usize,

    /// Sector offset into the backing file
    pub file_offset: u64,

    /// Bytes per sector in the backing file; `0` marks a virtual blank
    /// pregap with no backing bytes
    pub file_sector_size: u32,

    /// Disc LBA where this index starts
    pub start_lba_on_disc: Lba,

    /// Length in sectors
    pub length: u32,

    /// Data mode, copied from the owning track
    pub mode: TrackMode,
}

impl Index {
    /// true when this index has no backing bytes
    pub fn is_blank_pregap(&self) -> bool {
        self.file_sector_size == 0
    }

    /// true when the index covers the given disc LBA
    pub fn contains(&self, lba: Lba) -> bool {
        lba >= self.start_lba_on_disc && lba < self.start_lba_on_disc + self.length
    }
}

/// Shared track/index geometry and read cursor
///
/// Containers own a layout and delegate positioning to it; only raw sector
/// retrieval differs per container.
pub struct ImageLayout {
    file_name: String,
    tracks: Vec<Track>,
    indices: Vec<Index>,
    lba_count: Lba,

    position_on_disc: Lba,
    current_index: Option<usize>,
    lba_in_index: Lba,
}

impl ImageLayout {
    /// Build a layout and place the cursor at the start of the first track
    ///
    /// # Errors
    ///
    /// Fails if the geometry has no tracks or the first track start cannot
    /// be seeked to.
    pub fn new(
        file_name: String,
        tracks: Vec<Track>,
        indices: Vec<Index>,
        lba_count: Lba,
    ) -> Result<Self, DiscError> {
        if tracks.is_empty() || indices.is_empty() {
            return Err(DiscError::ParseError {
                path: file_name,
                reason: "image has no tracks".to_string(),
            });
        }

        let mut layout = Self {
            file_name,
            tracks,
            indices,
            lba_count,
            position_on_disc: 0,
            current_index: None,
            lba_in_index: 0,
        };
        layout.seek(1, Position::ZERO)?;
        Ok(layout)
    }

    /// Name of the image source
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Total sectors on the disc, blank pregaps included
    pub fn lba_count(&self) -> Lba {
        self.lba_count
    }

    /// Number of tracks
    pub fn track_count(&self) -> u8 {
        self.tracks.len() as u8
    }

    /// Track by number (1-based)
    pub fn track(&self, number: u8) -> Option<&Track> {
        self.tracks.get(number.checked_sub(1)? as usize)
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Index by identifier
    pub fn index(&self, id: u32) -> Option<&Index> {
        self.indices.get(id as usize)
    }

    /// Current absolute position
    pub fn position(&self) -> Lba {
        self.position_on_disc
    }

    /// Identifier of the index under the cursor
    pub fn current_index_id(&self) -> Option<u32> {
        self.current_index.map(|i| i as u32)
    }

    /// Cursor offset within the current index
    pub fn lba_in_index(&self) -> Lba {
        self.lba_in_index
    }

    /// Track number under the cursor
    pub fn current_track(&self) -> Option<u8> {
        self.current_index.map(|i| self.indices[i].track_number)
    }

    fn index_for_lba(&self, lba: Lba) -> Option<usize> {
        self.indices.iter().position(|index| index.contains(lba))
    }

    /// Move the cursor to an absolute sector address
    ///
    /// # Errors
    ///
    /// Returns a normal failure when no index covers the address.
    pub fn seek_lba(&mut self, lba: Lba) -> Result<(), DiscError> {
        let index_id = self.index_for_lba(lba).ok_or(DiscError::OutOfRange {
            sector: lba as u64,
        })?;
        self.current_index = Some(index_id);
        self.lba_in_index = lba - self.indices[index_id].start_lba_on_disc;
        self.position_on_disc = lba;
        Ok(())
    }

    /// Move the cursor to a position within a track
    ///
    /// # Errors
    ///
    /// Returns a failure for unknown tracks or positions past the track end.
    pub fn seek(&mut self, track: u8, position: Position) -> Result<(), DiscError> {
        let t = *self.track(track).ok_or(DiscError::InvalidSeek { track })?;
        let lba = t.start_lba + position.total_frames();
        if position.total_frames() >= t.length {
            return Err(DiscError::InvalidSeek { track });
        }
        self.seek_lba(lba)
    }

    /// Advance the cursor by one sector
    pub fn advance(&mut self) {
        self.position_on_disc += 1;
        self.lba_in_index += 1;

        if let Some(i) = self.current_index {
            if self.lba_in_index >= self.indices[i].length {
                if i + 1 < self.indices.len() {
                    self.current_index = Some(i + 1);
                    self.lba_in_index = 0;
                } else {
                    // Ran off the end of the disc; subsequent reads fail
                    self.current_index = None;
                }
            }
        }
    }

    /// Synthesize the Q frame for the cursor position
    ///
    /// # Errors
    ///
    /// Fails when the cursor is past the end of the disc.
    pub fn subq_for_position(&self) -> Result<SubChannelQ, DiscError> {
        let index = self
            .current_index
            .map(|i| &self.indices[i])
            .ok_or(DiscError::OutOfRange {
                sector: self.position_on_disc as u64,
            })?;
        let track = self
            .track(index.track_number)
            .ok_or(DiscError::InvalidSeek {
                track: index.track_number,
            })?;

        // Inside a pregap the relative timecode counts down to the track
        // start; past it, up from the start.
        let relative = track.start_lba.abs_diff(self.position_on_disc);

        Ok(SubChannelQ::generate(
            index.track_number,
            index.index_number,
            index.mode,
            Position::from_frames(relative),
            Position::from_disc_lba(self.position_on_disc),
        ))
    }
}

/// Random sector/subchannel access to a disc image
///
/// Containers implement raw retrieval ([`CdImage::read_sector_from_index`])
/// and expose their shared [`ImageLayout`]; everything else is provided.
pub trait CdImage {
    /// Shared geometry and cursor
    fn layout(&self) -> &ImageLayout;

    /// Shared geometry and cursor, mutable
    fn layout_mut(&mut self) -> &mut ImageLayout;

    /// Copy one raw sector out of an index
    ///
    /// `buffer` receives exactly [`RAW_SECTOR_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// An out-of-range computed sector number is a normal failure result and
    /// performs no copy.
    fn read_sector_from_index(
        &mut self,
        buffer: &mut [u8],
        index_id: u32,
        lba_in_index: Lba,
    ) -> Result<(), DiscError>;

    /// Name of the image source
    fn file_name(&self) -> &str {
        self.layout().file_name()
    }

    /// Total sectors on the disc
    fn lba_count(&self) -> Lba {
        self.layout().lba_count()
    }

    /// Number of tracks
    fn track_count(&self) -> u8 {
        self.layout().track_count()
    }

    /// Track by number (1-based)
    fn track(&self, number: u8) -> Option<&Track> {
        self.layout().track(number)
    }

    /// Number of indices
    fn index_count(&self) -> u32 {
        self.layout().index_count()
    }

    /// Index by identifier
    fn index(&self, id: u32) -> Option<&Index> {
        self.layout().index(id)
    }

    /// Current absolute position
    fn position(&self) -> Lba {
        self.layout().position()
    }

    /// Track number under the cursor
    fn current_track(&self) -> Option<u8> {
        self.layout().current_track()
    }

    /// Move the cursor to an absolute sector address
    fn seek_lba(&mut self, lba: Lba) -> Result<(), DiscError> {
        self.layout_mut().seek_lba(lba)
    }

    /// Move the cursor to a position within a track
    fn seek(&mut self, track: u8, position: Position) -> Result<(), DiscError> {
        self.layout_mut().seek(track, position)
    }

    /// Read the sector under the cursor and advance
    ///
    /// Blank pregap sectors read as zeroes.
    ///
    /// # Errors
    ///
    /// Fails when the cursor is past the end of the disc or the backing
    /// store cannot be read.
    fn read_raw_sector(&mut self, buffer: &mut [u8]) -> Result<(), DiscError> {
        let (index_id, lba_in_index, blank) = {
            let layout = self.layout();
            let index_id = layout.current_index_id().ok_or(DiscError::OutOfRange {
                sector: layout.position() as u64,
            })?;
            let blank = layout
                .index(index_id)
                .is_some_and(Index::is_blank_pregap);
            (index_id, layout.lba_in_index(), blank)
        };

        if blank {
            buffer[..RAW_SECTOR_SIZE].fill(0);
        } else {
            self.read_sector_from_index(buffer, index_id, lba_in_index)?;
        }

        self.layout_mut().advance();
        Ok(())
    }

    /// Q subchannel frame for the cursor position
    ///
    /// The base behavior synthesizes the frame from the geometry; the
    /// memory-preloaded container intercepts this with its replacement
    /// table.
    fn read_sub_channel_q(&mut self) -> Result<SubChannelQ, DiscError> {
        self.layout().subq_for_position()
    }
}

/// One track described by a cue sheet
struct CueTrack {
    number: u8,
    mode: TrackMode,
    /// Virtual pregap ahead of the file indices, in sectors
    pregap: u32,
    /// (index number, file LBA) pairs in sheet order
    file_indices: Vec<(u8, Lba)>,
}

/// File-backed cue/bin image with lazy sector reads
///
/// # Example
///
/// ```no_run
/// use corepsx::core::cdrom::disc::{CdImage, CueBinImage};
///
/// let disc = CueBinImage::open("game.cue").unwrap();
/// assert!(disc.track_count() >= 1);
/// ```
pub struct CueBinImage {
    layout: ImageLayout,
    file: File,
}

impl CueBinImage {
    /// Open a cue sheet and its single backing bin file
    ///
    /// # Errors
    ///
    /// Fails when the sheet cannot be parsed or either file cannot be
    /// opened.
    pub fn open<P: AsRef<Path>>(cue_path: P) -> Result<Self, DiscError> {
        let cue_path = cue_path.as_ref();
        let text = std::fs::read_to_string(cue_path).map_err(|e| DiscError::OpenError {
            path: cue_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let (bin_path, cue_tracks) = Self::parse_cue(&text, cue_path)?;

        let file = File::open(&bin_path).map_err(|e| DiscError::OpenError {
            path: bin_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file_sectors =
            (file.metadata().map(|m| m.len()).unwrap_or(0) / RAW_SECTOR_SIZE as u64) as Lba;

        let (tracks, indices, lba_count) =
            Self::build_geometry(&cue_tracks, file_sectors, cue_path)?;

        log::info!(
            "Opened cue/bin image '{}': {} tracks, {} sectors",
            cue_path.display(),
            tracks.len(),
            lba_count
        );

        let layout = ImageLayout::new(
            cue_path.display().to_string(),
            tracks,
            indices,
            lba_count,
        )?;
        Ok(Self { layout, file })
    }

    /// Open a bare bin/img file as one Mode 2 data track
    ///
    /// A standard two-second blank pregap is synthesized ahead of the data.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or is not sector-aligned.
    pub fn open_bin<P: AsRef<Path>>(bin_path: P) -> Result<Self, DiscError> {
        let bin_path = bin_path.as_ref();
        let file = File::open(bin_path).map_err(|e| DiscError::OpenError {
            path: bin_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        if len == 0 || len % RAW_SECTOR_SIZE as u64 != 0 {
            return Err(DiscError::ParseError {
                path: bin_path.display().to_string(),
                reason: format!("{len} bytes is not a whole number of raw sectors"),
            });
        }
        let file_sectors = (len / RAW_SECTOR_SIZE as u64) as Lba;

        let tracks = vec![Track {
            number: 1,
            mode: TrackMode::Mode2,
            start_lba: LEAD_IN_SECTORS,
            length: file_sectors,
        }];
        let indices = vec![
            Index {
                track_number: 1,
                index_number: 0,
                file_index: 0,
                file_offset: 0,
                file_sector_size: 0,
                start_lba_on_disc: 0,
                length: LEAD_IN_SECTORS,
                mode: TrackMode::Mode2,
            },
            Index {
                track_number: 1,
                index_number: 1,
                file_index: 0,
                file_offset: 0,
                file_sector_size: RAW_SECTOR_SIZE as u32,
                start_lba_on_disc: LEAD_IN_SECTORS,
                length: file_sectors,
                mode: TrackMode::Mode2,
            },
        ];

        log::info!(
            "Opened raw image '{}': {} sectors",
            bin_path.display(),
            file_sectors
        );

        let layout = ImageLayout::new(
            bin_path.display().to_string(),
            tracks,
            indices,
            LEAD_IN_SECTORS + file_sectors,
        )?;
        Ok(Self { layout, file })
    }

    /// Parse a cue sheet into its backing file and per-track entries
    fn parse_cue(
        text: &str,
        cue_path: &Path,
    ) -> Result<(std::path::PathBuf, Vec<CueTrack>), DiscError> {
        let parse_error = |reason: String| DiscError::ParseError {
            path: cue_path.display().to_string(),
            reason,
        };

        let mut bin_path = None;
        let mut tracks: Vec<CueTrack> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            let mut words = line.split_whitespace();
            match words.next() {
                Some("FILE") => {
                    if bin_path.is_some() {
                        return Err(parse_error("multi-file sheets are not supported".into()));
                    }
                    let name = line
                        .split('"')
                        .nth(1)
                        .ok_or_else(|| parse_error("FILE without a quoted name".into()))?;
                    let path = match cue_path.parent() {
                        Some(parent) => parent.join(name),
                        None => std::path::PathBuf::from(name),
                    };
                    bin_path = Some(path);
                }
                Some("TRACK") => {
                    let number: u8 = words
                        .next()
                        .and_then(|w| w.parse().ok())
                        .ok_or_else(|| parse_error("TRACK without a number".into()))?;
                    let mode = match words.next() {
                        Some("AUDIO") => TrackMode::Audio,
                        Some("MODE1/2352") => TrackMode::Mode1,
                        Some("MODE2/2352") => TrackMode::Mode2,
                        other => {
                            return Err(parse_error(format!(
                                "unsupported track type {other:?}"
                            )))
                        }
                    };
                    tracks.push(CueTrack {
                        number,
                        mode,
                        pregap: 0,
                        file_indices: Vec::new(),
                    });
                }
                Some("PREGAP") => {
                    let track = tracks
                        .last_mut()
                        .ok_or_else(|| parse_error("PREGAP before any TRACK".into()))?;
                    track.pregap = Self::parse_msf(words.next(), cue_path)?.total_frames();
                }
                Some("INDEX") => {
                    let track = tracks
                        .last_mut()
                        .ok_or_else(|| parse_error("INDEX before any TRACK".into()))?;
                    let number: u8 = words
                        .next()
                        .and_then(|w| w.parse().ok())
                        .ok_or_else(|| parse_error("INDEX without a number".into()))?;
                    let position = Self::parse_msf(words.next(), cue_path)?;
                    track.file_indices.push((number, position.total_frames()));
                }
                // REM, CATALOG, FLAGS etc. carry nothing we model
                _ => {}
            }
        }

        let bin_path = bin_path.ok_or_else(|| parse_error("no FILE directive".into()))?;
        if tracks.is_empty() {
            return Err(parse_error("no TRACK directives".into()));
        }
        for track in &tracks {
            if !track.file_indices.iter().any(|(n, _)| *n == 1) {
                return Err(parse_error(format!("track {} has no INDEX 01", track.number)));
            }
        }

        Ok((bin_path, tracks))
    }

    /// Parse an MM:SS:FF timecode field
    fn parse_msf(word: Option<&str>, cue_path: &Path) -> Result<Position, DiscError> {
        let parse_error = || DiscError::ParseError {
            path: cue_path.display().to_string(),
            reason: format!("invalid MSF timecode {word:?}"),
        };

        let word = word.ok_or_else(parse_error)?;
        let mut parts = word.split(':');
        let minute = parts.next().and_then(|p| p.parse().ok());
        let second = parts.next().and_then(|p| p.parse().ok());
        let frame = parts.next().and_then(|p| p.parse().ok());
        match (minute, second, frame, parts.next()) {
            (Some(minute), Some(second), Some(frame), None) => Ok(Position {
                minute,
                second,
                frame,
            }),
            _ => Err(parse_error()),
        }
    }

    /// Lay the parsed tracks out on the disc
    ///
    /// File indices get their lengths from the distance to the next file
    /// index (or the end of the file); virtual pregaps are interleaved at
    /// their disc positions without consuming file sectors.
    fn build_geometry(
        cue_tracks: &[CueTrack],
        file_sectors: Lba,
        cue_path: &Path,
    ) -> Result<(Vec<Track>, Vec<Index>, Lba), DiscError> {
        // Flatten (track slot, index number, file LBA) to compute lengths
        let flat: Vec<(usize, u8, Lba)> = cue_tracks
            .iter()
            .enumerate()
            .flat_map(|(slot, t)| {
                t.file_indices
                    .iter()
                    .map(move |&(number, file_lba)| (slot, number, file_lba))
            })
            .collect();

        for window in flat.windows(2) {
            if window[1].2 < window[0].2 {
                return Err(DiscError::ParseError {
                    path: cue_path.display().to_string(),
                    reason: "INDEX positions must not decrease".to_string(),
                });
            }
        }
        if let Some(&(_, _, last_lba)) = flat.last() {
            if last_lba > file_sectors {
                return Err(DiscError::ParseError {
                    path: cue_path.display().to_string(),
                    reason: "INDEX position past the end of the file".to_string(),
                });
            }
        }

        let length_of = |flat_pos: usize| -> u32 {
            let (_, _, file_lba) = flat[flat_pos];
            match flat.get(flat_pos + 1) {
                Some(&(_, _, next_lba)) => next_lba - file_lba,
                None => file_sectors - file_lba,
            }
        };

        let mut tracks = Vec::new();
        let mut indices = Vec::new();
        let mut disc_lba: Lba = 0;
        let mut flat_pos = 0;

        for cue_track in cue_tracks {
            if cue_track.pregap > 0 {
                indices.push(Index {
                    track_number: cue_track.number,
                    index_number: 0,
                    file_index: 0,
                    file_offset: 0,
                    file_sector_size: 0,
                    start_lba_on_disc: disc_lba,
                    length: cue_track.pregap,
                    mode: cue_track.mode,
                });
                disc_lba += cue_track.pregap;
            }

            let mut start_lba = disc_lba;
            for &(index_number, file_lba) in &cue_track.file_indices {
                let length = length_of(flat_pos);
                flat_pos += 1;

                if index_number == 1 {
                    start_lba = disc_lba;
                }
                indices.push(Index {
                    track_number: cue_track.number,
                    index_number,
                    file_index: 0,
                    file_offset: file_lba as u64,
                    file_sector_size: RAW_SECTOR_SIZE as u32,
                    start_lba_on_disc: disc_lba,
                    length,
                    mode: cue_track.mode,
                });
                disc_lba += length;
            }

            tracks.push(Track {
                number: cue_track.number,
                mode: cue_track.mode,
                start_lba,
                length: disc_lba - start_lba,
            });
        }

        Ok((tracks, indices, disc_lba))
    }
}

impl CdImage for CueBinImage {
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
        let index = *self.layout.index(index_id).ok_or(DiscError::ReadError {
            lba: lba_in_index,
            index: index_id,
        })?;
        if lba_in_index >= index.length {
            return Err(DiscError::OutOfRange {
                sector: index.file_offset + lba_in_index as u64,
            });
        }

        let byte_offset =
            (index.file_offset + lba_in_index as u64) * index.file_sector_size as u64;
        self.file
            .seek(SeekFrom::Start(byte_offset))
            .and_then(|_| self.file.read_exact(&mut buffer[..RAW_SECTOR_SIZE]))
            .map_err(|e| {
                log::error!(
                    "Sector read failed at LBA {lba_in_index} in index {index_id}: {e}"
                );
                DiscError::ReadError {
                    lba: lba_in_index,
                    index: index_id,
                }
            })
    }
}

/// Open a disc image by path, dispatching on the container extension
///
/// # Errors
///
/// Unknown containers and unreadable files are I/O-class failures carrying
/// the offending path.
pub fn open_image<P: AsRef<Path>>(path: P) -> Result<Box<dyn CdImage>, DiscError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("cue") => Ok(Box::new(CueBinImage::open(path)?)),
        Some("bin") | Some("img") => Ok(Box::new(CueBinImage::open_bin(path)?)),
        _ => Err(DiscError::UnsupportedFormat(path.display().to_string())),
    }
}

#[cfg(test)]
pub(crate) mod tests;
