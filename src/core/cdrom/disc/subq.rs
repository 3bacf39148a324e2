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

//! Subchannel Q metadata
//!
//! Every sector carries a Q subchannel frame with control flags, track and
//! index numbers, relative and absolute timecode, and a CRC. Frames decoded
//! from real media can be corrupt; the replacement table maps absolute
//! sector addresses to corrected frames and is consulted before any raw or
//! synthesized read.

use std::collections::HashMap;

use bincode::{Decode, Encode};
use bitflags::bitflags;

use super::{Lba, Position, TrackMode};

bitflags! {
    /// Control bits in the upper nibble of the control/ADR byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u8 {
        /// Audio track recorded with pre-emphasis
        const AUDIO_PREEMPHASIS = 1 << 0;
        /// Digital copy permitted
        const DIGITAL_COPY_PERMITTED = 1 << 1;
        /// Data track
        const DATA = 1 << 2;
        /// Four-channel audio
        const FOUR_CHANNEL_AUDIO = 1 << 3;
    }
}

/// ADR value for position data (mode 1 Q frames)
pub const ADR_POSITION: u8 = 0x1;

/// Pack a binary value into BCD
pub fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Unpack a BCD value
pub fn from_bcd(value: u8) -> u8 {
    ((value >> 4) * 10) + (value & 0x0F)
}

/// CRC-16/CCITT over a Q frame's first ten bytes, bitwise-inverted
pub fn crc16(data: &[u8]) -> u16 {
    let mut value: u16 = 0;
    for &byte in data {
        value ^= (byte as u16) << 8;
        for _ in 0..8 {
            value = if value & 0x8000 != 0 {
                (value << 1) ^ 0x1021
            } else {
                value << 1
            };
        }
    }
    !value
}

/// One Q subchannel frame
///
/// Timecode fields are BCD-packed as they appear on the wire. The CRC covers
/// the ten preceding bytes.
///
/// # Example
///
/// ```
/// use corepsx::core::cdrom::disc::subq::SubChannelQ;
/// use corepsx::core::cdrom::disc::{Position, TrackMode};
///
/// let q = SubChannelQ::generate(
///     1,
///     1,
///     TrackMode::Mode2,
///     Position::from_frames(0),
///     Position::from_frames(150),
/// );
/// assert!(q.is_crc_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct SubChannelQ {
    /// Control flags (upper nibble) and ADR (lower nibble)
    pub control_and_adr: u8,

    /// Track number, BCD
    pub track_number_bcd: u8,

    /// Index number within the track, BCD
    pub index_number_bcd: u8,

    /// Timecode relative to the track start, BCD
    pub relative_minute_bcd: u8,
    pub relative_second_bcd: u8,
    pub relative_frame_bcd: u8,

    /// Reserved, always zero
    pub reserved: u8,

    /// Absolute disc timecode, BCD
    pub absolute_minute_bcd: u8,
    pub absolute_second_bcd: u8,
    pub absolute_frame_bcd: u8,

    /// CRC-16/CCITT of the preceding ten bytes, inverted
    pub crc: u16,
}

impl SubChannelQ {
    /// Synthesize a frame for a disc position
    pub fn generate(
        track_number: u8,
        index_number: u8,
        mode: TrackMode,
        relative: Position,
        absolute: Position,
    ) -> Self {
        let control = if mode.is_data() {
            ControlFlags::DATA
        } else {
            ControlFlags::empty()
        };

        let mut q = Self {
            control_and_adr: (control.bits() << 4) | ADR_POSITION,
            track_number_bcd: to_bcd(track_number),
            index_number_bcd: to_bcd(index_number),
            relative_minute_bcd: to_bcd(relative.minute),
            relative_second_bcd: to_bcd(relative.second),
            relative_frame_bcd: to_bcd(relative.frame),
            reserved: 0,
            absolute_minute_bcd: to_bcd(absolute.minute),
            absolute_second_bcd: to_bcd(absolute.second),
            absolute_frame_bcd: to_bcd(absolute.frame),
            crc: 0,
        };
        q.update_crc();
        q
    }

    /// The ten CRC-covered bytes in wire order
    fn crc_bytes(&self) -> [u8; 10] {
        [
            self.control_and_adr,
            self.track_number_bcd,
            self.index_number_bcd,
            self.relative_minute_bcd,
            self.relative_second_bcd,
            self.relative_frame_bcd,
            self.reserved,
            self.absolute_minute_bcd,
            self.absolute_second_bcd,
            self.absolute_frame_bcd,
        ]
    }

    /// Recompute and store the CRC
    pub fn update_crc(&mut self) {
        self.crc = crc16(&self.crc_bytes());
    }

    /// Integrity check
    pub fn is_crc_valid(&self) -> bool {
        self.crc == crc16(&self.crc_bytes())
    }

    /// Control flags from the upper nibble
    pub fn control(&self) -> ControlFlags {
        ControlFlags::from_bits_truncate(self.control_and_adr >> 4)
    }

    /// true when the frame describes a data track
    pub fn is_data(&self) -> bool {
        self.control().contains(ControlFlags::DATA)
    }
}

/// Sparse table of corrected Q frames, keyed by absolute sector address
///
/// Populated once at memory-image build time; entries take precedence over
/// raw or synthesized subchannel data for as long as the image lives.
#[derive(Default)]
pub struct SubChannelReplacement {
    map: HashMap<Lba, SubChannelQ>,
}

impl SubChannelReplacement {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of replaced sectors
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// true when no sector has a replacement
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Record a corrected frame for a sector
    ///
    /// The stored copy always carries a valid CRC, whatever state the input
    /// frame was in.
    pub fn add_replacement(&mut self, lba: Lba, mut subq: SubChannelQ) {
        subq.update_crc();
        self.map.insert(lba, subq);
    }

    /// Corrected frame for a sector, if one was recorded
    pub fn lookup(&self, lba: Lba) -> Option<SubChannelQ> {
        self.map.get(&lba).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_q() -> SubChannelQ {
        SubChannelQ::generate(
            1,
            1,
            TrackMode::Mode2,
            Position::from_frames(0),
            Position::from_frames(150),
        )
    }

    #[test]
    fn test_bcd_round_trip() {
        for value in 0..=99 {
            assert_eq!(from_bcd(to_bcd(value)), value);
        }
        assert_eq!(to_bcd(59), 0x59);
        assert_eq!(from_bcd(0x74), 74);
    }

    #[test]
    fn test_generated_frame_is_valid() {
        let q = sample_q();
        assert!(q.is_crc_valid());
        assert!(q.is_data());
        assert_eq!(q.control_and_adr & 0x0F, ADR_POSITION);
        assert_eq!(q.track_number_bcd, 0x01);
        assert_eq!(q.absolute_second_bcd, 0x02); // lba 0 = 00:02:00
    }

    #[test]
    fn test_audio_frame_has_no_data_flag() {
        let q = SubChannelQ::generate(
            2,
            1,
            TrackMode::Audio,
            Position::from_frames(0),
            Position::from_frames(300),
        );
        assert!(!q.is_data());
        assert!(q.is_crc_valid());
    }

    #[test]
    fn test_corruption_fails_crc() {
        let mut q = sample_q();
        q.track_number_bcd = 0x99;
        assert!(!q.is_crc_valid());
    }

    #[test]
    fn test_crc_is_position_sensitive() {
        let a = sample_q();
        let b = SubChannelQ::generate(
            1,
            1,
            TrackMode::Mode2,
            Position::from_frames(1),
            Position::from_frames(151),
        );
        assert_ne!(a.crc, b.crc);
    }

    #[test]
    fn test_replacement_corrects_crc() {
        let mut table = SubChannelReplacement::new();
        let mut corrupt = sample_q();
        corrupt.crc ^= 0xFFFF;
        assert!(!corrupt.is_crc_valid());

        table.add_replacement(42, corrupt);
        let stored = table.lookup(42).unwrap();
        assert!(stored.is_crc_valid());
        assert_eq!(stored.track_number_bcd, corrupt.track_number_bcd);
    }

    #[test]
    fn test_replacement_lookup_misses() {
        let mut table = SubChannelReplacement::new();
        assert!(table.is_empty());
        table.add_replacement(10, sample_q());
        assert_eq!(table.len(), 1);
        assert!(table.lookup(10).is_some());
        assert!(table.lookup(11).is_none());
    }
}
