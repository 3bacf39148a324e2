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

//! Memory-preloaded image build and read semantics

use proptest::prelude::*;

use super::super::super::super::error::DiscError;
use super::super::super::super::host::NullProgressCallback;
use super::super::{
    CdImage, Index, MemoryImage, Position, Track, TrackMode, RAW_SECTOR_SIZE,
};
use super::fixtures::{mixed_image, simple_image, TestImage};

fn build(source: &mut TestImage) -> Result<MemoryImage, DiscError> {
    MemoryImage::copy_image(source, &mut NullProgressCallback)
}

#[test]
fn test_mixed_geometry_build() {
    let mut source = mixed_image();
    let image = build(&mut source).unwrap();

    // The blank pregap contributes nothing: 100 + 200 real sectors
    assert_eq!(image.memory_sectors(), 300);
    assert_eq!(image.lba_count(), 450);
    assert_eq!(image.track_count(), 2);

    // Indices are re-based onto the flat buffer in index order
    let data = image.index(0).unwrap();
    assert_eq!(data.file_index, 0);
    assert_eq!(data.file_offset, 0);
    assert_eq!(data.file_sector_size, 2048);

    let pregap = image.index(1).unwrap();
    assert!(pregap.is_blank_pregap());

    let audio = image.index(2).unwrap();
    assert_eq!(audio.file_index, 0);
    assert_eq!(audio.file_offset, 100);

    // Ready state: cursor at the start of the first track
    assert_eq!(image.position(), 0);
    assert_eq!(image.current_track(), Some(1));
}

#[test]
fn test_copied_sectors_match_source() {
    let mut source = mixed_image();
    let mut image = build(&mut source).unwrap();
    let mut buffer = vec![0u8; RAW_SECTOR_SIZE];

    // Track 1 data comes from disc positions 0..100
    image.seek_lba(0).unwrap();
    image.read_raw_sector(&mut buffer).unwrap();
    assert_eq!(buffer[0], TestImage::pattern_byte(0));

    // Track 2 audio comes from disc positions 250..450
    image.seek(2, Position::ZERO).unwrap();
    image.read_raw_sector(&mut buffer).unwrap();
    assert_eq!(buffer[0], TestImage::pattern_byte(250));

    // Pregap sectors read as zeroes
    image.seek_lba(120).unwrap();
    image.read_raw_sector(&mut buffer).unwrap();
    assert!(buffer.iter().all(|&b| b == 0));
}

#[test]
fn test_single_read_failure_aborts_build() {
    let mut source = mixed_image();
    // One bad sector in the middle of the audio index
    source.fail_read_at(2, 57);

    assert!(matches!(
        build(&mut source),
        Err(DiscError::ReadError { lba: 57, index: 2 })
    ));
}

#[test]
fn test_out_of_range_read_performs_no_copy() {
    let mut source = simple_image(50);
    let mut image = build(&mut source).unwrap();

    let mut buffer = vec![0xAAu8; RAW_SECTOR_SIZE];
    let result = image.read_sector_from_index(&mut buffer, 0, 50);

    assert!(matches!(result, Err(DiscError::OutOfRange { sector: 50 })));
    assert!(buffer.iter().all(|&b| b == 0xAA));
}

#[test]
fn test_in_range_read_is_exact_copy() {
    let mut source = simple_image(50);
    let mut image = build(&mut source).unwrap();

    let mut buffer = vec![0u8; RAW_SECTOR_SIZE + 8];
    buffer[RAW_SECTOR_SIZE..].fill(0x55);
    image.read_sector_from_index(&mut buffer, 0, 7).unwrap();

    assert!(buffer[..RAW_SECTOR_SIZE]
        .iter()
        .all(|&b| b == TestImage::pattern_byte(7)));
    // Nothing beyond the fixed sector size is touched
    assert!(buffer[RAW_SECTOR_SIZE..].iter().all(|&b| b == 0x55));
}

#[test]
fn test_build_scan_repairs_corrupt_subchannel() {
    let mut source = mixed_image();
    source.corrupt_subq_at(3);
    source.corrupt_subq_at(260);

    let mut image = build(&mut source).unwrap();
    assert_eq!(image.replacement_count(), 2);

    // The corrected entry decodes cleanly at the corrupted addresses
    image.seek_lba(3).unwrap();
    let subq = image.read_sub_channel_q().unwrap();
    assert!(subq.is_crc_valid());

    // Untouched addresses still synthesize
    image.seek_lba(4).unwrap();
    assert!(image.read_sub_channel_q().unwrap().is_crc_valid());
}

#[test]
fn test_replacement_always_wins_over_raw() {
    let mut source = simple_image(20);
    let mut image = build(&mut source).unwrap();
    assert_eq!(image.replacement_count(), 0);

    // Inject a replacement whose index number cannot come from synthesis;
    // the raw frame at this address would decode fine
    image.seek_lba(5).unwrap();
    let mut marked = image.read_sub_channel_q().unwrap();
    marked.index_number_bcd = 0x77;
    image.add_subchannel_replacement(5, marked);

    image.seek_lba(5).unwrap();
    let subq = image.read_sub_channel_q().unwrap();
    assert_eq!(subq.index_number_bcd, 0x77);
    assert!(subq.is_crc_valid());
}

proptest! {
    /// Sector accounting holds for arbitrary index layouts: the copied
    /// sector count equals the sum of real index lengths, and rebuilt
    /// offsets are monotone and end exactly at that sum.
    #[test]
    fn prop_memory_image_accounting(spans in prop::collection::vec((1u32..40, prop::bool::ANY), 1..12)) {
        let mut indices = Vec::new();
        let mut disc_lba = 0u32;
        for (i, &(length, blank)) in spans.iter().enumerate() {
            // The first span stays real so track 1 has readable sectors
            let blank = blank && i != 0;
            indices.push(Index {
                track_number: 1,
                index_number: if i == 0 { 1 } else { i as u8 + 1 },
                file_index: 0,
                file_offset: disc_lba as u64,
                file_sector_size: if blank { 0 } else { RAW_SECTOR_SIZE as u32 },
                start_lba_on_disc: disc_lba,
                length,
                mode: TrackMode::Mode2,
            });
            disc_lba += length;
        }
        let tracks = vec![Track {
            number: 1,
            mode: TrackMode::Mode2,
            start_lba: 0,
            length: disc_lba,
        }];
        let expected: u32 = indices
            .iter()
            .filter(|index| !index.is_blank_pregap())
            .map(|index| index.length)
            .sum();

        let mut source = TestImage::new(tracks, indices, disc_lba);
        let image = build(&mut source).unwrap();

        prop_assert_eq!(image.memory_sectors(), expected);

        // Rebuilt offsets are monotone over real indices and end at the sum
        let mut cursor = 0u64;
        for id in 0..image.index_count() {
            let index = image.index(id).unwrap();
            prop_assert_eq!(index.file_index, 0);
            if !index.is_blank_pregap() {
                prop_assert_eq!(index.file_offset, cursor);
                cursor += index.length as u64;
            }
        }
        prop_assert_eq!(cursor, expected as u64);
    }
}
