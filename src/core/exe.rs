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

//! PS-EXE executable format
//!
//! PS-EXE files carry a fixed 2048-byte header immediately followed by the
//! program body, which is copied verbatim to the load address:
//!
//! ```text
//! 0x00-0x07: "PS-X EXE" magic
//! 0x08-0x0F: padding
//! 0x10-0x13: Initial PC (entry point)
//! 0x14-0x17: Initial GP (global pointer)
//! 0x18-0x1B: Load address
//! 0x1C-0x1F: Body size (excluding header)
//! 0x20-0x27: Reserved
//! 0x28-0x2B: Zero-fill region start
//! 0x2C-0x2F: Zero-fill region size
//! 0x30-0x33: Stack base
//! 0x34-0x37: Stack offset
//! 0x38-0x4B: Reserved
//! 0x4C-0x7FF: Marker/padding
//! 0x800+:    Program body
//! ```
//!
//! All fields are little-endian 32-bit words. Decoding goes field by field
//! through explicit offsets rather than through in-memory layout assumptions.

use super::error::{EmulatorError, Result};

/// Fixed PS-EXE header size
pub const HEADER_SIZE: usize = 0x800;

/// Identifying tag at the start of every PS-EXE
pub const MAGIC: &[u8; 8] = b"PS-X EXE";

/// Decoded PS-EXE header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExeHeader {
    /// Initial program counter (entry point)
    pub initial_pc: u32,

    /// Initial global pointer (GP register, r28)
    pub initial_gp: u32,

    /// Load address in RAM
    pub load_address: u32,

    /// Program body size in bytes, excluding the header
    pub file_size: u32,

    /// Start of the region zero-filled before the body copy
    pub memfill_start: u32,

    /// Size of the zero-fill region in bytes
    pub memfill_size: u32,

    /// Stack base address
    pub initial_sp_base: u32,

    /// Stack offset from base
    pub initial_sp_offset: u32,
}

impl ExeHeader {
    /// Decode a header from the first [`HEADER_SIZE`] bytes of a file
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than a header or the magic
    /// tag does not match.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(EmulatorError::Loader(format!(
                "file too small for a PS-EXE header ({} bytes)",
                data.len()
            )));
        }

        if &data[0..8] != MAGIC {
            return Err(EmulatorError::Loader("bad PS-EXE magic".to_string()));
        }

        Ok(Self {
            initial_pc: read_word(data, 0x10),
            initial_gp: read_word(data, 0x14),
            load_address: read_word(data, 0x18),
            file_size: read_word(data, 0x1C),
            memfill_start: read_word(data, 0x28),
            memfill_size: read_word(data, 0x2C),
            initial_sp_base: read_word(data, 0x30),
            initial_sp_offset: read_word(data, 0x34),
        })
    }
}

fn read_word(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Check whether a path names a directly bootable executable
pub fn is_ps_exe(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".exe") || lower.ends_with(".psexe")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal valid header buffer for tests
    pub(crate) fn make_header(
        pc: u32,
        gp: u32,
        load_address: u32,
        file_size: u32,
        sp_base: u32,
        sp_offset: u32,
    ) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..8].copy_from_slice(MAGIC);
        data[0x10..0x14].copy_from_slice(&pc.to_le_bytes());
        data[0x14..0x18].copy_from_slice(&gp.to_le_bytes());
        data[0x18..0x1C].copy_from_slice(&load_address.to_le_bytes());
        data[0x1C..0x20].copy_from_slice(&file_size.to_le_bytes());
        data[0x30..0x34].copy_from_slice(&sp_base.to_le_bytes());
        data[0x34..0x38].copy_from_slice(&sp_offset.to_le_bytes());
        data
    }

    #[test]
    fn test_header_parsing() {
        let mut data = make_header(0x8001_0000, 0x8002_0000, 0x8001_0000, 0x100, 0x801F_FF00, 0);
        data[0x28..0x2C].copy_from_slice(&0x8003_0000u32.to_le_bytes());
        data[0x2C..0x30].copy_from_slice(&0x40u32.to_le_bytes());

        let header = ExeHeader::parse(&data).unwrap();
        assert_eq!(header.initial_pc, 0x8001_0000);
        assert_eq!(header.initial_gp, 0x8002_0000);
        assert_eq!(header.load_address, 0x8001_0000);
        assert_eq!(header.file_size, 0x100);
        assert_eq!(header.memfill_start, 0x8003_0000);
        assert_eq!(header.memfill_size, 0x40);
        assert_eq!(header.initial_sp_base, 0x801F_FF00);
        assert_eq!(header.initial_sp_offset, 0);
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..8].copy_from_slice(b"INVALID!");
        assert!(ExeHeader::parse(&data).is_err());
    }

    #[test]
    fn test_too_small() {
        assert!(ExeHeader::parse(&[0u8; 0x100]).is_err());
    }

    #[test]
    fn test_is_ps_exe() {
        assert!(is_ps_exe("game.exe"));
        assert!(is_ps_exe("GAME.EXE"));
        assert!(is_ps_exe("demo.psexe"));
        assert!(!is_ps_exe("game.cue"));
        assert!(!is_ps_exe("game.bin"));
    }
}
