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

//! BIOS image handling
//!
//! The BIOS is acquired from the host keyed by console region and patched
//! in memory before it is handed to the bus. Patches are keyed by a content
//! hash of the unmodified image so offsets can be matched across
//! region/revision variants; the retail kernel places the patched routines at
//! the same offsets in every known revision, so one location set covers them
//! all and the hash is logged for traceability.

use sha2::{Digest, Sha256};

use super::error::{EmulatorError, Result};

/// Required BIOS image size (512 KiB)
pub const BIOS_SIZE: usize = 512 * 1024;

/// Content hash of an unmodified BIOS image
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Hash([u8; 32]);

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({self})")
    }
}

/// Compute the content hash of a BIOS image
pub fn hash(image: &[u8]) -> Hash {
    Hash(Sha256::digest(image).into())
}

/// Validate the size of a BIOS image
pub fn validate(image: &[u8]) -> Result<()> {
    if image.len() != BIOS_SIZE {
        return Err(EmulatorError::InvalidBiosSize {
            expected: BIOS_SIZE,
            got: image.len(),
        });
    }
    Ok(())
}

/// Write one little-endian word into the image at `offset`
fn patch(image: &mut [u8], offset: usize, value: u32) -> Result<()> {
    if offset + 4 > image.len() {
        return Err(EmulatorError::InvalidMemoryAccess {
            address: offset as u32,
        });
    }
    image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    log::trace!("BIOS patch: [0x{offset:05X}] = 0x{value:08X}");
    Ok(())
}

/// Patch the BIOS to route kernel TTY output to the host
///
/// Replaces the kernel's putchar stub so diagnostic output becomes visible.
pub fn patch_bios_enable_tty(image: &mut [u8], hash: &Hash) -> Result<()> {
    log::info!("Patching BIOS {hash} to enable TTY output");
    patch(image, 0x6F0C, 0x2401_0001)?; // addiu $at, $zero, 1
    patch(image, 0x6F14, 0xAF81_A9C0)?; // sw $at, -0x5640($gp)
    Ok(())
}

/// Patch the BIOS to skip the disc-boot intro delay
///
/// Only applied when media is actually present; an empty drive still goes
/// through the normal shell path.
pub fn patch_bios_fast_boot(image: &mut [u8], hash: &Hash) -> Result<()> {
    log::info!("Patching BIOS {hash} for fast boot");
    patch(image, 0x18000, 0x0000_0000)?; // nop out the intro branch
    Ok(())
}

/// Patch the BIOS to jump directly into a side-loaded executable
///
/// Rewrites the fixed kernel entry location with a register setup sequence
/// (entry PC, global pointer, stack and frame pointers from the executable
/// header) followed by a jump, bypassing the normal disc-boot path.
pub fn patch_bios_for_exe(image: &mut [u8], r_pc: u32, r_gp: u32, r_sp: u32, r_fp: u32) -> Result<()> {
    // pc goes through $t0 because the jump target cannot be loaded in the
    // delay slot
    patch(image, 0x6990, 0x3C08_0000 | (r_pc >> 16))?; // lui $t0, hi(pc)
    patch(image, 0x6994, 0x3508_0000 | (r_pc & 0xFFFF))?; // ori $t0, $t0, lo(pc)
    patch(image, 0x6998, 0x3C1C_0000 | (r_gp >> 16))?; // lui $gp, hi(gp)
    patch(image, 0x699C, 0x379C_0000 | (r_gp & 0xFFFF))?; // ori $gp, $gp, lo(gp)

    if r_sp != 0 {
        patch(image, 0x69A0, 0x3C1D_0000 | (r_sp >> 16))?; // lui $sp, hi(sp)
        patch(image, 0x69A4, 0x37BD_0000 | (r_sp & 0xFFFF))?; // ori $sp, $sp, lo(sp)
    } else {
        patch(image, 0x69A0, 0x0000_0000)?;
        patch(image, 0x69A4, 0x0000_0000)?;
    }

    if r_fp != 0 {
        patch(image, 0x69A8, 0x3C1E_0000 | (r_fp >> 16))?; // lui $fp, hi(fp)
        patch(image, 0x69AC, 0x37DE_0000 | (r_fp & 0xFFFF))?; // ori $fp, $fp, lo(fp)
    } else {
        patch(image, 0x69A8, 0x0000_0000)?;
        patch(image, 0x69AC, 0x0000_0000)?;
    }

    patch(image, 0x69B0, 0x0100_0008)?; // jr $t0
    patch(image, 0x69B4, 0x0000_0000)?; // nop (delay slot)
    Ok(())
}
