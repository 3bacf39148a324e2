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

/// Emulator error types
use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the emulator
///
/// Every cross-component call returns an explicit success/failure outcome;
/// the orchestrator is the sole decision point for abort-vs-continue.
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("BIOS image not available for region {0}")]
    BiosNotFound(String),

    #[error("Invalid BIOS size: {got} bytes (expected {expected})")]
    InvalidBiosSize { expected: usize, got: usize },

    #[error("Invalid memory access at 0x{address:08X}")]
    InvalidMemoryAccess { address: u32 },

    #[error("Unaligned memory access: {size}-byte access at 0x{address:08X}")]
    UnalignedAccess { address: u32, size: u8 },

    #[error("Invalid system state: {0}")]
    InvalidState(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    #[error("Disc error: {0}")]
    Disc(#[from] DiscError),

    #[error("Save state error: {0}")]
    State(#[from] StateError),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Memory card error: {0}")]
    MemoryCard(String),
}

/// GPU-specific error types
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Rendering backend error: {0}")]
    BackendError(String),
}

/// Disc-image-specific error types
#[derive(Error, Debug)]
pub enum DiscError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to open image '{path}': {reason}")]
    OpenError { path: String, reason: String },

    #[error("Failed to parse image '{path}': {reason}")]
    ParseError { path: String, reason: String },

    #[error("Read error at LBA {lba} in index {index}")]
    ReadError { lba: u32, index: u32 },

    #[error("Sector {sector} out of range")]
    OutOfRange { sector: u64 },

    #[error("Image of {sectors} sectors exceeds the address space")]
    AddressSpaceExceeded { sectors: u32 },

    #[error("Failed to allocate memory for {sectors} sectors")]
    OutOfMemory { sectors: u32 },

    #[error("Invalid seek target: track {track}")]
    InvalidSeek { track: u8 },

    #[error("No disc inserted")]
    NoDisc,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Save-state stream errors
///
/// A marker mismatch means the stream comes from a structurally different
/// build and must be treated as incompatible; the load is aborted with no
/// partial restore.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("State marker mismatch: expected '{expected}', found '{found}'")]
    MarkerMismatch { expected: String, found: String },

    #[error("Truncated state stream")]
    UnexpectedEof,

    #[error("Failed to encode state section: {0}")]
    Encode(String),

    #[error("Failed to decode state section: {0}")]
    Decode(String),

    #[error("Incompatible save state version: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
