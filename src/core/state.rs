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

//! Save state serialization
//!
//! A save state is a single ordered sequence of named section markers, one
//! per top-level counter group and one per hardware component, each marker
//! followed by that section's bincode-encoded payload. Save and load walk the
//! identical marker sequence, so the stream is self-describing: any marker
//! mismatch on load is a detected failure rather than silent corruption, and
//! a failure in any single section aborts the entire operation.
//!
//! # Example
//!
//! ```
//! use corepsx::core::state::StateWrapper;
//!
//! let mut sw = StateWrapper::for_write();
//! sw.marker("System").unwrap();
//! sw.write_payload(&42u64).unwrap();
//!
//! let mut sr = StateWrapper::for_read(sw.into_inner());
//! sr.marker("System").unwrap();
//! let ticks: u64 = sr.read_payload().unwrap();
//! assert_eq!(ticks, 42);
//! ```

use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::StateError;

/// Save state version for compatibility checking
///
/// Incremented whenever the on-disk wrapper format changes in a way that
/// breaks backward compatibility. The section markers inside the stream catch
/// structural differences between builds.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Direction of a state pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// Sequential reader/writer over the save-state stream
///
/// One wrapper instance is threaded through the orchestrator and every
/// component in a fixed order; the same code path drives both directions.
pub struct StateWrapper {
    mode: Mode,
    data: Vec<u8>,
    cursor: usize,
}

impl StateWrapper {
    /// Create a wrapper that serializes into a fresh buffer
    pub fn for_write() -> Self {
        Self {
            mode: Mode::Write,
            data: Vec::new(),
            cursor: 0,
        }
    }

    /// Create a wrapper that deserializes from an existing stream
    pub fn for_read(data: Vec<u8>) -> Self {
        Self {
            mode: Mode::Read,
            data,
            cursor: 0,
        }
    }

    /// Current pass direction
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// true when this pass restores state
    pub fn is_reading(&self) -> bool {
        self.mode == Mode::Read
    }

    /// Consume the wrapper and return the serialized stream
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Write or verify a named section marker
    ///
    /// On write the marker name is appended to the stream. On read the next
    /// marker is decoded and compared; a mismatch aborts the load.
    pub fn marker(&mut self, name: &str) -> Result<(), StateError> {
        match self.mode {
            Mode::Write => {
                self.write_bytes(name.as_bytes());
                Ok(())
            }
            Mode::Read => {
                let bytes = self.read_bytes()?;
                let found = String::from_utf8_lossy(&bytes).into_owned();
                if found != name {
                    return Err(StateError::MarkerMismatch {
                        expected: name.to_string(),
                        found,
                    });
                }
                Ok(())
            }
        }
    }

    /// Append one section payload (write mode only)
    pub fn write_payload<T: Encode>(&mut self, value: &T) -> Result<(), StateError> {
        debug_assert_eq!(self.mode, Mode::Write);
        let encoded = bincode::encode_to_vec(value, config::standard())
            .map_err(|e| StateError::Encode(e.to_string()))?;
        self.write_bytes(&encoded);
        Ok(())
    }

    /// Decode the next section payload (read mode only)
    pub fn read_payload<T: Decode<()>>(&mut self) -> Result<T, StateError> {
        debug_assert_eq!(self.mode, Mode::Read);
        let bytes = self.read_bytes()?;
        let (value, consumed): (T, usize) =
            bincode::decode_from_slice(&bytes, config::standard())
                .map_err(|e| StateError::Decode(e.to_string()))?;
        if consumed != bytes.len() {
            return Err(StateError::Decode(format!(
                "trailing bytes in section payload ({} of {} consumed)",
                consumed,
                bytes.len()
            )));
        }
        Ok(value)
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.data
            .extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.data.extend_from_slice(bytes);
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, StateError> {
        let len_end = self.cursor + 4;
        if len_end > self.data.len() {
            return Err(StateError::UnexpectedEof);
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.data[self.cursor..len_end]);
        let len = u32::from_le_bytes(len_bytes) as usize;

        let end = len_end + len;
        if end > self.data.len() {
            return Err(StateError::UnexpectedEof);
        }
        let bytes = self.data[len_end..end].to_vec();
        self.cursor = end;
        Ok(bytes)
    }
}

/// Trait for components whose state round-trips through a payload struct
///
/// Components convert themselves to a plain state struct for encoding and
/// restore themselves from a decoded one. `do_state_payload` drives both
/// directions through a [`StateWrapper`].
pub trait StateSave {
    /// The state payload type for this component
    type State: Encode + Decode<()>;

    /// Convert this component to a saveable state
    fn to_state(&self) -> Self::State;

    /// Restore this component from a saved state
    fn restore_from_state(&mut self, state: &Self::State);
}

/// Run one section payload pass for a [`StateSave`] component
pub fn do_state_payload<C: StateSave>(
    component: &mut C,
    sw: &mut StateWrapper,
) -> Result<(), StateError> {
    match sw.mode() {
        Mode::Write => {
            let state = component.to_state();
            sw.write_payload(&state)
        }
        Mode::Read => {
            let state: C::State = sw.read_payload()?;
            component.restore_from_state(&state);
            Ok(())
        }
    }
}

/// On-disk wrapper around a serialized state stream
///
/// Adds a version number and creation metadata around the opaque marker
/// stream. Loading a file with a different version fails with an error.
#[derive(Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct SaveStateFile {
    /// Version number for compatibility checking
    pub version: u32,

    /// Timestamp when the save state was created
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    /// Frame count at save time
    pub frame_count: u32,

    /// The serialized section stream
    pub data: Vec<u8>,
}

impl SaveStateFile {
    /// Wrap a serialized stream for writing to disk
    pub fn new(frame_count: u32, data: Vec<u8>) -> Self {
        Self {
            version: SAVE_STATE_VERSION,
            timestamp: Utc::now(),
            frame_count,
            data,
        }
    }

    /// Save state to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StateError> {
        let encoded = bincode::encode_to_vec(self, config::standard())
            .map_err(|e| StateError::Encode(e.to_string()))?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Load state from file, verifying version compatibility
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, StateError> {
        let buffer = std::fs::read(path)?;
        let (file, _): (SaveStateFile, usize) =
            bincode::decode_from_slice(&buffer, config::standard())
                .map_err(|e| StateError::Decode(e.to_string()))?;

        if file.version != SAVE_STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                got: file.version,
            });
        }

        Ok(file)
    }
}
