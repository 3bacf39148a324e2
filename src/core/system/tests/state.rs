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

//! Whole-system save/load

use super::super::super::error::{EmulatorError, StateError};
use super::fixtures::boot_default;

#[test]
fn test_save_load_round_trip_preserves_counters() {
    let mut system = boot_default();
    system.run_frame().unwrap();
    system.run_frame().unwrap();

    let saved = system.save_state().unwrap();
    let frame = system.frame_number();
    let ticks = system.global_tick_counter();

    let mut restored = boot_default();
    restored.load_state(saved).unwrap();

    assert_eq!(restored.frame_number(), frame);
    assert_eq!(restored.global_tick_counter(), ticks);
    assert_eq!(
        restored.internal_frame_number(),
        system.internal_frame_number()
    );
}

#[test]
fn test_load_reproduces_subsequent_execution() {
    let mut original = boot_default();
    original.run_frame().unwrap();
    original.run_frame().unwrap();
    let saved = original.save_state().unwrap();

    let mut restored = boot_default();
    restored.load_state(saved).unwrap();

    // Identical counters after any number of subsequent passes
    for _ in 0..3 {
        original.run_frame().unwrap();
        restored.run_frame().unwrap();
        assert_eq!(original.frame_number(), restored.frame_number());
        assert_eq!(
            original.global_tick_counter(),
            restored.global_tick_counter()
        );
    }

    // And the streams they produce stay identical too
    assert_eq!(
        original.save_state().unwrap(),
        restored.save_state().unwrap()
    );
}

#[test]
fn test_marker_mismatch_fails_load() {
    let mut system = boot_default();
    let mut saved = system.save_state().unwrap();

    // The stream opens with a length-prefixed "System" marker; damaging
    // the name must fail the load, not corrupt silently
    saved[4] = b'Z';
    let result = system.load_state(saved);
    assert!(matches!(
        result,
        Err(EmulatorError::State(StateError::MarkerMismatch { .. }))
    ));
}

#[test]
fn test_truncated_stream_fails_load() {
    let mut system = boot_default();
    let mut saved = system.save_state().unwrap();
    saved.truncate(saved.len() / 2);

    assert!(matches!(
        system.load_state(saved),
        Err(EmulatorError::State(StateError::UnexpectedEof))
    ));
}

#[test]
fn test_save_streams_are_deterministic() {
    let mut system = boot_default();
    system.run_frame().unwrap();

    let first = system.save_state().unwrap();
    let second = system.save_state().unwrap();
    assert_eq!(first, second);
}
