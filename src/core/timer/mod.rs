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

//! Timers
//!
//! Three 16-bit counter channels driven from the shared tick quantum. Each
//! channel counts toward a target value and raises its own interrupt when
//! the target is reached, then wraps. Dotclock/hblank clock sources are the
//! video core's concern; here every channel counts system clock ticks.

use std::cell::RefCell;
use std::rc::Rc;

use bincode::{Decode, Encode};

use super::component::Component;
use super::error::StateError;
use super::interrupt::{interrupts, InterruptController};
use super::state::{do_state_payload, StateSave, StateWrapper};
use super::timing::TickCount;

/// Number of timer channels
pub const NUM_TIMERS: usize = 3;

const TIMER_IRQS: [u16; NUM_TIMERS] = [
    interrupts::TIMER0,
    interrupts::TIMER1,
    interrupts::TIMER2,
];

/// One timer channel
#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct TimerChannel {
    /// Current counter value
    pub counter: u32,

    /// Target value; reaching it wraps the counter
    pub target: u32,

    /// Raise an interrupt when the target is reached
    pub irq_on_target: bool,
}

impl TimerChannel {
    fn new() -> Self {
        Self {
            counter: 0,
            // Free-running 16-bit counter until a target is programmed
            target: 0x1_0000,
            irq_on_target: false,
        }
    }
}

/// Serialized timer state
#[derive(Encode, Decode)]
pub struct TimersState {
    channels: [TimerChannel; NUM_TIMERS],
}

/// Timer block
///
/// # Example
///
/// ```
/// use corepsx::core::component::Component;
/// use corepsx::core::timer::Timers;
///
/// let mut timers = Timers::new();
/// timers.set_target(0, 100, true);
/// timers.execute(100);
/// assert_eq!(timers.counter(0), 0); // wrapped at target
/// ```
pub struct Timers {
    /// Interrupt controller handle, wired during initialization
    interrupt_controller: Option<Rc<RefCell<InterruptController>>>,

    channels: [TimerChannel; NUM_TIMERS],
}

impl Timers {
    /// Create a new timer block
    pub fn new() -> Self {
        Self {
            interrupt_controller: None,
            channels: [TimerChannel::new(); NUM_TIMERS],
        }
    }

    /// Wire the interrupt controller
    pub fn initialize(&mut self, interrupt_controller: Rc<RefCell<InterruptController>>) {
        self.interrupt_controller = Some(interrupt_controller);
    }

    /// Program a channel target
    pub fn set_target(&mut self, channel: usize, target: u32, irq_on_target: bool) {
        let ch = &mut self.channels[channel];
        ch.target = target.max(1);
        ch.irq_on_target = irq_on_target;
        log::debug!("Timer {channel} target={target} irq={irq_on_target}");
    }

    /// Current counter value of a channel
    pub fn counter(&self, channel: usize) -> u32 {
        self.channels[channel].counter
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Timers {
    type State = TimersState;

    fn to_state(&self) -> Self::State {
        TimersState {
            channels: self.channels,
        }
    }

    fn restore_from_state(&mut self, state: &Self::State) {
        self.channels = state.channels;
    }
}

impl Component for Timers {
    fn reset(&mut self) {
        self.channels = [TimerChannel::new(); NUM_TIMERS];
    }

    fn execute(&mut self, ticks: TickCount) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            let mut remaining = ticks as u32;
            while remaining > 0 {
                let to_target = ch.target - ch.counter;
                if remaining >= to_target {
                    remaining -= to_target;
                    ch.counter = 0;
                    if ch.irq_on_target {
                        if let Some(ic) = &self.interrupt_controller {
                            ic.borrow_mut().request(TIMER_IRQS[i]);
                        }
                    }
                } else {
                    ch.counter += remaining;
                    remaining = 0;
                }
            }
        }
    }

    fn ticks_until_event(&self) -> TickCount {
        self.channels
            .iter()
            .filter(|ch| ch.irq_on_target)
            .map(|ch| (ch.target - ch.counter) as TickCount)
            .min()
            .unwrap_or(TickCount::MAX)
    }

    fn do_state(&mut self, sw: &mut StateWrapper) -> Result<(), StateError> {
        do_state_payload(self, sw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timers_with_irq() -> (Timers, Rc<RefCell<InterruptController>>) {
        let ic = Rc::new(RefCell::new(InterruptController::new()));
        ic.borrow_mut().write_mask(0xFFFF);
        let mut timers = Timers::new();
        timers.initialize(ic.clone());
        (timers, ic)
    }

    #[test]
    fn test_counting_toward_target() {
        let (mut timers, ic) = timers_with_irq();
        timers.set_target(0, 1000, true);

        timers.execute(999);
        assert_eq!(timers.counter(0), 999);
        assert!(!ic.borrow().is_pending());

        timers.execute(1);
        assert_eq!(timers.counter(0), 0);
        assert_eq!(ic.borrow().read_status(), interrupts::TIMER0 as u32);
    }

    #[test]
    fn test_per_channel_irqs() {
        let (mut timers, ic) = timers_with_irq();
        timers.set_target(1, 10, true);
        timers.set_target(2, 20, true);

        timers.execute(10);
        assert_eq!(ic.borrow().read_status(), interrupts::TIMER1 as u32);

        timers.execute(10);
        assert_eq!(
            ic.borrow().read_status(),
            (interrupts::TIMER1 | interrupts::TIMER2) as u32
        );
    }

    #[test]
    fn test_quantum_spanning_multiple_targets() {
        let (mut timers, _ic) = timers_with_irq();
        timers.set_target(0, 100, false);

        // 250 ticks = two wraps + 50
        timers.execute(250);
        assert_eq!(timers.counter(0), 50);
    }

    #[test]
    fn test_ticks_until_event_ignores_silent_channels() {
        let (mut timers, _ic) = timers_with_irq();
        assert_eq!(timers.ticks_until_event(), TickCount::MAX);

        timers.set_target(0, 500, false);
        assert_eq!(timers.ticks_until_event(), TickCount::MAX);

        timers.set_target(1, 300, true);
        timers.execute(100);
        assert_eq!(timers.ticks_until_event(), 200);
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let (mut timers, _ic) = timers_with_irq();
        timers.set_target(0, 50, true);
        timers.execute(30);
        timers.reset();
        assert_eq!(timers.counter(0), 0);
        assert_eq!(timers.ticks_until_event(), TickCount::MAX);
    }

    #[test]
    fn test_state_round_trip() {
        let (mut timers, _ic) = timers_with_irq();
        timers.set_target(2, 400, true);
        timers.execute(150);

        let mut sw = StateWrapper::for_write();
        timers.do_state(&mut sw).unwrap();

        let mut restored = Timers::new();
        let mut sr = StateWrapper::for_read(sw.into_inner());
        restored.do_state(&mut sr).unwrap();

        assert_eq!(restored.counter(2), 150);
        assert_eq!(restored.ticks_until_event(), 250);
    }
}
