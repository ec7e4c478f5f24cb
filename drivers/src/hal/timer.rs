//! Timer Hardware Abstraction Layer.
//!
//! This module defines platform-independent traits for general purpose
//! timers and for the free-running clock used to bound busy-waits.

use core::cell::Cell;

use bitflags::bitflags;

use crate::error::{Error, Field};
use crate::hal::interrupt::IrqNumber;

/// Timer operating mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TimerMode {
    /// Timer fires once after the specified interval.
    OneShot,
    /// Timer automatically reloads and fires periodically.
    #[default]
    Periodic,
    /// Timer drives its output pin with a duty cycle set by the match value.
    Pwm,
}

impl TryFrom<u8> for TimerMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TimerMode::OneShot),
            1 => Ok(TimerMode::Periodic),
            2 => Ok(TimerMode::Pwm),
            _ => Err(Error::InvalidParameter(Field::Mode)),
        }
    }
}

/// Counter width.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Width {
    /// Two independent 16-bit channels, A and B.
    Bits16,
    /// One concatenated 32-bit counter driven through channel A.
    #[default]
    Bits32,
}

impl TryFrom<u8> for Width {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            16 => Ok(Width::Bits16),
            32 => Ok(Width::Bits32),
            _ => Err(Error::InvalidParameter(Field::Width)),
        }
    }
}

/// Half of a split timer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Half {
    A,
    B,
}

impl Half {
    pub const fn index(self) -> usize {
        match self {
            Half::A => 0,
            Half::B => 1,
        }
    }
}

/// Interrupt trigger of a channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Counter reached its end value.
    Timeout,
    /// Counter reached the match value.
    Match,
}

bitflags! {
    /// Interrupt sources, laid out like the GPTM interrupt registers.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct TimerEvents: u32 {
        const TIMEOUT_A = 1 << 0;
        const MATCH_A = 1 << 4;
        const TIMEOUT_B = 1 << 8;
        const MATCH_B = 1 << 11;
    }
}

impl TimerEvents {
    /// Every source belonging to one half.
    pub const fn of(half: Half) -> Self {
        match half {
            Half::A => Self::TIMEOUT_A.union(Self::MATCH_A),
            Half::B => Self::TIMEOUT_B.union(Self::MATCH_B),
        }
    }

    pub const fn for_trigger(half: Half, trigger: Trigger) -> Self {
        match (half, trigger) {
            (Half::A, Trigger::Timeout) => Self::TIMEOUT_A,
            (Half::A, Trigger::Match) => Self::MATCH_A,
            (Half::B, Trigger::Timeout) => Self::TIMEOUT_B,
            (Half::B, Trigger::Match) => Self::MATCH_B,
        }
    }
}

/// General purpose timer block.
///
/// In 32-bit mode only the A registers are used.
pub trait Timer {
    fn power_on(&mut self);

    fn is_ready(&self) -> bool;

    /// Pulse the block's reset and gate its clock.
    fn power_off(&mut self);

    fn set_width(&mut self, width: Width);

    fn set_mode(&mut self, half: Half, mode: TimerMode);

    /// Interval load value, in prescaled ticks.
    fn set_load(&mut self, half: Half, load: u32);

    fn set_prescaler(&mut self, half: Half, prescaler: u8);

    fn set_match(&mut self, half: Half, value: u32);

    fn start(&mut self, half: Half);

    fn stop(&mut self, half: Half);

    fn is_running(&self, half: Half) -> bool;

    /// Enable interrupt sources at the timer.
    fn unmask(&mut self, events: TimerEvents);

    /// Disable interrupt sources at the timer.
    fn mask(&mut self, events: TimerEvents);

    /// Masked interrupt status.
    fn pending(&self) -> TimerEvents;

    /// Clear interrupt sources.
    fn clear(&mut self, events: TimerEvents);

    fn irq(&self, half: Half) -> IrqNumber;
}

/// Free-running clock.
pub trait CountingTimer {
    /// Read the current timer counter value in microseconds.
    ///
    /// This is a free-running counter that increments continuously.
    fn now_us(&self) -> u64;

    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Upper bound on how often a busy loop can sample the clock within one
    /// millisecond.
    fn polls_per_ms(&self) -> u64;
}

/// Millisecond deadline measured against a [`CountingTimer`].
///
/// Arithmetic is modulo 2^32 ms so a wrapping clock does not expire it.
/// Each check also counts as a poll; once `timeout_ms * polls_per_ms`
/// checks have been made the deadline has passed whether or not the clock
/// moved, so a clock that stands still cannot stall a wait.
pub struct Deadline<'a, C: CountingTimer> {
    clock: &'a C,
    start_ms: u32,
    timeout_ms: u32,
    polls: Cell<u64>,
    max_polls: u64,
}

impl<'a, C: CountingTimer> Deadline<'a, C> {
    pub fn new(clock: &'a C, timeout_ms: u32) -> Self {
        Self {
            clock,
            start_ms: clock.now_ms() as u32,
            timeout_ms,
            polls: Cell::new(0),
            max_polls: (timeout_ms as u64).saturating_mul(clock.polls_per_ms()),
        }
    }

    pub fn expired(&self) -> bool {
        let polls = self.polls.get() + 1;
        self.polls.set(polls);
        polls > self.max_polls
            || (self.clock.now_ms() as u32).wrapping_sub(self.start_ms) >= self.timeout_ms
    }

    /// Spin until `done` holds, or fail with [`Error::Timeout`].
    pub fn spin_until(&self, mut done: impl FnMut() -> bool) -> Result<(), Error> {
        while !done() {
            if self.expired() {
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }
        Ok(())
    }
}
