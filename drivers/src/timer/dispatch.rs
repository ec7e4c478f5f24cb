//! Interrupt-context callback dispatch.
//!
//! Application callbacks run inside the timer interrupt. They return a
//! `Result`; a failure is recorded in a [`FaultLog`] for the foreground to
//! drain and never reaches the interrupt epilogue. Heap allocation is
//! suppressed for the duration of the call.

use alloc::boxed::Box;
use core::sync::atomic::{AtomicU32, Ordering};

use common::sync::{IrqControl, IrqSpinLock, NoAllocGuard};
use log::debug;

use crate::hal::timer::{Half, TimerEvents};

/// What a callback learns about the interrupt that invoked it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimerEvent {
    pub unit: usize,
    pub half: Half,
    /// Sources that fired, already cleared at the timer.
    pub events: TimerEvents,
}

/// Failure reported by a callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallbackFault {
    pub code: u32,
}

impl CallbackFault {
    pub const fn new(code: u32) -> Self {
        Self { code }
    }
}

/// Interrupt-context callback.
///
/// Must not allocate and must not wait on foreground state.
pub type Callback = Box<dyn FnMut(&TimerEvent) -> Result<(), CallbackFault> + Send>;

/// Fault counters shared between the interrupt and the foreground.
pub struct FaultLog {
    total: AtomicU32,
    unread: AtomicU32,
    last: AtomicU32,
}

impl FaultLog {
    pub const fn new() -> Self {
        Self {
            total: AtomicU32::new(0),
            unread: AtomicU32::new(0),
            last: AtomicU32::new(0),
        }
    }

    pub fn record(&self, code: u32) {
        self.last.store(code, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
        self.unread.fetch_add(1, Ordering::Release);
    }

    /// Faults recorded since boot.
    pub fn total(&self) -> u32 {
        self.total.load(Ordering::Relaxed)
    }

    /// Faults since the last call and the most recent code.
    pub fn take(&self) -> Option<(u32, u32)> {
        match self.unread.swap(0, Ordering::Acquire) {
            0 => None,
            count => Some((count, self.last.load(Ordering::Relaxed))),
        }
    }
}

impl Default for FaultLog {
    fn default() -> Self {
        Self::new()
    }
}

struct SlotState {
    callback: Option<Callback>,
    armed: bool,
    /// Bumped by every registration.
    generation: u32,
    /// Callback replaced while it was running, dropped by the foreground.
    retired: Option<Callback>,
}

/// Storage for one registered callback.
///
/// The interrupt takes the callback out while it runs so the lock is not
/// held across application code. If the callback was replaced in the
/// meantime it is parked in `retired` instead of being put back, so the
/// interrupt never frees memory.
pub struct CallbackSlot<I: IrqControl> {
    state: IrqSpinLock<SlotState, I>,
}

impl<I: IrqControl> CallbackSlot<I> {
    pub const fn new() -> Self {
        Self {
            state: IrqSpinLock::new(SlotState {
                callback: None,
                armed: false,
                generation: 0,
                retired: None,
            }),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.with(|s| s.armed)
    }

    /// Install `callback` (or clear the slot).
    ///
    /// Returns the callbacks displaced, for the caller to drop outside the
    /// lock.
    pub fn replace(&self, callback: Option<Callback>) -> [Option<Callback>; 2] {
        self.state.with(|s| {
            s.generation = s.generation.wrapping_add(1);
            s.armed = callback.is_some();
            [
                core::mem::replace(&mut s.callback, callback),
                s.retired.take(),
            ]
        })
    }

    /// Run the callback, if any. Interrupt context only.
    ///
    /// Returns whether a callback ran.
    pub fn dispatch(&self, event: &TimerEvent, faults: &FaultLog) -> bool {
        let (callback, generation) = self.state.with(|s| (s.callback.take(), s.generation));
        let Some(mut callback) = callback else {
            return false;
        };

        let result = {
            let _no_alloc = NoAllocGuard::new();
            callback(event)
        };
        if let Err(fault) = result {
            faults.record(fault.code);
            debug!(
                "Timer{} {:?}: callback fault {:#x}",
                event.unit, event.half, fault.code
            );
        }

        self.state.with(|s| {
            if s.generation == generation {
                s.callback = Some(callback);
            } else if s.retired.is_none() {
                s.retired = Some(callback);
            } else {
                // Two replacements during one call; leak rather than free here.
                core::mem::forget(callback);
            }
        });
        true
    }
}

impl<I: IrqControl> Default for CallbackSlot<I> {
    fn default() -> Self {
        Self::new()
    }
}
