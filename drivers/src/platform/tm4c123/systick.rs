//! SysTick millisecond clock.
//!
//! SysTick interrupts once per millisecond and [`on_tick`] advances a
//! counter; the current count-down value adds sub-millisecond resolution.
//! While interrupts are masked the exception stays pending, so readers
//! take the tick themselves and the clock keeps moving.

use common::arch::arm::CortexMIrq;
use common::sync::IrqControl;

use crate::hal::timer::CountingTimer;
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{AtomicU32, Ordering};

const SYST_CSR: usize = 0xE000_E010;
const SYST_RVR: usize = 0xE000_E014;
const SYST_CVR: usize = 0xE000_E018;
const SCB_ICSR: usize = 0xE000_ED04;

const CSR_ENABLE: u32 = 1 << 0;
const CSR_TICKINT: u32 = 1 << 1;
const CSR_CLKSOURCE: u32 = 1 << 2;

const ICSR_PENDSTCLR: u32 = 1 << 25;
const ICSR_PENDSTSET: u32 = 1 << 26;

static MILLIS: AtomicU32 = AtomicU32::new(0);

/// SysTick exception handler body.
pub fn on_tick() {
    MILLIS.fetch_add(1, Ordering::Relaxed);
}

/// Account for a tick whose exception cannot run because interrupts are
/// masked. Ticks beyond one per call are lost, which only lengthens waits.
fn take_masked_tick() {
    if CortexMIrq::is_enabled() {
        return;
    }
    unsafe {
        if read_volatile(SCB_ICSR as *const u32) & ICSR_PENDSTSET != 0 {
            write_volatile(SCB_ICSR as *mut u32, ICSR_PENDSTCLR);
            on_tick();
        }
    }
}

#[derive(Debug)]
pub struct SysTickClock {
    ticks_per_ms: u32,
}

impl SysTickClock {
    /// # Safety
    ///
    /// Only one instance may exist.
    pub const unsafe fn new(sysclk: u32) -> Self {
        Self {
            ticks_per_ms: sysclk / 1000,
        }
    }

    /// Start the 1 kHz tick.
    pub fn start(&self) {
        unsafe {
            write_volatile(SYST_RVR as *mut u32, self.ticks_per_ms - 1);
            write_volatile(SYST_CVR as *mut u32, 0);
            write_volatile(
                SYST_CSR as *mut u32,
                CSR_CLKSOURCE | CSR_TICKINT | CSR_ENABLE,
            );
        }
    }
}

impl CountingTimer for SysTickClock {
    fn now_us(&self) -> u64 {
        take_masked_tick();
        // Re-read if a tick lands between the two reads
        loop {
            let ms = MILLIS.load(Ordering::Relaxed);
            let remaining = unsafe { read_volatile(SYST_CVR as *const u32) };
            if MILLIS.load(Ordering::Relaxed) == ms {
                let elapsed = self.ticks_per_ms.saturating_sub(remaining);
                let us = elapsed as u64 * 1000 / self.ticks_per_ms as u64;
                return ms as u64 * 1000 + us;
            }
        }
    }

    fn now_ms(&self) -> u64 {
        take_masked_tick();
        MILLIS.load(Ordering::Relaxed) as u64
    }

    /// A poll costs at least one core cycle.
    fn polls_per_ms(&self) -> u64 {
        self.ticks_per_ms as u64
    }
}
