//! TM4C123 System Control: peripheral clock gating and reset.
//!
//! Each peripheral class has a run-mode clock gating register (RCGC), a
//! ready register (PR) and, for most classes, a software reset register
//! (SR), with one bit per instance.

use core::ptr::{read_volatile, write_volatile};

/// System control base address.
pub const SYSCTL_BASE: usize = 0x400F_E000;

/// Register offsets of one peripheral class.
#[derive(Debug, Copy, Clone)]
pub struct Gate {
    rcgc: usize,
    pr: usize,
    sr: Option<usize>,
}

pub const TIMER: Gate = Gate {
    rcgc: 0x604,
    pr: 0xA04,
    sr: Some(0x504),
};

pub const GPIO: Gate = Gate {
    rcgc: 0x608,
    pr: 0xA08,
    sr: Some(0x508),
};

pub const UDMA: Gate = Gate {
    rcgc: 0x60C,
    pr: 0xA0C,
    sr: Some(0x50C),
};

pub const SSI: Gate = Gate {
    rcgc: 0x61C,
    pr: 0xA1C,
    sr: Some(0x51C),
};

#[inline(always)]
fn reg(offset: usize) -> *mut u32 {
    (SYSCTL_BASE + offset) as *mut u32
}

// ============================================================================
// Raw Hardware Functions
// ============================================================================

/// Ungate the clock of instance `n`.
pub fn enable(gate: Gate, n: usize) {
    unsafe {
        let r = reg(gate.rcgc);
        write_volatile(r, read_volatile(r) | 1 << n);
    }
}

/// Gate the clock of instance `n`.
pub fn disable(gate: Gate, n: usize) {
    unsafe {
        let r = reg(gate.rcgc);
        write_volatile(r, read_volatile(r) & !(1 << n));
    }
}

/// Whether instance `n` is clocked and out of reset.
pub fn is_ready(gate: Gate, n: usize) -> bool {
    unsafe { read_volatile(reg(gate.pr)) & 1 << n != 0 }
}

/// Assert and release the software reset of instance `n`.
pub fn reset(gate: Gate, n: usize) {
    let Some(sr) = gate.sr else {
        return;
    };
    unsafe {
        let r = reg(sr);
        write_volatile(r, read_volatile(r) | 1 << n);
        // The reset must be held for a few cycles
        for _ in 0..16 {
            core::hint::spin_loop();
        }
        write_volatile(r, read_volatile(r) & !(1 << n));
    }
}
