//! TM4C123 General-Purpose Timer Module
//!
//! Six 16/32-bit blocks. Each runs either as one 32-bit counter or as two
//! 16-bit counters (A and B) with 8-bit prescalers.

use crate::hal::interrupt::IrqNumber;
use crate::hal::timer::{Half, Timer, TimerEvents, TimerMode, Width};
use core::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile};

use super::sysctl;

/// Timer 0 base address; blocks are 4 KiB apart.
pub const GPTM_BASE: usize = 0x4003_0000;

pub const GPTM_UNITS: usize = 6;

const CFG_32_BIT: u32 = 0x0;
const CFG_16_BIT: u32 = 0x4;

const TNMR_ONE_SHOT: u32 = 0x1;
const TNMR_PERIODIC: u32 = 0x2;
/// Alternate mode select: PWM.
const TNMR_AMS: u32 = 1 << 3;
/// Match interrupt enable.
const TNMR_MIE: u32 = 1 << 5;

const CTL_TAEN: u32 = 1 << 0;
const CTL_TBEN: u32 = 1 << 8;

/// Interrupt lines for halves A and B of each block.
const IRQS: [[IrqNumber; 2]; GPTM_UNITS] = [[19, 20], [21, 22], [23, 24], [35, 36], [70, 71], [92, 93]];

/// Memory-mapped timer registers.
#[repr(C)]
#[allow(dead_code)]
struct Registers {
    cfg: u32,
    tamr: u32,
    tbmr: u32,
    ctl: u32,
    sync: u32,
    _reserved: u32,
    imr: u32,
    ris: u32,
    mis: u32,
    icr: u32,
    tailr: u32,
    tbilr: u32,
    tamatchr: u32,
    tbmatchr: u32,
    tapr: u32,
    tbpr: u32,
}

const fn mode_bits(mode: TimerMode) -> u32 {
    match mode {
        TimerMode::OneShot => TNMR_ONE_SHOT,
        TimerMode::Periodic => TNMR_PERIODIC,
        TimerMode::Pwm => TNMR_AMS | TNMR_PERIODIC,
    }
}

const fn enable_bit(half: Half) -> u32 {
    match half {
        Half::A => CTL_TAEN,
        Half::B => CTL_TBEN,
    }
}

// ============================================================================
// HAL Implementation
// ============================================================================

/// One timer block.
#[derive(Debug)]
pub struct Gptm {
    n: usize,
    regs: *mut Registers,
}

// SAFETY: the register block is only reached through `&mut self`
unsafe impl Send for Gptm {}

impl Gptm {
    /// # Safety
    ///
    /// At most one driver per block may exist.
    pub const unsafe fn new(n: usize) -> Self {
        Self {
            n,
            regs: (GPTM_BASE + n * 0x1000) as *mut Registers,
        }
    }

    fn mode_reg(&self, half: Half) -> *mut u32 {
        unsafe {
            match half {
                Half::A => addr_of_mut!((*self.regs).tamr),
                Half::B => addr_of_mut!((*self.regs).tbmr),
            }
        }
    }

    fn modify(reg: *mut u32, set: u32, clear: u32) {
        unsafe { write_volatile(reg, (read_volatile(reg) & !clear) | set) }
    }
}

impl Timer for Gptm {
    fn power_on(&mut self) {
        sysctl::enable(sysctl::TIMER, self.n);
    }

    fn is_ready(&self) -> bool {
        sysctl::is_ready(sysctl::TIMER, self.n)
    }

    fn power_off(&mut self) {
        sysctl::reset(sysctl::TIMER, self.n);
        sysctl::disable(sysctl::TIMER, self.n);
    }

    fn set_width(&mut self, width: Width) {
        let cfg = match width {
            Width::Bits32 => CFG_32_BIT,
            Width::Bits16 => CFG_16_BIT,
        };
        unsafe { write_volatile(addr_of_mut!((*self.regs).cfg), cfg) };
    }

    fn set_mode(&mut self, half: Half, mode: TimerMode) {
        // Keep the match interrupt enable across mode changes
        let reg = self.mode_reg(half);
        let mie = unsafe { read_volatile(reg) } & TNMR_MIE;
        unsafe { write_volatile(reg, mode_bits(mode) | mie) };
    }

    fn set_load(&mut self, half: Half, load: u32) {
        unsafe {
            match half {
                Half::A => write_volatile(addr_of_mut!((*self.regs).tailr), load),
                Half::B => write_volatile(addr_of_mut!((*self.regs).tbilr), load),
            }
        }
    }

    fn set_prescaler(&mut self, half: Half, prescaler: u8) {
        unsafe {
            match half {
                Half::A => write_volatile(addr_of_mut!((*self.regs).tapr), prescaler as u32),
                Half::B => write_volatile(addr_of_mut!((*self.regs).tbpr), prescaler as u32),
            }
        }
    }

    fn set_match(&mut self, half: Half, value: u32) {
        unsafe {
            match half {
                Half::A => write_volatile(addr_of_mut!((*self.regs).tamatchr), value),
                Half::B => write_volatile(addr_of_mut!((*self.regs).tbmatchr), value),
            }
        }
    }

    fn start(&mut self, half: Half) {
        Self::modify(unsafe { addr_of_mut!((*self.regs).ctl) }, enable_bit(half), 0);
    }

    fn stop(&mut self, half: Half) {
        Self::modify(unsafe { addr_of_mut!((*self.regs).ctl) }, 0, enable_bit(half));
    }

    fn is_running(&self, half: Half) -> bool {
        unsafe { read_volatile(addr_of!((*self.regs).ctl)) & enable_bit(half) != 0 }
    }

    fn unmask(&mut self, events: TimerEvents) {
        if events.contains(TimerEvents::MATCH_A) {
            Self::modify(self.mode_reg(Half::A), TNMR_MIE, 0);
        }
        if events.contains(TimerEvents::MATCH_B) {
            Self::modify(self.mode_reg(Half::B), TNMR_MIE, 0);
        }
        Self::modify(unsafe { addr_of_mut!((*self.regs).imr) }, events.bits(), 0);
    }

    fn mask(&mut self, events: TimerEvents) {
        Self::modify(unsafe { addr_of_mut!((*self.regs).imr) }, 0, events.bits());
        if events.contains(TimerEvents::MATCH_A) {
            Self::modify(self.mode_reg(Half::A), 0, TNMR_MIE);
        }
        if events.contains(TimerEvents::MATCH_B) {
            Self::modify(self.mode_reg(Half::B), 0, TNMR_MIE);
        }
    }

    fn pending(&self) -> TimerEvents {
        TimerEvents::from_bits_truncate(unsafe { read_volatile(addr_of!((*self.regs).mis)) })
    }

    fn clear(&mut self, events: TimerEvents) {
        unsafe { write_volatile(addr_of_mut!((*self.regs).icr), events.bits()) };
    }

    fn irq(&self, half: Half) -> IrqNumber {
        IRQS[self.n][half.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_layout() {
        assert_eq!(core::mem::offset_of!(Registers, imr), 0x18);
        assert_eq!(core::mem::offset_of!(Registers, tailr), 0x28);
        assert_eq!(core::mem::offset_of!(Registers, tbpr), 0x3C);
    }

    #[test]
    fn pwm_selects_alternate_mode() {
        assert_eq!(mode_bits(TimerMode::Pwm), 0xA);
        assert_eq!(mode_bits(TimerMode::OneShot), 0x1);
    }
}
