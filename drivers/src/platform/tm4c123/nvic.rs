//! Cortex-M4 Nested Vectored Interrupt Controller.

use crate::hal::interrupt::{InterruptController, IrqNumber, Priority, PriorityInterruptController};
use core::ptr::{read_volatile, write_volatile};

const NVIC_ISER: usize = 0xE000_E100;
const NVIC_ICER: usize = 0xE000_E180;
const NVIC_ICPR: usize = 0xE000_E280;
const NVIC_IPR: usize = 0xE000_E400;

/// Implemented priority bits, in the top of each priority byte.
const PRIORITY_BITS: u8 = 3;

#[inline(always)]
fn word(base: usize, irq: IrqNumber) -> (*mut u32, u32) {
    let reg = (base + 4 * (irq as usize / 32)) as *mut u32;
    (reg, 1 << (irq % 32))
}

// ============================================================================
// Raw Hardware Functions
// ============================================================================

pub fn enable_irq(irq: IrqNumber) {
    let (reg, bit) = word(NVIC_ISER, irq);
    unsafe { write_volatile(reg, bit) }
}

pub fn disable_irq(irq: IrqNumber) {
    let (reg, bit) = word(NVIC_ICER, irq);
    unsafe { write_volatile(reg, bit) }
}

// ============================================================================
// HAL Implementation
// ============================================================================

/// The NVIC.
#[derive(Debug)]
pub struct Nvic;

impl Nvic {
    /// # Safety
    ///
    /// Only one instance may exist.
    pub const unsafe fn new() -> Self {
        Self
    }
}

impl InterruptController for Nvic {
    fn enable(&mut self, irq: IrqNumber) {
        enable_irq(irq);
    }

    fn disable(&mut self, irq: IrqNumber) {
        disable_irq(irq);
    }

    fn is_enabled(&self, irq: IrqNumber) -> bool {
        let (reg, bit) = word(NVIC_ISER, irq);
        unsafe { read_volatile(reg) & bit != 0 }
    }

    fn clear(&mut self, irq: IrqNumber) {
        let (reg, bit) = word(NVIC_ICPR, irq);
        unsafe { write_volatile(reg, bit) }
    }
}

impl PriorityInterruptController for Nvic {
    const LEVELS: Priority = 1 << PRIORITY_BITS;

    fn set_priority(&mut self, irq: IrqNumber, priority: Priority) {
        let reg = (NVIC_IPR + irq as usize) as *mut u8;
        unsafe { write_volatile(reg, priority << (8 - PRIORITY_BITS)) }
    }

    fn priority(&self, irq: IrqNumber) -> Priority {
        let reg = (NVIC_IPR + irq as usize) as *const u8;
        unsafe { read_volatile(reg) >> (8 - PRIORITY_BITS) }
    }
}
