//! TM4C123 GPIO pad configuration for peripheral pins.

use crate::hal::gpio::{AlternateFunction, PullMode};
use core::ptr::{read_volatile, write_volatile};

use super::sysctl;

const GPIO_AFSEL: usize = 0x420;
const GPIO_PUR: usize = 0x510;
const GPIO_PDR: usize = 0x514;
const GPIO_DEN: usize = 0x51C;
const GPIO_LOCK: usize = 0x520;
const GPIO_CR: usize = 0x524;
const GPIO_AMSEL: usize = 0x528;
const GPIO_PCTL: usize = 0x52C;

const LOCK_KEY: u32 = 0x4C4F_434B;

/// APB GPIO ports used by the SSI units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum Port {
    A = 0,
    B = 1,
    D = 3,
    F = 5,
}

impl Port {
    const fn base(self) -> usize {
        match self {
            Port::A => 0x4000_4000,
            Port::B => 0x4000_5000,
            Port::D => 0x4000_7000,
            Port::F => 0x4002_5000,
        }
    }
}

/// A pin on one of the ports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pin {
    pub port: Port,
    pub number: u8,
}

impl Pin {
    pub const fn new(port: Port, number: u8) -> Self {
        Self { port, number }
    }

    /// PF0 is a locked NMI pin.
    fn is_locked(self) -> bool {
        self.port == Port::F && self.number == 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GpioError {
    BadPin,
    BadFunction,
}

#[inline(always)]
fn reg(pin: Pin, offset: usize) -> *mut u32 {
    (pin.port.base() + offset) as *mut u32
}

fn modify(pin: Pin, offset: usize, set: bool) {
    let bit = 1u32 << pin.number;
    unsafe {
        let r = reg(pin, offset);
        let value = read_volatile(r);
        write_volatile(r, if set { value | bit } else { value & !bit });
    }
}

// ============================================================================
// HAL Implementation
// ============================================================================

/// Pad control for all ports.
#[derive(Debug)]
pub struct Gpio;

impl Gpio {
    /// # Safety
    ///
    /// The caller must not configure the same pins concurrently.
    pub const unsafe fn new() -> Self {
        Self
    }

    fn power(&mut self, port: Port) {
        let n = port as usize;
        if !sysctl::is_ready(sysctl::GPIO, n) {
            sysctl::enable(sysctl::GPIO, n);
            while !sysctl::is_ready(sysctl::GPIO, n) {
                core::hint::spin_loop();
            }
        }
    }

    fn unlock(&mut self, pin: Pin) {
        if pin.is_locked() {
            unsafe { write_volatile(reg(pin, GPIO_LOCK), LOCK_KEY) };
            modify(pin, GPIO_CR, true);
        }
    }
}

impl AlternateFunction for Gpio {
    type Pin = Pin;
    type Error = GpioError;

    fn set_alt_function(&mut self, pin: Pin, function: u8) -> Result<(), GpioError> {
        if pin.number > 7 {
            return Err(GpioError::BadPin);
        }
        if function > 15 {
            return Err(GpioError::BadFunction);
        }
        self.power(pin.port);
        self.unlock(pin);

        let shift = pin.number as u32 * 4;
        unsafe {
            let pctl = reg(pin, GPIO_PCTL);
            let value = read_volatile(pctl) & !(0xF << shift);
            write_volatile(pctl, value | (function as u32) << shift);
        }
        modify(pin, GPIO_AMSEL, false);
        modify(pin, GPIO_AFSEL, true);
        modify(pin, GPIO_DEN, true);
        Ok(())
    }

    fn set_pull(&mut self, pin: Pin, pull: PullMode) -> Result<(), GpioError> {
        if pin.number > 7 {
            return Err(GpioError::BadPin);
        }
        self.power(pin.port);
        modify(pin, GPIO_PUR, pull == PullMode::Up);
        modify(pin, GPIO_PDR, pull == PullMode::Down);
        Ok(())
    }

    fn release(&mut self, pin: Pin) -> Result<(), GpioError> {
        if pin.number > 7 {
            return Err(GpioError::BadPin);
        }
        self.power(pin.port);
        modify(pin, GPIO_AFSEL, false);
        Ok(())
    }
}
