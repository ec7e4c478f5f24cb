//! TI TM4C123GH6PM (Tiva C LaunchPad).
//!
//! Cortex-M4F at 80 MHz from the PLL. Four SSI units, six 16/32-bit timer
//! blocks, a 32-channel µDMA and an NVIC with 3 priority bits.

mod gpio;
mod gptm;
mod nvic;
mod ssi;
mod sysctl;
mod systick;
mod udma;

use common::arch::arm::CortexMIrq;
use spin::Once;

use super::Board;
use crate::hal::timer::Half;
use crate::peripherals::Peripherals;
use crate::platform::tm4c123::gptm::{GPTM_UNITS, Gptm};
use crate::platform::tm4c123::nvic::Nvic;
use crate::platform::tm4c123::ssi::{SSI_UNITS, Tm4cSsi};
use crate::platform::tm4c123::systick::SysTickClock;
use crate::platform::tm4c123::udma::Udma;

pub const SYSTEM_CLOCK_HZ: u32 = 80_000_000;

pub struct Tm4c123;

/// Parse `<prefix><digit>` against any of `prefixes`, case-sensitive.
fn parse_alias(alias: &str, prefixes: &[&str], units: usize) -> Option<usize> {
    prefixes.iter().find_map(|prefix| {
        let digits = alias.strip_prefix(prefix)?;
        let unit: usize = digits.parse().ok()?;
        (unit < units).then_some(unit)
    })
}

impl Board for Tm4c123 {
    type Irq = CortexMIrq;
    type Ssi = Tm4cSsi;
    type Dma = Udma;
    type Timer = Gptm;
    type Intc = Nvic;
    type Clock = SysTickClock;

    fn name() -> &'static str {
        "TM4C123GH6PM (Tiva C LaunchPad)"
    }

    fn system_clock_hz() -> u32 {
        SYSTEM_CLOCK_HZ
    }

    fn ssi(unit: usize) -> Option<Tm4cSsi> {
        // SAFETY: the registry creates each unit's record once
        (unit < SSI_UNITS).then(|| unsafe { Tm4cSsi::new(unit) })
    }

    fn ssi_alias(alias: &str) -> Option<usize> {
        parse_alias(alias, &["SSI", "SPI"], SSI_UNITS)
    }

    fn timer(unit: usize) -> Option<Gptm> {
        (unit < GPTM_UNITS).then(|| unsafe { Gptm::new(unit) })
    }

    fn timer_alias(alias: &str) -> Option<usize> {
        parse_alias(alias, &["TIMER"], GPTM_UNITS)
    }

    fn dma() -> Udma {
        unsafe { Udma::new() }
    }

    fn interrupt_controller() -> Nvic {
        unsafe { Nvic::new() }
    }

    fn clock() -> SysTickClock {
        unsafe { SysTickClock::new(SYSTEM_CLOCK_HZ) }
    }
}

// ============================================================================
// Board Context and Interrupt Entry Points
// ============================================================================

static PERIPHERALS: Once<Peripherals<Tm4c123>> = Once::new();

/// The board's driver context, created and its clock started on first use.
pub fn peripherals() -> &'static Peripherals<Tm4c123> {
    PERIPHERALS.call_once(|| {
        let ctx = Peripherals::<Tm4c123>::new();
        ctx.clock().start();
        ctx
    })
}

/// Interrupts that arrive before [`peripherals`] has run are ignored.
macro_rules! bus_handler {
    ($name:ident, $unit:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name() {
            if let Some(ctx) = PERIPHERALS.get() {
                ctx.on_bus_interrupt($unit);
            }
        }
    };
}

macro_rules! timer_handler {
    ($name:ident, $unit:expr, $half:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name() {
            if let Some(ctx) = PERIPHERALS.get() {
                ctx.on_timer_interrupt($unit, $half);
            }
        }
    };
}

bus_handler!(SSI0_Handler, 0);
bus_handler!(SSI1_Handler, 1);
bus_handler!(SSI2_Handler, 2);
bus_handler!(SSI3_Handler, 3);

timer_handler!(TIMER0A_Handler, 0, Half::A);
timer_handler!(TIMER0B_Handler, 0, Half::B);
timer_handler!(TIMER1A_Handler, 1, Half::A);
timer_handler!(TIMER1B_Handler, 1, Half::B);
timer_handler!(TIMER2A_Handler, 2, Half::A);
timer_handler!(TIMER2B_Handler, 2, Half::B);
timer_handler!(TIMER3A_Handler, 3, Half::A);
timer_handler!(TIMER3B_Handler, 3, Half::B);
timer_handler!(TIMER4A_Handler, 4, Half::A);
timer_handler!(TIMER4B_Handler, 4, Half::B);
timer_handler!(TIMER5A_Handler, 5, Half::A);
timer_handler!(TIMER5B_Handler, 5, Half::B);

#[unsafe(no_mangle)]
pub extern "C" fn SysTick_Handler() {
    systick::on_tick();
}
