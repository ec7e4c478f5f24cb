//! The driver context.
//!
//! [`Peripherals`] owns every instance table plus the shared controllers
//! (DMA, interrupt controller, clock). It is created once at startup and
//! passed by reference to everything that touches hardware; interrupt
//! entry points reach it through the board's static.

use core::sync::atomic::{AtomicUsize, Ordering};

use common::sync::IrqSpinLock;
use log::{debug, trace};

use crate::bus::{Bus, BusHandle};
use crate::error::Result;
use crate::hal::timer::Half;
use crate::platform::Board;
use crate::registry::{Id, Registry};
use crate::timer::{TimerHandle, TimerUnit};

/// SSI units addressable on any supported board.
pub const MAX_BUSES: usize = 4;

/// Timer blocks addressable on any supported board.
pub const MAX_TIMERS: usize = 6;

pub struct Peripherals<B: Board> {
    pub(crate) buses: Registry<Bus<B::Ssi, B::Irq>, MAX_BUSES>,
    pub(crate) timers: Registry<TimerUnit<B::Timer, B::Irq>, MAX_TIMERS>,
    pub(crate) dma: IrqSpinLock<B::Dma, B::Irq>,
    pub(crate) intc: IrqSpinLock<B::Intc, B::Irq>,
    pub(crate) clock: B::Clock,
    pub(crate) reservations: AtomicUsize,
}

impl<B: Board> Peripherals<B> {
    pub fn new() -> Self {
        debug!("{}: driver context, {} Hz", B::name(), B::system_clock_hz());
        Self {
            buses: Registry::new(),
            timers: Registry::new(),
            dma: IrqSpinLock::new(B::dma()),
            intc: IrqSpinLock::new(B::interrupt_controller()),
            clock: B::clock(),
            reservations: AtomicUsize::new(0),
        }
    }

    /// Resolve a bus by unit number or alias.
    ///
    /// The first reference creates the record; every later one returns
    /// the same record.
    pub fn bus<'a>(&'a self, id: impl Into<Id<'a>>) -> Result<BusHandle<'a, B>> {
        let unit = id.into().unit(B::ssi_alias)?;
        let bus = self.buses.resolve(unit, || {
            trace!("creating SSI{} record", unit);
            B::ssi(unit).map(|port| Bus::new(unit, port))
        })?;
        Ok(BusHandle::new(self, bus))
    }

    /// Resolve a timer by unit number or alias.
    pub fn timer<'a>(&'a self, id: impl Into<Id<'a>>) -> Result<TimerHandle<'a, B>> {
        let unit = id.into().unit(B::timer_alias)?;
        let timer = self.timers.resolve(unit, || {
            trace!("creating Timer{} record", unit);
            B::timer(unit).map(|hw| TimerUnit::new(unit, hw))
        })?;
        Ok(TimerHandle::new(self, timer))
    }

    /// SSI interrupt entry point. Services DMA completion for `unit`.
    pub fn on_bus_interrupt(&self, unit: usize) {
        if let Some(bus) = self.buses.get(unit) {
            self.dma.with(|dma| bus.on_dma_interrupt(dma));
        }
    }

    /// Timer interrupt entry point for one half of `unit`.
    pub fn on_timer_interrupt(&self, unit: usize, half: Half) {
        if let Some(timer) = self.timers.get(unit) {
            timer.on_interrupt(half);
        }
    }

    /// DMA reservations currently held by transfers.
    pub fn outstanding_reservations(&self) -> usize {
        self.reservations.load(Ordering::Acquire)
    }

    pub fn clock(&self) -> &B::Clock {
        &self.clock
    }
}

impl<B: Board> Default for Peripherals<B> {
    fn default() -> Self {
        Self::new()
    }
}
