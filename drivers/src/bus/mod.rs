//! Synchronous serial bus engine.
//!
//! A [`Bus`] is the record behind one SSI unit: the register driver, the
//! configuration snapshot and the completion state the DMA interrupt
//! reports into. [`BusHandle`] pairs a record with the driver context and
//! carries every foreground operation.
//!
//! The record's state lives behind a [`SpinLock`] that is only ever
//! *try*-locked by operations. Holding it is the ownership token: a second
//! caller while a transfer or configuration is in flight gets
//! [`Error::Busy`] instead of interleaving register writes.
//!
//! Whether the bus is enabled and its configuration are mirrored in a
//! short-lived [`IrqSpinLock`] that the owner updates, so readers, interrupt
//! handlers included, never wait for a transfer to end.

pub mod config;
pub mod dma;
pub mod role;
pub mod transfer;

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use common::sync::{IrqControl, IrqSpinLock, SpinLock};
use log::{debug, trace};

use crate::error::{Error, Result};
use crate::hal::dma::{ChannelPair, ChannelStatus, DmaChannel, DmaController};
use crate::hal::interrupt::{InterruptController, IrqNumber};
use crate::hal::ssi::{BusConfig, DmaMask, SsiPort};
use crate::hal::timer::Deadline;
use crate::peripherals::Peripherals;
use crate::platform::Board;

pub use config::{BusUpdate, Validated};
pub use transfer::{Payload, TransferRequest, Word};

/// How long a unit may take to come out of reset after its clock is ungated.
const READY_TIMEOUT_MS: u32 = 10;

/// Progress of the DMA transfer a bus is waiting on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Completion {
    Idle = 0,
    Pending = 1,
    Done = 2,
    Failed = 3,
}

impl Completion {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Completion::Pending,
            2 => Completion::Done,
            3 => Completion::Failed,
            _ => Completion::Idle,
        }
    }
}

pub(crate) struct BusState<P> {
    pub(crate) port: P,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Snapshot {
    pub(crate) enabled: bool,
    pub(crate) config: BusConfig,
}

/// Record of one SSI unit.
pub struct Bus<P, I: IrqControl> {
    unit: usize,
    channels: ChannelPair,
    irq: IrqNumber,
    pub(crate) state: SpinLock<BusState<P>>,
    snapshot: IrqSpinLock<Snapshot, I>,
    /// Directions whose DMA channel has not completed yet.
    inflight: AtomicU8,
    completion: AtomicU8,
    dma_status: AtomicU32,
}

impl<P: SsiPort, I: IrqControl> Bus<P, I> {
    pub(crate) fn new(unit: usize, port: P) -> Self {
        Self {
            unit,
            channels: port.dma_channels(),
            irq: port.irq(),
            state: SpinLock::new(BusState { port }),
            snapshot: IrqSpinLock::new(Snapshot {
                enabled: false,
                config: BusConfig::default(),
            }),
            inflight: AtomicU8::new(0),
            completion: AtomicU8::new(Completion::Idle as u8),
            dma_status: AtomicU32::new(0),
        }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn channels(&self) -> ChannelPair {
        self.channels
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.snapshot.with(|s| *s)
    }

    /// Owner only.
    fn publish(&self, enabled: bool, config: BusConfig) {
        self.snapshot.with(|s| *s = Snapshot { enabled, config });
    }

    pub fn completion(&self) -> Completion {
        Completion::from_raw(self.completion.load(Ordering::Acquire))
    }

    /// Status word of the last failed DMA transfer.
    pub fn dma_status(&self) -> u32 {
        self.dma_status.load(Ordering::Acquire)
    }

    pub(crate) fn channels_for(&self, mask: DmaMask) -> impl Iterator<Item = (DmaMask, DmaChannel)> {
        [(DmaMask::RX, self.channels.rx), (DmaMask::TX, self.channels.tx)]
            .into_iter()
            .filter(move |(direction, _)| mask.contains(*direction))
    }

    /// Arm the completion state before the channels are enabled.
    pub(crate) fn expect(&self, wired: DmaMask) {
        self.dma_status.store(0, Ordering::Relaxed);
        self.inflight.store(wired.bits(), Ordering::Relaxed);
        self.completion
            .store(Completion::Pending as u8, Ordering::Release);
    }

    pub(crate) fn disarm(&self) {
        self.inflight.store(0, Ordering::Relaxed);
        self.completion.store(Completion::Idle as u8, Ordering::Release);
    }

    /// DMA completion interrupt for this unit.
    ///
    /// Acknowledges finished channels and publishes the outcome once every
    /// wired channel is done, or as soon as one fails.
    pub fn on_dma_interrupt<D: DmaController>(&self, dma: &mut D) {
        let inflight = DmaMask::from_bits_truncate(self.inflight.load(Ordering::Acquire));
        if inflight.is_empty() {
            return;
        }

        let mut remaining = inflight;
        for (direction, channel) in self.channels_for(inflight) {
            match dma.status(channel) {
                ChannelStatus::Done => {
                    dma.acknowledge(channel);
                    remaining.remove(direction);
                }
                ChannelStatus::Error(status) => {
                    dma.acknowledge(channel);
                    debug!("SSI{}: DMA channel {} failed: {:#x}", self.unit, channel.number, status);
                    self.dma_status.store(status, Ordering::Relaxed);
                    self.inflight.store(0, Ordering::Relaxed);
                    self.completion
                        .store(Completion::Failed as u8, Ordering::Release);
                    return;
                }
                ChannelStatus::Idle | ChannelStatus::Busy => {}
            }
        }

        self.inflight.store(remaining.bits(), Ordering::Relaxed);
        if remaining.is_empty() {
            trace!("SSI{}: DMA complete", self.unit);
            self.completion
                .store(Completion::Done as u8, Ordering::Release);
        }
    }
}

/// A resolved bus together with the context it lives in.
pub struct BusHandle<'a, B: Board> {
    pub(crate) ctx: &'a Peripherals<B>,
    pub(crate) bus: &'a Bus<B::Ssi, B::Irq>,
}

impl<B: Board> Clone for BusHandle<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Board> Copy for BusHandle<'_, B> {}

impl<'a, B: Board> BusHandle<'a, B> {
    pub(crate) fn new(ctx: &'a Peripherals<B>, bus: &'a Bus<B::Ssi, B::Irq>) -> Self {
        Self { ctx, bus }
    }

    pub fn unit(&self) -> usize {
        self.bus.unit
    }

    /// The backing record. Two handles for the same unit return the same
    /// record.
    pub fn instance(&self) -> &'a Bus<B::Ssi, B::Irq> {
        self.bus
    }

    /// Never waits for the bus owner.
    pub fn is_enabled(&self) -> bool {
        self.bus.snapshot().enabled
    }

    /// Current configuration snapshot. Never waits for the bus owner.
    pub fn config(&self) -> BusConfig {
        self.bus.snapshot().config
    }

    /// Validate and apply a complete configuration, then enable the unit.
    ///
    /// Nothing is written if validation fails.
    pub fn configure(&self, config: BusConfig) -> Result<()> {
        let validated = config::validate(&config, B::system_clock_hz())?;
        let mut state = self.bus.state.try_lock().ok_or(Error::Busy)?;
        self.apply(&mut state, &validated)
    }

    /// Change some parameters of an enabled bus, keeping the rest.
    pub fn reconfigure(&self, update: BusUpdate) -> Result<()> {
        let mut state = self.bus.state.try_lock().ok_or(Error::Busy)?;
        let current = self.bus.snapshot();
        if !current.enabled {
            return Err(Error::Disabled);
        }
        let config = update.merge(&current.config);
        let validated = config::validate(&config, B::system_clock_hz())?;
        self.apply(&mut state, &validated)
    }

    /// Disable the unit, reset it and gate its clock.
    ///
    /// The record and its configuration snapshot survive; `configure`
    /// powers the unit up again.
    pub fn deinit(&self) -> Result<()> {
        let mut state = self.bus.state.try_lock().ok_or(Error::Busy)?;
        let port = &mut state.port;
        if port.is_ready() {
            port.set_enabled(false);
            port.set_dma(DmaMask::empty());
        }
        let irq = self.bus.irq;
        self.ctx.intc.with(|intc| {
            intc.disable(irq);
            intc.clear(irq);
        });
        port.power_off();
        self.bus.publish(false, self.bus.snapshot().config);
        debug!("SSI{}: deinit", self.bus.unit);
        Ok(())
    }

    fn apply(&self, state: &mut BusState<B::Ssi>, validated: &Validated) -> Result<()> {
        let previous = self.bus.snapshot().config;
        self.bus.publish(false, previous);

        let port = &mut state.port;
        if port.is_ready() {
            port.set_enabled(false);
        }
        port.power_on();
        Deadline::new(&self.ctx.clock, READY_TIMEOUT_MS).spin_until(|| port.is_ready())?;

        port.mask_interrupts();
        port.set_enabled(false);
        port.configure_pins(&validated.pins);
        port.apply(&validated.frame);
        port.set_dma(DmaMask::empty());
        port.set_dma(validated.config.dma);
        port.set_enabled(true);

        let irq = self.bus.irq;
        let uses_dma = !validated.config.dma.is_empty();
        self.ctx.intc.with(|intc| {
            if uses_dma {
                intc.enable(irq);
            } else {
                intc.disable(irq);
            }
        });

        let config = validated.config;
        self.bus.publish(true, config);
        debug!(
            "SSI{}: {:?} {} Hz, {} bits, {:?}, cs {:?}, dma {:?}",
            self.bus.unit,
            config.role,
            config.baudrate,
            config.word_width,
            config.frame_format,
            config.chip_select,
            config.dma
        );
        Ok(())
    }
}
