//! Data transfers.
//!
//! A transfer either polls the FIFOs word by word or hands the buffers to
//! DMA and sleeps until the completion interrupt. Single words, transfers
//! issued with interrupts masked and transfers whose directions are not
//! all DMA-enabled are polled; everything else goes through DMA in chunks
//! of at most `MAX_ITEMS` items.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{Ordering, compiler_fence};

use common::sync::{IrqControl, IrqGuard};
use log::{trace, warn};

use crate::bus::dma::{Chunk, DmaReservation, TxSource};
use crate::bus::role::Role;
use crate::bus::{BusHandle, Completion};
use crate::error::{Error, Field, Result};
use crate::hal::dma::{DmaController, ElementSize};
use crate::hal::ssi::{DmaMask, SsiPort};
use crate::hal::timer::{CountingTimer, Deadline};
use crate::platform::Board;

/// Timeout of the explicit-timeout calls when the caller passes `None`.
pub const DEFAULT_TIMEOUT_MS: u32 = 5000;

/// Frame shifted out while only receiving.
const FILL_FRAME: u16 = 0xFFFF;

static FILL: u16 = FILL_FRAME;

/// Timeout of the implicit-timeout calls: one millisecond per word (the bus
/// never runs below 8 kHz) plus slack.
pub fn implicit_timeout(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX).saturating_add(100)
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// Element type of a transfer buffer.
pub trait Word: Copy + Default + sealed::Sealed + 'static {
    const SIZE: ElementSize;
    /// Widest frame the type holds.
    const BITS: u8;

    fn into_frame(self) -> u16;

    fn from_frame(frame: u16) -> Self;
}

impl Word for u8 {
    const SIZE: ElementSize = ElementSize::Byte;
    const BITS: u8 = 8;

    fn into_frame(self) -> u16 {
        self as u16
    }

    fn from_frame(frame: u16) -> Self {
        frame as u8
    }
}

impl Word for u16 {
    const SIZE: ElementSize = ElementSize::HalfWord;
    const BITS: u8 = 16;

    fn into_frame(self) -> u16 {
        self
    }

    fn from_frame(frame: u16) -> Self {
        frame
    }
}

/// Buffers of a transfer.
pub enum Payload<'a, W> {
    Send(&'a [W]),
    Receive(&'a mut [W]),
    /// Equal-length transmit and receive buffers.
    Duplex { tx: &'a [W], rx: &'a mut [W] },
    /// Transmit a buffer and overwrite it with what comes back.
    InPlace(&'a mut [W]),
}

impl<W: Word> Payload<'_, W> {
    pub fn len(&self) -> usize {
        match self {
            Payload::Send(tx) | Payload::Duplex { tx, .. } => tx.len(),
            Payload::Receive(rx) | Payload::InPlace(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn receives(&self) -> bool {
        !matches!(self, Payload::Send(_))
    }

    fn validate(&self) -> Result<usize> {
        if let Payload::Duplex { tx, rx } = self {
            if tx.len() != rx.len() {
                return Err(Error::InvalidParameter(Field::Length));
            }
        }
        match self.len() {
            0 => Err(Error::InvalidParameter(Field::Length)),
            len => Ok(len),
        }
    }

    /// DMA directions this payload needs under `role`.
    pub fn wired(&self, role: &dyn Role) -> DmaMask {
        match self {
            Payload::Send(_) => DmaMask::TX,
            Payload::Receive(_) if role.clocks_receive() => DmaMask::RX | DmaMask::TX,
            Payload::Receive(_) => DmaMask::RX,
            Payload::Duplex { .. } | Payload::InPlace(_) => DmaMask::RX | DmaMask::TX,
        }
    }

    fn tx_word(&self, index: usize) -> Option<W> {
        match self {
            Payload::Send(tx) | Payload::Duplex { tx, .. } => Some(tx[index]),
            Payload::InPlace(buf) => Some(buf[index]),
            Payload::Receive(_) => None,
        }
    }

    fn store(&mut self, index: usize, word: W) {
        match self {
            Payload::Receive(rx) | Payload::Duplex { rx, .. } | Payload::InPlace(rx) => {
                rx[index] = word
            }
            Payload::Send(_) => {}
        }
    }

    /// Base addresses for the transmit and receive channels.
    fn addresses(&mut self) -> (TxSource, Option<usize>) {
        let fill = TxSource::Fill(&FILL as *const u16 as usize);
        match self {
            Payload::Send(tx) => (TxSource::Buffer(tx.as_ptr() as usize), None),
            Payload::Receive(rx) => (fill, Some(rx.as_mut_ptr() as usize)),
            Payload::Duplex { tx, rx } => (
                TxSource::Buffer(tx.as_ptr() as usize),
                Some(rx.as_mut_ptr() as usize),
            ),
            Payload::InPlace(buf) => {
                let addr = buf.as_mut_ptr() as usize;
                (TxSource::Buffer(addr), Some(addr))
            }
        }
    }
}

/// A transfer: buffers plus the time it may take.
pub struct TransferRequest<'a, W> {
    pub payload: Payload<'a, W>,
    pub timeout_ms: u32,
}

impl<'a, W: Word> TransferRequest<'a, W> {
    pub fn new(payload: Payload<'a, W>, timeout_ms: u32) -> Self {
        Self {
            payload,
            timeout_ms,
        }
    }

    /// Request with `timeout_ms`, or [`DEFAULT_TIMEOUT_MS`].
    pub fn explicit(payload: Payload<'a, W>, timeout_ms: Option<u32>) -> Self {
        Self::new(payload, timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Request with the `len + 100` ms timeout.
    pub fn implicit(payload: Payload<'a, W>) -> Self {
        let timeout_ms = implicit_timeout(payload.len());
        Self::new(payload, timeout_ms)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Strategy {
    Polled,
    Dma,
}

/// Pick how to move `len` words.
pub fn select_strategy(len: usize, irqs_enabled: bool, enabled: DmaMask, wired: DmaMask) -> Strategy {
    if len == 1 || !irqs_enabled || !enabled.contains(wired) {
        Strategy::Polled
    } else {
        Strategy::Dma
    }
}

impl<B: Board> BusHandle<'_, B> {
    /// Run one transfer to completion, or fail.
    ///
    /// Returns [`Error::Busy`] if another operation owns the bus and
    /// [`Error::Disabled`] if it was never configured.
    pub fn transfer<W: Word>(&self, request: TransferRequest<'_, W>) -> Result<()> {
        let TransferRequest {
            mut payload,
            timeout_ms,
        } = request;
        let len = payload.validate()?;

        let mut state = self.bus.state.try_lock().ok_or(Error::Busy)?;
        let snapshot = self.bus.snapshot();
        if !snapshot.enabled {
            return Err(Error::Disabled);
        }
        let config = snapshot.config;
        if config.word_width > W::BITS {
            return Err(Error::InvalidParameter(Field::WordWidth));
        }

        let role = config.role.role();
        let wired = payload.wired(role);
        let strategy = select_strategy(len, B::Irq::is_enabled(), config.dma, wired);
        trace!(
            "SSI{}: {} words, {:?}, timeout {} ms",
            self.bus.unit(),
            len,
            strategy,
            timeout_ms
        );

        let deadline = Deadline::new(&self.ctx.clock, timeout_ms);
        let port = &mut state.port;
        let result = match strategy {
            Strategy::Polled => Self::run_polled(port, &mut payload, role, &deadline),
            Strategy::Dma => self.run_dma(port, &mut payload, wired, &deadline),
        }
        .and_then(|()| Self::finish(port, payload.receives(), &deadline));

        if let Err(err) = result {
            warn!("SSI{}: transfer of {} words failed: {}", self.bus.unit(), len, err);
        }
        result
    }

    fn run_polled<W: Word, C: CountingTimer>(
        port: &mut B::Ssi,
        payload: &mut Payload<'_, W>,
        role: &dyn Role,
        deadline: &Deadline<'_, C>,
    ) -> Result<()> {
        for index in 0..payload.len() {
            let outgoing = match payload.tx_word(index) {
                Some(word) => Some(word.into_frame()),
                None if role.clocks_receive() => Some(FILL_FRAME),
                None => None,
            };
            if let Some(frame) = outgoing {
                deadline.spin_until(|| port.tx_not_full())?;
                port.write_frame(frame);
            }

            deadline.spin_until(|| port.rx_not_empty())?;
            let frame = port.read_frame();
            payload.store(index, W::from_frame(frame));
        }
        Ok(())
    }

    fn run_dma<W: Word, C: CountingTimer>(
        &self,
        port: &mut B::Ssi,
        payload: &mut Payload<'_, W>,
        wired: DmaMask,
        deadline: &Deadline<'_, C>,
    ) -> Result<()> {
        let len = payload.len();
        let (tx, rx) = payload.addresses();
        let mut reservation =
            DmaReservation::acquire(self.ctx, self.bus, wired, port.data_register())?;

        let mut offset = 0;
        while offset < len {
            let count = (len - offset).min(B::Dma::MAX_ITEMS);
            let byte_offset = offset * W::SIZE.bytes();
            let tx = match tx {
                TxSource::Buffer(addr) => TxSource::Buffer(addr + byte_offset),
                fill @ TxSource::Fill(_) => fill,
            };
            reservation.start(&Chunk {
                tx: Some(tx),
                rx: rx.map(|addr| addr + byte_offset),
                count,
                size: W::SIZE,
            });
            self.wait_completion(deadline)?;
            offset += count;
        }
        Ok(())
    }

    /// Sleep until the completion interrupt reports, or the deadline passes.
    ///
    /// The state is sampled with interrupts masked and the core sleeps
    /// before unmasking, so a completion landing between the check and the
    /// sleep still wakes it.
    fn wait_completion<C: CountingTimer>(&self, deadline: &Deadline<'_, C>) -> Result<()> {
        loop {
            let guard = IrqGuard::<B::Irq>::new();
            match self.bus.completion() {
                Completion::Done => {
                    compiler_fence(Ordering::SeqCst);
                    return Ok(());
                }
                Completion::Failed => return Err(Error::HardwareFault(self.bus.dma_status())),
                Completion::Idle | Completion::Pending => guard.wait_for_interrupt(),
            }
            drop(guard);

            if deadline.expired() {
                return Err(Error::Timeout);
            }
        }
    }

    /// Let the last frame leave, drop stale receive data and check status.
    ///
    /// Send-only transfers always overrun the receive FIFO, so their
    /// status is discarded.
    fn finish<C: CountingTimer>(
        port: &mut B::Ssi,
        receives: bool,
        deadline: &Deadline<'_, C>,
    ) -> Result<()> {
        deadline.spin_until(|| !port.is_busy())?;
        // A slave keeps receiving for as long as its master clocks
        while port.rx_not_empty() {
            if deadline.expired() {
                return Err(Error::Timeout);
            }
            port.read_frame();
        }
        match port.take_status() {
            0 => Ok(()),
            status if receives => Err(Error::HardwareFault(status)),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Explicit timeout
    // ========================================================================

    pub fn send<W: Word>(&self, data: &[W], timeout_ms: Option<u32>) -> Result<()> {
        self.transfer(TransferRequest::explicit(Payload::Send(data), timeout_ms))
    }

    /// Receive `len` words into a fresh buffer.
    pub fn receive<W: Word>(&self, len: usize, timeout_ms: Option<u32>) -> Result<Vec<W>> {
        let mut buf = vec![W::default(); len];
        self.receive_into(&mut buf, timeout_ms)?;
        Ok(buf)
    }

    /// Fill `buf` and hand the same buffer back.
    pub fn receive_into<'b, W: Word>(&self, buf: &'b mut [W], timeout_ms: Option<u32>) -> Result<&'b mut [W]> {
        self.transfer(TransferRequest::explicit(Payload::Receive(&mut *buf), timeout_ms))?;
        Ok(buf)
    }

    /// Full duplex into a fresh buffer of `tx.len()` words.
    pub fn send_recv<W: Word>(&self, tx: &[W], timeout_ms: Option<u32>) -> Result<Vec<W>> {
        let mut rx = vec![W::default(); tx.len()];
        self.send_recv_into(tx, &mut rx, timeout_ms)?;
        Ok(rx)
    }

    pub fn send_recv_into<'b, W: Word>(
        &self,
        tx: &[W],
        rx: &'b mut [W],
        timeout_ms: Option<u32>,
    ) -> Result<&'b mut [W]> {
        self.transfer(TransferRequest::explicit(
            Payload::Duplex { tx, rx: &mut *rx },
            timeout_ms,
        ))?;
        Ok(rx)
    }

    pub fn send_recv_in_place<'b, W: Word>(
        &self,
        buf: &'b mut [W],
        timeout_ms: Option<u32>,
    ) -> Result<&'b mut [W]> {
        self.transfer(TransferRequest::explicit(Payload::InPlace(&mut *buf), timeout_ms))?;
        Ok(buf)
    }

    // ========================================================================
    // Implicit timeout
    // ========================================================================

    pub fn read<W: Word>(&self, len: usize) -> Result<Vec<W>> {
        self.receive(len, Some(implicit_timeout(len)))
    }

    pub fn read_into<W: Word>(&self, buf: &mut [W]) -> Result<()> {
        self.transfer(TransferRequest::implicit(Payload::Receive(buf)))
    }

    pub fn write<W: Word>(&self, data: &[W]) -> Result<()> {
        self.transfer(TransferRequest::implicit(Payload::Send(data)))
    }

    pub fn write_read_into<W: Word>(&self, tx: &[W], rx: &mut [W]) -> Result<()> {
        self.transfer(TransferRequest::implicit(Payload::Duplex { tx, rx }))
    }
}
