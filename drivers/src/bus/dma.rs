//! Scoped DMA channel reservation for one transfer.
//!
//! [`DmaReservation::acquire`] claims the channels a transfer wires and
//! counts the reservation; dropping it stops, acknowledges and releases
//! them again. Every exit path of a transfer, including `?` on a timeout,
//! therefore releases exactly once.

use core::sync::atomic::Ordering;

use log::trace;

use crate::bus::Bus;
use crate::error::{Error, Result};
use crate::hal::dma::{ChannelTransfer, DmaController, ElementSize};
use crate::hal::ssi::DmaMask;
use crate::peripherals::Peripherals;
use crate::platform::Board;

/// Source of the transmit channel for one chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxSource {
    /// Walk a buffer.
    Buffer(usize),
    /// Repeat one fill word, to clock in receive data.
    Fill(usize),
}

/// One hardware transfer of at most `MAX_ITEMS` items.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tx: Option<TxSource>,
    pub rx: Option<usize>,
    pub count: usize,
    pub size: ElementSize,
}

pub struct DmaReservation<'a, B: Board> {
    ctx: &'a Peripherals<B>,
    bus: &'a Bus<B::Ssi, B::Irq>,
    wired: DmaMask,
    data_register: usize,
}

impl<'a, B: Board> DmaReservation<'a, B> {
    /// Claim one channel per direction in `wired`.
    ///
    /// Fails with [`Error::Busy`] if any of them is taken, leaving none
    /// claimed.
    pub fn acquire(
        ctx: &'a Peripherals<B>,
        bus: &'a Bus<B::Ssi, B::Irq>,
        wired: DmaMask,
        data_register: usize,
    ) -> Result<Self> {
        ctx.dma.with(|dma| {
            let mut claimed = DmaMask::empty();
            for (direction, channel) in bus.channels_for(wired) {
                if !dma.claim(channel) {
                    for (_, taken) in bus.channels_for(claimed) {
                        dma.release(taken);
                    }
                    return Err(Error::Busy);
                }
                claimed |= direction;
            }
            Ok(())
        })?;

        ctx.reservations.fetch_add(1, Ordering::AcqRel);
        trace!("SSI{}: reserved DMA {:?}", bus.unit(), wired);
        Ok(Self {
            ctx,
            bus,
            wired,
            data_register,
        })
    }

    /// Program and start one chunk.
    ///
    /// The receive channel is enabled before the transmit channel so no
    /// incoming frame is missed. The caller waits for
    /// [`Completion::Done`](crate::bus::Completion).
    pub fn start(&mut self, chunk: &Chunk) {
        let bytes = chunk.count * chunk.size.bytes();
        let dr = self.data_register;
        let rx = self.bus.channels().rx;
        let tx = self.bus.channels().tx;
        let wired = self.wired;

        self.ctx.dma.with(|dma| {
            if let (true, Some(dst)) = (wired.contains(DmaMask::RX), chunk.rx) {
                dma.clean_invalidate_dcache(dst, bytes);
                dma.program(
                    rx,
                    &ChannelTransfer {
                        src: dr,
                        dst,
                        count: chunk.count,
                        size: chunk.size,
                        src_increment: false,
                        dst_increment: true,
                    },
                );
            }
            if let (true, Some(source)) = (wired.contains(DmaMask::TX), chunk.tx) {
                let (src, src_increment) = match source {
                    TxSource::Buffer(addr) => {
                        dma.clean_dcache(addr, bytes);
                        (addr, true)
                    }
                    TxSource::Fill(addr) => (addr, false),
                };
                dma.program(
                    tx,
                    &ChannelTransfer {
                        src,
                        dst: dr,
                        count: chunk.count,
                        size: chunk.size,
                        src_increment,
                        dst_increment: false,
                    },
                );
            }

            self.bus.expect(wired);
            if wired.contains(DmaMask::RX) {
                dma.enable(rx);
            }
            if wired.contains(DmaMask::TX) {
                dma.enable(tx);
            }
        });
    }
}

impl<B: Board> Drop for DmaReservation<'_, B> {
    fn drop(&mut self) {
        let bus = self.bus;
        let wired = self.wired;
        self.ctx.dma.with(|dma| {
            for (_, channel) in bus.channels_for(wired) {
                dma.disable(channel);
                dma.acknowledge(channel);
                dma.release(channel);
            }
        });
        bus.disarm();
        self.ctx.reservations.fetch_sub(1, Ordering::AcqRel);
        trace!("SSI{}: released DMA {:?}", bus.unit(), wired);
    }
}
