//! DMA Controller Hardware Abstraction Layer.

/// One DMA channel and the peripheral mapping it must be switched to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DmaChannel {
    pub number: u8,
    /// Channel map encoding selecting the peripheral request line.
    pub assignment: u8,
}

impl DmaChannel {
    pub const fn new(number: u8, assignment: u8) -> Self {
        Self { number, assignment }
    }
}

/// Receive and transmit channels serving one peripheral.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelPair {
    pub rx: DmaChannel,
    pub tx: DmaChannel,
}

/// Size of one transferred item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ElementSize {
    Byte,
    HalfWord,
}

impl ElementSize {
    pub const fn bytes(self) -> usize {
        match self {
            ElementSize::Byte => 1,
            ElementSize::HalfWord => 2,
        }
    }
}

/// Basic (single buffer) transfer description for one channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelTransfer {
    pub src: usize,
    pub dst: usize,
    /// Items to move, at most [`DmaController::MAX_ITEMS`].
    pub count: usize,
    pub size: ElementSize,
    pub src_increment: bool,
    pub dst_increment: bool,
}

/// Channel state as seen by the completion interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Idle,
    Busy,
    Done,
    Error(u32),
}

/// Peripheral DMA controller.
pub trait DmaController {
    /// Largest item count of one basic transfer.
    const MAX_ITEMS: usize;

    /// Take exclusive use of a channel and map it to its peripheral.
    ///
    /// Returns `false` if the channel is already claimed.
    fn claim(&mut self, channel: DmaChannel) -> bool;

    fn release(&mut self, channel: DmaChannel);

    /// Write the channel's control structure. The channel must be disabled.
    fn program(&mut self, channel: DmaChannel, transfer: &ChannelTransfer);

    /// Let the channel respond to its peripheral's requests.
    fn enable(&mut self, channel: DmaChannel);

    fn disable(&mut self, channel: DmaChannel);

    fn status(&self, channel: DmaChannel) -> ChannelStatus;

    /// Clear the channel's completion and error flags.
    fn acknowledge(&mut self, channel: DmaChannel);

    /// Write back cached lines covering a buffer the DMA will read.
    fn clean_dcache(&mut self, addr: usize, len: usize) {
        let _ = (addr, len);
    }

    /// Write back and drop cached lines covering a buffer the DMA will write.
    fn clean_invalidate_dcache(&mut self, addr: usize, len: usize) {
        let _ = (addr, len);
    }
}
