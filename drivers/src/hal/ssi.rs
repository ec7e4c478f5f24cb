//! Synchronous Serial Interface Hardware Abstraction Layer.
//!
//! Value types describing a bus configuration, and the [`SsiPort`] trait a
//! board implements for each SSI unit.

use bitflags::bitflags;

use crate::error::{Error, Field};
use crate::hal::dma::ChannelPair;
use crate::hal::interrupt::IrqNumber;

/// Which side drives the serial clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BusRole {
    #[default]
    Master,
    Slave,
}

impl TryFrom<u8> for BusRole {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BusRole::Master),
            1 => Ok(BusRole::Slave),
            _ => Err(Error::InvalidParameter(Field::Role)),
        }
    }
}

/// Frame format.
///
/// The raw values are the ones the binding layer passes through, where the
/// low bit selects clock polarity and bit 1 selects clock phase.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FrameFormat {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
    /// TI synchronous serial frame format
    Ti,
    /// National Microwire frame format
    Microwire,
}

impl FrameFormat {
    /// Raw binding-layer value.
    pub const fn raw(self) -> u8 {
        match self {
            FrameFormat::Mode0 => 0x00,
            FrameFormat::Mode1 => 0x02,
            FrameFormat::Mode2 => 0x01,
            FrameFormat::Mode3 => 0x03,
            FrameFormat::Ti => 0x10,
            FrameFormat::Microwire => 0x20,
        }
    }

    /// One of the four standard SPI clock modes.
    pub const fn is_spi(self) -> bool {
        matches!(
            self,
            FrameFormat::Mode0 | FrameFormat::Mode1 | FrameFormat::Mode2 | FrameFormat::Mode3
        )
    }

    /// Serial clock idles high between frames.
    pub const fn clock_idles_high(self) -> bool {
        self.is_spi() && self.raw() & 0x01 != 0
    }

    /// Data is captured on the second clock edge.
    pub const fn samples_second_edge(self) -> bool {
        self.is_spi() && self.raw() & 0x02 != 0
    }
}

impl TryFrom<u8> for FrameFormat {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(FrameFormat::Mode0),
            0x02 => Ok(FrameFormat::Mode1),
            0x01 => Ok(FrameFormat::Mode2),
            0x03 => Ok(FrameFormat::Mode3),
            0x10 => Ok(FrameFormat::Ti),
            0x20 => Ok(FrameFormat::Microwire),
            _ => Err(Error::InvalidParameter(Field::FrameFormat)),
        }
    }
}

/// Who drives the frame/chip-select line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ChipSelect {
    /// The SSI unit toggles FSS itself.
    #[default]
    Hardware,
    /// The application drives a GPIO.
    Software,
}

impl TryFrom<u8> for ChipSelect {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChipSelect::Hardware),
            1 => Ok(ChipSelect::Software),
            _ => Err(Error::InvalidParameter(Field::ChipSelect)),
        }
    }
}

bitflags! {
    /// DMA request enables, also used for the directions a transfer wires.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct DmaMask: u8 {
        const RX = 1 << 0;
        const TX = 1 << 1;
    }
}

impl TryFrom<u32> for DmaMask {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(DmaMask::from_bits)
            .ok_or(Error::InvalidParameter(Field::Dma))
    }
}

/// Complete configuration snapshot of one bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub role: BusRole,
    pub baudrate: u32,
    /// Bits per frame.
    pub word_width: u8,
    pub frame_format: FrameFormat,
    pub chip_select: ChipSelect,
    pub dma: DmaMask,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            role: BusRole::Master,
            baudrate: 500_000,
            word_width: 8,
            frame_format: FrameFormat::Mode0,
            chip_select: ChipSelect::Hardware,
            dma: DmaMask::empty(),
        }
    }
}

impl BusConfig {
    pub fn master(baudrate: u32) -> Self {
        Self {
            baudrate,
            ..Self::default()
        }
    }

    pub fn slave(baudrate: u32) -> Self {
        Self {
            role: BusRole::Slave,
            baudrate,
            ..Self::default()
        }
    }

    pub fn word_width(mut self, bits: u8) -> Self {
        self.word_width = bits;
        self
    }

    pub fn frame_format(mut self, format: FrameFormat) -> Self {
        self.frame_format = format;
        self
    }

    pub fn chip_select(mut self, cs: ChipSelect) -> Self {
        self.chip_select = cs;
        self
    }

    pub fn dma(mut self, mask: DmaMask) -> Self {
        self.dma = mask;
        self
    }
}

/// Fully resolved frame parameters, ready to be written to the unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameSetup {
    pub role: BusRole,
    pub word_width: u8,
    pub format: FrameFormat,
    /// Even clock prescaler, 2..=254.
    pub prescaler: u8,
    /// Serial clock rate divider, 0..=255.
    pub scr: u8,
}

/// Pad settings for the unit's pins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PinSetup {
    /// Enable the pull-up on the clock pin.
    pub clock_pull_up: bool,
    /// Route FSS to the unit instead of leaving it to the application.
    pub hardware_fss: bool,
}

/// One synchronous serial unit.
///
/// Methods map one-to-one onto register accesses; sequencing is the
/// caller's job.
pub trait SsiPort {
    /// Ungate the unit's clock.
    fn power_on(&mut self);

    /// Whether the unit's clock is running and its registers accessible.
    fn is_ready(&self) -> bool;

    /// Pulse the unit's reset and gate its clock.
    fn power_off(&mut self);

    /// Set or clear the synchronous serial port enable.
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Mask every interrupt source of the unit.
    fn mask_interrupts(&mut self);

    /// Route and pad the unit's pins.
    fn configure_pins(&mut self, pins: &PinSetup);

    /// Write clocking, role and frame format. The unit must be disabled.
    fn apply(&mut self, frame: &FrameSetup);

    /// Set the DMA request enables.
    fn set_dma(&mut self, mask: DmaMask);

    /// Transmit FIFO has room.
    fn tx_not_full(&self) -> bool;

    /// Receive FIFO holds at least one frame.
    fn rx_not_empty(&self) -> bool;

    fn write_frame(&mut self, frame: u16);

    fn read_frame(&mut self) -> u16;

    /// Shifting a frame or transmit FIFO not empty.
    fn is_busy(&self) -> bool;

    /// Read and clear error status. Zero means OK.
    fn take_status(&mut self) -> u32;

    /// Bus address of the data register, for DMA.
    fn data_register(&self) -> usize;

    /// DMA channels hard-wired to this unit.
    fn dma_channels(&self) -> ChannelPair;

    fn irq(&self) -> IrqNumber;
}
