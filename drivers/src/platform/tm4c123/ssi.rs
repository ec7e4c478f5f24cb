//! TM4C123 Synchronous Serial Interface driver
//!
//! Four SSI units, each with an 8-entry transmit and receive FIFO and
//! µDMA request lines for both directions.

use crate::hal::dma::{ChannelPair, DmaChannel};
use crate::hal::gpio::{AlternateFunction, PullMode};
use crate::hal::interrupt::IrqNumber;
use crate::hal::ssi::{BusRole, DmaMask, FrameFormat, FrameSetup, PinSetup, SsiPort};
use core::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile};

use super::gpio::{Gpio, Pin, Port};
use super::sysctl;

/// SSI0 base address; units are 4 KiB apart.
pub const SSI_BASE: usize = 0x4000_8000;

pub const SSI_UNITS: usize = 4;

const CR0_SPO: u32 = 1 << 6;
const CR0_SPH: u32 = 1 << 7;
const CR0_FRF_SHIFT: u32 = 4;
const CR0_SCR_SHIFT: u32 = 8;

const CR1_SSE: u32 = 1 << 1;
const CR1_MS: u32 = 1 << 2;

const SR_TNF: u32 = 1 << 1;
const SR_RNE: u32 = 1 << 2;
const SR_BSY: u32 = 1 << 4;

/// Receive overrun.
const RIS_ROR: u32 = 1 << 0;

const DMACTL_RXDMAE: u32 = 1 << 0;
const DMACTL_TXDMAE: u32 = 1 << 1;

/// Clock source: system clock.
const CC_SYSCLK: u32 = 0x0;

/// Memory-mapped SSI registers.
#[repr(C)]
#[allow(dead_code)]
struct Registers {
    cr0: u32,
    cr1: u32,
    dr: u32,
    sr: u32,
    cpsr: u32,
    im: u32,
    ris: u32,
    mis: u32,
    icr: u32,
    dmactl: u32,
    _reserved: [u32; 1000],
    cc: u32,
}

/// Static description of one unit.
struct Unit {
    irq: IrqNumber,
    channels: ChannelPair,
    /// Clock, frame select, receive, transmit.
    pins: [Pin; 4],
    pin_function: u8,
}

static UNITS: [Unit; SSI_UNITS] = [
    Unit {
        irq: 7,
        channels: ChannelPair {
            rx: DmaChannel::new(10, 0),
            tx: DmaChannel::new(11, 0),
        },
        pins: [
            Pin::new(Port::A, 2),
            Pin::new(Port::A, 3),
            Pin::new(Port::A, 4),
            Pin::new(Port::A, 5),
        ],
        pin_function: 2,
    },
    Unit {
        irq: 34,
        channels: ChannelPair {
            rx: DmaChannel::new(24, 0),
            tx: DmaChannel::new(25, 0),
        },
        pins: [
            Pin::new(Port::F, 2),
            Pin::new(Port::F, 3),
            Pin::new(Port::F, 0),
            Pin::new(Port::F, 1),
        ],
        pin_function: 2,
    },
    Unit {
        irq: 57,
        channels: ChannelPair {
            rx: DmaChannel::new(12, 2),
            tx: DmaChannel::new(13, 2),
        },
        pins: [
            Pin::new(Port::B, 4),
            Pin::new(Port::B, 5),
            Pin::new(Port::B, 6),
            Pin::new(Port::B, 7),
        ],
        pin_function: 2,
    },
    Unit {
        irq: 58,
        channels: ChannelPair {
            rx: DmaChannel::new(14, 2),
            tx: DmaChannel::new(15, 2),
        },
        pins: [
            Pin::new(Port::D, 0),
            Pin::new(Port::D, 1),
            Pin::new(Port::D, 2),
            Pin::new(Port::D, 3),
        ],
        pin_function: 1,
    },
];

fn cr0(frame: &FrameSetup) -> u32 {
    let dss = (frame.word_width - 1) as u32;
    let (frf, spo, sph) = match frame.format {
        FrameFormat::Ti => (1, false, false),
        FrameFormat::Microwire => (2, false, false),
        spi => (0, spi.clock_idles_high(), spi.samples_second_edge()),
    };
    let mut value = dss | frf << CR0_FRF_SHIFT | (frame.scr as u32) << CR0_SCR_SHIFT;
    if spo {
        value |= CR0_SPO;
    }
    if sph {
        value |= CR0_SPH;
    }
    value
}

// ============================================================================
// HAL Implementation
// ============================================================================

/// One SSI unit.
#[derive(Debug)]
pub struct Tm4cSsi {
    n: usize,
    regs: *mut Registers,
}

// SAFETY: the register block is only reached through `&mut self`
unsafe impl Send for Tm4cSsi {}

impl Tm4cSsi {
    /// # Safety
    ///
    /// At most one driver per unit may exist.
    pub const unsafe fn new(n: usize) -> Self {
        Self {
            n,
            regs: (SSI_BASE + n * 0x1000) as *mut Registers,
        }
    }

    fn unit(&self) -> &'static Unit {
        &UNITS[self.n]
    }

    fn read(&self, field: *const u32) -> u32 {
        unsafe { read_volatile(field) }
    }
}

impl SsiPort for Tm4cSsi {
    fn power_on(&mut self) {
        sysctl::enable(sysctl::SSI, self.n);
    }

    fn is_ready(&self) -> bool {
        sysctl::is_ready(sysctl::SSI, self.n)
    }

    fn power_off(&mut self) {
        sysctl::reset(sysctl::SSI, self.n);
        sysctl::disable(sysctl::SSI, self.n);
    }

    fn set_enabled(&mut self, enabled: bool) {
        unsafe {
            let cr1 = addr_of_mut!((*self.regs).cr1);
            let value = read_volatile(cr1);
            write_volatile(cr1, if enabled { value | CR1_SSE } else { value & !CR1_SSE });
        }
    }

    fn is_enabled(&self) -> bool {
        self.read(unsafe { addr_of!((*self.regs).cr1) }) & CR1_SSE != 0
    }

    fn mask_interrupts(&mut self) {
        unsafe {
            write_volatile(addr_of_mut!((*self.regs).im), 0);
            write_volatile(addr_of_mut!((*self.regs).icr), 0x3);
        }
    }

    fn configure_pins(&mut self, pins: &PinSetup) {
        let unit = self.unit();
        let [clk, fss, rx, tx] = unit.pins;
        let mut gpio = unsafe { Gpio::new() };

        // Pin numbers are fixed by the unit table, so these cannot fail.
        gpio.set_alt_function(clk, unit.pin_function).ok();
        gpio.set_alt_function(rx, unit.pin_function).ok();
        gpio.set_alt_function(tx, unit.pin_function).ok();
        if pins.hardware_fss {
            gpio.set_alt_function(fss, unit.pin_function).ok();
        } else {
            gpio.release(fss).ok();
        }
        let pull = if pins.clock_pull_up {
            PullMode::Up
        } else {
            PullMode::None
        };
        gpio.set_pull(clk, pull).ok();
    }

    fn apply(&mut self, frame: &FrameSetup) {
        unsafe {
            write_volatile(addr_of_mut!((*self.regs).cc), CC_SYSCLK);
            let cr1 = match frame.role {
                BusRole::Master => 0,
                BusRole::Slave => CR1_MS,
            };
            write_volatile(addr_of_mut!((*self.regs).cr1), cr1);
            write_volatile(addr_of_mut!((*self.regs).cpsr), frame.prescaler as u32);
            write_volatile(addr_of_mut!((*self.regs).cr0), cr0(frame));
        }
    }

    fn set_dma(&mut self, mask: DmaMask) {
        let mut value = 0;
        if mask.contains(DmaMask::RX) {
            value |= DMACTL_RXDMAE;
        }
        if mask.contains(DmaMask::TX) {
            value |= DMACTL_TXDMAE;
        }
        unsafe { write_volatile(addr_of_mut!((*self.regs).dmactl), value) };
    }

    fn tx_not_full(&self) -> bool {
        self.read(unsafe { addr_of!((*self.regs).sr) }) & SR_TNF != 0
    }

    fn rx_not_empty(&self) -> bool {
        self.read(unsafe { addr_of!((*self.regs).sr) }) & SR_RNE != 0
    }

    fn write_frame(&mut self, frame: u16) {
        unsafe { write_volatile(addr_of_mut!((*self.regs).dr), frame as u32) };
    }

    fn read_frame(&mut self) -> u16 {
        self.read(unsafe { addr_of!((*self.regs).dr) }) as u16
    }

    fn is_busy(&self) -> bool {
        self.read(unsafe { addr_of!((*self.regs).sr) }) & SR_BSY != 0
    }

    fn take_status(&mut self) -> u32 {
        unsafe {
            let status = read_volatile(addr_of!((*self.regs).ris)) & RIS_ROR;
            write_volatile(addr_of_mut!((*self.regs).icr), status);
            status
        }
    }

    fn data_register(&self) -> usize {
        unsafe { addr_of!((*self.regs).dr) as usize }
    }

    fn dma_channels(&self) -> ChannelPair {
        self.unit().channels
    }

    fn irq(&self) -> IrqNumber {
        self.unit().irq
    }
}
