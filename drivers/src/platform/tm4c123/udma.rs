//! TM4C123 µDMA controller.
//!
//! 32 channels, each described by a 16-byte entry in a control table the
//! controller reads from SRAM. Only the primary table and basic mode are
//! used. Completion of a peripheral channel raises that peripheral's
//! interrupt and sets the channel's bit in CHIS.

use core::cell::UnsafeCell;
use core::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile};

use crate::hal::dma::{ChannelStatus, ChannelTransfer, DmaChannel, DmaController, ElementSize};

use super::sysctl;

/// µDMA base address.
pub const UDMA_BASE: usize = 0x400F_F000;

pub const CHANNELS: usize = 32;

const CFG_MASTEN: u32 = 1 << 0;

const CTL_XFERMODE_BASIC: u32 = 0x1;
const CTL_XFERSIZE_SHIFT: u32 = 4;
/// Arbitrate after 4 items, half an SSI FIFO.
const CTL_ARBSIZE_4: u32 = 2 << 14;
const CTL_SRCSIZE_SHIFT: u32 = 24;
const CTL_SRCINC_SHIFT: u32 = 26;
const CTL_DSTSIZE_SHIFT: u32 = 28;
const CTL_DSTINC_SHIFT: u32 = 30;
const INC_NONE: u32 = 0x3;

/// Memory-mapped µDMA registers.
#[repr(C)]
#[allow(dead_code)]
struct Registers {
    stat: u32,
    cfg: u32,
    ctlbase: u32,
    altbase: u32,
    waitstat: u32,
    swreq: u32,
    useburstset: u32,
    useburstclr: u32,
    reqmaskset: u32,
    reqmaskclr: u32,
    enaset: u32,
    enaclr: u32,
    altset: u32,
    altclr: u32,
    prioset: u32,
    prioclr: u32,
    _reserved0: [u32; 3],
    errclr: u32,
    _reserved1: [u32; 300],
    chasgn: u32,
    chis: u32,
    _reserved2: [u32; 2],
    chmap: [u32; 4],
}

#[repr(C)]
#[derive(Copy, Clone)]
struct ControlEntry {
    src_end: u32,
    dst_end: u32,
    control: u32,
    _unused: u32,
}

#[repr(C, align(1024))]
struct ControlTable(UnsafeCell<[ControlEntry; CHANNELS]>);

// SAFETY: entries are written only by the `Udma` owner with the channel
// disabled, and read by the controller.
unsafe impl Sync for ControlTable {}

static CONTROL_TABLE: ControlTable = ControlTable(UnsafeCell::new(
    [ControlEntry {
        src_end: 0,
        dst_end: 0,
        control: 0,
        _unused: 0,
    }; CHANNELS],
));

#[inline(always)]
fn regs() -> *mut Registers {
    UDMA_BASE as *mut Registers
}

const fn size_bits(size: ElementSize) -> u32 {
    match size {
        ElementSize::Byte => 0,
        ElementSize::HalfWord => 1,
    }
}

/// Control word for a basic transfer.
fn control_word(transfer: &ChannelTransfer) -> u32 {
    let size = size_bits(transfer.size);
    let src_inc = if transfer.src_increment { size } else { INC_NONE };
    let dst_inc = if transfer.dst_increment { size } else { INC_NONE };
    dst_inc << CTL_DSTINC_SHIFT
        | size << CTL_DSTSIZE_SHIFT
        | src_inc << CTL_SRCINC_SHIFT
        | size << CTL_SRCSIZE_SHIFT
        | CTL_ARBSIZE_4
        | ((transfer.count as u32 - 1) << CTL_XFERSIZE_SHIFT)
        | CTL_XFERMODE_BASIC
}

/// The controller addresses the last item, not one past it.
fn end_pointer(start: usize, increment: bool, transfer: &ChannelTransfer) -> u32 {
    if increment {
        (start + (transfer.count - 1) * transfer.size.bytes()) as u32
    } else {
        start as u32
    }
}

// ============================================================================
// HAL Implementation
// ============================================================================

#[derive(Debug)]
pub struct Udma {
    claimed: u32,
    enabled: bool,
}

impl Udma {
    /// # Safety
    ///
    /// Only one instance may exist; it owns the control table.
    pub const unsafe fn new() -> Self {
        Self {
            claimed: 0,
            enabled: false,
        }
    }

    fn ensure_enabled(&mut self) {
        if self.enabled {
            return;
        }
        sysctl::enable(sysctl::UDMA, 0);
        while !sysctl::is_ready(sysctl::UDMA, 0) {
            core::hint::spin_loop();
        }
        unsafe {
            write_volatile(addr_of_mut!((*regs()).cfg), CFG_MASTEN);
            write_volatile(
                addr_of_mut!((*regs()).ctlbase),
                CONTROL_TABLE.0.get() as usize as u32,
            );
        }
        self.enabled = true;
    }

    fn entry(channel: DmaChannel) -> *mut ControlEntry {
        unsafe { (CONTROL_TABLE.0.get() as *mut ControlEntry).add(channel.number as usize) }
    }
}

impl DmaController for Udma {
    const MAX_ITEMS: usize = 1024;

    fn claim(&mut self, channel: DmaChannel) -> bool {
        let bit = 1u32 << channel.number;
        if self.claimed & bit != 0 {
            return false;
        }
        self.ensure_enabled();
        self.claimed |= bit;

        let index = channel.number as usize / 8;
        let shift = (channel.number as u32 % 8) * 4;
        unsafe {
            let r = regs();
            let chmap = addr_of_mut!((*r).chmap[index]);
            let value = read_volatile(chmap) & !(0xF << shift);
            write_volatile(chmap, value | (channel.assignment as u32) << shift);

            // Primary structure, default priority, single and burst requests
            write_volatile(addr_of_mut!((*r).altclr), bit);
            write_volatile(addr_of_mut!((*r).prioclr), bit);
            write_volatile(addr_of_mut!((*r).useburstclr), bit);
            write_volatile(addr_of_mut!((*r).reqmaskclr), bit);
        }
        true
    }

    fn release(&mut self, channel: DmaChannel) {
        self.claimed &= !(1u32 << channel.number);
    }

    fn program(&mut self, channel: DmaChannel, transfer: &ChannelTransfer) {
        let entry = Self::entry(channel);
        unsafe {
            write_volatile(
                addr_of_mut!((*entry).src_end),
                end_pointer(transfer.src, transfer.src_increment, transfer),
            );
            write_volatile(
                addr_of_mut!((*entry).dst_end),
                end_pointer(transfer.dst, transfer.dst_increment, transfer),
            );
            write_volatile(addr_of_mut!((*entry).control), control_word(transfer));
        }
    }

    fn enable(&mut self, channel: DmaChannel) {
        unsafe { write_volatile(addr_of_mut!((*regs()).enaset), 1 << channel.number) };
    }

    fn disable(&mut self, channel: DmaChannel) {
        unsafe { write_volatile(addr_of_mut!((*regs()).enaclr), 1 << channel.number) };
    }

    fn status(&self, channel: DmaChannel) -> ChannelStatus {
        let bit = 1u32 << channel.number;
        unsafe {
            let r = regs();
            let error = read_volatile(addr_of!((*r).errclr));
            if error != 0 {
                return ChannelStatus::Error(error);
            }
            if read_volatile(addr_of!((*r).chis)) & bit != 0 {
                return ChannelStatus::Done;
            }
            // The enable bit clears itself when a basic transfer finishes
            if read_volatile(addr_of!((*r).enaset)) & bit != 0 {
                ChannelStatus::Busy
            } else {
                ChannelStatus::Idle
            }
        }
    }

    fn acknowledge(&mut self, channel: DmaChannel) {
        unsafe {
            let r = regs();
            write_volatile(addr_of_mut!((*r).chis), 1 << channel.number);
            if read_volatile(addr_of!((*r).errclr)) != 0 {
                write_volatile(addr_of_mut!((*r).errclr), 1);
            }
        }
    }
}
