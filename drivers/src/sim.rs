//! Simulated board for host tests.
//!
//! Every register driver keeps its state in thread-locals, so each test
//! thread sees its own hardware. The core only "runs" when the engine
//! sleeps: [`SimIrq::wait_for_interrupt`] advances the clock by one
//! millisecond and completes enabled DMA channels; unmasking then delivers
//! the SSI interrupt to the context registered with [`context`].
//!
//! Wire model: every frame a master transmits comes back through
//! [`set_wire`], loopback by default. A slave receives what [`feed`]
//! queued for the remote master to send. The clock also creeps forward
//! one microsecond per read unless [`freeze_clock`] stopped it.

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::vec::Vec;

use common::sync::IrqControl;

use crate::hal::dma::{ChannelPair, ChannelStatus, ChannelTransfer, DmaChannel, DmaController, ElementSize};
use crate::hal::interrupt::{InterruptController, IrqNumber, Priority, PriorityInterruptController};
use crate::hal::ssi::{BusRole, DmaMask, FrameSetup, PinSetup, SsiPort};
use crate::hal::timer::{CountingTimer, Half, Timer, TimerEvents, TimerMode, Width};
use crate::peripherals::Peripherals;
use crate::platform::Board;

pub const SYSCLK: u32 = 80_000_000;
const UNITS: usize = 4;
const TIMERS: usize = 6;
const CHANNELS: usize = 2 * UNITS;

#[derive(Copy, Clone, Default)]
struct Channel {
    program: Option<ChannelTransfer>,
    enabled: bool,
    status: Option<ChannelStatus>,
}

#[derive(Copy, Clone, Default)]
pub struct TimerRegs {
    pub powered: bool,
    pub width: Option<Width>,
    pub mode: [Option<TimerMode>; 2],
    pub load: [u32; 2],
    pub prescaler: [u8; 2],
    pub match_value: [u32; 2],
    pub running: [bool; 2],
    pub unmasked: TimerEvents,
    pub raised: TimerEvents,
}

thread_local! {
    static CTX: Cell<Option<&'static Peripherals<SimBoard>>> = const { Cell::new(None) };
    static IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
    static PENDING_BUSES: Cell<u8> = const { Cell::new(0) };
    static NOW_US: Cell<u64> = const { Cell::new(0) };
    static FROZEN: Cell<bool> = const { Cell::new(false) };
    static UNMASKED_SLEEPS: Cell<usize> = const { Cell::new(0) };

    static WIRE: Cell<fn(u16) -> u16> = const { Cell::new(loopback) };
    static SENT: RefCell<Vec<u16>> = const { RefCell::new(Vec::new()) };
    static REMOTE: RefCell<VecDeque<u16>> = const { RefCell::new(VecDeque::new()) };
    static POLLED_FRAMES: Cell<usize> = const { Cell::new(0) };
    static SSI_STATUS: Cell<u32> = const { Cell::new(0) };
    static STUCK_IN_RESET: Cell<u8> = const { Cell::new(0) };

    static DMA: RefCell<[Channel; CHANNELS]> = RefCell::new([Channel::default(); CHANNELS]);
    static CLAIMED: Cell<u32> = const { Cell::new(0) };
    static DMA_CHUNKS: Cell<usize> = const { Cell::new(0) };
    static DMA_STALL: Cell<bool> = const { Cell::new(false) };
    static DMA_ERROR: Cell<Option<u32>> = const { Cell::new(None) };

    static INTC_ENABLED: Cell<u128> = const { Cell::new(0) };
    static CLEARED: Cell<u128> = const { Cell::new(0) };
    static PRIORITIES: RefCell<[Priority; 128]> = const { RefCell::new([0; 128]) };

    static TIMER_REGS: RefCell<[TimerRegs; TIMERS]> = RefCell::new([TimerRegs::default(); TIMERS]);
}

fn loopback(frame: u16) -> u16 {
    frame
}

/// Fresh hardware and a new context, registered for interrupt delivery.
pub fn context() -> &'static Peripherals<SimBoard> {
    IRQ_ENABLED.with(|c| c.set(true));
    PENDING_BUSES.with(|c| c.set(0));
    NOW_US.with(|c| c.set(0));
    FROZEN.with(|c| c.set(false));
    UNMASKED_SLEEPS.with(|c| c.set(0));
    STUCK_IN_RESET.with(|c| c.set(0));
    WIRE.with(|c| c.set(loopback));
    SENT.with(|s| s.borrow_mut().clear());
    REMOTE.with(|r| r.borrow_mut().clear());
    POLLED_FRAMES.with(|c| c.set(0));
    SSI_STATUS.with(|c| c.set(0));
    DMA.with(|d| *d.borrow_mut() = [Channel::default(); CHANNELS]);
    CLAIMED.with(|c| c.set(0));
    DMA_CHUNKS.with(|c| c.set(0));
    DMA_STALL.with(|c| c.set(false));
    DMA_ERROR.with(|c| c.set(None));
    INTC_ENABLED.with(|c| c.set(0));
    CLEARED.with(|c| c.set(0));
    TIMER_REGS.with(|t| *t.borrow_mut() = [TimerRegs::default(); TIMERS]);

    let ctx: &'static Peripherals<SimBoard> = Box::leak(Box::new(Peripherals::new()));
    CTX.with(|c| c.set(Some(ctx)));
    ctx
}

pub fn set_wire(wire: fn(u16) -> u16) {
    WIRE.with(|c| c.set(wire));
}

/// Queue frames for the remote master to clock into a slave.
pub fn feed(frames: &[u16]) {
    REMOTE.with(|r| r.borrow_mut().extend(frames));
}

fn remote_frame() -> Option<u16> {
    REMOTE.with(|r| r.borrow_mut().pop_front())
}

/// Frames that left the transmit side, polled or DMA.
pub fn sent() -> Vec<u16> {
    SENT.with(|s| s.borrow().clone())
}

/// Frames moved through the data register by the CPU.
pub fn polled_frames() -> usize {
    POLLED_FRAMES.with(Cell::get)
}

/// Chunks the DMA controller has moved.
pub fn dma_chunks() -> usize {
    DMA_CHUNKS.with(Cell::get)
}

/// DMA channels never complete.
pub fn stall_dma() {
    DMA_STALL.with(|c| c.set(true));
}

/// The next DMA completion reports `status` instead.
pub fn fail_dma(status: u32) {
    DMA_ERROR.with(|c| c.set(Some(status)));
}

/// Status the SSI reports after the next transfer.
pub fn set_ssi_status(status: u32) {
    SSI_STATUS.with(|c| c.set(status));
}

/// Claim a channel behind the engine's back.
pub fn claim_channel(number: u8) {
    CLAIMED.with(|c| c.set(c.get() | 1 << number));
}

pub fn claimed_channels() -> u32 {
    CLAIMED.with(Cell::get)
}

/// Stop the clock. Only sleeping still moves it.
pub fn freeze_clock() {
    FROZEN.with(|c| c.set(true));
}

/// Times the core went to sleep with interrupts unmasked, where a
/// completion arriving just before the sleep would go unnoticed.
pub fn unmasked_sleeps() -> usize {
    UNMASKED_SLEEPS.with(Cell::get)
}

/// `unit` never reports ready after its next power-up.
pub fn stick_in_reset(unit: usize) {
    STUCK_IN_RESET.with(|c| c.set(c.get() | 1 << unit));
}

/// Mask or unmask interrupts at the simulated core.
pub fn set_irqs_enabled(enabled: bool) {
    IRQ_ENABLED.with(|c| c.set(enabled));
}

pub fn irq_line_enabled(irq: IrqNumber) -> bool {
    INTC_ENABLED.with(|c| c.get() & 1 << irq != 0)
}

/// Whether a pending state was ever discarded for `irq`.
pub fn irq_line_cleared(irq: IrqNumber) -> bool {
    CLEARED.with(|c| c.get() & 1 << irq != 0)
}

pub fn irq_priority(irq: IrqNumber) -> Priority {
    PRIORITIES.with(|p| p.borrow()[irq as usize])
}

pub fn timer_regs(unit: usize) -> TimerRegs {
    TIMER_REGS.with(|t| t.borrow()[unit])
}

/// Raise timer sources as the counter would.
pub fn raise(unit: usize, events: TimerEvents) {
    TIMER_REGS.with(|t| t.borrow_mut()[unit].raised |= events);
}

fn deliver_pending() {
    let pending = PENDING_BUSES.with(|c| c.replace(0));
    if pending == 0 {
        return;
    }
    if let Some(ctx) = CTX.with(Cell::get) {
        for unit in (0..UNITS).filter(|unit| pending & 1 << unit != 0) {
            ctx.on_bus_interrupt(unit);
        }
    }
}

unsafe fn load(addr: usize, size: ElementSize) -> u16 {
    unsafe {
        match size {
            ElementSize::Byte => *(addr as *const u8) as u16,
            ElementSize::HalfWord => *(addr as *const u16),
        }
    }
}

unsafe fn store(addr: usize, size: ElementSize, frame: u16) {
    unsafe {
        match size {
            ElementSize::Byte => *(addr as *mut u8) = frame as u8,
            ElementSize::HalfWord => *(addr as *mut u16) = frame,
        }
    }
}

/// Run every enabled channel pair to completion.
fn complete_dma() {
    if DMA_STALL.with(Cell::get) {
        return;
    }
    let wire = WIRE.with(Cell::get);
    DMA.with(|dma| {
        let mut dma = dma.borrow_mut();
        for unit in 0..UNITS {
            let (rx, tx) = (2 * unit, 2 * unit + 1);
            let rx_program = dma[rx].program.filter(|_| dma[rx].enabled);
            let tx_program = dma[tx].program.filter(|_| dma[tx].enabled);
            let Some(count) = rx_program.or(tx_program).map(|p| p.count) else {
                continue;
            };
            DMA_CHUNKS.with(|c| c.set(c.get() + 1));

            for i in 0..count {
                let incoming = match tx_program {
                    Some(p) => {
                        let addr = if p.src_increment { p.src + i * p.size.bytes() } else { p.src };
                        let frame = unsafe { load(addr, p.size) };
                        SENT.with(|s| s.borrow_mut().push(frame));
                        wire(frame)
                    }
                    None => remote_frame().unwrap_or(0xFFFF),
                };
                if let Some(p) = rx_program {
                    unsafe { store(p.dst + i * p.size.bytes(), p.size, incoming) };
                }
            }

            let status = match DMA_ERROR.with(Cell::take) {
                Some(code) => ChannelStatus::Error(code),
                None => ChannelStatus::Done,
            };
            for channel in [rx, tx] {
                if dma[channel].enabled {
                    dma[channel].enabled = false;
                    dma[channel].status = Some(status);
                }
            }
            PENDING_BUSES.with(|c| c.set(c.get() | 1 << unit));
        }
    });
}

// ============================================================================
// Core
// ============================================================================

pub struct SimIrq;

impl IrqControl for SimIrq {
    type State = bool;

    fn disable() -> bool {
        IRQ_ENABLED.with(|c| c.replace(false))
    }

    fn restore(prev_enabled: bool) {
        if prev_enabled {
            IRQ_ENABLED.with(|c| c.set(true));
            deliver_pending();
        }
    }

    fn is_enabled() -> bool {
        IRQ_ENABLED.with(Cell::get)
    }

    fn wait_for_interrupt() {
        if Self::is_enabled() {
            UNMASKED_SLEEPS.with(|c| c.set(c.get() + 1));
        }
        NOW_US.with(|c| c.set(c.get() + 1000));
        complete_dma();
        if Self::is_enabled() {
            deliver_pending();
        }
    }
}

pub struct SimClock;

impl CountingTimer for SimClock {
    fn now_us(&self) -> u64 {
        let creep = !FROZEN.with(Cell::get) as u64;
        NOW_US.with(|c| {
            let now = c.get();
            c.set(now + creep);
            now
        })
    }

    fn polls_per_ms(&self) -> u64 {
        1000
    }
}

// ============================================================================
// SSI
// ============================================================================

pub struct SimSsi {
    unit: usize,
    powered: bool,
    stuck: bool,
    enabled: bool,
    role: BusRole,
    dma: DmaMask,
    rx_fifo: Vec<u16>,
    pub pins: Option<PinSetup>,
    pub frame: Option<FrameSetup>,
}

impl SimSsi {
    fn new(unit: usize) -> Self {
        Self {
            unit,
            powered: false,
            stuck: false,
            enabled: false,
            role: BusRole::Master,
            dma: DmaMask::empty(),
            rx_fifo: Vec::new(),
            pins: None,
            frame: None,
        }
    }
}

impl SsiPort for SimSsi {
    fn power_on(&mut self) {
        self.powered = true;
        self.stuck = STUCK_IN_RESET.with(|c| c.get() & 1 << self.unit != 0);
    }

    fn is_ready(&self) -> bool {
        self.powered && !self.stuck
    }

    fn power_off(&mut self) {
        self.powered = false;
        self.enabled = false;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn mask_interrupts(&mut self) {}

    fn configure_pins(&mut self, pins: &PinSetup) {
        self.pins = Some(*pins);
    }

    fn apply(&mut self, frame: &FrameSetup) {
        self.role = frame.role;
        self.frame = Some(*frame);
    }

    fn set_dma(&mut self, mask: DmaMask) {
        self.dma = mask;
    }

    fn tx_not_full(&self) -> bool {
        self.enabled
    }

    fn rx_not_empty(&self) -> bool {
        let remote = self.role == BusRole::Slave && REMOTE.with(|r| !r.borrow().is_empty());
        !self.rx_fifo.is_empty() || remote
    }

    fn write_frame(&mut self, frame: u16) {
        SENT.with(|s| s.borrow_mut().push(frame));
        let wire = WIRE.with(Cell::get);
        self.rx_fifo.push(wire(frame));
    }

    fn read_frame(&mut self) -> u16 {
        POLLED_FRAMES.with(|c| c.set(c.get() + 1));
        if !self.rx_fifo.is_empty() {
            return self.rx_fifo.remove(0);
        }
        remote_frame().unwrap_or(0)
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn take_status(&mut self) -> u32 {
        SSI_STATUS.with(Cell::take)
    }

    fn data_register(&self) -> usize {
        0x4000_8008 + self.unit * 0x1000
    }

    fn dma_channels(&self) -> ChannelPair {
        ChannelPair {
            rx: DmaChannel::new(2 * self.unit as u8, 0),
            tx: DmaChannel::new(2 * self.unit as u8 + 1, 0),
        }
    }

    fn irq(&self) -> IrqNumber {
        7 + self.unit as IrqNumber
    }
}

// ============================================================================
// DMA
// ============================================================================

pub struct SimDma;

impl DmaController for SimDma {
    // Small, so short test buffers already span several chunks.
    const MAX_ITEMS: usize = 4;

    fn claim(&mut self, channel: DmaChannel) -> bool {
        let bit = 1u32 << channel.number;
        CLAIMED.with(|c| {
            let claimed = c.get();
            c.set(claimed | bit);
            claimed & bit == 0
        })
    }

    fn release(&mut self, channel: DmaChannel) {
        CLAIMED.with(|c| c.set(c.get() & !(1 << channel.number)));
    }

    fn program(&mut self, channel: DmaChannel, transfer: &ChannelTransfer) {
        assert!(transfer.count <= Self::MAX_ITEMS);
        DMA.with(|d| {
            let mut d = d.borrow_mut();
            let ch = &mut d[channel.number as usize];
            assert!(!ch.enabled, "programmed while enabled");
            ch.program = Some(*transfer);
            ch.status = Some(ChannelStatus::Busy);
        });
    }

    fn enable(&mut self, channel: DmaChannel) {
        DMA.with(|d| d.borrow_mut()[channel.number as usize].enabled = true);
    }

    fn disable(&mut self, channel: DmaChannel) {
        DMA.with(|d| d.borrow_mut()[channel.number as usize].enabled = false);
    }

    fn status(&self, channel: DmaChannel) -> ChannelStatus {
        DMA.with(|d| d.borrow()[channel.number as usize].status.unwrap_or(ChannelStatus::Idle))
    }

    fn acknowledge(&mut self, channel: DmaChannel) {
        DMA.with(|d| {
            let mut d = d.borrow_mut();
            let ch = &mut d[channel.number as usize];
            if matches!(ch.status, Some(ChannelStatus::Done | ChannelStatus::Error(_))) {
                ch.status = None;
            }
        });
    }
}

// ============================================================================
// Interrupt controller
// ============================================================================

pub struct SimIntc;

impl InterruptController for SimIntc {
    fn enable(&mut self, irq: IrqNumber) {
        INTC_ENABLED.with(|c| c.set(c.get() | 1 << irq));
    }

    fn disable(&mut self, irq: IrqNumber) {
        INTC_ENABLED.with(|c| c.set(c.get() & !(1 << irq)));
    }

    fn is_enabled(&self, irq: IrqNumber) -> bool {
        irq_line_enabled(irq)
    }

    fn clear(&mut self, irq: IrqNumber) {
        CLEARED.with(|c| c.set(c.get() | 1 << irq));
    }
}

impl PriorityInterruptController for SimIntc {
    const LEVELS: Priority = 8;

    fn set_priority(&mut self, irq: IrqNumber, priority: Priority) {
        PRIORITIES.with(|p| p.borrow_mut()[irq as usize] = priority);
    }

    fn priority(&self, irq: IrqNumber) -> Priority {
        irq_priority(irq)
    }
}

// ============================================================================
// Timer
// ============================================================================

pub struct SimTimer {
    unit: usize,
}

impl SimTimer {
    fn with<R>(&self, f: impl FnOnce(&mut TimerRegs) -> R) -> R {
        TIMER_REGS.with(|t| f(&mut t.borrow_mut()[self.unit]))
    }
}

impl Timer for SimTimer {
    fn power_on(&mut self) {
        self.with(|r| r.powered = true);
    }

    fn is_ready(&self) -> bool {
        self.with(|r| r.powered)
    }

    fn power_off(&mut self) {
        self.with(|r| *r = TimerRegs::default());
    }

    fn set_width(&mut self, width: Width) {
        self.with(|r| r.width = Some(width));
    }

    fn set_mode(&mut self, half: Half, mode: TimerMode) {
        self.with(|r| r.mode[half.index()] = Some(mode));
    }

    fn set_load(&mut self, half: Half, load: u32) {
        self.with(|r| r.load[half.index()] = load);
    }

    fn set_prescaler(&mut self, half: Half, prescaler: u8) {
        self.with(|r| r.prescaler[half.index()] = prescaler);
    }

    fn set_match(&mut self, half: Half, value: u32) {
        self.with(|r| r.match_value[half.index()] = value);
    }

    fn start(&mut self, half: Half) {
        self.with(|r| r.running[half.index()] = true);
    }

    fn stop(&mut self, half: Half) {
        self.with(|r| r.running[half.index()] = false);
    }

    fn is_running(&self, half: Half) -> bool {
        self.with(|r| r.running[half.index()])
    }

    fn unmask(&mut self, events: TimerEvents) {
        self.with(|r| r.unmasked |= events);
    }

    fn mask(&mut self, events: TimerEvents) {
        self.with(|r| r.unmasked -= events);
    }

    fn pending(&self) -> TimerEvents {
        self.with(|r| r.raised & r.unmasked)
    }

    fn clear(&mut self, events: TimerEvents) {
        self.with(|r| r.raised -= events);
    }

    fn irq(&self, half: Half) -> IrqNumber {
        19 + 2 * self.unit as IrqNumber + half.index() as IrqNumber
    }
}

// ============================================================================
// Board
// ============================================================================

pub struct SimBoard;

fn alias(name: &str, prefix: &str, units: usize) -> Option<usize> {
    let unit: usize = name.strip_prefix(prefix)?.parse().ok()?;
    (unit < units).then_some(unit)
}

impl Board for SimBoard {
    type Irq = SimIrq;
    type Ssi = SimSsi;
    type Dma = SimDma;
    type Timer = SimTimer;
    type Intc = SimIntc;
    type Clock = SimClock;

    fn name() -> &'static str {
        "simulator"
    }

    fn system_clock_hz() -> u32 {
        SYSCLK
    }

    fn ssi(unit: usize) -> Option<SimSsi> {
        (unit < UNITS).then(|| SimSsi::new(unit))
    }

    fn ssi_alias(name: &str) -> Option<usize> {
        match name {
            "X" => Some(1),
            "Y" => Some(2),
            _ => alias(name, "SSI", UNITS),
        }
    }

    fn timer(unit: usize) -> Option<SimTimer> {
        (unit < TIMERS).then_some(SimTimer { unit })
    }

    fn timer_alias(name: &str) -> Option<usize> {
        alias(name, "TIMER", TIMERS)
    }

    fn dma() -> SimDma {
        SimDma
    }

    fn interrupt_controller() -> SimIntc {
        SimIntc
    }

    fn clock() -> SimClock {
        SimClock
    }
}
