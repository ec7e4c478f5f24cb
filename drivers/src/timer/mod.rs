//! General purpose timers with interrupt callbacks.
//!
//! A [`TimerUnit`] is the record behind one timer block. A 32-bit timer
//! runs as one counter and reports through half A; a 16-bit timer splits
//! into two independent [`TimerChannel`]s, each with its own interrupt
//! line and callback.
//!
//! The interrupt path clears the pending sources first and then runs the
//! callback through [`dispatch::CallbackSlot`], so a failing callback can
//! never leave the line asserted.

pub mod dispatch;

use common::sync::{IrqControl, IrqSpinLock};
use log::{debug, warn};

use crate::error::{Error, Field, Result};
use crate::hal::interrupt::{InterruptController, IrqNumber, Priority, PriorityInterruptController};
use crate::hal::timer::{Half, Timer, TimerEvents, TimerMode, Trigger, Width};
use crate::peripherals::Peripherals;
use crate::platform::Board;

pub use dispatch::{Callback, CallbackFault, CallbackSlot, FaultLog, TimerEvent};

/// Largest interval of a 16-bit half, in prescaled ticks.
const MAX_PERIOD_16: u32 = 0x1_0000;

/// Register polls allowed for a block to come out of reset. The poll runs
/// with interrupts masked, where the millisecond clock stands still.
const READY_POLLS: u32 = 10_000;

/// Counting parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    pub mode: TimerMode,
    pub width: Width,
    /// Ticks per interval, after the prescaler. `0` is the full range of
    /// the counter: 2^32 ticks at 32 bits, 2^16 at 16 bits.
    pub period: u32,
    /// Extra divider, `prescaler + 1`. 16-bit halves only.
    pub prescaler: u8,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            mode: TimerMode::Periodic,
            width: Width::Bits32,
            period: 0,
            prescaler: 0,
        }
    }
}

impl TimerConfig {
    /// Interval parameters for `freq_hz` interrupts per second.
    pub fn from_freq(freq_hz: u32, sysclk: u32, mode: TimerMode, width: Width) -> Result<Self> {
        let ticks = sysclk.checked_div(freq_hz).unwrap_or(0);
        if ticks == 0 {
            return Err(Error::InvalidParameter(Field::Frequency));
        }

        let (period, prescaler) = match width {
            Width::Bits32 => (ticks, 0),
            Width::Bits16 => {
                let prescaler = (ticks - 1) / MAX_PERIOD_16;
                let prescaler =
                    u8::try_from(prescaler).map_err(|_| Error::InvalidParameter(Field::Frequency))?;
                (ticks / (prescaler as u32 + 1), prescaler)
            }
        };

        let config = Self {
            mode,
            width,
            period,
            prescaler,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.width {
            Width::Bits16 if self.period > MAX_PERIOD_16 => {
                Err(Error::InvalidParameter(Field::Period))
            }
            Width::Bits32 if self.prescaler != 0 => Err(Error::InvalidParameter(Field::Prescaler)),
            Width::Bits32 if self.mode == TimerMode::Pwm => Err(Error::InvalidParameter(Field::Mode)),
            _ => Ok(()),
        }
    }

    /// Value for the interval load register.
    pub fn load(&self) -> u32 {
        match (self.period, self.width) {
            (0, Width::Bits32) => u32::MAX,
            (0, Width::Bits16) => MAX_PERIOD_16 - 1,
            (period, _) => period - 1,
        }
    }

    fn halves(&self) -> &'static [Half] {
        match self.width {
            Width::Bits32 => &[Half::A],
            Width::Bits16 => &[Half::A, Half::B],
        }
    }

    /// Sources that exist at this width.
    fn events(&self) -> TimerEvents {
        match self.width {
            Width::Bits32 => TimerEvents::of(Half::A),
            Width::Bits16 => TimerEvents::all(),
        }
    }
}

struct TimerState<T> {
    timer: T,
    config: Option<TimerConfig>,
    /// Sources with a callback behind them.
    armed: TimerEvents,
}

/// Record of one timer block.
pub struct TimerUnit<T, I: IrqControl> {
    unit: usize,
    irqs: [IrqNumber; 2],
    hw: IrqSpinLock<TimerState<T>, I>,
    slots: [CallbackSlot<I>; 2],
    faults: FaultLog,
}

impl<T: Timer, I: IrqControl> TimerUnit<T, I> {
    pub(crate) fn new(unit: usize, timer: T) -> Self {
        Self {
            unit,
            irqs: [timer.irq(Half::A), timer.irq(Half::B)],
            hw: IrqSpinLock::new(TimerState {
                timer,
                config: None,
                armed: TimerEvents::empty(),
            }),
            slots: [CallbackSlot::new(), CallbackSlot::new()],
            faults: FaultLog::new(),
        }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Interrupt entry for one half.
    pub fn on_interrupt(&self, half: Half) {
        let events = self.hw.with(|s| {
            let events = s.timer.pending() & TimerEvents::of(half);
            s.timer.clear(events);
            events
        });
        if events.is_empty() {
            return;
        }

        let event = TimerEvent {
            unit: self.unit,
            half,
            events,
        };
        self.slots[half.index()].dispatch(&event, &self.faults);
    }
}

fn wait_ready<T: Timer>(timer: &T) -> Result<()> {
    for _ in 0..READY_POLLS {
        if timer.is_ready() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(Error::Timeout)
}

/// A resolved timer together with the context it lives in.
pub struct TimerHandle<'a, B: Board> {
    ctx: &'a Peripherals<B>,
    timer: &'a TimerUnit<B::Timer, B::Irq>,
}

impl<B: Board> Clone for TimerHandle<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Board> Copy for TimerHandle<'_, B> {}

impl<'a, B: Board> TimerHandle<'a, B> {
    pub(crate) fn new(ctx: &'a Peripherals<B>, timer: &'a TimerUnit<B::Timer, B::Irq>) -> Self {
        Self { ctx, timer }
    }

    pub fn unit(&self) -> usize {
        self.timer.unit
    }

    pub fn instance(&self) -> &'a TimerUnit<B::Timer, B::Irq> {
        self.timer
    }

    pub fn config(&self) -> Option<TimerConfig> {
        self.timer.hw.with(|s| s.config)
    }

    /// Program the block and start counting.
    ///
    /// Callbacks registered earlier stay registered if their source still
    /// exists at the new width.
    pub fn init(&self, config: TimerConfig) -> Result<()> {
        config.validate()?;

        let dropped = self.timer.hw.with(|s| -> Result<TimerEvents> {
            s.timer.power_on();
            wait_ready(&s.timer)?;

            s.timer.stop(Half::A);
            s.timer.stop(Half::B);
            s.timer.mask(TimerEvents::all());
            s.timer.clear(TimerEvents::all());

            s.timer.set_width(config.width);
            for &half in config.halves() {
                s.timer.set_mode(half, config.mode);
                s.timer.set_prescaler(half, config.prescaler);
                s.timer.set_load(half, config.load());
            }

            let dropped = s.armed - config.events();
            s.armed &= config.events();
            s.timer.unmask(s.armed);
            s.config = Some(config);

            for &half in config.halves() {
                s.timer.start(half);
            }
            Ok(dropped)
        })?;

        if dropped.intersects(TimerEvents::of(Half::B)) {
            self.disarm(Half::B);
        }
        debug!(
            "Timer{}: {:?} {:?}, period {}, prescaler {}",
            self.timer.unit, config.mode, config.width, config.period, config.prescaler
        );
        Ok(())
    }

    /// Stop the block, drop its callbacks, reset it and gate its clock.
    pub fn deinit(&self) -> Result<()> {
        self.disarm(Half::A);
        self.disarm(Half::B);
        self.timer.hw.with(|s| {
            if s.config.take().is_some() {
                s.timer.stop(Half::A);
                s.timer.stop(Half::B);
                s.timer.mask(TimerEvents::all());
                s.timer.clear(TimerEvents::all());
            }
            s.timer.power_off();
        });
        debug!("Timer{}: deinit", self.timer.unit);
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        self.timer.hw.with(|s| {
            let config = s.config.ok_or(Error::Disabled)?;
            for &half in config.halves() {
                s.timer.start(half);
            }
            Ok(())
        })
    }

    pub fn stop(&self) -> Result<()> {
        self.timer.hw.with(|s| {
            let config = s.config.ok_or(Error::Disabled)?;
            for &half in config.halves() {
                s.timer.stop(half);
            }
            Ok(())
        })
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .hw
            .with(|s| s.config.is_some() && s.timer.is_running(Half::A))
    }

    /// Register the update callback, or pass `None` to disable the
    /// interrupt source.
    pub fn set_callback(&self, callback: Option<Callback>) -> Result<()> {
        self.arm(Half::A, TimerEvents::TIMEOUT_A, callback, None)
    }

    pub fn is_armed(&self) -> bool {
        self.timer.slots[Half::A.index()].is_armed()
    }

    /// One half of a 16-bit timer.
    pub fn channel(&self, half: Half) -> TimerChannel<'a, B> {
        TimerChannel {
            handle: *self,
            half,
        }
    }

    /// Callback faults recorded since boot.
    pub fn fault_count(&self) -> u32 {
        self.timer.faults.total()
    }

    /// Drain faults recorded since the last drain.
    pub fn take_fault(&self) -> Option<Error> {
        let (count, code) = self.timer.faults.take()?;
        warn!(
            "Timer{}: {} callback fault(s), last code {:#x}",
            self.timer.unit, count, code
        );
        Some(Error::ContainedFault { count, code })
    }

    /// `Err(ContainedFault)` if any callback failed since the last drain.
    pub fn check_faults(&self) -> Result<()> {
        self.take_fault().map_or(Ok(()), Err)
    }

    fn arm(
        &self,
        half: Half,
        events: TimerEvents,
        callback: Option<Callback>,
        priority: Option<Priority>,
    ) -> Result<()> {
        let Some(callback) = callback else {
            self.disarm(half);
            return Ok(());
        };
        if self.config().is_none() {
            return Err(Error::Disabled);
        }

        let irq = self.timer.irqs[half.index()];
        let displaced = self.timer.slots[half.index()].replace(Some(callback));
        self.timer.hw.with(|s| {
            let others = TimerEvents::of(half) - events;
            s.timer.mask(others);
            s.armed = (s.armed - others) | events;
            s.timer.clear(events);
            s.timer.unmask(events);
        });
        self.ctx.intc.with(|intc| {
            if let Some(priority) = priority {
                intc.set_priority(irq, priority);
            }
            intc.enable(irq);
        });
        drop(displaced);

        debug!("Timer{} {:?}: armed {:?}", self.timer.unit, half, events);
        Ok(())
    }

    fn disarm(&self, half: Half) {
        let irq = self.timer.irqs[half.index()];
        self.ctx.intc.with(|intc| {
            intc.disable(irq);
            intc.clear(irq);
        });
        self.timer.hw.with(|s| {
            if s.config.is_some() {
                s.timer.mask(TimerEvents::of(half));
            }
            s.armed.remove(TimerEvents::of(half));
        });
        let displaced = self.timer.slots[half.index()].replace(None);
        drop(displaced);
    }
}

/// One 16-bit half of a split timer.
pub struct TimerChannel<'a, B: Board> {
    handle: TimerHandle<'a, B>,
    half: Half,
}

impl<B: Board> TimerChannel<'_, B> {
    pub fn half(&self) -> Half {
        self.half
    }

    fn split_config(&self) -> Result<TimerConfig> {
        let config = self.handle.config().ok_or(Error::Disabled)?;
        if config.width != Width::Bits16 {
            return Err(Error::InvalidParameter(Field::Width));
        }
        Ok(config)
    }

    /// Register `handler` for `trigger` at NVIC `priority`, or pass `None`
    /// to disable the channel's interrupt.
    pub fn irq(&self, trigger: Trigger, priority: Priority, handler: Option<Callback>) -> Result<()> {
        self.split_config()?;
        if priority >= B::Intc::LEVELS {
            return Err(Error::InvalidParameter(Field::Priority));
        }
        let events = TimerEvents::for_trigger(self.half, trigger);
        self.handle.arm(self.half, events, handler, Some(priority))
    }

    /// Compare value for [`Trigger::Match`] and the PWM duty cycle.
    pub fn set_match(&self, value: u32) -> Result<()> {
        let config = self.split_config()?;
        if value > config.load() {
            return Err(Error::InvalidParameter(Field::Period));
        }
        let half = self.half;
        self.handle.timer.hw.with(|s| s.timer.set_match(half, value));
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.handle.timer.slots[self.half.index()].is_armed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{self, SimBoard};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    const SYSCLK: u32 = 80_000_000;

    fn callback(
        f: impl FnMut(&TimerEvent) -> core::result::Result<(), CallbackFault> + Send + 'static,
    ) -> Option<Callback> {
        Some(Box::new(f))
    }

    fn counting() -> (Arc<AtomicUsize>, Option<Callback>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let cb = callback(move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        (count, cb)
    }

    fn started(ctx: &'static Peripherals<SimBoard>, width: Width) -> TimerHandle<'static, SimBoard> {
        let timer = ctx.timer(0usize).unwrap();
        let config = TimerConfig::from_freq(1_000, SYSCLK, TimerMode::Periodic, width).unwrap();
        timer.init(config).unwrap();
        timer
    }

    #[test]
    fn from_freq_32_bit() {
        let config = TimerConfig::from_freq(1_000, SYSCLK, TimerMode::Periodic, Width::Bits32).unwrap();
        assert_eq!(config.period, 80_000);
        assert_eq!(config.load(), 79_999);
        assert_eq!(config.prescaler, 0);
    }

    #[test]
    fn from_freq_16_bit_uses_prescaler() {
        let config = TimerConfig::from_freq(100, SYSCLK, TimerMode::Periodic, Width::Bits16).unwrap();
        // 800_000 ticks need a divide-by-13 prescaler to fit 16 bits.
        assert_eq!(config.prescaler, 12);
        assert!(config.period <= MAX_PERIOD_16);
        assert_eq!(config.period, 800_000 / 13);

        // 80 MHz / 256 / 65536 is about 4.77 Hz.
        assert_eq!(
            TimerConfig::from_freq(4, SYSCLK, TimerMode::Periodic, Width::Bits16),
            Err(Error::InvalidParameter(Field::Frequency))
        );
    }

    #[test]
    fn zero_period_counts_the_full_range() {
        let full32 = TimerConfig::default();
        assert_eq!(full32.validate(), Ok(()));
        assert_eq!(full32.load(), u32::MAX);

        let full16 = TimerConfig {
            width: Width::Bits16,
            ..TimerConfig::default()
        };
        assert_eq!(full16.load(), 0xFFFF);

        let ctx = sim::context();
        let timer = ctx.timer(1usize).unwrap();
        timer.init(full32).unwrap();
        assert_eq!(sim::timer_regs(1).load[0], u32::MAX);
    }

    #[test]
    fn invalid_configs() {
        assert_eq!(
            TimerConfig::from_freq(0, SYSCLK, TimerMode::OneShot, Width::Bits32),
            Err(Error::InvalidParameter(Field::Frequency))
        );
        assert_eq!(
            TimerConfig::from_freq(SYSCLK + 1, SYSCLK, TimerMode::OneShot, Width::Bits32),
            Err(Error::InvalidParameter(Field::Frequency))
        );
        let pwm32 = TimerConfig {
            mode: TimerMode::Pwm,
            ..TimerConfig::default()
        };
        assert_eq!(pwm32.validate(), Err(Error::InvalidParameter(Field::Mode)));
        let long16 = TimerConfig {
            width: Width::Bits16,
            period: MAX_PERIOD_16 + 1,
            ..TimerConfig::default()
        };
        assert_eq!(long16.validate(), Err(Error::InvalidParameter(Field::Period)));
    }

    #[test]
    fn init_programs_both_halves_at_16_bits() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits16);

        let regs = sim::timer_regs(0);
        assert_eq!(regs.width, Some(Width::Bits16));
        assert_eq!(regs.running, [true, true]);
        assert_eq!(regs.mode, [Some(TimerMode::Periodic); 2]);
        assert_eq!(regs.load[1], 80_000 / (regs.prescaler[1] as u32 + 1) - 1);
        assert!(timer.is_running());

        timer.stop().unwrap();
        assert_eq!(sim::timer_regs(0).running, [false, false]);
    }

    #[test]
    fn callback_runs_once_per_interrupt() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits32);
        let (count, cb) = counting();
        timer.set_callback(cb).unwrap();
        assert!(timer.is_armed());
        assert!(sim::irq_line_enabled(19));

        sim::raise(0, TimerEvents::TIMEOUT_A);
        ctx.on_timer_interrupt(0, Half::A);
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(sim::timer_regs(0).raised.is_empty());

        // Spurious entry with nothing pending
        ctx.on_timer_interrupt(0, Half::A);
        assert_eq!(count.load(Ordering::Relaxed), 1);

        sim::raise(0, TimerEvents::TIMEOUT_A);
        ctx.on_timer_interrupt(0, Half::A);
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn faulting_callback_is_contained() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits32);
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        timer
            .set_callback(callback(move |_| {
                if seen.fetch_add(1, Ordering::Relaxed) == 0 {
                    Err(CallbackFault::new(0xBAD))
                } else {
                    Ok(())
                }
            }))
            .unwrap();

        for _ in 0..3 {
            sim::raise(0, TimerEvents::TIMEOUT_A);
            ctx.on_timer_interrupt(0, Half::A);
            assert!(sim::timer_regs(0).raised.is_empty());
        }
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert!(timer.is_armed());

        assert_eq!(timer.fault_count(), 1);
        assert_eq!(
            timer.check_faults(),
            Err(Error::ContainedFault { count: 1, code: 0xBAD })
        );
        assert_eq!(timer.check_faults(), Ok(()));
        assert_eq!(timer.fault_count(), 1);
    }

    #[test]
    fn callback_needs_init_and_none_disarms() {
        let ctx = sim::context();
        let timer = ctx.timer("TIMER0").unwrap();
        let (count, cb) = counting();
        assert_eq!(timer.set_callback(cb), Err(Error::Disabled));
        assert_eq!(timer.start(), Err(Error::Disabled));

        let timer = started(ctx, Width::Bits32);
        let (_, cb) = counting();
        timer.set_callback(cb).unwrap();
        timer.set_callback(None).unwrap();
        assert!(!timer.is_armed());
        assert!(!sim::irq_line_enabled(19));
        assert!(!sim::timer_regs(0).unmasked.contains(TimerEvents::TIMEOUT_A));

        sim::raise(0, TimerEvents::TIMEOUT_A);
        ctx.on_timer_interrupt(0, Half::A);
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn split_channel_match_interrupt() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits16);
        let channel = timer.channel(Half::B);

        let (_, cb) = counting();
        assert_eq!(
            channel.irq(Trigger::Match, 8, cb),
            Err(Error::InvalidParameter(Field::Priority))
        );

        let events = Arc::new(AtomicU32::new(0));
        let seen = events.clone();
        channel
            .irq(
                Trigger::Match,
                3,
                callback(move |event| {
                    assert_eq!(event.half, Half::B);
                    seen.fetch_or(event.events.bits(), Ordering::Relaxed);
                    Ok(())
                }),
            )
            .unwrap();
        assert!(channel.is_armed());
        assert!(!timer.is_armed());
        assert_eq!(sim::irq_priority(20), 3);
        assert!(sim::irq_line_enabled(20));

        channel.set_match(100).unwrap();
        assert_eq!(sim::timer_regs(0).match_value[1], 100);
        assert_eq!(
            channel.set_match(0x1_0000),
            Err(Error::InvalidParameter(Field::Period))
        );

        // Timeout of B is masked; only the match reaches the callback.
        sim::raise(0, TimerEvents::TIMEOUT_B | TimerEvents::MATCH_B);
        ctx.on_timer_interrupt(0, Half::B);
        assert_eq!(events.load(Ordering::Relaxed), TimerEvents::MATCH_B.bits());
    }

    #[test]
    fn channels_need_16_bit_mode() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits32);
        let (_, cb) = counting();
        assert_eq!(
            timer.channel(Half::A).irq(Trigger::Timeout, 1, cb),
            Err(Error::InvalidParameter(Field::Width))
        );
    }

    #[test]
    fn widening_drops_half_b() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits16);
        let (_, a) = counting();
        let (_, b) = counting();
        timer.set_callback(a).unwrap();
        timer.channel(Half::B).irq(Trigger::Timeout, 2, b).unwrap();

        let config = TimerConfig::from_freq(10, SYSCLK, TimerMode::OneShot, Width::Bits32).unwrap();
        timer.init(config).unwrap();
        assert!(timer.is_armed());
        assert!(!timer.channel(Half::B).is_armed());
        assert!(!sim::irq_line_enabled(20));
        assert!(sim::timer_regs(0).unmasked.contains(TimerEvents::TIMEOUT_A));
    }

    #[test]
    fn deinit_clears_everything() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits32);
        let (_, cb) = counting();
        timer.set_callback(cb).unwrap();

        timer.deinit().unwrap();
        assert!(!timer.is_armed());
        assert!(!timer.is_running());
        assert_eq!(timer.config(), None);
        assert!(!sim::timer_regs(0).powered);
        assert!(sim::irq_line_cleared(19));
    }

    #[test]
    fn callbacks_run_with_allocation_suppressed() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits32);
        let suppressed = Arc::new(AtomicUsize::new(0));
        let seen = suppressed.clone();
        timer
            .set_callback(callback(move |_| {
                if common::sync::alloc_guard::allocation_suppressed() {
                    seen.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            }))
            .unwrap();

        sim::raise(0, TimerEvents::TIMEOUT_A);
        ctx.on_timer_interrupt(0, Half::A);
        assert_eq!(suppressed.load(Ordering::Relaxed), 1);
    }

    struct DropCount(Arc<AtomicUsize>);

    impl Drop for DropCount {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn callback_replaced_from_inside_itself() {
        let ctx = sim::context();
        let timer = started(ctx, Width::Bits32);
        let dropped = Arc::new(AtomicUsize::new(0));
        let token = DropCount(dropped.clone());
        let (second_calls, mut next) = counting();
        timer
            .set_callback(callback(move |_| {
                let _alive = &token;
                if let Some(next) = next.take() {
                    ctx.timer(0usize).unwrap().set_callback(Some(next)).unwrap();
                }
                Ok(())
            }))
            .unwrap();

        sim::raise(0, TimerEvents::TIMEOUT_A);
        ctx.on_timer_interrupt(0, Half::A);
        // Parked by the interrupt, not freed
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
        assert!(timer.is_armed());

        sim::raise(0, TimerEvents::TIMEOUT_A);
        ctx.on_timer_interrupt(0, Half::A);
        assert_eq!(second_calls.load(Ordering::Relaxed), 1);
        assert_eq!(dropped.load(Ordering::Relaxed), 0);

        timer.set_callback(None).unwrap();
        assert_eq!(dropped.load(Ordering::Relaxed), 1);
    }
}
