use core::fmt::Debug;
use core::marker::PhantomData;

/// Architecture-specific interrupt masking interface.
///
/// Implemented by the architecture layer (see [`crate::arch`]).
pub trait IrqControl {
    /// Saved interrupt state
    type State: Copy + Debug;

    /// Disable interrupts and return the previous state.
    fn disable() -> Self::State;

    /// Restore interrupts to a previous state.
    fn restore(state: Self::State);

    /// Whether interrupts are currently enabled at the call site.
    fn is_enabled() -> bool;

    /// Sleep until an interrupt is pending.
    ///
    /// Must return on a pending interrupt even while interrupts are masked.
    fn wait_for_interrupt();
}

/// Scoped interrupt-disable section.
///
/// Interrupts are masked for the lifetime of the guard and the previous
/// state is restored on drop, whichever way the scope is left.
///
/// ```ignore
/// let guard = IrqGuard::<CortexMIrq>::new();
/// if !flag.load(Ordering::Acquire) {
///     // An interrupt raised after the load still wakes the core.
///     guard.wait_for_interrupt();
/// }
/// drop(guard); // pending handler runs here
/// ```
pub struct IrqGuard<I: IrqControl> {
    state: I::State,
    _irq: PhantomData<I>,
}

impl<I: IrqControl> IrqGuard<I> {
    /// Mask interrupts until the guard is dropped.
    pub fn new() -> Self {
        Self {
            state: I::disable(),
            _irq: PhantomData,
        }
    }

    /// Sleep until an interrupt is pending, with interrupts still masked.
    pub fn wait_for_interrupt(&self) {
        I::wait_for_interrupt();
    }
}

impl<I: IrqControl> Default for IrqGuard<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: IrqControl> Drop for IrqGuard<I> {
    fn drop(&mut self) {
        I::restore(self.state);
    }
}
