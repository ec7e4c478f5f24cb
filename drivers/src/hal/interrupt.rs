//! Interrupt Controller Hardware Abstraction Layer.
//!
//! This module defines platform-independent traits for interrupt management.

/// Interrupt number type.
pub type IrqNumber = u32;

/// Interrupt priority level.
///
/// Lower values indicate higher priority.
pub type Priority = u8;

/// Interrupt controller trait.
///
/// This trait represents the system's interrupt controller.
pub trait InterruptController {
    /// Enable (unmask) an interrupt line.
    fn enable(&mut self, irq: IrqNumber);

    /// Disable (mask) an interrupt line.
    fn disable(&mut self, irq: IrqNumber);

    fn is_enabled(&self, irq: IrqNumber) -> bool;

    /// Clear a pending interrupt.
    fn clear(&mut self, irq: IrqNumber);
}

/// Extension trait for interrupt controllers with priority support.
pub trait PriorityInterruptController: InterruptController {
    /// Number of distinct priority levels.
    const LEVELS: Priority;

    /// Set the priority of an interrupt line.
    fn set_priority(&mut self, irq: IrqNumber, priority: Priority);

    /// Get the priority of an interrupt line.
    fn priority(&self, irq: IrqNumber) -> Priority;
}
