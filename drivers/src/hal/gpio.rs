//! GPIO (General Purpose Input/Output) Hardware Abstraction Layer.
//!
//! Only pad configuration for peripheral pins is covered; driving pins as
//! plain outputs is left to the application.

/// Internal pull resistor configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PullMode {
    /// No pull resistor (high impedance).
    None,
    /// Enable internal pull-up resistor.
    Up,
    /// Enable internal pull-down resistor.
    Down,
}

/// GPIO port able to hand pins to on-chip peripherals.
pub trait AlternateFunction {
    /// Platform-specific pin identifier.
    type Pin: Copy + Clone;

    /// Error type for GPIO operations.
    type Error: core::fmt::Debug;

    /// Connect a pin to a peripheral signal and enable its digital input.
    fn set_alt_function(&mut self, pin: Self::Pin, function: u8) -> Result<(), Self::Error>;

    /// Configure the internal pull resistor for a pin.
    fn set_pull(&mut self, pin: Self::Pin, pull: PullMode) -> Result<(), Self::Error>;

    /// Hand a pin back to the GPIO block.
    fn release(&mut self, pin: Self::Pin) -> Result<(), Self::Error>;
}
