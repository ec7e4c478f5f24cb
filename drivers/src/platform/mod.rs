//! Platform Abstraction Layer
//!
//! This module provides a platform-agnostic interface for hardware access.
//! Each board implements the [`Board`] trait, naming the concrete register
//! drivers the engine runs on.
//!
//! # Usage
//!
//! ```ignore
//! use drivers::platform::{Board, CurrentBoard};
//!
//! let ctx = CurrentBoard::peripherals();
//! let bus = ctx.bus("X")?;
//! bus.configure(BusConfig::master(1_000_000))?;
//! ```

use common::sync::IrqControl;

use crate::hal::dma::DmaController;
use crate::hal::interrupt::PriorityInterruptController;
use crate::hal::ssi::SsiPort;
use crate::hal::timer::{CountingTimer, Timer};

/// Board trait - implemented by each supported board
pub trait Board: Sized + 'static {
    /// Interrupt masking and wait-for-interrupt of the core.
    type Irq: IrqControl;
    type Ssi: SsiPort + Send;
    type Dma: DmaController + Send;
    type Timer: Timer + Send;
    type Intc: PriorityInterruptController + Send;
    type Clock: CountingTimer + Sync;

    /// Board name for debugging
    fn name() -> &'static str;

    /// Frequency of the clock feeding the peripherals.
    fn system_clock_hz() -> u32;

    /// Register driver for SSI `unit`, or `None` if the board lacks it.
    fn ssi(unit: usize) -> Option<Self::Ssi>;

    fn ssi_alias(alias: &str) -> Option<usize>;

    /// Register driver for timer `unit`, or `None` if the board lacks it.
    fn timer(unit: usize) -> Option<Self::Timer>;

    fn timer_alias(alias: &str) -> Option<usize>;

    fn dma() -> Self::Dma;

    fn interrupt_controller() -> Self::Intc;

    fn clock() -> Self::Clock;
}

// Board selection based on Cargo features
cfg_if::cfg_if! {
    if #[cfg(feature = "tm4c123")] {
        pub mod tm4c123;
        pub use tm4c123::Tm4c123 as CurrentBoard;
    } else if #[cfg(not(test))] {
        compile_error!(
            "No board selected!\n\
            Use: cargo build --features tm4c123"
        );
    }
}
