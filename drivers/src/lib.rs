//! Serial bus and timer drivers
//!
//! This crate provides a layered driver stack for the SSI units and
//! general purpose timers of Cortex-M microcontrollers:
//!
//! # Module Organization
//!
//! - [`hal`]: Platform-independent register driver traits
//! - [`platform`]: Board implementations of those traits
//! - [`registry`]: Lazily created per-unit records
//! - [`bus`]: Bus configuration, DMA coordination and transfers
//! - [`timer`]: Timer configuration and interrupt callback dispatch
//! - [`peripherals`]: The driver context tying all of the above together
//!
//! # Usage Example
//!
//! ```ignore
//! use drivers::hal::ssi::{BusConfig, DmaMask};
//! use drivers::platform::tm4c123;
//!
//! let ctx = tm4c123::peripherals();
//! let bus = ctx.bus("SSI0")?;
//! bus.configure(BusConfig::master(1_000_000).dma(DmaMask::RX | DmaMask::TX))?;
//! let reply: Vec<u8> = bus.send_recv(&[0x9F, 0, 0, 0], Some(10))?;
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bus;
pub mod error;
pub mod hal;
pub mod peripherals;
pub mod platform;
pub mod registry;
pub mod timer;

#[cfg(test)]
mod sim;

// Re-export commonly used types
pub use bus::{BusHandle, Payload, TransferRequest};
pub use error::{Error, Field, Result};
pub use hal::ssi::{BusConfig, BusRole, ChipSelect, DmaMask, FrameFormat};
pub use hal::timer::{Half, TimerMode, Trigger, Width};
pub use peripherals::Peripherals;
pub use registry::Id;
pub use timer::{Callback, CallbackFault, TimerChannel, TimerConfig, TimerEvent, TimerHandle};
