//! Hardware Abstraction Layer (HAL) - Platform-Independent Traits
//!
//! This module defines the register-level interfaces the engine drives.
//! Each board implements them on top of its own register blocks, and the
//! test simulator implements them on top of thread-local state.
//!
//! # Available Interfaces
//!
//! - [`ssi`]: Synchronous serial interface (SPI-like bus) units
//! - [`dma`]: Peripheral DMA controller
//! - [`timer`]: General purpose timers and the millisecond clock
//! - [`interrupt`]: Interrupt controller management
//! - [`gpio`]: Pad configuration for peripheral pins

pub mod dma;
pub mod gpio;
pub mod interrupt;
pub mod ssi;
pub mod timer;
