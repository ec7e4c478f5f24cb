//! Synchronization primitives and architecture glue shared by the driver crates.
//!
//! - [`sync`]: spinlocks, interrupt masking, and the allocation-suppression guard
//! - [`arch`]: per-architecture implementations of [`sync::irq::IrqControl`]

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod sync;
