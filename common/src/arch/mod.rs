//! Architecture support.
//!
//! Each architecture provides an [`IrqControl`](crate::sync::irq::IrqControl)
//! implementation for the drivers to mask interrupts and sleep.

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "arm", not(target_os = "none")))] {
        pub mod arm;
    } else {
        compile_error!("Unsupported architecture: only ARMv7-M targets are supported");
    }
}
