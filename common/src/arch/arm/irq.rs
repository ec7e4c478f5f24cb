use crate::sync::irq::IrqControl;
use core::sync::atomic::{Ordering, compiler_fence};

const PRIMASK_PM: u32 = 1 << 0;

pub struct CortexMIrq;

/// Interrupt control for ARMv7-M cores (Cortex-M3/M4/M7).
///
/// Masks configurable-priority interrupts through PRIMASK.
///
/// # State Management
/// The `State` type is `bool`: `true` when interrupts were enabled before
/// `disable()` was called.
///
/// # Assembly Details
///
/// - `mrs {0}, PRIMASK`: read the current mask
/// - `cpsid i`: set PRIMASK, masking interrupts
/// - `cpsie i`: clear PRIMASK
/// - `wfi`: sleep until an interrupt becomes pending. The core wakes even while
///   PRIMASK is set; the handler then runs as soon as the mask is cleared.
///
/// On non-ARM hosts the mask is emulated so the drivers type-check and run
/// under `cargo check`; nothing sleeps there.
impl IrqControl for CortexMIrq {
    type State = bool;

    #[inline(always)]
    fn disable() -> bool {
        let primask = read_primask();
        #[cfg(target_arch = "arm")]
        unsafe {
            core::arch::asm!("cpsid i", options(nomem, nostack, preserves_flags));
        }
        #[cfg(not(target_arch = "arm"))]
        host::MASKED.store(true, Ordering::SeqCst);
        // Keep memory accesses inside the critical section
        compiler_fence(Ordering::SeqCst);
        primask & PRIMASK_PM == 0
    }

    #[inline(always)]
    fn restore(prev_enabled: bool) {
        compiler_fence(Ordering::SeqCst);
        if prev_enabled {
            #[cfg(target_arch = "arm")]
            unsafe {
                core::arch::asm!("cpsie i", options(nomem, nostack, preserves_flags));
            }
            #[cfg(not(target_arch = "arm"))]
            host::MASKED.store(false, Ordering::SeqCst);
        }
    }

    #[inline(always)]
    fn is_enabled() -> bool {
        read_primask() & PRIMASK_PM == 0
    }

    #[inline(always)]
    fn wait_for_interrupt() {
        #[cfg(target_arch = "arm")]
        unsafe {
            core::arch::asm!("wfi", options(nomem, nostack, preserves_flags));
        }
        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}

#[inline(always)]
fn read_primask() -> u32 {
    #[cfg(target_arch = "arm")]
    {
        let primask: u32;
        unsafe {
            core::arch::asm!(
                "mrs {0}, PRIMASK",
                out(reg) primask,
                options(nomem, nostack, preserves_flags)
            );
        }
        primask
    }
    #[cfg(not(target_arch = "arm"))]
    {
        host::MASKED.load(Ordering::SeqCst) as u32
    }
}

#[cfg(not(target_arch = "arm"))]
mod host {
    use core::sync::atomic::AtomicBool;

    pub(super) static MASKED: AtomicBool = AtomicBool::new(false);
}
