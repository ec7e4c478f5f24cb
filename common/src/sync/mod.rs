pub mod alloc_guard;
pub mod irq;
pub mod irq_spinlock;
pub mod spinlock;

pub use alloc_guard::{GuardedAlloc, NoAllocGuard};
pub use irq::{IrqControl, IrqGuard};
pub use irq_spinlock::IrqSpinLock;
pub use spinlock::SpinLock;
