//! Allocation suppression for interrupt context.
//!
//! A handler that runs application code holds a [`NoAllocGuard`] for the
//! duration of the call. While any guard is alive, a heap wrapped in
//! [`GuardedAlloc`] refuses to allocate: the foreground may be halfway
//! through an allocation of its own with the heap lock held.

use core::alloc::{GlobalAlloc, Layout};
use core::sync::atomic::{AtomicUsize, Ordering};

static DEPTH: AtomicUsize = AtomicUsize::new(0);
static DENIED: AtomicUsize = AtomicUsize::new(0);

/// Suppresses heap allocation until dropped. Guards nest.
pub struct NoAllocGuard {
    _private: (),
}

impl NoAllocGuard {
    pub fn new() -> Self {
        DEPTH.fetch_add(1, Ordering::AcqRel);
        Self { _private: () }
    }
}

impl Default for NoAllocGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NoAllocGuard {
    fn drop(&mut self) {
        DEPTH.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Whether a [`NoAllocGuard`] is currently alive.
pub fn allocation_suppressed() -> bool {
    DEPTH.load(Ordering::Acquire) > 0
}

/// Allocations refused since boot.
pub fn denied_allocations() -> usize {
    DENIED.load(Ordering::Relaxed)
}

/// `GlobalAlloc` wrapper honouring [`NoAllocGuard`].
///
/// Allocation under a guard returns null. Freeing under a guard leaks the
/// block instead of touching the heap.
///
/// ```ignore
/// #[global_allocator]
/// static HEAP: GuardedAlloc<HeapAllocator> = GuardedAlloc::new(HeapAllocator::new());
/// ```
pub struct GuardedAlloc<A> {
    inner: A,
}

impl<A> GuardedAlloc<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for GuardedAlloc<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if allocation_suppressed() {
            DENIED.fetch_add(1, Ordering::Relaxed);
            return core::ptr::null_mut();
        }
        unsafe { self.inner.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if allocation_suppressed() {
            return;
        }
        unsafe { self.inner.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if allocation_suppressed() {
            DENIED.fetch_add(1, Ordering::Relaxed);
            return core::ptr::null_mut();
        }
        unsafe { self.inner.realloc(ptr, layout, new_size) }
    }
}
