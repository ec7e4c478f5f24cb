use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A spinlock for foreground-only data in a `no_std` environment.
///
/// Interrupts stay enabled while the lock is held, so the protected data must
/// never be touched from interrupt context (use
/// [`IrqSpinLock`](super::IrqSpinLock) for that).
///
/// [`try_lock`](SpinLock::try_lock) doubles as an ownership token: a driver
/// takes it at the start of an operation and gets `None` if another
/// operation already owns the peripheral.
///
/// # Type Parameters
///
/// * `T` - The type of data protected by the spinlock.
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: SpinLock can be shared between threads if T can be sent between threads
unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates a new `SpinLock` wrapping the provided data.
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, spinning until it is available.
    ///
    /// # Example
    ///
    /// ```
    /// # use common::sync::SpinLock;
    /// let lock = SpinLock::new(0);
    /// {
    ///     let mut guard = lock.lock();
    ///     *guard += 1;
    /// } // lock is released here
    /// ```
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        SpinLockGuard { lock: self }
    }

    /// Acquires the lock only if nobody holds it.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard { lock: self })
    }

    /// Whether the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// A guard that provides access to the data protected by a `SpinLock`.
///
/// The lock is released when the guard is dropped.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> core::ops::Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: The lock is held, so we have exclusive access
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> core::ops::DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The lock is held, so we have exclusive access
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_lock_fails_while_held() {
        let lock = SpinLock::new(5u32);
        let guard = lock.try_lock().expect("lock is free");
        assert!(lock.is_locked());
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(!lock.is_locked());
        assert_eq!(*lock.try_lock().expect("lock released"), 5);
    }

    #[test]
    fn guard_released_on_early_return() {
        fn bail(lock: &SpinLock<u32>) -> Result<(), ()> {
            let mut guard = lock.try_lock().ok_or(())?;
            *guard += 1;
            Err(())
        }

        let lock = SpinLock::new(0);
        assert!(bail(&lock).is_err());
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 1);
    }
}
