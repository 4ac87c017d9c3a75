//! Synchronization primitives for ISR-safe access.
//!
//! The top-half/bottom-half split in the interrupt router and the lost-wakeup
//! lock on the completion path are built on these.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` for safe mutable access
/// from both normal code and interrupt handlers.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }
}

// SAFETY: CriticalSectionCell uses critical sections to protect all access.
unsafe impl<T> Sync for CriticalSectionCell<T> {}

/// Completion signal shared between the deferred-work path and waiters.
///
/// The deferred-work handler publishes the monotonic completed-descriptor
/// count under a critical section; a waiter polls for the count to reach its
/// target. Publishing and observing both happen inside the lock, so a
/// completion that lands between a waiter's check and its sleep is picked up
/// on the next poll rather than lost.
pub struct CompletionFlag {
    observed: CriticalSectionCell<u64>,
}

impl CompletionFlag {
    /// Create a new flag with nothing observed.
    pub const fn new() -> Self {
        Self {
            observed: CriticalSectionCell::new(0),
        }
    }

    /// Publish a new completed count (monotonic, stale publishes ignored).
    #[inline]
    pub fn publish(&self, completed: u64) {
        self.observed.with(|v| {
            if completed > *v {
                *v = completed;
            }
        });
    }

    /// Read the last published count.
    #[inline]
    pub fn observed(&self) -> u64 {
        self.observed.with(|v| *v)
    }

    /// Reset for a new transfer.
    #[inline]
    pub fn reset(&self) {
        self.observed.with(|v| *v = 0);
    }

    /// Wait until the published count reaches `target` or `timeout_us` elapses.
    ///
    /// Returns `true` on reaching the target.
    pub fn wait_for(
        &self,
        target: u64,
        delay: &mut impl DelayNs,
        timeout_us: u32,
        poll_interval_us: u32,
    ) -> bool {
        let mut waited: u32 = 0;
        loop {
            if self.observed() >= target {
                return true;
            }
            if waited >= timeout_us {
                return false;
            }
            delay.delay_us(poll_interval_us);
            waited = waited.saturating_add(poll_interval_us);
        }
    }
}

impl Default for CompletionFlag {
    fn default() -> Self {
        Self::new()
    }
}
