//! Kernel synchronization primitives.
//!
//! Spinlocks are `spin::Mutex`, used directly. The condition variable
//! below pairs with one: waiters publish interest through a generation
//! counter, drop the guard, and spin until a signal bumps the counter.
//! Parking the thread instead of spinning belongs to the scheduler,
//! which lives outside this subsystem.

use core::sync::atomic::{AtomicU64, Ordering};
use spin::{Mutex, MutexGuard};

/// Condition variable for use with a `spin::Mutex`.
///
/// Wakeups may be spurious; callers re-check their predicate in a loop.
/// `signal` and `broadcast` are equivalent (every waiter re-checks).
pub struct Condvar {
    generation: AtomicU64,
}

impl Condvar {
    pub const fn new() -> Self {
        Condvar {
            generation: AtomicU64::new(0),
        }
    }

    /// Atomically release `guard` and wait for a signal, then re-acquire
    /// the lock. The caller must have read its predicate under `guard`
    /// before calling; a signaler that changes the predicate does so
    /// under the same lock, so no wakeup can be lost.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>, lock: &'a Mutex<T>) -> MutexGuard<'a, T> {
        let observed = self.generation.load(Ordering::Acquire);
        drop(guard);
        while self.generation.load(Ordering::Acquire) == observed {
            core::hint::spin_loop();
            #[cfg(test)]
            std::thread::yield_now();
        }
        lock.lock()
    }

    /// Wake one waiter. Implemented as a broadcast; waiters filter on
    /// their own predicate.
    pub fn signal(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Wake every waiter.
    pub fn broadcast(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn signal_wakes_waiter() {
        let lock = Arc::new(Mutex::new(false));
        let cv = Arc::new(Condvar::new());

        let waiter = {
            let lock = Arc::clone(&lock);
            let cv = Arc::clone(&cv);
            std::thread::spawn(move || {
                let mut done = lock.lock();
                while !*done {
                    done = cv.wait(done, &lock);
                }
                true
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        {
            let mut done = lock.lock();
            *done = true;
            cv.signal();
        }
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn no_wait_when_predicate_already_set() {
        let lock = Mutex::new(true);
        let cv = Condvar::new();
        // Signal delivered before any waiter exists must not matter.
        cv.signal();
        let done = lock.lock();
        assert!(*done);
    }
}
