//! Counting semaphore bounding teardown fan-out.

use parking_lot::{Condvar, Mutex};

/// Blocking counting semaphore.
///
/// Permits are returned when the [`SemaphorePermit`] guard drops, so a
/// worker holding one releases it even if its closure unwinds.
pub(crate) struct Semaphore {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl Semaphore {
    /// Creates a semaphore with `capacity` permits. Zero is raised to one.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    /// Blocks until a permit is free.
    pub(crate) fn acquire(&self) -> SemaphorePermit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        SemaphorePermit { semaphore: self }
    }

    #[cfg(test)]
    fn available_permits(&self) -> usize {
        *self.available.lock()
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        debug_assert!(*available <= self.capacity);
        self.released.notify_one();
    }
}

/// RAII guard for one semaphore permit.
pub(crate) struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_is_raised() {
        let semaphore = Semaphore::new(0);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[test]
    fn test_permits_return_on_drop() {
        let semaphore = Semaphore::new(2);
        let first = semaphore.acquire();
        let second = semaphore.acquire();
        assert_eq!(semaphore.available_permits(), 0);

        drop(first);
        assert_eq!(semaphore.available_permits(), 1);
        drop(second);
        assert_eq!(semaphore.available_permits(), 2);
    }

    #[test]
    fn test_bounds_concurrent_holders() {
        let semaphore = Semaphore::new(3);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..12 {
                let permit = semaphore.acquire();
                let (active, peak) = (&active, &peak);
                scope.spawn(move || {
                    let _permit = permit;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(semaphore.available_permits(), 3);
    }
}
