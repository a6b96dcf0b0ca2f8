use std::collections::{HashSet, VecDeque};

use parking_lot::{Condvar, Mutex};

struct PermitState {
    available: usize,
    // tickets of blocked acquirers, oldest first
    waiters: VecDeque<u64>,
    // tickets that received a permit straight from `release`
    handed_over: HashSet<u64>,
    next_ticket: u64,
}

/// Caps the number of upstream calls in flight across the whole client.
///
/// Waiters are served strictly in arrival order. A released permit goes
/// directly to the oldest waiter and never shows up in
/// [`Semaphore::available_permits`] while someone is queued.
pub struct Semaphore {
    state: Mutex<PermitState>,
    handoff: Condvar,
    max_permits: usize,
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Semaphore")
            .field("max_permits", &self.max_permits)
            .field("available", &state.available)
            .field("waiting", &state.waiters.len())
            .finish()
    }
}

impl Semaphore {
    /// Create a limiter with `permits` slots
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(PermitState {
                available: permits,
                waiters: VecDeque::new(),
                handed_over: HashSet::new(),
                next_ticket: 0,
            }),
            handoff: Condvar::new(),
            max_permits: permits,
        }
    }

    /// Block until a permit is free.
    ///
    /// The permit is returned when the guard is dropped, so every exit path
    /// of the caller releases it.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        let mut state = self.state.lock();

        if state.available > 0 && state.waiters.is_empty() {
            state.available -= 1;
            return SemaphorePermit { semaphore: self };
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiters.push_back(ticket);

        while !state.handed_over.remove(&ticket) {
            self.handoff.wait(&mut state);
        }

        SemaphorePermit { semaphore: self }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        match state.waiters.pop_front() {
            Some(ticket) => {
                state.handed_over.insert(ticket);
                drop(state);
                self.handoff.notify_all();
            }
            None => state.available += 1,
        }
    }

    /// Permits not held and not promised to a waiter
    pub fn available_permits(&self) -> usize {
        self.state.lock().available
    }

    /// Callers currently blocked in [`Semaphore::acquire`]
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Configured concurrency limit
    pub fn max_permits(&self) -> usize {
        self.max_permits
    }
}

/// A held permit; dropping it releases the slot
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct SemaphorePermit<'a> {
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
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };

    fn wait_for_waiters(semaphore: &Semaphore, count: usize) {
        while semaphore.waiting() < count {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn never_admits_more_than_the_limit() {
        let semaphore = Arc::new(Semaphore::new(2));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let semaphore = Arc::clone(&semaphore);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    let _permit = semaphore.acquire();
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(15));
                    active.fetch_sub(1, Ordering::SeqCst);
                    finished.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(finished.load(Ordering::SeqCst), 8);
        assert_eq!(semaphore.available_permits(), 2);
    }

    #[test]
    fn release_hands_permit_to_waiter() {
        let semaphore = Arc::new(Semaphore::new(1));
        let held = semaphore.acquire();
        assert_eq!(semaphore.available_permits(), 0);

        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || {
                let _permit = semaphore.acquire();
                thread::sleep(Duration::from_millis(10));
            })
        };
        wait_for_waiters(&semaphore, 1);

        drop(held);
        // the freed permit went to the waiter, not back to the pool
        assert_eq!(semaphore.available_permits(), 0);
        assert_eq!(semaphore.waiting(), 0);

        waiter.join().unwrap();
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[test]
    fn waiters_are_admitted_in_arrival_order() {
        let semaphore = Arc::new(Semaphore::new(1));
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let held = semaphore.acquire();

        let mut handles = Vec::new();
        for id in 0..4 {
            let sem = Arc::clone(&semaphore);
            let order = Arc::clone(&order);
            handles.push(thread::spawn(move || {
                let _permit = sem.acquire();
                order.lock().push(id);
            }));
            wait_for_waiters(&semaphore, id + 1);
        }

        drop(held);
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn newcomer_does_not_jump_the_queue() {
        let semaphore = Arc::new(Semaphore::new(1));
        let held = semaphore.acquire();

        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || {
                let permit = semaphore.acquire();
                thread::sleep(Duration::from_millis(20));
                drop(permit);
            })
        };
        wait_for_waiters(&semaphore, 1);
        drop(held);

        // the waiter owns the permit now; a fresh acquire has to queue
        assert_eq!(semaphore.available_permits(), 0);
        let _late = semaphore.acquire();
        waiter.join().unwrap();
        assert_eq!(semaphore.available_permits(), 0);
    }
}
