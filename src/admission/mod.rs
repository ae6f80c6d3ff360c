//! Admission control (load shedding).
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → AdmissionGate::try_admit()
//!         in_flight < ceiling → CAS increment → Some(AdmissionPermit)
//!         otherwise           → None (shed, nothing to release)
//!     → permit held for the lifetime of the request
//!     → Drop for AdmissionPermit decrements exactly once
//! ```
//!
//! # Design Decisions
//! - Non-queuing: excess load is rejected, never buffered
//! - Release is tied to Drop so every exit path (error, panic, cancelled
//!   future on client disconnect) gives the slot back
//! - A single atomic counter is the only state shared across request tasks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct GateState {
    in_flight: AtomicUsize,
    ceiling: usize,
}

/// Concurrency-limiting gate that sheds instead of queuing.
///
/// Cloning is cheap; clones share the same counter.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    state: Arc<GateState>,
}

impl AdmissionGate {
    /// Create a gate admitting at most `ceiling` concurrent requests.
    pub fn new(ceiling: usize) -> Self {
        Self {
            state: Arc::new(GateState {
                in_flight: AtomicUsize::new(0),
                ceiling,
            }),
        }
    }

    /// Try to take a slot.
    ///
    /// Returns `None` without side effects when the gate is full. The
    /// returned permit releases its slot when dropped.
    pub fn try_admit(&self) -> Option<AdmissionPermit> {
        let mut current = self.state.in_flight.load(Ordering::Acquire);
        loop {
            if current >= self.state.ceiling {
                return None;
            }
            match self.state.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    metrics::gauge!("admission_in_flight").increment(1.0);
                    return Some(AdmissionPermit {
                        state: Arc::clone(&self.state),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Requests currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::Acquire)
    }

    /// Configured maximum concurrency.
    pub fn ceiling(&self) -> usize {
        self.state.ceiling
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.state.ceiling.saturating_sub(self.in_flight())
    }
}

/// A held admission slot.
///
/// Not `Clone`: one permit, one release.
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the slot"]
pub struct AdmissionPermit {
    state: Arc<GateState>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let previous = self.state.in_flight.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "admission counter underflow");
        metrics::gauge!("admission_in_flight").decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_admits_up_to_ceiling() {
        let gate = AdmissionGate::new(2);
        let first = gate.try_admit();
        let second = gate.try_admit();
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(gate.in_flight(), 2);

        assert!(gate.try_admit().is_none());
        assert_eq!(gate.in_flight(), 2, "rejection must not touch the counter");

        drop(first);
        assert_eq!(gate.in_flight(), 1);
        assert_eq!(gate.available(), 1);

        let third = gate.try_admit();
        assert!(third.is_some());
        drop(second);
        drop(third);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_zero_ceiling_sheds_everything() {
        let gate = AdmissionGate::new(0);
        assert!(gate.try_admit().is_none());
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_clones_share_the_counter() {
        let gate = AdmissionGate::new(1);
        let other = gate.clone();
        let _permit = gate.try_admit().unwrap();
        assert!(other.try_admit().is_none());
        assert_eq!(other.in_flight(), 1);
    }

    #[test]
    fn test_permit_released_during_unwind() {
        let gate = AdmissionGate::new(1);
        let inner = gate.clone();
        let result = std::panic::catch_unwind(move || {
            let _permit = inner.try_admit().unwrap();
            panic!("handler blew up");
        });
        assert!(result.is_err());
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_concurrent_admission_never_exceeds_ceiling() {
        const CEILING: usize = 4;
        const THREADS: usize = 16;
        const ROUNDS: usize = 2_000;

        let gate = AdmissionGate::new(CEILING);
        let high_water = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gate = gate.clone();
                let high_water = Arc::clone(&high_water);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut admitted = 0usize;
                    for _ in 0..ROUNDS {
                        if let Some(permit) = gate.try_admit() {
                            admitted += 1;
                            let seen = gate.in_flight();
                            assert!(seen <= CEILING);
                            high_water.fetch_max(seen, Ordering::Relaxed);
                            drop(permit);
                        }
                    }
                    admitted
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(admitted > 0);
        assert!(high_water.load(Ordering::Relaxed) <= CEILING);
        assert_eq!(gate.in_flight(), 0);
    }
}
