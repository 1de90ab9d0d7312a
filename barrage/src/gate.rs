//! Bounded concurrency gate
use crate::error::Error;
use std::future::Future;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting admission control.
///
/// At most `capacity` [`GatePermit`]s exist at any instant. A permit is released when it is
/// dropped, so a holder that fails or panics still gives its slot back. The gate also counts
/// current holders and the highest number of holders ever observed.
#[derive(Debug, Clone)]
pub struct Gate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<GateCounters>,
}

#[derive(Debug, Default)]
struct GateCounters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Proof of admission through a [`Gate`]. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<GateCounters>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // NOTE: Runs before the semaphore permit is returned, so `in_flight` never exceeds the
        // number of permits held.
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Gate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(GateCounters::default()),
        }
    }

    /// Wait until fewer than `capacity` permits are held, then take one.
    pub async fn acquire(&self) -> Result<GatePermit, Error> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);

        Ok(GatePermit {
            _permit: permit,
            counters: self.counters.clone(),
        })
    }

    /// Run `fut` while holding a permit.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Error> {
        let _permit = self.acquire().await?;
        Ok(fut.await)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}
