//! LeavingSoon - Delayed Counter Unwind
//!
//! ## Responsibilities
//!
//! - Increment a lot's leaving-soon counter on request
//! - Schedule one independent decrement per increment after a fixed delay
//! - Keep handles to outstanding decrement tasks so they can be awaited or
//!   cancelled

use crate::error::Result;
use crate::lot_store::{Lot, LotStateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// How long a leaving-soon signal stays active
pub const DEFAULT_DECREMENT_DELAY: Duration = Duration::from_secs(5 * 60);

/// LeavingSoonTracker instance
pub struct LeavingSoonTracker {
    store: Arc<dyn LotStateStore>,
    delay: Duration,
    /// Outstanding decrement task handles
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl LeavingSoonTracker {
    /// Create new tracker with the default 5-minute delay
    pub fn new(store: Arc<dyn LotStateStore>) -> Self {
        Self::with_delay(store, DEFAULT_DECREMENT_DELAY)
    }

    /// Create new tracker with a custom delay (tests)
    pub fn with_delay(store: Arc<dyn LotStateStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Record a leaving-soon signal: increment immediately, schedule a
    /// decrement of the then-current value after the delay, and return the
    /// post-increment lot view.
    ///
    /// Each call schedules its own decrement, so repeated signals unwind to
    /// zero one by one absent write races.
    pub async fn mark_leaving(&self, lot_name: &str) -> Result<Lot> {
        let lot = self.store.increment_leaving_soon(lot_name).await?;

        let store = self.store.clone();
        let name = lot_name.to_string();
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = store.decrement_leaving_soon(&name).await {
                tracing::warn!(lot = %name, error = %e, "Leaving-soon decrement failed");
            }
        });

        let mut tasks = self.tasks.lock().await;
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);

        tracing::info!(
            lot = %lot.name,
            leaving_soon = lot.leaving_soon,
            "Leaving-soon signal recorded"
        );

        Ok(lot)
    }

    /// Number of decrements not yet applied
    pub async fn pending_decrements(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }

    /// Await every outstanding decrement
    pub async fn drain(&self) {
        let handles: Vec<_> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Cancel every outstanding decrement
    pub async fn cancel_pending(&self) {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::OccupancySnapshot;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;

    /// In-memory stand-in for the lot store
    struct CounterStore {
        leaving_soon: StdMutex<i32>,
    }

    impl CounterStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                leaving_soon: StdMutex::new(0),
            })
        }

        fn value(&self) -> i32 {
            *self.leaving_soon.lock().unwrap()
        }
    }

    #[async_trait]
    impl LotStateStore for CounterStore {
        async fn record_occupancy(
            &self,
            _lot_name: &str,
            _snapshot: &OccupancySnapshot,
        ) -> Result<()> {
            Err(Error::Internal("not exercised by the tracker".to_string()))
        }

        async fn increment_leaving_soon(&self, lot_name: &str) -> Result<Lot> {
            let mut counter = self.leaving_soon.lock().unwrap();
            *counter += 1;
            Ok(Lot {
                id: 1,
                name: lot_name.to_string(),
                max_occupancy: 150,
                occupancy: 0,
                leaving_soon: *counter,
                latitude: None,
                longitude: None,
                updated_at: Utc::now(),
            })
        }

        async fn decrement_leaving_soon(&self, _lot_name: &str) -> Result<()> {
            let mut counter = self.leaving_soon.lock().unwrap();
            *counter = (*counter - 1).max(0);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_quick_signals_stack_then_unwind_to_zero() {
        let store = CounterStore::new();
        let tracker = LeavingSoonTracker::with_delay(store.clone(), Duration::from_secs(300));

        let first = tracker.mark_leaving("Furnas Hall Parking").await.unwrap();
        assert_eq!(first.leaving_soon, 1);

        let second = tracker.mark_leaving("Furnas Hall Parking").await.unwrap();
        assert_eq!(second.leaving_soon, 2);
        assert_eq!(store.value(), 2);
        assert_eq!(tracker.pending_decrements().await, 2);

        // Simulated time: both scheduled decrements fire at +300s
        tracker.drain().await;
        assert_eq!(store.value(), 0);
        assert_eq!(tracker.pending_decrements().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_decrement_leaves_counter_in_place() {
        let store = CounterStore::new();
        let tracker = LeavingSoonTracker::with_delay(store.clone(), Duration::from_secs(300));

        tracker.mark_leaving("Furnas Hall Parking").await.unwrap();
        tracker.cancel_pending().await;

        // Even well past the delay, no decrement runs
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(store.value(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decrement_clamps_at_zero() {
        let store = CounterStore::new();
        let tracker = LeavingSoonTracker::with_delay(store.clone(), Duration::from_secs(1));

        tracker.mark_leaving("Lot").await.unwrap();
        tracker.drain().await;
        assert_eq!(store.value(), 0);

        // A direct decrement on an already-zero counter stays at zero
        store.decrement_leaving_soon("Lot").await.unwrap();
        assert_eq!(store.value(), 0);
    }
}
